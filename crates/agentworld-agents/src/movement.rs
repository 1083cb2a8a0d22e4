//! Eased interpolation, direction parsing, and target selection.
//!
//! Movement is a pure function of the last position, the target, and the
//! progress fraction, so the position an agent reports is always the eased
//! interpolation of `last -> target` at its current progress.

use agentworld_types::{Direction, Position};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::{ActivityArea, AgentConfig};

/// Smoothstep-style ease: `t^3 (t (6t - 15) + 10)`, with `t` clamped to `[0, 1]`.
pub fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * t.mul_add(t.mul_add(6.0, -15.0), 10.0)
}

/// Position at `progress` along the eased path from `last` to `target`,
/// truncated to whole pixels.
#[allow(clippy::cast_possible_truncation)]
pub fn interpolate(last: Position, target: Position, progress: f64) -> Position {
    let e = ease(progress);
    let axis = |from: i32, to: i32| -> i32 {
        let from = f64::from(from);
        (f64::from(to) - from).mul_add(e, from) as i32
    };
    Position::new(axis(last.x, target.x), axis(last.y, target.y))
}

/// Pick a direction from free-form thought text.
///
/// Keywords are checked in the order north, south, east, west, stay. When
/// none appears the direction is drawn uniformly from all five.
pub fn extract_direction<R: Rng + ?Sized>(thought: &str, rng: &mut R) -> Direction {
    let lower = thought.to_lowercase();
    Direction::ALL
        .into_iter()
        .find(|d| lower.contains(d.as_str()))
        .unwrap_or_else(|| random_direction(rng))
}

/// Uniformly random direction.
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL
        .choose(rng)
        .copied()
        .unwrap_or(Direction::Stay)
}

/// Compute a new target from `from` in `direction`, clamped to `area`.
///
/// A directed move travels a random `step_min..=step_max` pixels. Staying,
/// or heading into the edge the agent already sits on, jitters each axis by
/// up to `stay_jitter` pixels instead.
pub fn calculate_target<R: Rng + ?Sized>(
    from: Position,
    direction: Direction,
    area: ActivityArea,
    config: &AgentConfig,
    rng: &mut R,
) -> Position {
    let step = rng.random_range(config.step_min..=config.step_max);
    let moved = match direction {
        Direction::North if from.y > area.min_y => Some(Position::new(from.x, from.y.saturating_sub(step))),
        Direction::South if from.y < area.max_y => Some(Position::new(from.x, from.y.saturating_add(step))),
        Direction::East if from.x < area.max_x => Some(Position::new(from.x.saturating_add(step), from.y)),
        Direction::West if from.x > area.min_x => Some(Position::new(from.x.saturating_sub(step), from.y)),
        _ => None,
    };
    let target = moved.unwrap_or_else(|| {
        let j = config.stay_jitter;
        Position::new(
            from.x.saturating_add(rng.random_range(-j..=j)),
            from.y.saturating_add(rng.random_range(-j..=j)),
        )
    });
    area.clamp(target)
}

/// Dominant-axis compass word for the displacement `from -> to`.
///
/// Ties between the axes resolve to the vertical one.
pub fn heading(from: Position, to: Position) -> Direction {
    let dx = i64::from(to.x) - i64::from(from.x);
    let dy = i64::from(to.y) - i64::from(from.y);
    if dx.abs() > dy.abs() {
        if dx > 0 { Direction::East } else { Direction::West }
    } else if dy > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn ease_endpoints() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        assert!((ease(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(ease(-3.0), 0.0);
        assert_eq!(ease(7.0), 1.0);
    }

    #[test]
    fn interpolation_hits_both_ends() {
        let last = Position::new(200, 200);
        let target = Position::new(213, 190);
        assert_eq!(interpolate(last, target, 0.0), last);
        assert_eq!(interpolate(last, target, 1.0), target);
    }

    #[test]
    fn interpolation_monotonically_approaches_target() {
        let last = Position::new(150, 300);
        let target = Position::new(165, 287);
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let p = f64::from(step) / 100.0;
            let d = interpolate(last, target, p).distance(target);
            assert!(d <= previous, "distance grew at p={p}");
            previous = d;
        }
        assert!(previous < f64::EPSILON);
    }

    #[test]
    fn direction_keywords_checked_in_order() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(extract_direction("Heading North, maybe east", &mut rng), Direction::North);
        assert_eq!(extract_direction("the south-east looks nice", &mut rng), Direction::South);
        assert_eq!(extract_direction("I'll explore west for a while.", &mut rng), Direction::West);
        assert_eq!(extract_direction("I should stay here", &mut rng), Direction::Stay);
    }

    #[test]
    fn unmatched_thought_picks_some_direction() {
        let mut rng = SmallRng::seed_from_u64(7);
        let d = extract_direction("hmm", &mut rng);
        assert!(Direction::ALL.contains(&d));
    }

    #[test]
    fn directed_target_stays_in_area() {
        let mut rng = SmallRng::seed_from_u64(3);
        let area = ActivityArea::default();
        let config = AgentConfig::default();
        for direction in Direction::ALL {
            for _ in 0..50 {
                let from = Position::new(rng.random_range(150..=350), rng.random_range(150..=300));
                let target = calculate_target(from, direction, area, &config, &mut rng);
                assert!(area.contains(target));
            }
        }
    }

    #[test]
    fn north_move_keeps_column() {
        let mut rng = SmallRng::seed_from_u64(11);
        let from = Position::new(250, 250);
        let target = calculate_target(
            from,
            Direction::North,
            ActivityArea::default(),
            &AgentConfig::default(),
            &mut rng,
        );
        assert_eq!(target.x, 250);
        assert!((235..=245).contains(&target.y));
    }

    #[test]
    fn blocked_direction_jitters() {
        let mut rng = SmallRng::seed_from_u64(5);
        let area = ActivityArea::default();
        let from = Position::new(250, area.min_y);
        let target = calculate_target(from, Direction::North, area, &AgentConfig::default(), &mut rng);
        assert!((target.x - from.x).abs() <= 3);
        assert!((target.y - from.y).abs() <= 3);
    }

    #[test]
    fn heading_uses_dominant_axis() {
        let origin = Position::new(200, 200);
        assert_eq!(heading(origin, Position::new(210, 203)), Direction::East);
        assert_eq!(heading(origin, Position::new(190, 203)), Direction::West);
        assert_eq!(heading(origin, Position::new(202, 214)), Direction::South);
        assert_eq!(heading(origin, Position::new(202, 188)), Direction::North);
    }
}
