//! Shared ceiling on outbound generation calls.
//!
//! Both dispatchers hold a clone of one [`CallLimiter`], so the total number
//! of simultaneous backend calls never exceeds the configured ceiling no
//! matter how many requests a single tick produces.
//!
//! A batch shares one deadline of `timeout x ceiling`: an entry still
//! waiting for a permit, or still in flight, when it passes times out and
//! falls back. A burst of any size therefore resolves within that bound.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agentworld_llm::GenerationError;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Counting limiter with a per-call deadline.
#[derive(Debug, Clone)]
pub struct CallLimiter {
    permits: Arc<Semaphore>,
    ceiling: usize,
}

impl CallLimiter {
    /// Allow at most `ceiling` calls (at least one) at a time.
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            permits: Arc::new(Semaphore::new(ceiling)),
            ceiling,
        }
    }

    /// The configured ceiling.
    pub const fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Deadline for a batch whose calls each allow `timeout`:
    /// `timeout x ceiling` from now.
    pub fn batch_deadline(&self, timeout: Duration) -> Instant {
        let now = Instant::now();
        let ceiling = u32::try_from(self.ceiling).unwrap_or(u32::MAX);
        timeout
            .checked_mul(ceiling)
            .and_then(|budget| now.checked_add(budget))
            .or_else(|| now.checked_add(timeout))
            .unwrap_or(now)
    }

    /// Run `call` once a permit is free, giving up after `timeout`.
    ///
    /// Shorthand for [`call_before`](Self::call_before) with a deadline of
    /// its own.
    ///
    /// # Errors
    ///
    /// See [`call_before`](Self::call_before).
    pub async fn call<F>(&self, timeout: Duration, call: F) -> Result<String, GenerationError>
    where
        F: Future<Output = Result<String, GenerationError>>,
    {
        self.call_before(self.batch_deadline(timeout), timeout, call).await
    }

    /// Run `call` once a permit is free. The call gets at most `timeout`,
    /// and neither the wait for a permit nor the call may outlast
    /// `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Timeout`] when either deadline passes,
    /// [`GenerationError::Unavailable`] if the limiter was closed, or
    /// whatever `call` itself returns.
    pub async fn call_before<F>(
        &self,
        deadline: Instant,
        timeout: Duration,
        call: F,
    ) -> Result<String, GenerationError>
    where
        F: Future<Output = Result<String, GenerationError>>,
    {
        let _permit = match tokio::time::timeout_at(deadline, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => return Err(GenerationError::Unavailable(e.to_string())),
            Err(elapsed) => {
                tracing::trace!(%elapsed, "batch deadline passed waiting for a permit");
                return Err(GenerationError::timeout(timeout));
            }
        };
        let call_deadline = Instant::now()
            .checked_add(timeout)
            .map_or(deadline, |d| d.min(deadline));
        match tokio::time::timeout_at(call_deadline, call).await {
            Ok(result) => result,
            Err(elapsed) => {
                tracing::trace!(%elapsed, "generation call deadline passed");
                Err(GenerationError::timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn passes_result_through() {
        let limiter = CallLimiter::new(2);
        let ok = limiter
            .call(Duration::from_secs(1), async { Ok("north".to_owned()) })
            .await;
        assert_eq!(ok.unwrap(), "north");

        let err = limiter
            .call(Duration::from_secs(1), async {
                Err(GenerationError::Backend("boom".to_owned()))
            })
            .await;
        assert_eq!(err, Err(GenerationError::Backend("boom".to_owned())));
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let limiter = CallLimiter::new(1);
        let result = limiter
            .call(Duration::from_millis(100), async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok("late".to_owned())
            })
            .await;
        assert_eq!(result, Err(GenerationError::Timeout { timeout_ms: 100 }));
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_ceiling() {
        let limiter = CallLimiter::new(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let limiter = limiter.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            async move {
                limiter
                    .call(Duration::from_secs(5), async {
                        let now = current.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        Ok(String::new())
                    })
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;
        assert_eq!(results.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_resolves_within_batch_deadline() {
        let limiter = CallLimiter::new(2);
        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let deadline = limiter.batch_deadline(timeout);

        let calls = (0..10).map(|_| {
            limiter.call_before(deadline, timeout, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("late".to_owned())
            })
        });
        let results = futures::future::join_all(calls).await;

        assert!(started.elapsed() <= timeout.saturating_mul(2));
        assert!(
            results
                .iter()
                .all(|r| *r == Err(GenerationError::Timeout { timeout_ms: 200 }))
        );
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_a_slow_wave_still_run_before_deadline() {
        let limiter = CallLimiter::new(1);
        let timeout = Duration::from_millis(100);
        let deadline = limiter.batch_deadline(timeout);

        let slow = limiter.call_before(deadline, timeout, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok("first".to_owned())
        });
        let fast = limiter.call_before(deadline, timeout, async { Ok("second".to_owned()) });
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), "first");
        assert_eq!(fast.unwrap(), "second");
    }

    #[test]
    fn zero_ceiling_is_raised_to_one() {
        assert_eq!(CallLimiter::new(0).ceiling(), 1);
    }
}
