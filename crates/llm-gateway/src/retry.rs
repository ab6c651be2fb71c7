//! Bounded retry with backoff for completion calls.
//!
//! Rate-limit class failures back off exponentially (base delay doubling per
//! attempt); other failures wait the fixed base delay. Attempts are bounded;
//! the last error surfaces once the budget is spent.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::errors::LlmError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts are exhausted.
    pub async fn run<F, Fut>(&self, mut op: F) -> Result<String, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, LlmError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last: Option<LlmError> = None;

        for attempt in 0..attempts {
            match op().await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_rate_limit() => {
                    if attempt + 1 == attempts {
                        return Err(err);
                    }
                    let wait = self.base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "rate limit hit, backing off before retry"
                    );
                    sleep(wait).await;
                    last = Some(err);
                }
                Err(err) => {
                    if attempt + 1 == attempts {
                        return Err(LlmError::Exhausted {
                            attempts,
                            last: err.to_string(),
                        });
                    }
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %err,
                        "completion attempt failed, retrying"
                    );
                    sleep(self.base_delay).await;
                    last = Some(err);
                }
            }
        }

        Err(last.unwrap_or_else(|| LlmError::Exhausted {
            attempts,
            last: "no attempts executed".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn rate_limit_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast_policy()
            .run(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(LlmError::RateLimited("429".into()))
                    } else {
                        Ok("done".to_string())
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_after_budget() {
        let result = fast_policy()
            .run(|| async { Err(LlmError::RateLimited("quota".into())) })
            .await;
        assert!(matches!(result, Err(LlmError::RateLimited(_))));
    }

    #[tokio::test]
    async fn generic_errors_exhaust_with_last_message() {
        let result = fast_policy()
            .run(|| async { Err(LlmError::Http("boom".into())) })
            .await;
        match result {
            Err(LlmError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
