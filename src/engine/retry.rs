use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Growth factor applied to the delay after each retry (1.0 = fixed).
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Exponential policy doubling the delay after each retry.
    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier: 2.0,
        }
    }

    /// Same delay before every retry.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(32) as i32);
        self.base_delay.mul_f64(factor)
    }
}

/// Retry an async operation while `is_retryable` accepts its error.
///
/// `op` receives the 0-based retry count. `on_retry` runs before each sleep
/// with the error, the 1-based retry number and the delay about to be taken.
pub async fn with_backoff<F, Fut, T, E, R, N>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: R,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    N: FnMut(&E, u32, Duration),
{
    let mut retries = 0;
    loop {
        match op(retries).await {
            Ok(v) => return Ok(v),
            Err(e) if retries < policy.max_retries && is_retryable(&e) => {
                let delay = policy.delay_for(retries);
                retries += 1;
                on_retry(&e, retries, delay);
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Busy,
        Fatal,
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let mut seen = Vec::new();
        let res: Result<u32, TestError> = with_backoff(
            &RetryPolicy::exponential(4, Duration::from_secs(3)),
            |_| {
                let current = calls.fetch_add(1, Ordering::Relaxed);
                async move {
                    if current < 2 {
                        Err(TestError::Busy)
                    } else {
                        Ok(7)
                    }
                }
            },
            |e| *e == TestError::Busy,
            |_, retry, delay| seen.push((retry, delay)),
        )
        .await;

        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(
            seen,
            vec![(1, Duration::from_secs(3)), (2, Duration::from_secs(6))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let res: Result<(), TestError> = with_backoff(
            &RetryPolicy::fixed(5, Duration::from_secs(30)),
            |_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err(TestError::Fatal) }
            },
            |e| *e == TestError::Busy,
            |_, _, _| {},
        )
        .await;

        assert_eq!(res.unwrap_err(), TestError::Fatal);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let res: Result<(), TestError> = with_backoff(
            &RetryPolicy::fixed(3, Duration::from_secs(30)),
            |_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err(TestError::Busy) }
            },
            |e| *e == TestError::Busy,
            |_, _, _| {},
        )
        .await;

        assert_eq!(res.unwrap_err(), TestError::Busy);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_fixed_policy_delay() {
        let policy = RetryPolicy::fixed(10, Duration::from_secs(30));
        assert_eq!(policy.delay_for(0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(9), Duration::from_secs(30));
    }
}
