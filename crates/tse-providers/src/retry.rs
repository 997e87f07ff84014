use std::time::Duration;

use crate::error::ProviderResult;

/// Exponential backoff: 1s initial delay, doubling, capped at 10s, up
/// to 3 attempts total.
const INITIAL_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;

pub async fn with_backoff<T, F, Fut>(op_name: &str, mut op: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<T>>,
{
    let mut delay = INITIAL_DELAY;
    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(op = op_name, attempt, error = %err, "provider call failed, retrying");
                last_err = Some(err);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
            }
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_call_succeeds() {
        let calls = AtomicU32::new(0);
        let result: ProviderResult<u32> = with_backoff("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: ProviderResult<u32> = with_backoff("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Other("boom".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
