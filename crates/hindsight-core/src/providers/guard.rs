use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Await a fallible external call with a time budget.
///
/// Returns `None` when the call fails or the budget elapses; the caller
/// substitutes its documented fallback. Failures are logged, never raised.
pub async fn guarded<T, E, F>(operation: &str, budget: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(error)) => {
            warn!(operation, %error, "External call failed, falling back");
            None
        }
        Err(_elapsed) => {
            warn!(
                operation,
                budget_ms = budget.as_millis() as u64,
                "External call timed out, falling back"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[tokio::test]
    async fn test_guarded_passes_through_success() {
        let out = guarded("ok", Duration::from_millis(100), async {
            Ok::<_, CoreError>(7)
        })
        .await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test]
    async fn test_guarded_absorbs_errors() {
        let out: Option<u32> = guarded("fail", Duration::from_millis(100), async {
            Err(CoreError::Provider("down".into()))
        })
        .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_guarded_times_out() {
        let out = guarded("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CoreError>(1)
        })
        .await;
        assert!(out.is_none());
    }
}
