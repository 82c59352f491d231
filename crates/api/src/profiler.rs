//! Wall-clock timing around slow-prone handler calls.

use std::future::Future;
use std::time::{Duration, Instant};

/// Await `fut`, log how long it took, and return its output untouched.
///
/// Calls slower than `threshold` are logged at `warn` so they surface in
/// alerting; everything else goes to `debug`.
pub async fn profile_and_notify<F, T>(label: &'static str, threshold: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let started = Instant::now();
    let output = fut.await;
    let elapsed = started.elapsed();

    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed > threshold {
        tracing::warn!(
            label,
            elapsed_ms,
            threshold_ms = threshold.as_millis() as u64,
            "Slow call"
        );
    } else {
        tracing::debug!(label, elapsed_ms, "Call finished");
    }

    output
}

#[cfg(test)]
mod tests {
    use civic_core::error::CoreError;

    use super::*;

    #[tokio::test]
    async fn passes_values_through() {
        let out = profile_and_notify("ok", Duration::from_secs(1), async { 41 + 1 }).await;
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn passes_errors_through_even_when_slow() {
        let out: Result<(), CoreError> = profile_and_notify("slow", Duration::ZERO, async {
            tokio::time::sleep(Duration::from_millis(2)).await;
            Err(CoreError::OccurredError)
        })
        .await;
        assert!(matches!(out, Err(CoreError::OccurredError)));
    }
}
