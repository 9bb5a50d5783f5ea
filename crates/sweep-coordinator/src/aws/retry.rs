//! Throttling retry for read-only provider calls

use super::error::classify_sdk_error;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run a read-only AWS call, retrying only when AWS throttles it.
///
/// Mutating calls never go through here: a destroy attempt is made once and
/// its outcome is reported as-is.
pub async fn retry_throttled<T, E, F, Fut>(
    operation: &str,
    max_retries: usize,
    call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ProvideErrorMetadata + std::error::Error,
{
    call.retry(
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(20))
            .with_max_times(max_retries)
            .with_jitter(),
    )
    .when(|e: &E| classify_sdk_error(e).is_retryable())
    .notify(|e: &E, delay: Duration| {
        warn!(operation, delay = ?delay, error = %e, "AWS rate limited, backing off...");
    })
    .await
}
