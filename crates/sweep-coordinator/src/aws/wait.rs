//! Polling for provider-side state changes
//!
//! Some deletions finish asynchronously: a terminated instance keeps its
//! network interfaces until it reaches `terminated`. Dependent teardown
//! phases wait here first.

use anyhow::{Result, bail};
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backoff and deadline for [`wait_until`]
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay before the second check
    pub initial_delay: Duration,
    /// Cap for the exponential growth
    pub max_delay: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Poll `check` until it reports `true`.
///
/// Check errors are logged and polled through; only the deadline or
/// cancellation end the wait early.
pub async fn wait_until<F, Fut>(
    config: &WaitConfig,
    cancel: &CancellationToken,
    what: &str,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .without_max_times()
        .with_jitter()
        .build();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if cancel.is_cancelled() {
            bail!("Wait for {what} cancelled");
        }

        match check().await {
            Ok(true) => {
                debug!(what, attempts, "Wait complete");
                return Ok(());
            }
            Ok(false) => debug!(what, attempts, "Still waiting"),
            Err(e) => warn!(what, attempts, error = %e, "Error while waiting"),
        }

        if start.elapsed() >= config.timeout {
            bail!("Timeout waiting for {what} after {:?} ({attempts} checks)", config.timeout);
        }

        let delay = delays.next().unwrap_or(config.max_delay);
        tokio::select! {
            _ = cancel.cancelled() => bail!("Wait for {what} cancelled"),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn completes_once_check_passes() {
        let counter = AtomicUsize::new(0);
        let checks = &counter;

        let result = wait_until(
            &WaitConfig::default(),
            &CancellationToken::new(),
            "thing",
            || async move { Ok(checks.fetch_add(1, Ordering::SeqCst) >= 2) },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn check_errors_are_polled_through() {
        let counter = AtomicUsize::new(0);
        let checks = &counter;

        let result = wait_until(
            &WaitConfig::default(),
            &CancellationToken::new(),
            "thing",
            || async move {
                if checks.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("transient")
                }
                Ok(true)
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let config = WaitConfig {
            timeout: Duration::from_secs(30),
            ..Default::default()
        };

        let err = wait_until(&config, &CancellationToken::new(), "thing", || async {
            Ok(false)
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Timeout waiting for thing"));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let counter = AtomicUsize::new(0);
        let checks = &counter;
        let err = wait_until(&WaitConfig::default(), &cancel, "thing", || async move {
            checks.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("cancelled"));
        assert_eq!(checks.load(Ordering::SeqCst), 0);
    }
}
