//! Two-phase destroy: dry-run check, then the real call
//!
//! For APIs that accept `DryRun=true`, nothing mutating is sent until the
//! provider has confirmed the request would succeed. Each attempt walks
//! `Pending -> DryRunChecked -> {Executing | Rejected}`.

use crate::aws::error::{classify_sdk_error, is_dry_run_success};
use crate::aws::AwsError;
use crate::outcome::{DestroyError, DestroyOutcome};
use async_trait::async_trait;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use sweep_common::ResourceDescriptor;
use tracing::debug;

/// Answer to a dry-run request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DryRunVerdict {
    /// The provider answered `DryRunOperation`
    WouldSucceed,
    /// Anything else, including an unexpected success
    Rejected(AwsError),
}

/// Provider operations for a destroy that supports dry-run
#[async_trait]
pub trait DryRunDestroy: Send + Sync {
    /// Send the destroy request with the dry-run flag set
    async fn dry_run(&self, descriptor: &ResourceDescriptor) -> DryRunVerdict;

    /// Send the real, mutating destroy request
    async fn execute(&self, descriptor: &ResourceDescriptor) -> Result<(), AwsError>;
}

/// State of one guarded destroy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPhase {
    Pending,
    DryRunChecked(DryRunVerdict),
    Executing,
    Rejected(AwsError),
}

impl DestroyPhase {
    fn name(&self) -> &'static str {
        match self {
            DestroyPhase::Pending => "pending",
            DestroyPhase::DryRunChecked(_) => "dry-run-checked",
            DestroyPhase::Executing => "executing",
            DestroyPhase::Rejected(_) => "rejected",
        }
    }
}

/// Destroy `descriptor` only after a dry-run confirms the call would succeed.
///
/// Any rejected dry-run is terminal and reported as
/// [`DestroyError::DryRunRejected`], "not found" included: the mutating call
/// is never attempted. Only the real call may report a resource as already
/// deleted.
pub async fn guarded_destroy<D>(ops: &D, descriptor: &ResourceDescriptor) -> DestroyOutcome
where
    D: DryRunDestroy + ?Sized,
{
    let mut phase = DestroyPhase::Pending;

    loop {
        debug!(
            resource_type = %descriptor.kind,
            resource_id = %descriptor.identifier,
            phase = phase.name(),
            "Destroy phase"
        );

        phase = match phase {
            DestroyPhase::Pending => DestroyPhase::DryRunChecked(ops.dry_run(descriptor).await),
            DestroyPhase::DryRunChecked(DryRunVerdict::WouldSucceed) => DestroyPhase::Executing,
            DestroyPhase::DryRunChecked(DryRunVerdict::Rejected(e)) => DestroyPhase::Rejected(e),
            DestroyPhase::Executing => {
                return DestroyOutcome::from_provider(ops.execute(descriptor).await);
            }
            DestroyPhase::Rejected(e) => {
                return DestroyOutcome::Failed(DestroyError::DryRunRejected(e));
            }
        };
    }
}

/// Interpret the raw response of a dry-run request.
///
/// EC2 signals "would succeed" with a `DryRunOperation` error. A plain
/// success means the flag was ignored, which is treated as a rejection.
pub fn verdict_from<T, E>(response: Result<T, E>) -> DryRunVerdict
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match response {
        Err(e) if is_dry_run_success(&e) => DryRunVerdict::WouldSucceed,
        Err(e) => DryRunVerdict::Rejected(classify_sdk_error(&e)),
        Ok(_) => DryRunVerdict::Rejected(AwsError::Sdk {
            code: None,
            message: "dry-run request unexpectedly succeeded".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::classify_aws_error;
    use crate::outcome::SkipReason;
    use std::sync::Mutex;
    use sweep_common::{RegionId, ResourceKind};

    /// Records the order of provider calls
    struct Scripted {
        verdict: DryRunVerdict,
        execute_result: Result<(), AwsError>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn new(verdict: DryRunVerdict, execute_result: Result<(), AwsError>) -> Self {
            Self {
                verdict,
                execute_result,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DryRunDestroy for Scripted {
        async fn dry_run(&self, _: &ResourceDescriptor) -> DryRunVerdict {
            self.calls.lock().unwrap().push("dry_run");
            self.verdict.clone()
        }

        async fn execute(&self, _: &ResourceDescriptor) -> Result<(), AwsError> {
            self.calls.lock().unwrap().push("execute");
            self.execute_result.clone()
        }
    }

    fn instance() -> ResourceDescriptor {
        ResourceDescriptor::new(
            RegionId::new("us-east-1").unwrap(),
            ResourceKind::Ec2Instance,
            "i-0abc",
        )
    }

    #[tokio::test]
    async fn dry_run_precedes_execute() {
        let ops = Scripted::new(DryRunVerdict::WouldSucceed, Ok(()));

        let outcome = guarded_destroy(&ops, &instance()).await;

        assert_eq!(outcome, DestroyOutcome::Destroyed);
        assert_eq!(ops.calls(), vec!["dry_run", "execute"]);
    }

    #[tokio::test]
    async fn rejected_dry_run_never_executes() {
        let denied = classify_aws_error(Some("UnauthorizedOperation"), Some("denied"));
        let ops = Scripted::new(DryRunVerdict::Rejected(denied.clone()), Ok(()));

        let outcome = guarded_destroy(&ops, &instance()).await;

        assert_eq!(
            outcome,
            DestroyOutcome::Failed(DestroyError::DryRunRejected(denied))
        );
        assert_eq!(ops.calls(), vec!["dry_run"]);
    }

    #[tokio::test]
    async fn not_found_dry_run_is_rejected() {
        let gone = classify_aws_error(Some("InvalidInstanceID.NotFound"), Some("gone"));
        let ops = Scripted::new(DryRunVerdict::Rejected(gone.clone()), Ok(()));

        let outcome = guarded_destroy(&ops, &instance()).await;

        assert_eq!(
            outcome,
            DestroyOutcome::Failed(DestroyError::DryRunRejected(gone))
        );
        assert_eq!(ops.calls(), vec!["dry_run"]);
    }

    #[tokio::test]
    async fn not_found_on_execute_is_already_deleted() {
        let gone = classify_aws_error(Some("InvalidInstanceID.NotFound"), Some("gone"));
        let ops = Scripted::new(DryRunVerdict::WouldSucceed, Err(gone));

        let outcome = guarded_destroy(&ops, &instance()).await;

        assert_eq!(outcome, DestroyOutcome::Skipped(SkipReason::AlreadyDeleted));
        assert_eq!(ops.calls(), vec!["dry_run", "execute"]);
    }

    #[tokio::test]
    async fn execute_failure_is_reported() {
        let protected = classify_aws_error(Some("OperationNotPermitted"), Some("protected"));
        let ops = Scripted::new(DryRunVerdict::WouldSucceed, Err(protected.clone()));

        let outcome = guarded_destroy(&ops, &instance()).await;

        assert_eq!(
            outcome,
            DestroyOutcome::Failed(DestroyError::Provider(protected))
        );
    }
}
