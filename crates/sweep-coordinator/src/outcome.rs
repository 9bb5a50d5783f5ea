//! Per-resource destroy outcomes

use crate::aws::AwsError;
use serde::Serialize;
use std::fmt;
use sweep_common::ResourceKind;
use thiserror::Error;

/// Options passed explicitly with every destroy call
///
/// Irreversible choices live here so they are always opt-in at the call
/// site. Handlers have no defaults of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestroyOptions {
    /// Delete databases without taking a final snapshot
    pub skip_final_snapshot: bool,
}

/// Why a resource was not destroyed without that being a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Destroy is deliberately inert (dry-run mode, disabled type or handler)
    NotEnabled,
    /// The provider reports the resource no longer exists
    AlreadyDeleted,
    /// The run was cancelled before this resource was attempted
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotEnabled => "not enabled",
            SkipReason::AlreadyDeleted => "already deleted",
            SkipReason::Cancelled => "cancelled",
        })
    }
}

/// Why a destroy attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestroyError {
    /// The dry-run check answered anything but "would succeed"; the real call was never made
    #[error("dry run rejected: {0}")]
    DryRunRejected(AwsError),

    /// The mutating call itself failed
    #[error(transparent)]
    Provider(AwsError),

    /// The inventory holds a resource type nobody can destroy
    #[error("no handler registered for resource type '{0}'")]
    NoHandler(ResourceKind),
}

impl DestroyError {
    /// The underlying provider error, if any
    pub fn aws_error(&self) -> Option<&AwsError> {
        match self {
            DestroyError::DryRunRejected(e) | DestroyError::Provider(e) => Some(e),
            DestroyError::NoHandler(_) => None,
        }
    }
}

/// Terminal result of one destroy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    Skipped(SkipReason),
    Failed(DestroyError),
}

impl DestroyOutcome {
    pub fn is_destroyed(&self) -> bool {
        matches!(self, DestroyOutcome::Destroyed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DestroyOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DestroyOutcome::Failed(_))
    }

    /// Map the result of a single mutating call.
    ///
    /// "Not found" means someone got there first, which is a skip rather
    /// than a failure.
    pub fn from_provider(result: Result<(), AwsError>) -> Self {
        match result {
            Ok(()) => DestroyOutcome::Destroyed,
            Err(e) if e.is_not_found() => DestroyOutcome::Skipped(SkipReason::AlreadyDeleted),
            Err(e) => DestroyOutcome::Failed(DestroyError::Provider(e)),
        }
    }
}

impl fmt::Display for DestroyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestroyOutcome::Destroyed => f.write_str("destroyed"),
            DestroyOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            DestroyOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::classify_aws_error;

    #[test]
    fn provider_not_found_is_skip() {
        let outcome = DestroyOutcome::from_provider(Err(classify_aws_error(
            Some("InvalidInstanceID.NotFound"),
            Some("gone"),
        )));
        assert_eq!(outcome, DestroyOutcome::Skipped(SkipReason::AlreadyDeleted));
    }

    #[test]
    fn provider_error_is_failure() {
        let err = classify_aws_error(Some("UnauthorizedOperation"), Some("denied"));
        let outcome = DestroyOutcome::from_provider(Err(err.clone()));
        assert_eq!(outcome, DestroyOutcome::Failed(DestroyError::Provider(err)));
        assert!(outcome.is_failed());
    }

    #[test]
    fn display() {
        assert_eq!(DestroyOutcome::Destroyed.to_string(), "destroyed");
        assert_eq!(
            DestroyOutcome::Skipped(SkipReason::NotEnabled).to_string(),
            "skipped (not enabled)"
        );
        assert_eq!(
            DestroyError::NoHandler(ResourceKind::ElasticIp).to_string(),
            "no handler registered for resource type 'eip'"
        );
    }
}
