//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// Error code EC2 returns when a dry-run request would have succeeded
pub const DRY_RUN_OPERATION: &str = "DryRunOperation";

/// AWS error categories for retry and teardown logic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsError {
    /// Resource was not found (already deleted)
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Resource is still in use by another resource
    #[error("Resource has dependent objects ({code}): {message}")]
    DependencyViolation { code: String, message: String },

    /// Caller lacks permission for the operation
    #[error("Not authorized ({code}): {message}")]
    Unauthorized { code: String, message: String },

    /// Termination or deletion protection is enabled
    #[error("Resource is protected against deletion: {message}")]
    Protected { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error{}: {message}", code_suffix(code))]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, AwsError::Throttled { .. })
    }

    /// The provider error code, when one was returned
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::DependencyViolation { code, .. }
            | AwsError::Unauthorized { code, .. } => Some(code),
            AwsError::Throttled { .. } | AwsError::Protected { .. } => None,
            AwsError::Sdk { code, .. } => code.as_deref(),
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AwsError::Unauthorized { .. } => {
                Some("Check the IAM permissions of the active profile for this action.")
            }
            AwsError::Protected { .. } => {
                Some("Disable termination or deletion protection, then run again.")
            }
            AwsError::DependencyViolation { .. } => Some(
                "Another resource still references this one. \
                 Destroy dependents first, then run again.",
            ),
            AwsError::Throttled { .. } => Some("AWS API rate limit hit. Lower --concurrency."),
            AwsError::NotFound { .. } | AwsError::Sdk { .. } => None,
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidAllocationID.NotFound",
    "InvalidAddress.NotFound",
    "LoadBalancerNotFound",
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBClusterNotFoundFault",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for dependency violations (resource still in use)
const DEPENDENCY_CODES: &[&str] = &[
    "DependencyViolation",
    "InvalidIPAddress.InUse",
    "ResourceInUse",
    "InvalidDBClusterStateFault",
];

/// Known AWS error codes for permission failures
const UNAUTHORIZED_CODES: &[&str] = &[
    "UnauthorizedOperation",
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
];

/// Known AWS error codes for termination/deletion protection
const PROTECTED_CODES: &[&str] = &["OperationNotPermitted"];

/// Classify an AWS error using its error code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled { message },
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation {
            code: c.to_string(),
            message,
        },
        Some(c) if UNAUTHORIZED_CODES.contains(&c) => AwsError::Unauthorized {
            code: c.to_string(),
            message,
        },
        Some(c) if PROTECTED_CODES.contains(&c) => AwsError::Protected { message },
        // RDS reports deletion protection as a parameter combination error
        Some("InvalidParameterCombination") if message.contains("deletion protection") => {
            AwsError::Protected { message }
        }
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any AWS SDK error.
///
/// Every service crate implements `ProvideErrorMetadata` for its operation
/// errors and for `SdkError`, so this works for EC2, ELBv2, RDS and STS alike.
/// Errors without metadata (timeouts, dispatch failures) fall back to the
/// full error context as message.
pub fn classify_sdk_error<E>(error: &E) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match error.message() {
        Some(message) => classify_aws_error(error.code(), Some(message)),
        None => {
            let context = DisplayErrorContext(error).to_string();
            classify_aws_error(error.code(), Some(&context))
        }
    }
}

/// Whether an SDK error is the "would have succeeded" answer to a dry-run request
pub fn is_dry_run_success<E: ProvideErrorMetadata>(error: &E) -> bool {
    error.code() == Some(DRY_RUN_OPERATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(code), Some("some message"));
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
            assert_eq!(err.code(), Some(*code));
        }
    }

    #[test]
    fn throttling_codes() {
        for code in THROTTLING_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(err.is_retryable(), "Expected retryable for code: {code}");
            assert!(matches!(err, AwsError::Throttled { .. }));
        }
    }

    #[test]
    fn unauthorized_codes() {
        for code in UNAUTHORIZED_CODES {
            let err = classify_aws_error(Some(code), Some("not allowed"));
            assert!(
                matches!(err, AwsError::Unauthorized { .. }),
                "Expected Unauthorized for code: {code}"
            );
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn dependency_violation() {
        let err = classify_aws_error(Some("InvalidIPAddress.InUse"), Some("address in use"));
        assert!(matches!(err, AwsError::DependencyViolation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn protection_codes() {
        let ec2 = classify_aws_error(Some("OperationNotPermitted"), Some("disableApiTermination"));
        assert!(matches!(ec2, AwsError::Protected { .. }));

        let rds = classify_aws_error(
            Some("InvalidParameterCombination"),
            Some(
                "Cannot delete protected DB Instance, \
                 please disable deletion protection and try again.",
            ),
        );
        assert!(matches!(rds, AwsError::Protected { .. }));

        let other = classify_aws_error(Some("InvalidParameterCombination"), Some("bad params"));
        assert!(matches!(other, AwsError::Sdk { .. }));
    }

    #[test]
    fn unknown_and_missing_codes() {
        let err = classify_aws_error(Some("SomeNewError"), Some("details"));
        assert_eq!(err.code(), Some("SomeNewError"));
        assert_eq!(err.to_string(), "AWS error (SomeNewError): details");

        let err2 = classify_aws_error(None, Some("something failed"));
        assert!(matches!(err2, AwsError::Sdk { code: None, .. }));
        assert_eq!(err2.to_string(), "AWS error: something failed");
    }

    #[test]
    fn suggestions() {
        assert!(
            classify_aws_error(Some("UnauthorizedOperation"), None)
                .suggestion()
                .is_some()
        );
        assert!(
            classify_aws_error(Some("SomeUnknownCode"), None)
                .suggestion()
                .is_none()
        );
    }
}
