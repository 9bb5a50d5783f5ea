//! AWS client plumbing for the resource handlers
//!
//! This module provides the pieces every handler shares:
//! - context: Credential loading and per-region client construction
//! - error: Classification of SDK errors by code
//! - retry: Backoff for throttled read-only calls
//! - account: STS account lookup
//! - wait: Polling until asynchronous deletions settle

pub mod account;
pub mod context;
pub mod error;
pub mod retry;
pub mod wait;

pub use account::{AccountId, get_current_account_id};
pub use context::AwsContext;
pub use error::{AwsError, classify_aws_error, classify_sdk_error};
pub use retry::retry_throttled;
pub use wait::{WaitConfig, wait_until};

use chrono::{DateTime, Utc};

/// Convert an SDK timestamp into a chrono timestamp
///
/// All service crates share the smithy `DateTime` type, so this serves
/// EC2, ELBv2 and RDS responses alike.
pub(crate) fn to_utc(dt: &aws_sdk_ec2::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
