//! Default configuration values
//!
//! These constants keep the CLI and library defaults in one place.

/// Default number of concurrent provider calls during inspection and teardown
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound on concurrent provider calls accepted from configuration
pub const MAX_CONCURRENCY: usize = 64;

/// Default number of retries for throttled list calls
pub const DEFAULT_LIST_RETRIES: usize = 5;

/// Default age cutoff: everything created before "now" is in scope
pub const DEFAULT_OLDER_THAN: &str = "0s";

/// Marker inserted into generated final snapshot identifiers
pub const FINAL_SNAPSHOT_MARKER: &str = "final";

