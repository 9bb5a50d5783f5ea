//! Configuration types for the sweep binary
//!
//! Command-line arguments are converted into these plain structs, which in
//! turn produce the engine inputs ([`QueryParams`], [`TerminatorConfig`]).

use crate::outcome::DestroyOptions;
use crate::query::QueryParams;
use crate::terminator::TerminatorConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use sweep_common::{ResourceKind, UnknownResourceKind};
use thiserror::Error;

/// A malformed `--older-than` value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{0}': expected <number><s|m|h|d>, e.g. 24h")]
pub struct InvalidDuration(pub String);

/// An age that reaches back past the earliest representable timestamp
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("--older-than {0} reaches past the earliest representable date")]
pub struct CutoffOutOfRange(pub Duration);

/// Parse an age such as `90s`, `15m`, `24h` or `7d`
pub fn parse_older_than(raw: &str) -> Result<Duration, InvalidDuration> {
    let s = raw.trim();
    let invalid = || InvalidDuration(s.to_string());

    let unit_at = s.len().checked_sub(1).ok_or_else(invalid)?;
    if !s.is_char_boundary(unit_at) {
        return Err(invalid());
    }
    let (number, unit) = s.split_at(unit_at);
    let n: i64 = number.parse().map_err(|_| invalid())?;
    if n < 0 {
        return Err(invalid());
    }

    match unit {
        "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// Which resources to look at
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub regions: Vec<String>,
    pub exclude_regions: Vec<String>,
    pub resource_types: Vec<String>,
    pub exclude_resource_types: Vec<String>,
    /// Only resources at least this old are in scope
    pub older_than: Duration,
}

impl ScopeConfig {
    /// Query parameters with the age cutoff anchored at `now`
    pub fn query_params(&self, now: DateTime<Utc>) -> Result<QueryParams, CutoffOutOfRange> {
        let exclude_after = now
            .checked_sub_signed(self.older_than)
            .ok_or(CutoffOutOfRange(self.older_than))?;

        Ok(QueryParams {
            target_regions: self.regions.clone(),
            exclude_regions: self.exclude_regions.clone(),
            include_types: self.resource_types.clone(),
            exclude_types: self.exclude_resource_types.clone(),
            exclude_after,
        })
    }
}

/// AWS credential selection
#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Teardown behavior flags
#[derive(Debug, Clone)]
pub struct TerminateFlags {
    /// Actually destroy resources (false = dry run)
    pub execute: bool,
    /// Delete RDS databases without a final snapshot
    pub skip_final_snapshot: bool,
    /// Resource types whose destroy path stays inert
    pub disabled_types: Vec<String>,
    /// Maximum provider calls in flight
    pub concurrency: usize,
}

impl TerminateFlags {
    pub fn terminator_config(&self) -> Result<TerminatorConfig, UnknownResourceKind> {
        let disabled = self
            .disabled_types
            .iter()
            .map(|t| t.parse::<ResourceKind>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(TerminatorConfig {
            dry_run: !self.execute,
            disabled,
            options: DestroyOptions {
                skip_final_snapshot: self.skip_final_snapshot,
            },
            concurrency: self.concurrency,
        })
    }
}

/// Configuration for one sweep invocation
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub scope: ScopeConfig,
    pub aws: AwsConfig,
    pub flags: TerminateFlags,
}

impl SweepConfig {
    pub fn aws_profile(&self) -> Option<&str> {
        self.aws.aws_profile.as_deref()
    }

    pub fn dry_run(&self) -> bool {
        !self.flags.execute
    }

    pub fn concurrency(&self) -> usize {
        self.flags.concurrency
    }
}
