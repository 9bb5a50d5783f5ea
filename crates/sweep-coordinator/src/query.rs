//! Scan scope
//!
//! A [`Query`] is built once per run from raw operator input and never
//! changes afterwards. All validation happens here, before any provider
//! call is made.

use crate::handlers::{HandlerRegistry, UndatedPolicy};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use sweep_common::{InvalidRegion, RegionId, ResourceKind};
use thiserror::Error;

/// Raw scope as given by the operator
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub target_regions: Vec<String>,
    pub exclude_regions: Vec<String>,
    /// Empty means every registered type
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    /// Resources created at or after this instant are out of scope
    pub exclude_after: DateTime<Utc>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            target_regions: Vec::new(),
            exclude_regions: Vec::new(),
            include_types: Vec::new(),
            exclude_types: Vec::new(),
            exclude_after: Utc::now(),
        }
    }
}

/// Which half of the scope ended up empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDimension {
    Regions,
    ResourceTypes,
}

impl fmt::Display for ScopeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeDimension::Regions => "regions",
            ScopeDimension::ResourceTypes => "resource types",
        })
    }
}

/// Errors raised while building a [`Query`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no {0} left in scope after applying exclusions")]
    InvalidScope(ScopeDimension),

    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error(transparent)]
    InvalidRegion(#[from] InvalidRegion),
}

/// Immutable scan scope: effective regions, effective types and age cutoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    regions: BTreeSet<RegionId>,
    kinds: BTreeSet<ResourceKind>,
    exclude_after: DateTime<Utc>,
}

impl Query {
    /// Validate and normalize `params` against the registered handlers.
    ///
    /// Exclusion always wins over inclusion. Fails if either effective set
    /// is empty or if a type id names nothing in `registry`.
    pub fn new(params: QueryParams, registry: &HandlerRegistry) -> Result<Self, QueryError> {
        let targets = parse_regions(&params.target_regions)?;
        let excluded_regions = parse_regions(&params.exclude_regions)?;
        let regions: BTreeSet<_> = targets.difference(&excluded_regions).cloned().collect();
        if regions.is_empty() {
            return Err(QueryError::InvalidScope(ScopeDimension::Regions));
        }

        let included = parse_kinds(&params.include_types, registry)?;
        let excluded_kinds = parse_kinds(&params.exclude_types, registry)?;
        let base = if included.is_empty() {
            registry.kinds().collect()
        } else {
            included
        };
        let kinds: BTreeSet<_> = base.difference(&excluded_kinds).copied().collect();
        if kinds.is_empty() {
            return Err(QueryError::InvalidScope(ScopeDimension::ResourceTypes));
        }

        Ok(Self {
            regions,
            kinds,
            exclude_after: params.exclude_after,
        })
    }

    /// Effective regions, sorted
    pub fn regions(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.iter()
    }

    /// Effective resource types, in cleanup priority order
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn exclude_after(&self) -> DateTime<Utc> {
        self.exclude_after
    }

    /// Age check for a single descriptor
    pub fn admits(&self, created_at: Option<DateTime<Utc>>, policy: UndatedPolicy) -> bool {
        match created_at {
            Some(t) => t < self.exclude_after,
            None => policy == UndatedPolicy::Include,
        }
    }
}

fn parse_regions(raw: &[String]) -> Result<BTreeSet<RegionId>, QueryError> {
    raw.iter()
        .map(|r| RegionId::new(r).map_err(QueryError::from))
        .collect()
}

fn parse_kinds(
    raw: &[String],
    registry: &HandlerRegistry,
) -> Result<BTreeSet<ResourceKind>, QueryError> {
    raw.iter()
        .map(|id| {
            id.parse::<ResourceKind>()
                .ok()
                .filter(|kind| registry.contains(*kind))
                .ok_or_else(|| QueryError::UnknownResourceType(id.trim().to_string()))
        })
        .collect()
}
