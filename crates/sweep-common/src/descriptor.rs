//! Discovered resource descriptor

use crate::{RegionId, ResourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One resource found by a listing call
///
/// Identifiers are opaque provider strings, unique within a
/// `(region, kind)` pair. `created_at` is `None` for resource types that
/// expose no reliable creation time; how those are aged is decided by the
/// owning handler, never guessed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    /// Region the resource lives in
    pub region: RegionId,
    /// Type of resource
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Provider identifier (instance ID, allocation ID, ARN, DB identifier)
    #[serde(rename = "id")]
    pub identifier: String,
    /// Creation time as reported by the provider
    pub created_at: Option<DateTime<Utc>>,
    /// Display name for reports (Name tag, public IP, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource this one is attached to, a member of or replicates from
    /// (owning instance, DB cluster, replica source). Ordering is the
    /// caller's job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(region: RegionId, kind: ResourceKind, identifier: impl Into<String>) -> Self {
        Self {
            region,
            kind,
            identifier: identifier.into(),
            created_at: None,
            name: None,
            parent: None,
        }
    }

    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }
}
