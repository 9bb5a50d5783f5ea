//! Cross-region resource snapshot
//!
//! An [`Inventory`] is assembled once by the inspector and is read-only
//! afterwards. Every `(region, kind)` pair that was listed successfully has
//! a bucket, even when nothing was found, so an empty bucket ("found zero")
//! is distinguishable from a missing one ("never checked" or "failed").

use serde::Serialize;
use std::collections::BTreeMap;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};

type Buckets = BTreeMap<ResourceKind, Vec<ResourceDescriptor>>;

/// Immutable `region -> kind -> descriptors` snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Inventory {
    regions: BTreeMap<RegionId, Buckets>,
}

impl Inventory {
    pub fn builder() -> InventoryBuilder {
        InventoryBuilder::default()
    }

    /// View of one region. Regions that were never scanned give an empty view.
    pub fn region(&self, region: &RegionId) -> RegionView<'_> {
        RegionView {
            buckets: self.regions.get(region),
        }
    }

    /// Whether `(region, kind)` was listed successfully
    pub fn scanned(&self, region: &RegionId, kind: ResourceKind) -> bool {
        self.regions
            .get(region)
            .is_some_and(|b| b.contains_key(&kind))
    }

    /// Total number of descriptors across all regions and kinds
    pub fn total(&self) -> usize {
        self.regions
            .values()
            .flat_map(|b| b.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Regions with at least one bucket, sorted
    pub fn regions(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.keys()
    }

    /// All descriptors in region, kind, then listing order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.regions
            .values()
            .flat_map(|b| b.values())
            .flat_map(|v| v.iter())
    }

    /// Descriptor count per kind across all regions
    pub fn counts_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for buckets in self.regions.values() {
            for (kind, descriptors) in buckets {
                *counts.entry(*kind).or_insert(0) += descriptors.len();
            }
        }
        counts
    }
}

/// Read-only slice of an [`Inventory`] for a single region
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    buckets: Option<&'a Buckets>,
}

impl<'a> RegionView<'a> {
    pub fn descriptors(&self, kind: ResourceKind) -> &'a [ResourceDescriptor] {
        self.buckets
            .and_then(|b| b.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.descriptors(kind).len()
    }

    pub fn present(&self, kind: ResourceKind) -> bool {
        self.count(kind) > 0
    }

    /// Identifiers in listing order
    pub fn identifiers(&self, kind: ResourceKind) -> Vec<&'a str> {
        self.descriptors(kind)
            .iter()
            .map(|d| d.identifier.as_str())
            .collect()
    }

    /// Kinds that were scanned in this region
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + 'a {
        self.buckets.into_iter().flat_map(|b| b.keys().copied())
    }
}

/// Accumulates listing results before freezing them into an [`Inventory`]
#[derive(Debug, Default)]
pub struct InventoryBuilder {
    regions: BTreeMap<RegionId, Buckets>,
}

impl InventoryBuilder {
    /// Record the result of one listing, creating the bucket even if empty
    pub fn insert(
        &mut self,
        region: RegionId,
        kind: ResourceKind,
        descriptors: Vec<ResourceDescriptor>,
    ) -> &mut Self {
        self.regions
            .entry(region)
            .or_default()
            .entry(kind)
            .or_default()
            .extend(descriptors);
        self
    }

    pub fn build(self) -> Inventory {
        Inventory {
            regions: self.regions,
        }
    }
}
