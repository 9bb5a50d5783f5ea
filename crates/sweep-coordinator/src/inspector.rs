//! Inventory discovery
//!
//! The inspector fans a [`Query`] out into one listing call per
//! `(region, resource type)` pair, runs them with bounded concurrency and
//! folds the results into an [`Inventory`]. A failing pair is recorded and
//! never cancels its siblings.

use crate::handlers::HandlerRegistry;
use crate::inventory::Inventory;
use crate::query::Query;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use sweep_common::defaults::MAX_CONCURRENCY;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One `(region, kind)` listing that could not be completed
#[derive(Debug, Clone)]
pub struct ListError {
    pub region: RegionId,
    pub kind: ResourceKind,
    pub source: Arc<anyhow::Error>,
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to list {} in {}", self.kind, self.region)
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &anyhow::Error = &self.source;
        Some(source.as_ref())
    }
}

/// Every listing failure of one inspection
#[derive(Debug, Clone, Error)]
#[error("{} listing(s) failed: {}", failures.len(), summary(failures))]
pub struct InspectError {
    pub failures: Vec<ListError>,
}

fn summary(failures: &[ListError]) -> String {
    failures
        .iter()
        .map(|f| format!("{}/{}", f.region, f.kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of [`Inspector::inspect`]: whatever could be listed, plus what could not
#[derive(Debug)]
pub struct Inspection {
    pub inventory: Inventory,
    pub failures: Vec<ListError>,
}

impl Inspection {
    /// True when every pair was listed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Aggregated listing failures, if any
    pub fn error(&self) -> Option<InspectError> {
        (!self.failures.is_empty()).then(|| InspectError {
            failures: self.failures.clone(),
        })
    }

    pub fn into_parts(self) -> (Inventory, Option<InspectError>) {
        let error = self.error();
        (self.inventory, error)
    }
}

/// Builds inventories by calling each handler's `list`
pub struct Inspector {
    registry: Arc<HandlerRegistry>,
    concurrency: usize,
}

impl Inspector {
    /// `concurrency` is clamped to `1..=MAX_CONCURRENCY`
    pub fn new(registry: Arc<HandlerRegistry>, concurrency: usize) -> Self {
        Self {
            registry,
            concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
        }
    }

    pub async fn inspect(&self, query: &Query) -> Inspection {
        let pairs: Vec<(RegionId, ResourceKind)> = query
            .regions()
            .flat_map(|region| query.kinds().map(move |kind| (region.clone(), kind)))
            .collect();

        info!(
            pairs = pairs.len(),
            concurrency = self.concurrency,
            exclude_after = %query.exclude_after(),
            "Inspecting resources"
        );

        // `buffered` keeps results in pair order, so the inventory does not
        // depend on which call happened to finish first
        let results: Vec<_> = stream::iter(pairs)
            .map(|(region, kind)| self.list_pair(query, region, kind))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut builder = Inventory::builder();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok((region, kind, descriptors)) => {
                    builder.insert(region, kind, descriptors);
                }
                Err(e) => failures.push(e),
            }
        }

        let inventory = builder.build();
        info!(
            total = inventory.total(),
            failed = failures.len(),
            "Inspection complete"
        );

        Inspection {
            inventory,
            failures,
        }
    }

    async fn list_pair(
        &self,
        query: &Query,
        region: RegionId,
        kind: ResourceKind,
    ) -> Result<(RegionId, ResourceKind, Vec<ResourceDescriptor>), ListError> {
        let Some(handler) = self.registry.get(kind) else {
            return Err(ListError {
                region,
                kind,
                source: Arc::new(anyhow::anyhow!("no handler registered for {kind}")),
            });
        };

        match handler.list(&region).await {
            Ok(listed) => {
                let found = listed.len();
                let policy = handler.undated_policy();
                let in_scope: Vec<_> = listed
                    .into_iter()
                    .filter(|d| belongs_to(d, &region, kind))
                    .filter(|d| query.admits(d.created_at, policy))
                    .collect();

                debug!(
                    region = %region,
                    resource_type = %kind,
                    found,
                    in_scope = in_scope.len(),
                    "Listed resources"
                );
                Ok((region, kind, in_scope))
            }
            Err(e) => {
                warn!(
                    region = %region,
                    resource_type = %kind,
                    error = ?e,
                    "Failed to list resources"
                );
                Err(ListError {
                    region,
                    kind,
                    source: Arc::new(e),
                })
            }
        }
    }
}

/// Whether a listed descriptor is really from the `(region, kind)` pair
/// that was listed. Anything else would land in the wrong inventory slot.
fn belongs_to(descriptor: &ResourceDescriptor, region: &RegionId, kind: ResourceKind) -> bool {
    let ok = descriptor.region == *region && descriptor.kind == kind;
    if !ok {
        warn!(
            region = %region,
            resource_type = %kind,
            listed_region = %descriptor.region,
            listed_type = %descriptor.kind,
            resource_id = %descriptor.identifier,
            "Dropping listed resource from another region or type"
        );
    }
    ok
}
