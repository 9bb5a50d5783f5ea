//! Resource teardown
//!
//! The terminator walks an [`Inventory`], hands each selected descriptor to
//! its handler's `destroy` and records every outcome. One failure never
//! stops the rest; there is no retry and no rollback.
//!
//! Before returning, each handler gets to wait for its deletions to settle,
//! so a later call tearing down dependent resources sees them gone.

use crate::handlers::HandlerRegistry;
use crate::inventory::Inventory;
use crate::outcome::{DestroyError, DestroyOptions, DestroyOutcome, SkipReason};
use crate::report::OutcomeReport;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use sweep_common::defaults::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Teardown configuration
#[derive(Debug, Clone)]
pub struct TerminatorConfig {
    /// Report what would be destroyed without calling the provider
    pub dry_run: bool,
    /// Kinds whose destroy path is switched off for this run
    pub disabled: BTreeSet<ResourceKind>,
    /// Passed to every destroy call
    pub options: DestroyOptions,
    /// Maximum destroy calls in flight
    pub concurrency: usize,
}

impl Default for TerminatorConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            disabled: BTreeSet::new(),
            options: DestroyOptions::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Which part of an inventory to tear down. Defaults to everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    regions: Option<BTreeSet<RegionId>>,
    kinds: Option<BTreeSet<ResourceKind>>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given regions
    pub fn regions(mut self, regions: impl IntoIterator<Item = RegionId>) -> Self {
        self.regions = Some(regions.into_iter().collect());
        self
    }

    /// Restrict to the given kinds
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Restrict to a single kind
    pub fn kind(self, kind: ResourceKind) -> Self {
        self.kinds([kind])
    }

    pub fn matches(&self, descriptor: &ResourceDescriptor) -> bool {
        self.regions
            .as_ref()
            .is_none_or(|r| r.contains(&descriptor.region))
            && self
                .kinds
                .as_ref()
                .is_none_or(|k| k.contains(&descriptor.kind))
    }
}

/// Destroys inventory entries through their handlers
pub struct Terminator {
    registry: Arc<HandlerRegistry>,
    config: TerminatorConfig,
    cancel: CancellationToken,
}

impl Terminator {
    pub fn new(registry: Arc<HandlerRegistry>, mut config: TerminatorConfig) -> Self {
        config.concurrency = config.concurrency.clamp(1, MAX_CONCURRENCY);
        Self {
            registry,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token, e.g. one wired to Ctrl-C
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &TerminatorConfig {
        &self.config
    }

    /// Destroy every selected descriptor and report each outcome.
    ///
    /// The report follows inventory order. After cancellation, calls
    /// already in flight finish and everything not yet started is
    /// reported as [`SkipReason::Cancelled`].
    ///
    /// Resources reported as destroyed are handed back to their handler's
    /// `settle` before this returns. A failed wait is logged and leaves the
    /// report unchanged.
    pub async fn terminate(&self, inventory: &Inventory, selection: &Selection) -> OutcomeReport {
        let selected: Vec<&ResourceDescriptor> =
            inventory.iter().filter(|d| selection.matches(d)).collect();

        info!(
            selected = selected.len(),
            dry_run = self.config.dry_run,
            concurrency = self.config.concurrency,
            "Starting teardown"
        );

        let outcomes: Vec<DestroyOutcome> = stream::iter(selected.iter().copied())
            .map(|d| self.destroy_one(d))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut report = OutcomeReport::new();
        for (descriptor, outcome) in selected.into_iter().zip(outcomes) {
            report.push(descriptor.clone(), outcome);
        }
        self.settle(&report).await;

        info!(
            destroyed = report.destroyed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Teardown complete"
        );
        report
    }

    async fn settle(&self, report: &OutcomeReport) {
        let mut destroyed: BTreeMap<ResourceKind, Vec<ResourceDescriptor>> = BTreeMap::new();
        for entry in report.entries() {
            if entry.outcome == DestroyOutcome::Destroyed {
                destroyed
                    .entry(entry.descriptor.kind)
                    .or_default()
                    .push(entry.descriptor.clone());
            }
        }

        for (kind, descriptors) in destroyed {
            let Some(handler) = self.registry.get(kind) else {
                continue;
            };
            if let Err(e) = handler.settle(&descriptors, &self.cancel).await {
                warn!(
                    resource_type = %kind,
                    count = descriptors.len(),
                    error = %e,
                    "Deletions did not settle; dependent resources may fail to delete"
                );
            }
        }
    }

    async fn destroy_one(&self, descriptor: &ResourceDescriptor) -> DestroyOutcome {
        let Some(handler) = self.registry.get(descriptor.kind) else {
            error!(
                region = %descriptor.region,
                resource_type = %descriptor.kind,
                resource_id = %descriptor.identifier,
                "No handler registered"
            );
            return DestroyOutcome::Failed(DestroyError::NoHandler(descriptor.kind));
        };

        if self.cancel.is_cancelled() {
            return DestroyOutcome::Skipped(SkipReason::Cancelled);
        }

        if self.config.dry_run
            || self.config.disabled.contains(&descriptor.kind)
            || !handler.destroy_enabled()
        {
            info!(
                region = %descriptor.region,
                resource_type = %descriptor.kind,
                resource_id = %descriptor.identifier,
                "[DRY RUN] Would destroy"
            );
            return DestroyOutcome::Skipped(SkipReason::NotEnabled);
        }

        let outcome = handler.destroy(descriptor, &self.config.options).await;
        match &outcome {
            DestroyOutcome::Destroyed => info!(
                region = %descriptor.region,
                resource_type = %descriptor.kind,
                resource_id = %descriptor.identifier,
                "Destroyed"
            ),
            DestroyOutcome::Skipped(reason) => info!(
                region = %descriptor.region,
                resource_type = %descriptor.kind,
                resource_id = %descriptor.identifier,
                reason = %reason,
                "Skipped"
            ),
            DestroyOutcome::Failed(e) => warn!(
                region = %descriptor.region,
                resource_type = %descriptor.kind,
                resource_id = %descriptor.identifier,
                error = %e,
                suggestion = e.aws_error().and_then(|a| a.suggestion()).unwrap_or(""),
                "Failed to destroy"
            ),
        }
        outcome
    }
}
