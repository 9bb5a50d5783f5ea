//! Shared test utilities for integration tests
//!
//! Provides an in-memory `ResourceHandler` with scripted listings and
//! destroy results that counts every call it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use sweep_coordinator::aws::classify_aws_error;
use sweep_coordinator::{
    DestroyError, DestroyOptions, DestroyOutcome, HandlerRegistry, ResourceHandler, SkipReason,
    UndatedPolicy,
};
use tokio_util::sync::CancellationToken;

/// Call log shared between fakes, to check ordering across handlers
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn region(s: &str) -> RegionId {
    RegionId::new(s).unwrap()
}

pub fn hours_ago(hours: i64) -> Option<DateTime<Utc>> {
    Some(Utc::now() - Duration::hours(hours))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fake handler for one resource kind
pub struct FakeHandler {
    kind: ResourceKind,
    policy: UndatedPolicy,
    enabled: bool,
    listings: HashMap<RegionId, Vec<ResourceDescriptor>>,
    failing_regions: HashSet<RegionId>,
    denied: HashSet<String>,
    gone: HashSet<String>,
    cancel_on_destroy: Option<CancellationToken>,
    settle_fails: bool,
    events: Option<EventLog>,
    list_calls: AtomicUsize,
    destroyed: Mutex<Vec<String>>,
    settled: Mutex<Vec<String>>,
    last_options: Mutex<Option<DestroyOptions>>,
}

impl FakeHandler {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            policy: UndatedPolicy::Include,
            enabled: true,
            listings: HashMap::new(),
            failing_regions: HashSet::new(),
            denied: HashSet::new(),
            gone: HashSet::new(),
            cancel_on_destroy: None,
            settle_fails: false,
            events: None,
            list_calls: AtomicUsize::new(0),
            destroyed: Mutex::new(Vec::new()),
            settled: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
        }
    }

    /// Add a resource to the listing of `region`
    pub fn resource(
        mut self,
        region_id: &str,
        id: &str,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        let r = region(region_id);
        self.listings
            .entry(r.clone())
            .or_default()
            .push(ResourceDescriptor::new(r, self.kind, id).with_created_at(created_at));
        self
    }

    /// Return `descriptor` from the listing of `region_id` as-is, even when
    /// its region or kind do not match
    pub fn listing_extra(mut self, region_id: &str, descriptor: ResourceDescriptor) -> Self {
        self.listings
            .entry(region(region_id))
            .or_default()
            .push(descriptor);
        self
    }

    pub fn undated(mut self, policy: UndatedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make `list` fail in `region`
    pub fn failing_in(mut self, region_id: &str) -> Self {
        self.failing_regions.insert(region(region_id));
        self
    }

    /// Make `destroy` of `id` fail with a permission error
    pub fn deny(mut self, id: &str) -> Self {
        self.denied.insert(id.to_string());
        self
    }

    /// Make `destroy` of `id` report the resource as already gone
    pub fn gone(mut self, id: &str) -> Self {
        self.gone.insert(id.to_string());
        self
    }

    /// Report the destroy path as not wired up
    pub fn inert(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Cancel `token` as soon as the first destroy call arrives
    pub fn cancel_on_destroy(mut self, token: CancellationToken) -> Self {
        self.cancel_on_destroy = Some(token);
        self
    }

    /// Make `settle` fail as if the wait timed out
    pub fn settle_fails(mut self) -> Self {
        self.settle_fails = true;
        self
    }

    /// Record `destroy <id>` and `settle <ids>` into `log`
    pub fn log_to(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    fn record(&self, event: String) {
        if let Some(log) = &self.events {
            log.lock().unwrap().push(event);
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroyed.lock().unwrap().len()
    }

    /// Identifiers passed to `destroy`, in call order
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<DestroyOptions> {
        *self.last_options.lock().unwrap()
    }

    /// Identifiers passed to `settle`, across all calls
    pub fn settled(&self) -> Vec<String> {
        self.settled.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceHandler for FakeHandler {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn undated_policy(&self) -> UndatedPolicy {
        self.policy
    }

    fn destroy_enabled(&self) -> bool {
        self.enabled
    }

    async fn list(&self, region: &RegionId) -> anyhow::Result<Vec<ResourceDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_regions.contains(region) {
            anyhow::bail!("simulated listing failure for {} in {region}", self.kind);
        }
        Ok(self.listings.get(region).cloned().unwrap_or_default())
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        options: &DestroyOptions,
    ) -> DestroyOutcome {
        self.destroyed
            .lock()
            .unwrap()
            .push(descriptor.identifier.clone());
        *self.last_options.lock().unwrap() = Some(*options);
        self.record(format!("destroy {}", descriptor.identifier));

        if let Some(token) = &self.cancel_on_destroy {
            token.cancel();
        }

        if self.denied.contains(&descriptor.identifier) {
            DestroyOutcome::Failed(DestroyError::Provider(classify_aws_error(
                Some("AccessDenied"),
                Some("not authorized to perform this operation"),
            )))
        } else if self.gone.contains(&descriptor.identifier) {
            DestroyOutcome::Skipped(SkipReason::AlreadyDeleted)
        } else {
            DestroyOutcome::Destroyed
        }
    }

    async fn settle(
        &self,
        destroyed: &[ResourceDescriptor],
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let ids: Vec<String> = destroyed.iter().map(|d| d.identifier.clone()).collect();
        self.record(format!("settle {}", ids.join(",")));
        self.settled.lock().unwrap().extend(ids);

        if self.settle_fails {
            anyhow::bail!("simulated timeout waiting for {} deletions", self.kind);
        }
        Ok(())
    }
}

/// Registry over shared fakes, so tests can inspect call counters afterwards
pub fn registry_of(handlers: &[Arc<FakeHandler>]) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler.clone());
    }
    Arc::new(registry)
}
