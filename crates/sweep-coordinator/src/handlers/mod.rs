//! Resource handlers
//!
//! One handler per resource type. A handler lists every resource of its type
//! in a region and destroys a single resource; age filtering and fan-out
//! belong to the inspector and terminator, so handlers stay small.

mod dry_run;
mod ec2_instance;
mod elastic_ip;
mod load_balancer;
mod rds;
mod registry;

pub use dry_run::{DestroyPhase, DryRunDestroy, DryRunVerdict, guarded_destroy, verdict_from};
pub use ec2_instance::Ec2InstanceHandler;
pub use elastic_ip::ElasticIpHandler;
pub use load_balancer::LoadBalancerHandler;
pub use rds::{RdsClusterHandler, RdsInstanceHandler};
pub use registry::HandlerRegistry;

use crate::outcome::{DestroyOptions, DestroyOutcome};
use anyhow::Result;
use async_trait::async_trait;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tokio_util::sync::CancellationToken;

/// What to do with resources that report no creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndatedPolicy {
    /// Always in scope, regardless of the age cutoff
    Include,
    /// Never in scope while undated
    Exclude,
}

/// List and destroy capability for exactly one resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The resource type this handler owns
    fn kind(&self) -> ResourceKind;

    /// Age policy for descriptors without `created_at`
    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Include
    }

    /// Whether `destroy` is wired to the real mutating call
    fn destroy_enabled(&self) -> bool {
        true
    }

    /// List every resource of this type in `region`, regardless of age
    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>>;

    /// Destroy one resource previously returned by `list`
    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        options: &DestroyOptions,
    ) -> DestroyOutcome;

    /// Wait until resources this handler reported as destroyed are fully
    /// gone on the provider side.
    ///
    /// Runs once per teardown phase, before any later phase starts. Handlers
    /// whose deletions take effect immediately keep the default.
    async fn settle(
        &self,
        _destroyed: &[ResourceDescriptor],
        _cancel: &CancellationToken,
    ) -> Result<()> {
        Ok(())
    }
}

/// Pick the `Name` tag out of a provider tag list.
///
/// EC2 and RDS use different tag types with the same key/value shape, so
/// the accessors are passed in as closures.
fn name_tag<T>(
    tags: &[T],
    key: impl Fn(&T) -> Option<&str>,
    value: impl Fn(&T) -> Option<&str>,
) -> Option<String> {
    tags.iter()
        .find(|t| key(*t) == Some("Name"))
        .and_then(value)
        .map(str::to_string)
}
