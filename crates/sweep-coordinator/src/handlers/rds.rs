//! RDS DB instance and DB cluster handlers
//!
//! Neither DeleteDBInstance nor DeleteDBCluster has a dry-run mode. Both
//! take the final snapshot choice from [`DestroyOptions`] on every call,
//! except for instances whose data is owned elsewhere (cluster members and
//! read replicas), which reject snapshot parameters.

use super::{ResourceHandler, UndatedPolicy, name_tag};
use crate::aws::{AwsContext, classify_sdk_error, retry_throttled, to_utc};
use crate::outcome::{DestroyOptions, DestroyOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_rds::types::DbInstance;
use chrono::{DateTime, Utc};
use sweep_common::defaults::FINAL_SNAPSHOT_MARKER;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tracing::{debug, info};

/// Identifier for the snapshot taken just before deletion
pub fn final_snapshot_identifier(identifier: &str, now: DateTime<Utc>) -> String {
    format!(
        "{identifier}-{FINAL_SNAPSHOT_MARKER}-{}",
        now.format("%Y%m%d%H%M%S")
    )
}

/// Final snapshot parameters for a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
enum SnapshotParams {
    /// Send no snapshot parameters at all
    Omit,
    /// `SkipFinalSnapshot=true`
    Skip,
    /// `SkipFinalSnapshot=false` with this `FinalDBSnapshotIdentifier`
    Take(String),
}

impl SnapshotParams {
    fn requested(identifier: &str, options: &DestroyOptions, now: DateTime<Utc>) -> Self {
        if options.skip_final_snapshot {
            SnapshotParams::Skip
        } else {
            SnapshotParams::Take(final_snapshot_identifier(identifier, now))
        }
    }

    /// Parameters for DeleteDBInstance.
    ///
    /// An instance with a parent is a cluster member or a read replica; its
    /// data is snapshotted through the parent, so nothing is sent.
    fn for_instance(
        descriptor: &ResourceDescriptor,
        options: &DestroyOptions,
        now: DateTime<Utc>,
    ) -> Self {
        match descriptor.parent {
            Some(_) => SnapshotParams::Omit,
            None => Self::requested(&descriptor.identifier, options, now),
        }
    }

    fn skip_final_snapshot(&self) -> Option<bool> {
        match self {
            SnapshotParams::Omit => None,
            SnapshotParams::Skip => Some(true),
            SnapshotParams::Take(_) => Some(false),
        }
    }

    fn final_snapshot_identifier(&self) -> Option<String> {
        match self {
            SnapshotParams::Take(id) => Some(id.clone()),
            SnapshotParams::Omit | SnapshotParams::Skip => None,
        }
    }
}

/// Descriptor for one DescribeDBInstances entry.
///
/// The parent is the owning cluster, or for a read replica the instance it
/// replicates from.
fn instance_descriptor(region: &RegionId, db: &DbInstance) -> Option<ResourceDescriptor> {
    let id = db.db_instance_identifier()?;
    let parent = db
        .db_cluster_identifier()
        .or(db.read_replica_source_db_instance_identifier())
        .map(str::to_string);

    Some(
        ResourceDescriptor::new(region.clone(), ResourceKind::RdsInstance, id)
            .with_created_at(db.instance_create_time().and_then(to_utc))
            .with_name(name_tag(db.tag_list(), |t| t.key(), |t| t.value()))
            .with_parent(parent),
    )
}

/// Lists RDS DB instances and deletes them
pub struct RdsInstanceHandler {
    ctx: AwsContext,
    list_retries: usize,
}

impl RdsInstanceHandler {
    pub fn new(ctx: AwsContext, list_retries: usize) -> Self {
        Self { ctx, list_retries }
    }
}

#[async_trait]
impl ResourceHandler for RdsInstanceHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RdsInstance
    }

    // No create time is reported while an instance is still being created
    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Exclude
    }

    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>> {
        let client = self.ctx.in_region(region).rds_client();
        let mut resources = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = retry_throttled("DescribeDBInstances", self.list_retries, || {
                client
                    .describe_db_instances()
                    .set_marker(marker.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to describe RDS DB instances in {region}"))?;

            resources.extend(
                response
                    .db_instances()
                    .iter()
                    .filter_map(|db| instance_descriptor(region, db)),
            );

            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        debug!(region = %region, count = resources.len(), "Found RDS DB instances");
        Ok(resources)
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        options: &DestroyOptions,
    ) -> DestroyOutcome {
        let snapshot = SnapshotParams::for_instance(descriptor, options, Utc::now());

        info!(
            region = %descriptor.region,
            db_instance = %descriptor.identifier,
            parent = ?descriptor.parent,
            snapshot = ?snapshot,
            "Deleting RDS DB instance"
        );

        let result = self
            .ctx
            .in_region(&descriptor.region)
            .rds_client()
            .delete_db_instance()
            .db_instance_identifier(&descriptor.identifier)
            .set_skip_final_snapshot(snapshot.skip_final_snapshot())
            .set_final_db_snapshot_identifier(snapshot.final_snapshot_identifier())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| classify_sdk_error(&e));

        DestroyOutcome::from_provider(result)
    }
}

/// Lists RDS DB clusters and deletes them
pub struct RdsClusterHandler {
    ctx: AwsContext,
    list_retries: usize,
}

impl RdsClusterHandler {
    pub fn new(ctx: AwsContext, list_retries: usize) -> Self {
        Self { ctx, list_retries }
    }
}

#[async_trait]
impl ResourceHandler for RdsClusterHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RdsCluster
    }

    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Exclude
    }

    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>> {
        let client = self.ctx.in_region(region).rds_client();
        let mut resources = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = retry_throttled("DescribeDBClusters", self.list_retries, || {
                client
                    .describe_db_clusters()
                    .set_marker(marker.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to describe RDS DB clusters in {region}"))?;

            for cluster in response.db_clusters() {
                let Some(id) = cluster.db_cluster_identifier() else {
                    continue;
                };

                resources.push(
                    ResourceDescriptor::new(region.clone(), ResourceKind::RdsCluster, id)
                        .with_created_at(cluster.cluster_create_time().and_then(to_utc))
                        .with_name(name_tag(cluster.tag_list(), |t| t.key(), |t| t.value())),
                );
            }

            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        debug!(region = %region, count = resources.len(), "Found RDS DB clusters");
        Ok(resources)
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        options: &DestroyOptions,
    ) -> DestroyOutcome {
        let snapshot = SnapshotParams::requested(&descriptor.identifier, options, Utc::now());

        info!(
            region = %descriptor.region,
            db_cluster = %descriptor.identifier,
            snapshot = ?snapshot,
            "Deleting RDS DB cluster"
        );

        let result = self
            .ctx
            .in_region(&descriptor.region)
            .rds_client()
            .delete_db_cluster()
            .db_cluster_identifier(&descriptor.identifier)
            .set_skip_final_snapshot(snapshot.skip_final_snapshot())
            .set_final_db_snapshot_identifier(snapshot.final_snapshot_identifier())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| classify_sdk_error(&e));

        DestroyOutcome::from_provider(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_final_snapshot_identifier() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            final_snapshot_identifier("orders-db", now),
            "orders-db-final-20240309070501"
        );
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    fn region() -> RegionId {
        RegionId::new("us-east-1").unwrap()
    }

    const KEEP: DestroyOptions = DestroyOptions {
        skip_final_snapshot: false,
    };
    const SKIP: DestroyOptions = DestroyOptions {
        skip_final_snapshot: true,
    };

    #[test]
    fn test_standalone_instance_snapshot_params() {
        let db = DbInstance::builder().db_instance_identifier("db-1").build();
        let d = instance_descriptor(&region(), &db).unwrap();
        assert_eq!(d.parent, None);

        let keep = SnapshotParams::for_instance(&d, &KEEP, now());
        assert_eq!(
            keep,
            SnapshotParams::Take("db-1-final-20240309070501".to_string())
        );
        assert_eq!(keep.skip_final_snapshot(), Some(false));
        assert_eq!(
            keep.final_snapshot_identifier().as_deref(),
            Some("db-1-final-20240309070501")
        );

        let skip = SnapshotParams::for_instance(&d, &SKIP, now());
        assert_eq!(skip.skip_final_snapshot(), Some(true));
        assert_eq!(skip.final_snapshot_identifier(), None);
    }

    #[test]
    fn test_read_replica_sends_no_snapshot_params() {
        let db = DbInstance::builder()
            .db_instance_identifier("db-1-replica")
            .read_replica_source_db_instance_identifier("db-1")
            .build();
        let d = instance_descriptor(&region(), &db).unwrap();
        assert_eq!(d.parent.as_deref(), Some("db-1"));

        for options in [KEEP, SKIP] {
            let params = SnapshotParams::for_instance(&d, &options, now());
            assert_eq!(params, SnapshotParams::Omit);
            assert_eq!(params.skip_final_snapshot(), None);
            assert_eq!(params.final_snapshot_identifier(), None);
        }
    }

    #[test]
    fn test_cluster_member_sends_no_snapshot_params() {
        let db = DbInstance::builder()
            .db_instance_identifier("aurora-1-instance-1")
            .db_cluster_identifier("aurora-1")
            .build();
        let d = instance_descriptor(&region(), &db).unwrap();
        assert_eq!(d.parent.as_deref(), Some("aurora-1"));

        for options in [KEEP, SKIP] {
            assert_eq!(
                SnapshotParams::for_instance(&d, &options, now()),
                SnapshotParams::Omit
            );
        }
    }

    #[test]
    fn test_cluster_snapshot_params() {
        assert_eq!(
            SnapshotParams::requested("aurora-1", &SKIP, now()),
            SnapshotParams::Skip
        );
        assert_eq!(
            SnapshotParams::requested("aurora-1", &KEEP, now()),
            SnapshotParams::Take("aurora-1-final-20240309070501".to_string())
        );
    }

    #[test]
    fn test_instance_without_identifier_is_dropped() {
        let db = DbInstance::builder().db_cluster_identifier("aurora-1").build();
        assert!(instance_descriptor(&region(), &db).is_none());
    }
}
