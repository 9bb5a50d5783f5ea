//! EC2 instance handler

use super::dry_run::{DryRunDestroy, DryRunVerdict, guarded_destroy, verdict_from};
use super::{ResourceHandler, UndatedPolicy, name_tag};
use crate::aws::{
    AwsContext, AwsError, WaitConfig, classify_sdk_error, retry_throttled, to_utc, wait_until,
};
use crate::outcome::{DestroyOptions, DestroyOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ec2::error::SdkError;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::operation::terminate_instances::TerminateInstancesError;
use aws_sdk_ec2::types::{Filter, InstanceStateName};
use std::collections::BTreeMap;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Instance IDs per DescribeInstances call while waiting for termination
const DESCRIBE_BATCH: usize = 100;

/// Lists live EC2 instances and terminates them behind a dry-run check
pub struct Ec2InstanceHandler {
    ctx: AwsContext,
    list_retries: usize,
    wait: WaitConfig,
}

impl Ec2InstanceHandler {
    pub fn new(ctx: AwsContext, list_retries: usize) -> Self {
        Self {
            ctx,
            list_retries,
            wait: WaitConfig::default(),
        }
    }

    /// Poll until every instance in `ids` has reached `terminated`
    async fn wait_for_terminated(
        &self,
        region: &RegionId,
        ids: &[&str],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let client = &self.client(region);
        let what = format!("{} instance(s) in {region} to terminate", ids.len());

        wait_until(&self.wait, cancel, &what, || async move {
            let response = client
                .describe_instances()
                .set_instance_ids(Some(ids.iter().map(|id| id.to_string()).collect()))
                .send()
                .await;

            match response {
                Ok(response) => {
                    let pending = not_yet_terminated(&response);
                    debug!(region = %region, pending = ?pending, "Instances still shutting down");
                    Ok(pending.is_empty())
                }
                // Instances that vanished from DescribeInstances are gone
                Err(e) => match classify_sdk_error(&e) {
                    e if e.is_not_found() => Ok(true),
                    e => Err(e.into()),
                },
            }
        })
        .await
    }

    fn client(&self, region: &RegionId) -> aws_sdk_ec2::Client {
        self.ctx.in_region(region).ec2_client()
    }

    async fn terminate(
        &self,
        descriptor: &ResourceDescriptor,
        dry_run: bool,
    ) -> Result<(), SdkError<TerminateInstancesError>> {
        self.client(&descriptor.region)
            .terminate_instances()
            .instance_ids(&descriptor.identifier)
            .dry_run(dry_run)
            .send()
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ResourceHandler for Ec2InstanceHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Ec2Instance
    }

    // Every instance carries a launch time, so this only matters for
    // malformed responses; keep those out rather than guess.
    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Exclude
    }

    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>> {
        let client = self.client(region);

        // Terminated instances linger in listings for a while; skip them
        let state_filter = Filter::builder()
            .name("instance-state-name")
            .values("pending")
            .values("running")
            .values("stopping")
            .values("stopped")
            .build();

        let mut resources = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = retry_throttled("DescribeInstances", self.list_retries, || {
                client
                    .describe_instances()
                    .filters(state_filter.clone())
                    .set_next_token(next_token.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to describe EC2 instances in {region}"))?;

            for reservation in response.reservations() {
                for instance in reservation.instances() {
                    let Some(instance_id) = instance.instance_id() else {
                        continue;
                    };

                    let created_at = instance.launch_time().and_then(to_utc);
                    let name = name_tag(instance.tags(), |t| t.key(), |t| t.value());
                    resources.push(
                        ResourceDescriptor::new(
                            region.clone(),
                            ResourceKind::Ec2Instance,
                            instance_id,
                        )
                        .with_created_at(created_at)
                        .with_name(name),
                    );
                }
            }

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!(region = %region, count = resources.len(), "Found EC2 instances");
        Ok(resources)
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        _options: &DestroyOptions,
    ) -> DestroyOutcome {
        guarded_destroy(self, descriptor).await
    }

    async fn settle(
        &self,
        destroyed: &[ResourceDescriptor],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut by_region: BTreeMap<&RegionId, Vec<&str>> = BTreeMap::new();
        for d in destroyed {
            by_region
                .entry(&d.region)
                .or_default()
                .push(d.identifier.as_str());
        }

        for (region, ids) in by_region {
            info!(region = %region, count = ids.len(), "Waiting for instances to terminate");
            for batch in ids.chunks(DESCRIBE_BATCH) {
                self.wait_for_terminated(region, batch, cancel).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DryRunDestroy for Ec2InstanceHandler {
    async fn dry_run(&self, descriptor: &ResourceDescriptor) -> DryRunVerdict {
        verdict_from(self.terminate(descriptor, true).await)
    }

    async fn execute(&self, descriptor: &ResourceDescriptor) -> Result<(), AwsError> {
        info!(
            region = %descriptor.region,
            instance_id = %descriptor.identifier,
            "Terminating instance"
        );
        self.terminate(descriptor, false)
            .await
            .map_err(|e| classify_sdk_error(&e))
    }
}

/// IDs in `response` whose state is anything other than `terminated`
fn not_yet_terminated(response: &DescribeInstancesOutput) -> Vec<&str> {
    response
        .reservations()
        .iter()
        .flat_map(|r| r.instances())
        .filter(|i| i.state().and_then(|s| s.name()) != Some(&InstanceStateName::Terminated))
        .filter_map(|i| i.instance_id())
        .collect()
}
