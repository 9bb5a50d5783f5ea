//! Elastic IP handler

use super::dry_run::{DryRunDestroy, DryRunVerdict, guarded_destroy, verdict_from};
use super::{ResourceHandler, UndatedPolicy, name_tag};
use crate::aws::{AwsContext, AwsError, classify_sdk_error, retry_throttled};
use crate::outcome::{DestroyOptions, DestroyOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ec2::error::SdkError;
use aws_sdk_ec2::operation::release_address::ReleaseAddressError;
use aws_sdk_ec2::types::Filter;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tracing::{debug, info};

/// Lists VPC Elastic IPs and releases them behind a dry-run check
pub struct ElasticIpHandler {
    ctx: AwsContext,
    list_retries: usize,
}

impl ElasticIpHandler {
    pub fn new(ctx: AwsContext, list_retries: usize) -> Self {
        Self { ctx, list_retries }
    }

    fn client(&self, region: &RegionId) -> aws_sdk_ec2::Client {
        self.ctx.in_region(region).ec2_client()
    }

    async fn release(
        &self,
        descriptor: &ResourceDescriptor,
        dry_run: bool,
    ) -> Result<(), SdkError<ReleaseAddressError>> {
        self.client(&descriptor.region)
            .release_address()
            .allocation_id(&descriptor.identifier)
            .dry_run(dry_run)
            .send()
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ResourceHandler for ElasticIpHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ElasticIp
    }

    // EC2 does not report when an address was allocated. Addresses are
    // swept regardless of the age cutoff.
    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Include
    }

    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>> {
        let client = self.client(region);
        let vpc_only = Filter::builder().name("domain").values("vpc").build();

        // DescribeAddresses is not paginated
        let response = retry_throttled("DescribeAddresses", self.list_retries, || {
            client.describe_addresses().filters(vpc_only.clone()).send()
        })
        .await
        .with_context(|| format!("Failed to describe Elastic IPs in {region}"))?;

        let resources: Vec<_> = response
            .addresses()
            .iter()
            .filter_map(|addr| {
                let allocation_id = addr.allocation_id()?;
                let label = name_tag(addr.tags(), |t| t.key(), |t| t.value())
                    .or_else(|| addr.public_ip().map(str::to_string));
                Some(
                    ResourceDescriptor::new(region.clone(), ResourceKind::ElasticIp, allocation_id)
                        .with_name(label)
                        .with_parent(addr.instance_id().map(str::to_string)),
                )
            })
            .collect();

        debug!(region = %region, count = resources.len(), "Found Elastic IPs");
        Ok(resources)
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        _options: &DestroyOptions,
    ) -> DestroyOutcome {
        guarded_destroy(self, descriptor).await
    }
}

#[async_trait]
impl DryRunDestroy for ElasticIpHandler {
    async fn dry_run(&self, descriptor: &ResourceDescriptor) -> DryRunVerdict {
        verdict_from(self.release(descriptor, true).await)
    }

    async fn execute(&self, descriptor: &ResourceDescriptor) -> Result<(), AwsError> {
        info!(
            region = %descriptor.region,
            allocation_id = %descriptor.identifier,
            "Releasing Elastic IP"
        );
        self.release(descriptor, false)
            .await
            .map_err(|e| classify_sdk_error(&e))
    }
}
