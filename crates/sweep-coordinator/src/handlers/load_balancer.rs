//! ELBv2 load balancer handler

use super::{ResourceHandler, UndatedPolicy};
use crate::aws::{AwsContext, classify_sdk_error, retry_throttled, to_utc};
use crate::outcome::{DestroyOptions, DestroyOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sweep_common::{RegionId, ResourceDescriptor, ResourceKind};
use tracing::{debug, info};

/// Lists application, network and gateway load balancers and deletes them
///
/// DeleteLoadBalancer has no dry-run mode, so deletion goes straight to the
/// mutating call.
pub struct LoadBalancerHandler {
    ctx: AwsContext,
    list_retries: usize,
}

impl LoadBalancerHandler {
    pub fn new(ctx: AwsContext, list_retries: usize) -> Self {
        Self { ctx, list_retries }
    }

    fn client(&self, region: &RegionId) -> aws_sdk_elasticloadbalancingv2::Client {
        self.ctx.in_region(region).elbv2_client()
    }
}

#[async_trait]
impl ResourceHandler for LoadBalancerHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::LoadBalancer
    }

    fn undated_policy(&self) -> UndatedPolicy {
        UndatedPolicy::Exclude
    }

    async fn list(&self, region: &RegionId) -> Result<Vec<ResourceDescriptor>> {
        let client = self.client(region);
        let mut resources = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = retry_throttled("DescribeLoadBalancers", self.list_retries, || {
                client
                    .describe_load_balancers()
                    .set_marker(marker.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to describe load balancers in {region}"))?;

            for lb in response.load_balancers() {
                let Some(arn) = lb.load_balancer_arn() else {
                    continue;
                };

                resources.push(
                    ResourceDescriptor::new(region.clone(), ResourceKind::LoadBalancer, arn)
                        .with_created_at(lb.created_time().and_then(to_utc))
                        .with_name(lb.load_balancer_name().map(str::to_string)),
                );
            }

            // Handle pagination
            marker = response.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        debug!(region = %region, count = resources.len(), "Found load balancers");
        Ok(resources)
    }

    async fn destroy(
        &self,
        descriptor: &ResourceDescriptor,
        _options: &DestroyOptions,
    ) -> DestroyOutcome {
        info!(
            region = %descriptor.region,
            load_balancer = %descriptor.name.as_deref().unwrap_or(&descriptor.identifier),
            "Deleting load balancer"
        );

        let result = self
            .client(&descriptor.region)
            .delete_load_balancer()
            .load_balancer_arn(&descriptor.identifier)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| classify_sdk_error(&e));

        DestroyOutcome::from_provider(result)
    }
}
