//! Shared AWS configuration context
//!
//! Provides `AwsContext` for loading AWS SDK configuration once and
//! creating per-region service clients from the same credentials.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use sweep_common::RegionId;

/// Shared AWS configuration context for creating service clients.
///
/// Credentials are resolved once by [`AwsContext::load`]. Handlers then
/// derive a context per region with [`AwsContext::in_region`], which only
/// swaps the region on a copy of the loaded config.
///
/// # Example
/// ```ignore
/// let aws = AwsContext::load(Some("sandbox"), None).await;
///
/// let ec2 = aws.in_region(&region).ec2_client();
/// let rds = aws.in_region(&region).rds_client();
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
}

impl AwsContext {
    /// Load AWS configuration from the environment, config files and IAM roles.
    ///
    /// `profile` overrides `AWS_PROFILE`; `home_region` is used for
    /// account-level calls such as STS when set.
    pub async fn load(profile: Option<&str>, home_region: Option<&RegionId>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = home_region {
            loader = loader.region(Region::new(region.to_string()));
        }

        Self {
            config: Arc::new(loader.load().await),
        }
    }

    /// Wrap an already loaded SDK config.
    pub fn from_sdk_config(config: SdkConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Derive a context targeting `region`, sharing credentials and retry config.
    pub fn in_region(&self, region: &RegionId) -> Self {
        let config = self
            .config
            .to_builder()
            .region(Region::new(region.to_string()))
            .build();

        Self {
            config: Arc::new(config),
        }
    }

    /// Get the underlying SDK config for direct client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Get the configured region, if any.
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    /// Create an EC2 client from this context.
    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }

    /// Create an ELBv2 client from this context.
    pub fn elbv2_client(&self) -> aws_sdk_elasticloadbalancingv2::Client {
        aws_sdk_elasticloadbalancingv2::Client::new(self.sdk_config())
    }

    /// Create an RDS client from this context.
    pub fn rds_client(&self) -> aws_sdk_rds::Client {
        aws_sdk_rds::Client::new(self.sdk_config())
    }

    /// Create an STS client from this context.
    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_context() -> AwsContext {
        AwsContext::from_sdk_config(
            SdkConfig::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        )
    }

    #[test]
    fn test_in_region_swaps_region_only() {
        let base = offline_context();
        let region = RegionId::new("eu-west-3").unwrap();

        let derived = base.in_region(&region);
        assert_eq!(derived.region(), Some("eu-west-3"));
        assert_eq!(base.region(), Some("us-east-1"));
    }

    #[tokio::test]
    #[ignore = "requires AWS credentials"]
    async fn test_context_load() {
        let region = RegionId::new("us-east-2").unwrap();
        let ctx = AwsContext::load(None, Some(&region)).await;
        assert_eq!(ctx.region(), Some("us-east-2"));
    }
}
