//! Handler registry

use super::{
    Ec2InstanceHandler, ElasticIpHandler, LoadBalancerHandler, RdsClusterHandler,
    RdsInstanceHandler, ResourceHandler,
};
use crate::aws::AwsContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use sweep_common::ResourceKind;
use tracing::warn;

/// The set of handlers a run may use, keyed by resource type
///
/// Built by the caller and handed to both the inspector and the terminator;
/// there is no process-wide client.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<ResourceKind, Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every AWS handler, sharing one credential context
    pub fn aws(ctx: &AwsContext, list_retries: usize) -> Self {
        Self::new()
            .with(Ec2InstanceHandler::new(ctx.clone(), list_retries))
            .with(LoadBalancerHandler::new(ctx.clone(), list_retries))
            .with(ElasticIpHandler::new(ctx.clone(), list_retries))
            .with(RdsInstanceHandler::new(ctx.clone(), list_retries))
            .with(RdsClusterHandler::new(ctx.clone(), list_retries))
    }

    /// Register a handler, replacing any previous handler for the same kind
    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            warn!(resource_type = %kind, "Replacing previously registered handler");
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.register(Arc::new(handler));
        self
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, in cleanup priority order
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region, SdkConfig};

    #[test]
    fn aws_registry_covers_every_kind() {
        let ctx = AwsContext::from_sdk_config(
            SdkConfig::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );

        let registry = HandlerRegistry::aws(&ctx, 0);

        assert_eq!(registry.len(), ResourceKind::ALL.len());
        assert_eq!(registry.kinds().collect::<Vec<_>>(), ResourceKind::ALL);
        for kind in ResourceKind::ALL {
            assert_eq!(registry.get(kind).map(|h| h.kind()), Some(kind));
        }
    }

    #[test]
    fn empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(ResourceKind::Ec2Instance));
    }
}
