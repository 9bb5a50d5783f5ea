//! Resource types and cleanup ordering
//!
//! Provides the closed set of resource types cloud-sweep knows how to
//! inventory and destroy, plus a consistent cleanup priority. Dependent
//! resources must be destroyed in order to avoid provider-side failures.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Types of AWS resources handled by cloud-sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// EC2 instance (terminate before releasing its addresses)
    Ec2Instance,
    /// ELBv2 load balancer (application, network or gateway)
    LoadBalancer,
    /// VPC Elastic IP allocation
    ElasticIp,
    /// RDS DB instance, including Aurora cluster members
    RdsInstance,
    /// RDS / Aurora DB cluster (members must be deleted first)
    RdsCluster,
}

impl ResourceKind {
    /// Every supported kind, in cleanup priority order
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Ec2Instance,
        ResourceKind::LoadBalancer,
        ResourceKind::ElasticIp,
        ResourceKind::RdsInstance,
        ResourceKind::RdsCluster,
    ];

    /// Stable identifier used on the command line and in reports
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Ec2Instance => "ec2",
            ResourceKind::LoadBalancer => "elbv2",
            ResourceKind::ElasticIp => "eip",
            ResourceKind::RdsInstance => "rds",
            ResourceKind::RdsCluster => "rds-cluster",
        }
    }

    /// Human-readable description for logging
    pub fn description(self) -> &'static str {
        match self {
            ResourceKind::Ec2Instance => "EC2 instance",
            ResourceKind::LoadBalancer => "Load balancer",
            ResourceKind::ElasticIp => "Elastic IP",
            ResourceKind::RdsInstance => "RDS DB instance",
            ResourceKind::RdsCluster => "RDS DB cluster",
        }
    }

    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// - 0: Terminate EC2 instances (frees their address associations)
    /// - 1: Delete load balancers (their ENIs hold addresses too)
    /// - 2: Release Elastic IPs
    /// - 3: Delete RDS DB instances
    /// - 4: Delete RDS DB clusters (a cluster with members cannot be deleted)
    pub fn cleanup_priority(self) -> u8 {
        match self {
            ResourceKind::Ec2Instance => 0,
            ResourceKind::LoadBalancer => 1,
            ResourceKind::ElasticIp => 2,
            ResourceKind::RdsInstance => 3,
            ResourceKind::RdsCluster => 4,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource type identifier that matches no supported kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource type '{0}'")]
pub struct UnknownResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownResourceKind(s.trim().to_string()))
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
