//! Typed records for control-plane resources
//!
//! These are the provisioner's view of what exists in a region: thin,
//! provider-neutral snapshots returned by describe/find calls. Identifiers
//! are the provider's (vpc-…, subnet-…, pcx-…); names are the deterministic
//! mesh names used for tag matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kinds, used for error context and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    InternetGateway,
    RouteTable,
    Route,
    PeeringConnection,
    SecurityGroup,
    Instance,
    Image,
    AvailabilityZone,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet-gateway",
            Self::RouteTable => "route-table",
            Self::Route => "route",
            Self::PeeringConnection => "peering-connection",
            Self::SecurityGroup => "security-group",
            Self::Instance => "instance",
            Self::Image => "image",
            Self::AvailabilityZone => "availability-zone",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VPC as seen by describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcInfo {
    pub id: String,
    pub cidr: String,
    /// Provider state string ("pending", "available").
    pub state: String,
}

/// A subnet as seen by describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetInfo {
    pub id: String,
    pub cidr: String,
    pub availability_zone: String,
}

/// An internet gateway as seen by describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgwInfo {
    pub id: String,
    /// The VPC this gateway is attached to, if any.
    pub attached_vpc: Option<String>,
}

/// A route table with its routes and subnet associations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTableInfo {
    pub id: String,
    pub routes: Vec<RouteInfo>,
    pub associations: Vec<RouteTableAssociation>,
}

impl RouteTableInfo {
    /// Number of routes that target a peering connection.
    pub fn peering_route_count(&self) -> usize {
        self.routes
            .iter()
            .filter(|r| matches!(r.target, RouteTarget::PeeringConnection(_)))
            .count()
    }
}

/// An explicit route-table ↔ subnet association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTableAssociation {
    pub id: String,
    pub subnet_id: String,
}

/// A single route: destination CIDR plus its forwarding target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub destination: String,
    pub target: RouteTarget,
}

/// Forwarding target of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteTarget {
    InternetGateway(String),
    PeeringConnection(String),
    /// The implicit in-VPC route every route table carries.
    Local,
    Other(String),
}

/// Peering-connection lifecycle, mirroring the provider's wire states.
///
/// The workflow only ever drives `absent → pending-acceptance → active`
/// (creation by the requester, then an explicit accept on the accepter
/// side) and `→ deleted` on teardown. The remaining states are observed,
/// not requested: `failed`/`rejected`/`expired` are terminal failures, and
/// anything still on the way to acceptance counts as pending. Routes over
/// a connection are only legal in `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeeringState {
    InitiatingRequest,
    PendingAcceptance,
    Provisioning,
    Active,
    Rejected,
    Failed,
    Expired,
    Deleting,
    Deleted,
}

impl PeeringState {
    /// Map a provider state string onto the lifecycle.
    pub fn parse(s: &str) -> Self {
        match s {
            "initiating-request" => Self::InitiatingRequest,
            "pending-acceptance" => Self::PendingAcceptance,
            "provisioning" => Self::Provisioning,
            "active" => Self::Active,
            "rejected" => Self::Rejected,
            "expired" => Self::Expired,
            "deleting" => Self::Deleting,
            "deleted" => Self::Deleted,
            // "failed" and anything unknown: not a state we can work with
            _ => Self::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitiatingRequest => "initiating-request",
            Self::PendingAcceptance => "pending-acceptance",
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }

    /// Only `active` admits routes over the connection.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Still waiting for the accepter's accept call.
    pub fn is_pending_acceptance(&self) -> bool {
        matches!(self, Self::PendingAcceptance)
    }

    /// Terminal failure: the connection will never become active.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Rejected | Self::Failed | Self::Expired)
    }

    /// The connection no longer exists (or is on its way out).
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Deleting | Self::Deleted)
    }
}

impl fmt::Display for PeeringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peering connection between two VPCs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeeringInfo {
    pub id: String,
    pub requester_vpc_id: String,
    pub accepter_vpc_id: String,
    pub state: PeeringState,
}

/// A security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgInfo {
    pub id: String,
    pub vpc_id: String,
}

/// An ingress rule: protocol, port range, source CIDR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgRule {
    /// "tcp", "udp", "icmp", or "-1" for all protocols.
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub source_cidr: String,
    pub description: Option<String>,
}

impl SgRule {
    /// SSH from anywhere.
    pub fn ssh_anywhere() -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: 22,
            to_port: 22,
            source_cidr: "0.0.0.0/0".to_string(),
            description: Some("SSH".to_string()),
        }
    }

    /// All ICMP from a peer VPC's CIDR.
    pub fn icmp_from(cidr: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            protocol: "icmp".to_string(),
            from_port: -1,
            to_port: -1,
            source_cidr: cidr.into(),
            description: Some(description.into()),
        }
    }

    /// The full TCP range from a peer VPC's CIDR.
    pub fn all_tcp_from(cidr: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: 0,
            to_port: 65535,
            source_cidr: cidr.into(),
            description: Some(description.into()),
        }
    }
}

/// Instance lifecycle states the provisioner cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Other(String),
}

impl InstanceState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Terminated or on the way there; such instances no longer block
    /// teardown of their subnet.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Live instances count toward the topology; terminated ones are
    /// leftovers from earlier runs and are ignored by find.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Stopping | Self::Stopped)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An instance as seen by describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub id: String,
    pub state: InstanceState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

/// Parameters for launching one instance.
#[derive(Debug, Clone)]
pub struct RunInstanceRequest {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub key_name: Option<String>,
    /// Opaque bootstrap payload, passed through untouched.
    pub user_data: Option<String>,
}
