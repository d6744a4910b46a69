//! Region client abstraction
//!
//! One `RegionClient` per region in the mesh. The provisioner only talks
//! through this trait, so the whole convergence workflow can run against
//! an in-memory fake as easily as against a real provider.
//!
//! Find methods match by deterministic name tag and return `None` for
//! absent resources; create methods return the new resource's id. Both
//! are expected to be cheap enough to call repeatedly: the workflow leans
//! on find-before-create for idempotence.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    IgwInfo, InstanceInfo, PeeringInfo, RouteTableInfo, RouteTarget, RunInstanceRequest, SgInfo,
    SgRule, SubnetInfo, VpcInfo,
};

/// Control-plane operations for a single region.
#[async_trait]
pub trait RegionClient: Send + Sync {
    /// Region this client operates in (e.g. "ap-northeast-1").
    fn region(&self) -> &str;

    // --- VPC ---

    /// Look up a VPC by name tag.
    async fn find_vpc(&self, name: &str) -> Result<Option<VpcInfo>>;

    /// Create a VPC with the given CIDR; returns its id. The VPC comes up
    /// with DNS support and DNS hostnames enabled.
    async fn create_vpc(&self, name: &str, cidr: &str) -> Result<String>;

    /// Delete a VPC. Fails with a dependency violation while anything
    /// inside it still exists.
    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;

    // --- Subnet ---

    /// Look up a subnet by name tag.
    async fn find_subnet(&self, name: &str) -> Result<Option<SubnetInfo>>;

    /// Create a subnet in the given zone; returns its id.
    async fn create_subnet(
        &self,
        name: &str,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
    ) -> Result<String>;

    /// Delete a subnet.
    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    /// First availability zone of this region, in the provider's order.
    async fn first_availability_zone(&self) -> Result<String>;

    // --- Internet gateway ---

    /// Look up an internet gateway by name tag.
    async fn find_internet_gateway(&self, name: &str) -> Result<Option<IgwInfo>>;

    /// Create an internet gateway; returns its id. Created detached.
    async fn create_internet_gateway(&self, name: &str) -> Result<String>;

    /// Attach a gateway to a VPC. Attaching an already-attached gateway
    /// to the same VPC is reported as a provider rejection.
    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()>;

    /// Detach a gateway from a VPC.
    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()>;

    /// Delete a detached internet gateway.
    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()>;

    // --- Route tables and routes ---

    /// Look up a route table by name tag.
    async fn find_route_table(&self, name: &str) -> Result<Option<RouteTableInfo>>;

    /// Create a route table in a VPC; returns its id.
    async fn create_route_table(&self, name: &str, vpc_id: &str) -> Result<String>;

    /// Associate a route table with a subnet; returns the association id.
    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str)
    -> Result<String>;

    /// Remove a route table ↔ subnet association.
    async fn disassociate_route_table(&self, association_id: &str) -> Result<()>;

    /// Delete a route table. The main route table cannot be deleted.
    async fn delete_route_table(&self, route_table_id: &str) -> Result<()>;

    /// Add a route. Fails if the target is not in a routable state
    /// (e.g. a peering connection that is not yet active).
    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &str,
        target: &RouteTarget,
    ) -> Result<()>;

    /// Remove the route for a destination CIDR.
    async fn delete_route(&self, route_table_id: &str, destination: &str) -> Result<()>;

    // --- Peering ---

    /// Look up a peering connection by name tag. Deleted connections
    /// linger in describe output for a while and are filtered out here.
    async fn find_peering(&self, name: &str) -> Result<Option<PeeringInfo>>;

    /// Request a peering connection from a local VPC to a VPC in another
    /// region; returns the connection id. The caller is the requester.
    async fn request_peering(
        &self,
        name: &str,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
    ) -> Result<String>;

    /// Current view of a peering connection, or `None` if this region
    /// cannot see it yet. Cross-region requests take a moment to appear
    /// on the accepter side.
    async fn describe_peering(&self, peering_id: &str) -> Result<Option<PeeringInfo>>;

    /// Accept a pending peering connection. Only valid in the accepter's
    /// region while the connection is pending-acceptance.
    async fn accept_peering(&self, peering_id: &str) -> Result<()>;

    /// Delete a peering connection. Either side may call this; the
    /// connection then reads as deleting/deleted from both regions.
    async fn delete_peering(&self, peering_id: &str) -> Result<()>;

    // --- Security groups ---

    /// Look up a security group by name tag.
    async fn find_security_group(&self, name: &str) -> Result<Option<SgInfo>>;

    /// Create a security group in a VPC; returns its id.
    async fn create_security_group(
        &self,
        name: &str,
        vpc_id: &str,
        description: &str,
    ) -> Result<String>;

    /// Authorize ingress rules on a group. Rules that already exist are
    /// tolerated, so replays converge instead of failing.
    async fn authorize_ingress(&self, sg_id: &str, rules: &[SgRule]) -> Result<()>;

    /// Delete a security group. Fails with a dependency violation while
    /// an instance still references it.
    async fn delete_security_group(&self, sg_id: &str) -> Result<()>;

    // --- Instances ---

    /// Look up a live instance by name tag. Terminated instances from
    /// earlier runs do not count.
    async fn find_instance(&self, name: &str) -> Result<Option<InstanceInfo>>;

    /// Resolve the newest image matching the owner and name pattern.
    async fn latest_image(&self, owner: &str, name_pattern: &str) -> Result<String>;

    /// Launch one instance; returns its id.
    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String>;

    /// Current view of an instance, or `None` if it is unknown.
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>>;

    /// Begin terminating an instance. Termination is asynchronous; poll
    /// `describe_instance` until the state reads terminated.
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;
}
