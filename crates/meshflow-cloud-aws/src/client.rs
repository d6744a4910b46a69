//! [`RegionClient`] implemented on top of the EC2 API.
//!
//! One client per region, all resolving the same credential chain. Every
//! resource the client creates carries the tag set from [`crate::tags`],
//! and every lookup filters on it, which is what lets a repeated converge
//! run land on the resources of the previous one.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::types::{
    AttributeBooleanValue, Filter, InstanceType, IpPermission, IpRange, ResourceType,
};
use tracing::{debug, info};

use meshflow_cloud::{
    CloudError, IgwInfo, InstanceInfo, InstanceState, PeeringInfo, PeeringState, RegionClient,
    ResourceKind, Result, RouteInfo, RouteTableAssociation, RouteTableInfo, RouteTarget,
    RunInstanceRequest, SgInfo, SgRule, SubnetInfo, VpcInfo,
};

use crate::error::{self, classify};
use crate::tags;

/// EC2-backed region client.
#[derive(Clone)]
pub struct AwsRegionClient {
    client: aws_sdk_ec2::Client,
    region: String,
    mesh: String,
}

impl AwsRegionClient {
    /// Build a client for one region, resolving credentials from the
    /// environment (env vars, shared config files, instance profiles).
    pub async fn connect(mesh: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        Self {
            client: aws_sdk_ec2::Client::new(&config),
            region,
            mesh: mesh.into(),
        }
    }

    fn filters(&self, name: &str) -> Vec<Filter> {
        tags::name_filters(&self.mesh, name)
    }

    /// Turn on DNS support and DNS hostnames for a fresh VPC. Instances in
    /// peered VPCs resolve each other only with both set, and the API takes
    /// one attribute per modify call.
    async fn enable_vpc_dns(&self, vpc_id: &str, name: &str) -> Result<()> {
        let on = AttributeBooleanValue::builder().value(true).build();
        self.client
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_support(on.clone())
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Vpc, name, &e))?;
        self.client
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_hostnames(on)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Vpc, name, &e))?;
        Ok(())
    }
}

#[async_trait]
impl RegionClient for AwsRegionClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn find_vpc(&self, name: &str) -> Result<Option<VpcInfo>> {
        let out = self
            .client
            .describe_vpcs()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Vpc, name, &e))?;
        Ok(out.vpcs().first().and_then(convert_vpc))
    }

    async fn create_vpc(&self, name: &str, cidr: &str) -> Result<String> {
        let out = self
            .client
            .create_vpc()
            .cidr_block(cidr)
            .tag_specifications(tags::tag_spec(ResourceType::Vpc, &self.mesh, name))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Vpc, name, &e))?;
        let id = out
            .vpc()
            .and_then(|vpc| vpc.vpc_id())
            .ok_or_else(|| missing(ResourceKind::Vpc, name, "vpc id"))?
            .to_string();
        self.enable_vpc_dns(&id, name).await?;
        info!(region = %self.region, vpc = %id, %name, "created VPC");
        Ok(id)
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.client
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Vpc, vpc_id, &e))?;
        debug!(region = %self.region, vpc = %vpc_id, "deleted VPC");
        Ok(())
    }

    async fn find_subnet(&self, name: &str) -> Result<Option<SubnetInfo>> {
        let out = self
            .client
            .describe_subnets()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Subnet, name, &e))?;
        Ok(out.subnets().first().and_then(convert_subnet))
    }

    async fn create_subnet(
        &self,
        name: &str,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
    ) -> Result<String> {
        let out = self
            .client
            .create_subnet()
            .vpc_id(vpc_id)
            .cidr_block(cidr)
            .availability_zone(availability_zone)
            .tag_specifications(tags::tag_spec(ResourceType::Subnet, &self.mesh, name))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Subnet, name, &e))?;
        let id = out
            .subnet()
            .and_then(|subnet| subnet.subnet_id())
            .ok_or_else(|| missing(ResourceKind::Subnet, name, "subnet id"))?
            .to_string();
        info!(region = %self.region, subnet = %id, zone = %availability_zone, "created subnet");
        Ok(id)
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.client
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Subnet, subnet_id, &e))?;
        debug!(region = %self.region, subnet = %subnet_id, "deleted subnet");
        Ok(())
    }

    async fn first_availability_zone(&self) -> Result<String> {
        let out = self
            .client
            .describe_availability_zones()
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| classify(ResourceKind::AvailabilityZone, &self.region, &e))?;
        out.availability_zones()
            .first()
            .and_then(|zone| zone.zone_name())
            .map(str::to_string)
            .ok_or_else(|| missing(ResourceKind::AvailabilityZone, &self.region, "zone name"))
    }

    async fn find_internet_gateway(&self, name: &str) -> Result<Option<IgwInfo>> {
        let out = self
            .client
            .describe_internet_gateways()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::InternetGateway, name, &e))?;
        Ok(out.internet_gateways().first().and_then(convert_igw))
    }

    async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        let out = self
            .client
            .create_internet_gateway()
            .tag_specifications(tags::tag_spec(
                ResourceType::InternetGateway,
                &self.mesh,
                name,
            ))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::InternetGateway, name, &e))?;
        let id = out
            .internet_gateway()
            .and_then(|igw| igw.internet_gateway_id())
            .ok_or_else(|| missing(ResourceKind::InternetGateway, name, "gateway id"))?
            .to_string();
        info!(region = %self.region, igw = %id, %name, "created internet gateway");
        Ok(id)
    }

    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::InternetGateway, igw_id, &e))?;
        debug!(region = %self.region, igw = %igw_id, vpc = %vpc_id, "attached internet gateway");
        Ok(())
    }

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .detach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::InternetGateway, igw_id, &e))?;
        debug!(region = %self.region, igw = %igw_id, vpc = %vpc_id, "detached internet gateway");
        Ok(())
    }

    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()> {
        self.client
            .delete_internet_gateway()
            .internet_gateway_id(igw_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::InternetGateway, igw_id, &e))?;
        debug!(region = %self.region, igw = %igw_id, "deleted internet gateway");
        Ok(())
    }

    async fn find_route_table(&self, name: &str) -> Result<Option<RouteTableInfo>> {
        let out = self
            .client
            .describe_route_tables()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::RouteTable, name, &e))?;
        Ok(out.route_tables().first().and_then(convert_route_table))
    }

    async fn create_route_table(&self, name: &str, vpc_id: &str) -> Result<String> {
        let out = self
            .client
            .create_route_table()
            .vpc_id(vpc_id)
            .tag_specifications(tags::tag_spec(ResourceType::RouteTable, &self.mesh, name))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::RouteTable, name, &e))?;
        let id = out
            .route_table()
            .and_then(|rt| rt.route_table_id())
            .ok_or_else(|| missing(ResourceKind::RouteTable, name, "route table id"))?
            .to_string();
        info!(region = %self.region, route_table = %id, %name, "created route table");
        Ok(id)
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        let out = self
            .client
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::RouteTable, route_table_id, &e))?;
        let id = out
            .association_id()
            .ok_or_else(|| missing(ResourceKind::RouteTable, route_table_id, "association id"))?
            .to_string();
        debug!(region = %self.region, route_table = %route_table_id, subnet = %subnet_id, "associated route table");
        Ok(id)
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        self.client
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::RouteTable, association_id, &e))?;
        debug!(region = %self.region, association = %association_id, "disassociated route table");
        Ok(())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::RouteTable, route_table_id, &e))?;
        debug!(region = %self.region, route_table = %route_table_id, "deleted route table");
        Ok(())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        let call = self
            .client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination);
        let call = match target {
            RouteTarget::InternetGateway(id) => call.gateway_id(id),
            RouteTarget::PeeringConnection(id) => call.vpc_peering_connection_id(id),
            RouteTarget::Local | RouteTarget::Other(_) => {
                return Err(CloudError::rejected(
                    ResourceKind::Route,
                    destination,
                    None,
                    format!("route target {target:?} is not supported by this backend"),
                ));
            }
        };
        call.send()
            .await
            .map_err(|e| classify(ResourceKind::Route, destination, &e))?;
        debug!(region = %self.region, route_table = %route_table_id, destination = %destination, "created route");
        Ok(())
    }

    async fn delete_route(&self, route_table_id: &str, destination: &str) -> Result<()> {
        self.client
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Route, destination, &e))?;
        debug!(region = %self.region, route_table = %route_table_id, destination = %destination, "deleted route");
        Ok(())
    }

    async fn find_peering(&self, name: &str) -> Result<Option<PeeringInfo>> {
        let out = self
            .client
            .describe_vpc_peering_connections()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::PeeringConnection, name, &e))?;
        // Deleted connections stay visible for a while; skip them so a
        // fresh request can take over the name.
        Ok(out
            .vpc_peering_connections()
            .iter()
            .filter_map(convert_peering)
            .find(|peering| !peering.state.is_gone()))
    }

    async fn request_peering(
        &self,
        name: &str,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
    ) -> Result<String> {
        let out = self
            .client
            .create_vpc_peering_connection()
            .vpc_id(vpc_id)
            .peer_vpc_id(peer_vpc_id)
            .peer_region(peer_region)
            .tag_specifications(tags::tag_spec(
                ResourceType::VpcPeeringConnection,
                &self.mesh,
                name,
            ))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::PeeringConnection, name, &e))?;
        let id = out
            .vpc_peering_connection()
            .and_then(|pcx| pcx.vpc_peering_connection_id())
            .ok_or_else(|| missing(ResourceKind::PeeringConnection, name, "connection id"))?
            .to_string();
        info!(region = %self.region, peering = %id, peer_region = %peer_region, "requested peering connection");
        Ok(id)
    }

    async fn describe_peering(&self, peering_id: &str) -> Result<Option<PeeringInfo>> {
        let result = self
            .client
            .describe_vpc_peering_connections()
            .vpc_peering_connection_ids(peering_id)
            .send()
            .await;
        match result {
            Ok(out) => Ok(out
                .vpc_peering_connections()
                .first()
                .and_then(convert_peering)),
            Err(e) => {
                let err = classify(ResourceKind::PeeringConnection, peering_id, &e);
                // Cross-region requests take a moment to become visible
                // on the accepter side.
                if err.is_not_found() { Ok(None) } else { Err(err) }
            }
        }
    }

    async fn accept_peering(&self, peering_id: &str) -> Result<()> {
        self.client
            .accept_vpc_peering_connection()
            .vpc_peering_connection_id(peering_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::PeeringConnection, peering_id, &e))?;
        info!(region = %self.region, peering = %peering_id, "accepted peering connection");
        Ok(())
    }

    async fn delete_peering(&self, peering_id: &str) -> Result<()> {
        self.client
            .delete_vpc_peering_connection()
            .vpc_peering_connection_id(peering_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::PeeringConnection, peering_id, &e))?;
        debug!(region = %self.region, peering = %peering_id, "deleted peering connection");
        Ok(())
    }

    async fn find_security_group(&self, name: &str) -> Result<Option<SgInfo>> {
        let out = self
            .client
            .describe_security_groups()
            .set_filters(Some(self.filters(name)))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::SecurityGroup, name, &e))?;
        Ok(out
            .security_groups()
            .first()
            .and_then(convert_security_group))
    }

    async fn create_security_group(
        &self,
        name: &str,
        vpc_id: &str,
        description: &str,
    ) -> Result<String> {
        let out = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(vpc_id)
            .tag_specifications(tags::tag_spec(
                ResourceType::SecurityGroup,
                &self.mesh,
                name,
            ))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::SecurityGroup, name, &e))?;
        let id = out
            .group_id()
            .ok_or_else(|| missing(ResourceKind::SecurityGroup, name, "group id"))?
            .to_string();
        info!(region = %self.region, sg = %id, %name, "created security group");
        Ok(id)
    }

    async fn authorize_ingress(&self, sg_id: &str, rules: &[SgRule]) -> Result<()> {
        // One call per rule: EC2 rejects a whole batch when any single
        // rule in it already exists.
        for rule in rules {
            let mut range = IpRange::builder().cidr_ip(&rule.source_cidr);
            if let Some(description) = &rule.description {
                range = range.description(description);
            }
            let permission = IpPermission::builder()
                .ip_protocol(&rule.protocol)
                .from_port(rule.from_port)
                .to_port(rule.to_port)
                .ip_ranges(range.build())
                .build();
            let result = self
                .client
                .authorize_security_group_ingress()
                .group_id(sg_id)
                .ip_permissions(permission)
                .send()
                .await;
            match result {
                Ok(_) => {}
                Err(e) if error::code_of(&e) == Some(error::DUPLICATE_RULE) => {
                    debug!(region = %self.region, sg = %sg_id, cidr = %rule.source_cidr, "ingress rule already present");
                }
                Err(e) => return Err(classify(ResourceKind::SecurityGroup, sg_id, &e)),
            }
        }
        Ok(())
    }

    async fn delete_security_group(&self, sg_id: &str) -> Result<()> {
        self.client
            .delete_security_group()
            .group_id(sg_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::SecurityGroup, sg_id, &e))?;
        debug!(region = %self.region, sg = %sg_id, "deleted security group");
        Ok(())
    }

    async fn find_instance(&self, name: &str) -> Result<Option<InstanceInfo>> {
        let mut filters = self.filters(name);
        // Terminated instances linger in describe output for about an
        // hour; they must not shadow a fresh launch.
        filters.push(
            Filter::builder()
                .name("instance-state-name")
                .values("pending")
                .values("running")
                .values("stopping")
                .values("stopped")
                .build(),
        );
        let out = self
            .client
            .describe_instances()
            .set_filters(Some(filters))
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Instance, name, &e))?;
        Ok(out
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .find_map(convert_instance))
    }

    async fn latest_image(&self, owner: &str, name_pattern: &str) -> Result<String> {
        let out = self
            .client
            .describe_images()
            .owners(owner)
            .filters(Filter::builder().name("name").values(name_pattern).build())
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Image, name_pattern, &e))?;
        let mut images: Vec<_> = out.images().iter().collect();
        images.sort_by(|a, b| {
            b.creation_date()
                .unwrap_or_default()
                .cmp(a.creation_date().unwrap_or_default())
        });
        let id = images
            .first()
            .and_then(|image| image.image_id())
            .ok_or_else(|| CloudError::not_found(ResourceKind::Image, name_pattern))?
            .to_string();
        debug!(region = %self.region, image = %id, pattern = %name_pattern, "resolved latest image");
        Ok(id)
    }

    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String> {
        let mut call = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .subnet_id(&request.subnet_id)
            .security_group_ids(&request.security_group_id)
            .tag_specifications(tags::tag_spec(
                ResourceType::Instance,
                &self.mesh,
                &request.name,
            ));
        if let Some(key_name) = &request.key_name {
            call = call.key_name(key_name);
        }
        if let Some(user_data) = &request.user_data {
            call = call.user_data(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                user_data.as_bytes(),
            ));
        }
        let out = call
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Instance, &request.name, &e))?;
        let id = out
            .instances()
            .first()
            .and_then(|instance| instance.instance_id())
            .ok_or_else(|| missing(ResourceKind::Instance, &request.name, "instance id"))?
            .to_string();
        info!(region = %self.region, instance = %id, name = %request.name, "launched instance");
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        let result = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await;
        match result {
            Ok(out) => Ok(out
                .reservations()
                .iter()
                .flat_map(|reservation| reservation.instances())
                .find_map(convert_instance)),
            Err(e) => {
                let err = classify(ResourceKind::Instance, instance_id, &e);
                if err.is_not_found() { Ok(None) } else { Err(err) }
            }
        }
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| classify(ResourceKind::Instance, instance_id, &e))?;
        info!(region = %self.region, instance = %instance_id, "terminating instance");
        Ok(())
    }
}

/// A required field the EC2 response did not populate.
fn missing(kind: ResourceKind, name: &str, field: &str) -> CloudError {
    CloudError::rejected(kind, name, None, format!("EC2 response missing {field}"))
}

fn convert_vpc(vpc: &aws_sdk_ec2::types::Vpc) -> Option<VpcInfo> {
    Some(VpcInfo {
        id: vpc.vpc_id()?.to_string(),
        cidr: vpc.cidr_block().unwrap_or_default().to_string(),
        state: vpc
            .state()
            .map(|state| state.as_str().to_string())
            .unwrap_or_default(),
    })
}

fn convert_subnet(subnet: &aws_sdk_ec2::types::Subnet) -> Option<SubnetInfo> {
    Some(SubnetInfo {
        id: subnet.subnet_id()?.to_string(),
        cidr: subnet.cidr_block().unwrap_or_default().to_string(),
        availability_zone: subnet.availability_zone().unwrap_or_default().to_string(),
    })
}

fn convert_igw(igw: &aws_sdk_ec2::types::InternetGateway) -> Option<IgwInfo> {
    Some(IgwInfo {
        id: igw.internet_gateway_id()?.to_string(),
        attached_vpc: igw
            .attachments()
            .first()
            .and_then(|attachment| attachment.vpc_id())
            .map(str::to_string),
    })
}

fn convert_route_table(rt: &aws_sdk_ec2::types::RouteTable) -> Option<RouteTableInfo> {
    Some(RouteTableInfo {
        id: rt.route_table_id()?.to_string(),
        routes: rt.routes().iter().filter_map(convert_route).collect(),
        associations: rt
            .associations()
            .iter()
            .filter_map(|assoc| {
                Some(RouteTableAssociation {
                    id: assoc.route_table_association_id()?.to_string(),
                    subnet_id: assoc.subnet_id()?.to_string(),
                })
            })
            .collect(),
    })
}

fn convert_route(route: &aws_sdk_ec2::types::Route) -> Option<RouteInfo> {
    // IPv6 and prefix-list routes carry no v4 destination; the mesh only
    // manages v4 routes, so they are ignored.
    let destination = route.destination_cidr_block()?.to_string();
    let target = if let Some(pcx) = route.vpc_peering_connection_id() {
        RouteTarget::PeeringConnection(pcx.to_string())
    } else if let Some(gateway) = route.gateway_id() {
        match gateway {
            "local" => RouteTarget::Local,
            igw if igw.starts_with("igw-") => RouteTarget::InternetGateway(igw.to_string()),
            other => RouteTarget::Other(other.to_string()),
        }
    } else {
        let other = route
            .nat_gateway_id()
            .or(route.network_interface_id())
            .or(route.instance_id())
            .or(route.transit_gateway_id())
            .unwrap_or("unknown");
        RouteTarget::Other(other.to_string())
    };
    Some(RouteInfo {
        destination,
        target,
    })
}

fn convert_peering(pcx: &aws_sdk_ec2::types::VpcPeeringConnection) -> Option<PeeringInfo> {
    let state = pcx
        .status()
        .and_then(|status| status.code())
        .map(|code| PeeringState::parse(code.as_str()))
        .unwrap_or(PeeringState::Failed);
    Some(PeeringInfo {
        id: pcx.vpc_peering_connection_id()?.to_string(),
        requester_vpc_id: pcx
            .requester_vpc_info()
            .and_then(|info| info.vpc_id())
            .unwrap_or_default()
            .to_string(),
        accepter_vpc_id: pcx
            .accepter_vpc_info()
            .and_then(|info| info.vpc_id())
            .unwrap_or_default()
            .to_string(),
        state,
    })
}

fn convert_security_group(sg: &aws_sdk_ec2::types::SecurityGroup) -> Option<SgInfo> {
    Some(SgInfo {
        id: sg.group_id()?.to_string(),
        vpc_id: sg.vpc_id().unwrap_or_default().to_string(),
    })
}

fn convert_instance(instance: &aws_sdk_ec2::types::Instance) -> Option<InstanceInfo> {
    Some(InstanceInfo {
        id: instance.instance_id()?.to_string(),
        state: instance
            .state()
            .and_then(|state| state.name())
            .map(|name| InstanceState::parse(name.as_str()))
            .unwrap_or(InstanceState::Pending),
        public_ip: instance.public_ip_address().map(str::to_string),
        private_ip: instance.private_ip_address().map(str::to_string),
    })
}
