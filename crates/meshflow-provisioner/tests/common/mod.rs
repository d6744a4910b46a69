//! テスト用のインメモリクラウド
//!
//! 全リージョンで 1 つの `CloudState` を共有し、リージョンごとの
//! `MockRegion` クライアントがそこを読み書きする。実プロバイダと同じ
//! 依存関係の検査 (active でないピアリングへのルート拒否、依存が残った
//! ままの削除拒否など) を行い、変更系の呼び出しを順序付きで記録する。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use meshflow_cloud::{
    CloudError, IgwInfo, InstanceInfo, InstanceState, PeeringInfo, PeeringState, RegionClient,
    ResourceKind, Result, RouteInfo, RouteTableAssociation, RouteTableInfo, RouteTarget,
    RunInstanceRequest, SgInfo, SgRule, SubnetInfo, VpcInfo,
};
use meshflow_core::{InstanceSpec, MeshSpec, RegionSpec, WaitConfig};

/// テスト用の spec。待機はミリ秒単位に短縮してある。
pub fn test_spec(name: &str, regions: &[(&str, &str, &str)]) -> MeshSpec {
    MeshSpec {
        name: name.to_string(),
        regions: regions
            .iter()
            .map(|(region, vpc, subnet)| RegionSpec {
                name: region.to_string(),
                vpc_cidr: vpc.parse().unwrap(),
                subnet_cidr: subnet.parse().unwrap(),
                key_name: None,
            })
            .collect(),
        instance: InstanceSpec::default(),
        wait: WaitConfig {
            max_retries: 6,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
        },
    }
}

/// 3 リージョンの標準トポロジ。
pub fn three_region_spec() -> MeshSpec {
    test_spec(
        "labnet",
        &[
            ("us-east-1", "10.0.0.0/16", "10.0.1.0/24"),
            ("eu-west-1", "10.1.0.0/16", "10.1.1.0/24"),
            ("ap-northeast-1", "10.2.0.0/16", "10.2.1.0/24"),
        ],
    )
}

#[derive(Default)]
struct CloudState {
    counter: u64,
    api_calls: u64,
    events: Vec<String>,
    fail_once: HashMap<String, String>,
    vpcs: HashMap<String, MockVpc>,
    subnets: HashMap<String, MockSubnet>,
    igws: HashMap<String, MockIgw>,
    route_tables: HashMap<String, MockRouteTable>,
    peerings: HashMap<String, MockPeering>,
    security_groups: HashMap<String, MockSg>,
    instances: HashMap<String, MockInstance>,
}

struct MockVpc {
    region: String,
    name: String,
    cidr: String,
    pending_ticks: u32,
}

struct MockSubnet {
    region: String,
    name: String,
    vpc_id: String,
    cidr: String,
    availability_zone: String,
}

struct MockIgw {
    region: String,
    name: String,
    attached_vpc: Option<String>,
}

struct MockRouteTable {
    region: String,
    name: String,
    vpc_id: String,
    routes: Vec<(String, RouteTarget)>,
    associations: Vec<(String, String)>,
}

struct MockPeering {
    name: String,
    requester_region: String,
    accepter_region: String,
    requester_vpc: String,
    accepter_vpc: String,
    state: PeeringState,
    /// アクセプター側から見えるようになるまでの describe 回数
    visibility_ticks: u32,
    /// provisioning から active になるまでの describe 回数
    provisioning_ticks: u32,
}

struct MockSg {
    region: String,
    name: String,
    vpc_id: String,
    rules: Vec<SgRule>,
}

struct MockInstance {
    region: String,
    name: String,
    subnet_id: String,
    security_group_id: String,
    state: InstanceState,
    ticks: u32,
    public_ip: String,
    private_ip: String,
}

impl CloudState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}-{:04}", self.counter)
    }

    fn record(&mut self, event: String) {
        self.events.push(event);
    }

    fn take_failure(&mut self, op: &str, region: &str, kind: ResourceKind) -> Result<()> {
        let key = format!("{op}:{region}");
        if let Some(message) = self.fail_once.remove(&key) {
            self.record(format!("injected_failure {op} {region}"));
            return Err(CloudError::rejected(kind, op, None, message));
        }
        Ok(())
    }

    fn vpc_has_dependents(&self, vpc_id: &str) -> Option<String> {
        if self.subnets.values().any(|s| s.vpc_id == vpc_id) {
            return Some("subnet".to_string());
        }
        if self
            .igws
            .values()
            .any(|g| g.attached_vpc.as_deref() == Some(vpc_id))
        {
            return Some("internet gateway".to_string());
        }
        if self.route_tables.values().any(|rt| rt.vpc_id == vpc_id) {
            return Some("route table".to_string());
        }
        if self.security_groups.values().any(|sg| sg.vpc_id == vpc_id) {
            return Some("security group".to_string());
        }
        if self.peerings.values().any(|p| {
            p.state != PeeringState::Deleted
                && (p.requester_vpc == vpc_id || p.accepter_vpc == vpc_id)
        }) {
            return Some("peering connection".to_string());
        }
        None
    }
}

/// 全リージョン共有のモッククラウド。クローンしても状態は共有される。
#[derive(Clone, Default)]
pub struct MockCloud {
    state: Arc<Mutex<CloudState>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, region: &str) -> MockRegion {
        MockRegion {
            region: region.to_string(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn clients(&self, regions: &[&str]) -> BTreeMap<String, MockRegion> {
        regions
            .iter()
            .map(|r| (r.to_string(), self.client(r)))
            .collect()
    }

    /// 次の 1 回だけ指定の操作を失敗させる。
    #[allow(dead_code)]
    pub fn fail_once(&self, op: &str, region: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .fail_once
            .insert(format!("{op}:{region}"), message.to_string());
    }

    /// 変更系呼び出しの順序付きログ。
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    /// リソースを新規に作った呼び出しだけに絞ったログ。冪等性の検証用。
    #[allow(dead_code)]
    pub fn creation_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| {
                e.starts_with("create_")
                    || e.starts_with("request_")
                    || e.starts_with("run_")
                    || e.starts_with("accept_")
                    || e.starts_with("attach_")
                    || e.starts_with("associate_")
            })
            .collect()
    }

    /// 読み取りも含む全 API 呼び出し数。
    #[allow(dead_code)]
    pub fn api_calls(&self) -> u64 {
        self.state.lock().unwrap().api_calls
    }

    /// 生きているリソースの総数。teardown 後は 0 になる。
    #[allow(dead_code)]
    pub fn live_resources(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.vpcs.len()
            + state.subnets.len()
            + state.igws.len()
            + state.route_tables.len()
            + state.security_groups.len()
            + state
                .peerings
                .values()
                .filter(|p| p.state != PeeringState::Deleted)
                .count()
            + state
                .instances
                .values()
                .filter(|i| i.state.is_live())
                .count()
    }

    /// ピアリング接続を向いたルートの総数 (全リージョン合計)。
    #[allow(dead_code)]
    pub fn peering_route_total(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .route_tables
            .values()
            .flat_map(|rt| rt.routes.iter())
            .filter(|(_, target)| matches!(target, RouteTarget::PeeringConnection(_)))
            .count()
    }

    /// 指定リージョンの SG が持つ ingress ルール。
    #[allow(dead_code)]
    pub fn sg_rules(&self, region: &str) -> Vec<SgRule> {
        let state = self.state.lock().unwrap();
        state
            .security_groups
            .values()
            .find(|sg| sg.region == region)
            .map(|sg| sg.rules.clone())
            .unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn peering_by_name(&self, name: &str) -> Option<(String, PeeringState)> {
        let state = self.state.lock().unwrap();
        state
            .peerings
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(id, p)| (id.clone(), p.state))
    }
}

/// 1 リージョン分のモッククライアント。
pub struct MockRegion {
    region: String,
    state: Arc<Mutex<CloudState>>,
}

impl MockRegion {
    fn lock(&self) -> std::sync::MutexGuard<'_, CloudState> {
        let mut state = self.state.lock().unwrap();
        state.api_calls += 1;
        state
    }
}

#[async_trait]
impl RegionClient for MockRegion {
    fn region(&self) -> &str {
        &self.region
    }

    async fn find_vpc(&self, name: &str) -> Result<Option<VpcInfo>> {
        let mut state = self.lock();
        let region = self.region.clone();
        let found = state
            .vpcs
            .iter_mut()
            .find(|(_, v)| v.region == region && v.name == name)
            .map(|(id, v)| {
                let vpc_state = if v.pending_ticks > 0 {
                    v.pending_ticks -= 1;
                    "pending"
                } else {
                    "available"
                };
                VpcInfo {
                    id: id.clone(),
                    cidr: v.cidr.clone(),
                    state: vpc_state.to_string(),
                }
            });
        Ok(found)
    }

    async fn create_vpc(&self, name: &str, cidr: &str) -> Result<String> {
        let mut state = self.lock();
        state.take_failure("create_vpc", &self.region, ResourceKind::Vpc)?;
        let id = state.next_id("vpc");
        state.vpcs.insert(
            id.clone(),
            MockVpc {
                region: self.region.clone(),
                name: name.to_string(),
                cidr: cidr.to_string(),
                pending_ticks: 1,
            },
        );
        state.record(format!("create_vpc {} {name}", self.region));
        Ok(id)
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("delete_vpc", &self.region, ResourceKind::Vpc)?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        if let Some(dependent) = state.vpc_has_dependents(vpc_id) {
            return Err(CloudError::violation(
                ResourceKind::Vpc,
                vpc_id,
                format!("vpc still has a {dependent}"),
            ));
        }
        state.vpcs.remove(vpc_id);
        state.record(format!("delete_vpc {} {vpc_id}", self.region));
        Ok(())
    }

    async fn find_subnet(&self, name: &str) -> Result<Option<SubnetInfo>> {
        let state = self.lock();
        Ok(state
            .subnets
            .iter()
            .find(|(_, s)| s.region == self.region && s.name == name)
            .map(|(id, s)| SubnetInfo {
                id: id.clone(),
                cidr: s.cidr.clone(),
                availability_zone: s.availability_zone.clone(),
            }))
    }

    async fn create_subnet(
        &self,
        name: &str,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
    ) -> Result<String> {
        let mut state = self.lock();
        state.take_failure("create_subnet", &self.region, ResourceKind::Subnet)?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        let id = state.next_id("subnet");
        state.subnets.insert(
            id.clone(),
            MockSubnet {
                region: self.region.clone(),
                name: name.to_string(),
                vpc_id: vpc_id.to_string(),
                cidr: cidr.to_string(),
                availability_zone: availability_zone.to_string(),
            },
        );
        state.record(format!("create_subnet {} {name}", self.region));
        Ok(id)
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("delete_subnet", &self.region, ResourceKind::Subnet)?;
        if !state.subnets.contains_key(subnet_id) {
            return Err(CloudError::not_found(ResourceKind::Subnet, subnet_id));
        }
        let blocked = state
            .instances
            .values()
            .any(|i| i.subnet_id == subnet_id && i.state.is_live());
        if blocked {
            return Err(CloudError::violation(
                ResourceKind::Subnet,
                subnet_id,
                "subnet still has instances",
            ));
        }
        state.subnets.remove(subnet_id);
        state.record(format!("delete_subnet {} {subnet_id}", self.region));
        Ok(())
    }

    async fn first_availability_zone(&self) -> Result<String> {
        let _ = self.lock();
        Ok(format!("{}a", self.region))
    }

    async fn find_internet_gateway(&self, name: &str) -> Result<Option<IgwInfo>> {
        let state = self.lock();
        Ok(state
            .igws
            .iter()
            .find(|(_, g)| g.region == self.region && g.name == name)
            .map(|(id, g)| IgwInfo {
                id: id.clone(),
                attached_vpc: g.attached_vpc.clone(),
            }))
    }

    async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        let mut state = self.lock();
        state.take_failure(
            "create_internet_gateway",
            &self.region,
            ResourceKind::InternetGateway,
        )?;
        let id = state.next_id("igw");
        state.igws.insert(
            id.clone(),
            MockIgw {
                region: self.region.clone(),
                name: name.to_string(),
                attached_vpc: None,
            },
        );
        state.record(format!("create_internet_gateway {} {name}", self.region));
        Ok(id)
    }

    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        let Some(igw) = state.igws.get_mut(igw_id) else {
            return Err(CloudError::not_found(ResourceKind::InternetGateway, igw_id));
        };
        if igw.attached_vpc.is_some() {
            return Err(CloudError::rejected(
                ResourceKind::InternetGateway,
                igw_id,
                Some("Resource.AlreadyAssociated".to_string()),
                "gateway is already attached",
            ));
        }
        igw.attached_vpc = Some(vpc_id.to_string());
        state.record(format!("attach_internet_gateway {} {igw_id}", self.region));
        Ok(())
    }

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(igw) = state.igws.get_mut(igw_id) else {
            return Err(CloudError::not_found(ResourceKind::InternetGateway, igw_id));
        };
        if igw.attached_vpc.as_deref() != Some(vpc_id) {
            return Err(CloudError::rejected(
                ResourceKind::InternetGateway,
                igw_id,
                Some("Gateway.NotAttached".to_string()),
                "gateway is not attached to that vpc",
            ));
        }
        igw.attached_vpc = None;
        state.record(format!("detach_internet_gateway {} {igw_id}", self.region));
        Ok(())
    }

    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(igw) = state.igws.get(igw_id) else {
            return Err(CloudError::not_found(ResourceKind::InternetGateway, igw_id));
        };
        if igw.attached_vpc.is_some() {
            return Err(CloudError::violation(
                ResourceKind::InternetGateway,
                igw_id,
                "gateway is still attached",
            ));
        }
        state.igws.remove(igw_id);
        state.record(format!("delete_internet_gateway {} {igw_id}", self.region));
        Ok(())
    }

    async fn find_route_table(&self, name: &str) -> Result<Option<RouteTableInfo>> {
        let state = self.lock();
        Ok(state
            .route_tables
            .iter()
            .find(|(_, rt)| rt.region == self.region && rt.name == name)
            .map(|(id, rt)| RouteTableInfo {
                id: id.clone(),
                routes: rt
                    .routes
                    .iter()
                    .map(|(destination, target)| RouteInfo {
                        destination: destination.clone(),
                        target: target.clone(),
                    })
                    .collect(),
                associations: rt
                    .associations
                    .iter()
                    .map(|(id, subnet_id)| RouteTableAssociation {
                        id: id.clone(),
                        subnet_id: subnet_id.clone(),
                    })
                    .collect(),
            }))
    }

    async fn create_route_table(&self, name: &str, vpc_id: &str) -> Result<String> {
        let mut state = self.lock();
        state.take_failure("create_route_table", &self.region, ResourceKind::RouteTable)?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        let id = state.next_id("rtb");
        state.route_tables.insert(
            id.clone(),
            MockRouteTable {
                region: self.region.clone(),
                name: name.to_string(),
                vpc_id: vpc_id.to_string(),
                routes: Vec::new(),
                associations: Vec::new(),
            },
        );
        state.record(format!("create_route_table {} {name}", self.region));
        Ok(id)
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        let mut state = self.lock();
        if !state.subnets.contains_key(subnet_id) {
            return Err(CloudError::not_found(ResourceKind::Subnet, subnet_id));
        }
        let assoc_id = state.next_id("rtbassoc");
        let Some(rt) = state.route_tables.get_mut(route_table_id) else {
            return Err(CloudError::not_found(
                ResourceKind::RouteTable,
                route_table_id,
            ));
        };
        rt.associations
            .push((assoc_id.clone(), subnet_id.to_string()));
        state.record(format!(
            "associate_route_table {} {route_table_id} {subnet_id}",
            self.region
        ));
        Ok(assoc_id)
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(rt) = state
            .route_tables
            .values_mut()
            .find(|rt| rt.associations.iter().any(|(id, _)| id == association_id))
        else {
            return Err(CloudError::not_found(
                ResourceKind::RouteTable,
                association_id,
            ));
        };
        rt.associations.retain(|(id, _)| id != association_id);
        state.record(format!(
            "disassociate_route_table {} {association_id}",
            self.region
        ));
        Ok(())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(rt) = state.route_tables.get(route_table_id) else {
            return Err(CloudError::not_found(
                ResourceKind::RouteTable,
                route_table_id,
            ));
        };
        if !rt.associations.is_empty() {
            return Err(CloudError::violation(
                ResourceKind::RouteTable,
                route_table_id,
                "route table still has associations",
            ));
        }
        state.route_tables.remove(route_table_id);
        state.record(format!("delete_route_table {} {route_table_id}", self.region));
        Ok(())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("create_route", &self.region, ResourceKind::Route)?;
        // ピアリング宛てのルートは接続が active でなければ拒否される
        if let RouteTarget::PeeringConnection(peering_id) = target {
            match state.peerings.get(peering_id) {
                None => {
                    return Err(CloudError::rejected(
                        ResourceKind::Route,
                        destination,
                        Some("InvalidVpcPeeringConnectionID.NotFound".to_string()),
                        format!("peering connection {peering_id} does not exist"),
                    ));
                }
                Some(p) if !p.state.is_active() => {
                    return Err(CloudError::rejected(
                        ResourceKind::Route,
                        destination,
                        Some("InvalidVpcPeeringConnectionID.NotFound".to_string()),
                        format!(
                            "peering connection {peering_id} is {} (must be active)",
                            p.state
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        let target_label = match target {
            RouteTarget::InternetGateway(id) => id.clone(),
            RouteTarget::PeeringConnection(id) => id.clone(),
            RouteTarget::Local => "local".to_string(),
            RouteTarget::Other(id) => id.clone(),
        };
        let Some(rt) = state.route_tables.get_mut(route_table_id) else {
            return Err(CloudError::not_found(
                ResourceKind::RouteTable,
                route_table_id,
            ));
        };
        if rt.routes.iter().any(|(dest, _)| dest == destination) {
            return Err(CloudError::rejected(
                ResourceKind::Route,
                destination,
                Some("RouteAlreadyExists".to_string()),
                "a route for that destination already exists",
            ));
        }
        rt.routes.push((destination.to_string(), target.clone()));
        state.record(format!(
            "create_route {} {route_table_id} {destination} {target_label}",
            self.region
        ));
        Ok(())
    }

    async fn delete_route(&self, route_table_id: &str, destination: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(rt) = state.route_tables.get_mut(route_table_id) else {
            return Err(CloudError::not_found(
                ResourceKind::RouteTable,
                route_table_id,
            ));
        };
        let before = rt.routes.len();
        rt.routes.retain(|(dest, _)| dest != destination);
        if rt.routes.len() == before {
            return Err(CloudError::not_found(ResourceKind::Route, destination));
        }
        state.record(format!(
            "delete_route {} {route_table_id} {destination}",
            self.region
        ));
        Ok(())
    }

    async fn find_peering(&self, name: &str) -> Result<Option<PeeringInfo>> {
        let state = self.lock();
        // クロスリージョンのピアリングは両端のリージョンからしか見えない
        Ok(state
            .peerings
            .iter()
            .find(|(_, p)| {
                (p.requester_region == self.region || p.accepter_region == self.region)
                    && p.name == name
                    && !p.state.is_gone()
            })
            .map(|(id, p)| PeeringInfo {
                id: id.clone(),
                requester_vpc_id: p.requester_vpc.clone(),
                accepter_vpc_id: p.accepter_vpc.clone(),
                state: p.state,
            }))
    }

    async fn request_peering(
        &self,
        name: &str,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
    ) -> Result<String> {
        let mut state = self.lock();
        state.take_failure(
            "request_peering",
            &self.region,
            ResourceKind::PeeringConnection,
        )?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        let id = state.next_id("pcx");
        state.peerings.insert(
            id.clone(),
            MockPeering {
                name: name.to_string(),
                requester_region: self.region.clone(),
                accepter_region: peer_region.to_string(),
                requester_vpc: vpc_id.to_string(),
                accepter_vpc: peer_vpc_id.to_string(),
                state: PeeringState::PendingAcceptance,
                visibility_ticks: 1,
                provisioning_ticks: 0,
            },
        );
        state.record(format!("request_peering {} {name}", self.region));
        Ok(id)
    }

    async fn describe_peering(&self, peering_id: &str) -> Result<Option<PeeringInfo>> {
        let mut state = self.lock();
        let region = self.region.clone();
        let Some(p) = state.peerings.get_mut(peering_id) else {
            return Ok(None);
        };
        // クロスリージョン伝搬: アクセプター側にはすぐには見えない
        if p.accepter_region == region && p.visibility_ticks > 0 {
            p.visibility_ticks -= 1;
            return Ok(None);
        }
        if p.state == PeeringState::Provisioning {
            if p.provisioning_ticks > 0 {
                p.provisioning_ticks -= 1;
            } else {
                p.state = PeeringState::Active;
            }
        }
        Ok(Some(PeeringInfo {
            id: peering_id.to_string(),
            requester_vpc_id: p.requester_vpc.clone(),
            accepter_vpc_id: p.accepter_vpc.clone(),
            state: p.state,
        }))
    }

    async fn accept_peering(&self, peering_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(
            "accept_peering",
            &self.region,
            ResourceKind::PeeringConnection,
        )?;
        let region = self.region.clone();
        let Some(p) = state.peerings.get_mut(peering_id) else {
            return Err(CloudError::not_found(
                ResourceKind::PeeringConnection,
                peering_id,
            ));
        };
        if p.accepter_region != region {
            return Err(CloudError::rejected(
                ResourceKind::PeeringConnection,
                peering_id,
                Some("OperationNotPermitted".to_string()),
                "accept must be called from the accepter region",
            ));
        }
        if p.state != PeeringState::PendingAcceptance {
            return Err(CloudError::rejected(
                ResourceKind::PeeringConnection,
                peering_id,
                Some("InvalidStateTransition".to_string()),
                format!("cannot accept a connection in state {}", p.state),
            ));
        }
        p.state = PeeringState::Provisioning;
        p.provisioning_ticks = 1;
        state.record(format!("accept_peering {region} {peering_id}"));
        Ok(())
    }

    async fn delete_peering(&self, peering_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(
            "delete_peering",
            &self.region,
            ResourceKind::PeeringConnection,
        )?;
        let Some(p) = state.peerings.get_mut(peering_id) else {
            return Err(CloudError::not_found(
                ResourceKind::PeeringConnection,
                peering_id,
            ));
        };
        p.state = PeeringState::Deleted;
        state.record(format!("delete_peering {} {peering_id}", self.region));
        Ok(())
    }

    async fn find_security_group(&self, name: &str) -> Result<Option<SgInfo>> {
        let state = self.lock();
        Ok(state
            .security_groups
            .iter()
            .find(|(_, sg)| sg.region == self.region && sg.name == name)
            .map(|(id, sg)| SgInfo {
                id: id.clone(),
                vpc_id: sg.vpc_id.clone(),
            }))
    }

    async fn create_security_group(
        &self,
        name: &str,
        vpc_id: &str,
        _description: &str,
    ) -> Result<String> {
        let mut state = self.lock();
        state.take_failure(
            "create_security_group",
            &self.region,
            ResourceKind::SecurityGroup,
        )?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(CloudError::not_found(ResourceKind::Vpc, vpc_id));
        }
        let id = state.next_id("sg");
        state.security_groups.insert(
            id.clone(),
            MockSg {
                region: self.region.clone(),
                name: name.to_string(),
                vpc_id: vpc_id.to_string(),
                rules: Vec::new(),
            },
        );
        state.record(format!("create_security_group {} {name}", self.region));
        Ok(id)
    }

    async fn authorize_ingress(&self, sg_id: &str, rules: &[SgRule]) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(
            "authorize_ingress",
            &self.region,
            ResourceKind::SecurityGroup,
        )?;
        let Some(sg) = state.security_groups.get_mut(sg_id) else {
            return Err(CloudError::not_found(ResourceKind::SecurityGroup, sg_id));
        };
        // 重複ルールは黙って無視する (実プロバイダの Duplicate 許容に合わせる)
        for rule in rules {
            if !sg.rules.contains(rule) {
                sg.rules.push(rule.clone());
            }
        }
        state.record(format!("authorize_ingress {} {sg_id}", self.region));
        Ok(())
    }

    async fn delete_security_group(&self, sg_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(
            "delete_security_group",
            &self.region,
            ResourceKind::SecurityGroup,
        )?;
        if !state.security_groups.contains_key(sg_id) {
            return Err(CloudError::not_found(ResourceKind::SecurityGroup, sg_id));
        }
        let blocked = state
            .instances
            .values()
            .any(|i| i.security_group_id == sg_id && i.state.is_live());
        if blocked {
            return Err(CloudError::violation(
                ResourceKind::SecurityGroup,
                sg_id,
                "security group is still in use by an instance",
            ));
        }
        state.security_groups.remove(sg_id);
        state.record(format!("delete_security_group {} {sg_id}", self.region));
        Ok(())
    }

    async fn find_instance(&self, name: &str) -> Result<Option<InstanceInfo>> {
        let state = self.lock();
        Ok(state
            .instances
            .iter()
            .find(|(_, i)| i.region == self.region && i.name == name && i.state.is_live())
            .map(|(id, i)| InstanceInfo {
                id: id.clone(),
                state: i.state.clone(),
                public_ip: Some(i.public_ip.clone()),
                private_ip: Some(i.private_ip.clone()),
            }))
    }

    async fn latest_image(&self, _owner: &str, _name_pattern: &str) -> Result<String> {
        let _ = self.lock();
        Ok(format!("ami-mock-{}", self.region))
    }

    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String> {
        let mut state = self.lock();
        state.take_failure("run_instance", &self.region, ResourceKind::Instance)?;
        let Some(subnet) = state.subnets.get(&request.subnet_id) else {
            return Err(CloudError::not_found(
                ResourceKind::Subnet,
                &request.subnet_id,
            ));
        };
        // サブネット CIDR 先頭 3 オクテットからプライベート IP を採番する
        let subnet_base = subnet
            .cidr
            .rsplit_once('.')
            .map(|(head, _)| head.to_string())
            .unwrap_or_default();
        if !state
            .security_groups
            .contains_key(&request.security_group_id)
        {
            return Err(CloudError::not_found(
                ResourceKind::SecurityGroup,
                &request.security_group_id,
            ));
        }
        let id = state.next_id("i");
        let public_ip = format!("203.0.113.{}", state.counter);
        let private_ip = format!("{subnet_base}.{}", 10 + state.counter % 240);
        state.instances.insert(
            id.clone(),
            MockInstance {
                region: self.region.clone(),
                name: request.name.clone(),
                subnet_id: request.subnet_id.clone(),
                security_group_id: request.security_group_id.clone(),
                state: InstanceState::Pending,
                ticks: 1,
                public_ip,
                private_ip,
            },
        );
        state.record(format!("run_instance {} {}", self.region, request.name));
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        let mut state = self.lock();
        let Some(i) = state.instances.get_mut(instance_id) else {
            return Ok(None);
        };
        if i.ticks > 0 {
            i.ticks -= 1;
        } else if i.state == InstanceState::Pending {
            i.state = InstanceState::Running;
        } else if i.state == InstanceState::ShuttingDown {
            i.state = InstanceState::Terminated;
        }
        Ok(Some(InstanceInfo {
            id: instance_id.to_string(),
            state: i.state.clone(),
            public_ip: Some(i.public_ip.clone()),
            private_ip: Some(i.private_ip.clone()),
        }))
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("terminate_instance", &self.region, ResourceKind::Instance)?;
        let Some(i) = state.instances.get_mut(instance_id) else {
            return Err(CloudError::not_found(ResourceKind::Instance, instance_id));
        };
        i.state = InstanceState::ShuttingDown;
        i.ticks = 1;
        state.record(format!("terminate_instance {} {instance_id}", self.region));
        Ok(())
    }
}
