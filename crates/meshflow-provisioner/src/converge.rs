//! 収束ワークフロー
//!
//! 各フェーズは「名前で探す → なければ作る → 使える状態になるまで待つ」
//! の繰り返しで、途中で止まっても次回の converge が続きを拾える。
//! ピアリング接続が active になる前にルートを敷くことは決してない。

use std::collections::{BTreeMap, BTreeSet};

use futures_util::future::join_all;
use meshflow_cloud::{
    CloudError, InstanceInfo, PeeringInfo, PeeringState, RegionClient, ResourceKind, RouteTarget,
    RunInstanceRequest, SgRule, wait_until,
};
use meshflow_core::{RegionSpec, WaitConfig, validate};
use tracing::{debug, info, warn};

use crate::error::{CloudResult, ProvisionError, Result};
use crate::names;
use crate::provisioner::Provisioner;
use crate::report::{MeshReport, PeeringReport};

/// フェーズ 1 が確立するリージョン基盤のリソース ID。
struct RegionNet {
    vpc_id: String,
    subnet_id: String,
    availability_zone: String,
    igw_id: String,
    route_table_id: String,
}

struct InstanceOutcome {
    id: String,
    public_ip: Option<String>,
    private_ip: Option<String>,
}

impl<C: RegionClient> Provisioner<C> {
    /// トポロジを spec に収束させる。
    ///
    /// 冪等: 既存リソースは名前タグで照合して再利用し、足りないものだけを
    /// 作成する。検証に失敗した場合はクラウド API を一度も呼ばずに返る。
    /// 一部のユニットが失敗した場合は `ProvisionError::Partial` が成功分の
    /// レポートを持ち帰る。
    pub async fn converge(&self) -> Result<MeshReport> {
        validate(&self.spec)?;

        let mesh = self.spec.name.clone();
        info!(
            mesh = %mesh,
            regions = self.spec.regions.len(),
            pairs = self.spec.region_pairs().len(),
            "メッシュの収束を開始"
        );

        let mut report = MeshReport::new(&mesh);
        let mut first_err: Option<CloudError> = None;

        let mut targets: Vec<(&RegionSpec, &C)> = Vec::new();
        for region in &self.spec.regions {
            targets.push((region, self.client(&region.name)?));
        }

        // フェーズ 1: リージョン基盤を並行構築
        let net_results = join_all(targets.iter().copied().map(|(region, client)| async move {
            (
                region.name.clone(),
                self.ensure_region_net(client, region).await,
            )
        }))
        .await;

        let mut nets: BTreeMap<String, RegionNet> = BTreeMap::new();
        for (region, result) in net_results {
            match result {
                Ok(net) => {
                    let entry = report.region_mut(&region);
                    entry.vpc_id = Some(net.vpc_id.clone());
                    entry.subnet_id = Some(net.subnet_id.clone());
                    entry.availability_zone = Some(net.availability_zone.clone());
                    entry.internet_gateway_id = Some(net.igw_id.clone());
                    entry.route_table_id = Some(net.route_table_id.clone());
                    nets.insert(region, net);
                }
                Err(e) => {
                    warn!(region = %region, error = %e, "リージョン基盤の構築に失敗");
                    first_err.get_or_insert(e);
                }
            }
        }
        // 基盤が欠けたままピアリングへ進んでも失敗を重ねるだけなので打ち切る
        if let Some(source) = first_err.take() {
            return Err(ProvisionError::Partial {
                report: Box::new(report),
                source,
            });
        }

        // フェーズ 2〜3 (ピアリング + ルート) とフェーズ 4 (SG) は独立に走る
        let peering_task = async {
            let mut futures = Vec::new();
            for (a, b) in self.spec.region_pairs() {
                let (Some(requester), Some(accepter)) =
                    (self.clients.get(&a.name), self.clients.get(&b.name))
                else {
                    continue;
                };
                let (Some(net_a), Some(net_b)) = (nets.get(&a.name), nets.get(&b.name)) else {
                    continue;
                };
                futures.push(async move {
                    (
                        (a.name.clone(), b.name.clone()),
                        self.ensure_peering(requester, accepter, a, b, net_a, net_b)
                            .await,
                    )
                });
            }
            join_all(futures).await
        };

        let sg_task = async {
            join_all(self.spec.regions.iter().filter_map(|region| {
                let client = self.clients.get(&region.name)?;
                let net = nets.get(&region.name)?;
                Some(async move {
                    (
                        region.name.clone(),
                        self.ensure_security_group(client, region, net).await,
                    )
                })
            }))
            .await
        };

        let (peering_results, sg_results) = tokio::join!(peering_task, sg_task);

        let mut peering_ok: BTreeSet<(String, String)> = BTreeSet::new();
        for ((a, b), result) in peering_results {
            match result {
                Ok(peering) => {
                    peering_ok.insert((a, b));
                    report.peerings.push(peering);
                }
                Err(e) => {
                    warn!(requester = %a, accepter = %b, error = %e, "ピアリングの収束に失敗");
                    first_err.get_or_insert(e);
                }
            }
        }

        let mut sgs: BTreeMap<String, String> = BTreeMap::new();
        for (region, result) in sg_results {
            match result {
                Ok(sg_id) => {
                    report.region_mut(&region).security_group_id = Some(sg_id.clone());
                    sgs.insert(region, sg_id);
                }
                Err(e) => {
                    warn!(region = %region, error = %e, "セキュリティグループの整備に失敗");
                    first_err.get_or_insert(e);
                }
            }
        }

        // フェーズ 5: 接しているピアリングがすべて active になったリージョン
        // だけインスタンスを起動する
        let mut launch_futures = Vec::new();
        for (region, client) in targets.iter().copied() {
            let touching_ok = self
                .spec
                .region_pairs()
                .iter()
                .filter(|(a, b)| a.name == region.name || b.name == region.name)
                .all(|(a, b)| peering_ok.contains(&(a.name.clone(), b.name.clone())));
            if !touching_ok {
                warn!(region = %region.name, "未収束のピアリングがあるため起動を見送り");
                continue;
            }
            let (Some(net), Some(sg_id)) = (nets.get(&region.name), sgs.get(&region.name)) else {
                // SG が失敗したリージョン。エラーは記録済み
                continue;
            };
            launch_futures.push(async move {
                (
                    region.name.clone(),
                    self.ensure_instance(client, region, net, sg_id).await,
                )
            });
        }
        for (region, result) in join_all(launch_futures).await {
            match result {
                Ok(outcome) => {
                    let entry = report.region_mut(&region);
                    entry.instance_id = Some(outcome.id);
                    entry.public_ip = outcome.public_ip;
                    entry.private_ip = outcome.private_ip;
                }
                Err(e) => {
                    warn!(region = %region, error = %e, "インスタンスの起動に失敗");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            None => {
                info!(mesh = %mesh, "メッシュは収束しました");
                Ok(report)
            }
            Some(source) => Err(ProvisionError::Partial {
                report: Box::new(report),
                source,
            }),
        }
    }

    /// VPC / サブネット / IGW / ルートテーブル (デフォルトルートと関連付け
    /// 込み) を 1 リージョン分そろえる。
    async fn ensure_region_net(&self, client: &C, region: &RegionSpec) -> CloudResult<RegionNet> {
        let mesh = &self.spec.name;
        let wait = self.wait();

        let vpc_name = names::vpc(mesh, &region.name);
        let vpc_id = match client.find_vpc(&vpc_name).await? {
            Some(vpc) => {
                debug!(region = %region.name, vpc = %vpc.id, "既存の VPC を再利用");
                vpc.id
            }
            None => {
                info!(region = %region.name, cidr = %region.vpc_cidr, "VPC を作成");
                client
                    .create_vpc(&vpc_name, &region.vpc_cidr.to_string())
                    .await?
            }
        };
        {
            let name = vpc_name.clone();
            wait_until(&format!("vpc {vpc_id} available"), wait, move || {
                let name = name.clone();
                async move {
                    Ok(client
                        .find_vpc(&name)
                        .await?
                        .filter(|vpc| vpc.state == "available")
                        .map(|_| ()))
                }
            })
            .await?;
        }

        let subnet_name = names::subnet(mesh, &region.name);
        let (subnet_id, availability_zone) = match client.find_subnet(&subnet_name).await? {
            Some(subnet) => (subnet.id, subnet.availability_zone),
            None => {
                // サブネットは各リージョンの最初の AZ に置く
                let zone = client.first_availability_zone().await?;
                info!(region = %region.name, zone = %zone, cidr = %region.subnet_cidr, "サブネットを作成");
                let id = client
                    .create_subnet(&subnet_name, &vpc_id, &region.subnet_cidr.to_string(), &zone)
                    .await?;
                (id, zone)
            }
        };

        let igw_name = names::internet_gateway(mesh, &region.name);
        let igw_id = match client.find_internet_gateway(&igw_name).await? {
            Some(igw) => {
                if igw.attached_vpc.is_none() {
                    client.attach_internet_gateway(&igw.id, &vpc_id).await?;
                }
                igw.id
            }
            None => {
                info!(region = %region.name, "インターネットゲートウェイを作成");
                let id = client.create_internet_gateway(&igw_name).await?;
                client.attach_internet_gateway(&id, &vpc_id).await?;
                id
            }
        };

        let rt_name = names::route_table(mesh, &region.name);
        let (route_table_id, has_default_route, has_association) =
            match client.find_route_table(&rt_name).await? {
                Some(rt) => {
                    let has_default = rt.routes.iter().any(|r| r.destination == "0.0.0.0/0");
                    let associated = rt.associations.iter().any(|a| a.subnet_id == subnet_id);
                    (rt.id, has_default, associated)
                }
                None => {
                    info!(region = %region.name, "ルートテーブルを作成");
                    let id = client.create_route_table(&rt_name, &vpc_id).await?;
                    (id, false, false)
                }
            };
        if !has_default_route {
            client
                .create_route(
                    &route_table_id,
                    "0.0.0.0/0",
                    &RouteTarget::InternetGateway(igw_id.clone()),
                )
                .await?;
        }
        if !has_association {
            client
                .associate_route_table(&route_table_id, &subnet_id)
                .await?;
        }

        Ok(RegionNet {
            vpc_id,
            subnet_id,
            availability_zone,
            igw_id,
            route_table_id,
        })
    }

    /// 1 ペア分のピアリングを収束させる。
    ///
    /// 要求は常にリクエスター (ペアの設定順で先のリージョン) 側から行い、
    /// アクセプター側で承認する。双方向ルートは接続が active になったのを
    /// 確認してからでないと敷かない。
    async fn ensure_peering(
        &self,
        requester: &C,
        accepter: &C,
        a: &RegionSpec,
        b: &RegionSpec,
        net_a: &RegionNet,
        net_b: &RegionNet,
    ) -> CloudResult<PeeringReport> {
        let mesh = &self.spec.name;
        let wait = self.wait();
        let name = names::peering(mesh, &a.name, &b.name);

        let peering_id = match requester.find_peering(&name).await? {
            Some(p) if p.state.is_failed() => {
                // rejected / failed / expired からは復帰できない
                return Err(CloudError::InvalidState {
                    kind: ResourceKind::PeeringConnection,
                    name: name.clone(),
                    state: p.state.to_string(),
                });
            }
            Some(p) => {
                debug!(peering = %p.id, state = %p.state, "既存のピアリング接続を再利用");
                p.id
            }
            None => {
                info!(requester = %a.name, accepter = %b.name, "ピアリング接続を要求");
                requester
                    .request_peering(&name, &net_a.vpc_id, &net_b.vpc_id, &b.name)
                    .await?
            }
        };

        // クロスリージョンの接続はアクセプター側に見えるまで少し掛かる
        let visible = await_peering(
            accepter,
            &peering_id,
            format!("peering {peering_id} acceptable in {}", b.name),
            wait,
            |state| {
                state.is_pending_acceptance()
                    || state.is_active()
                    || matches!(state, PeeringState::Provisioning)
            },
        )
        .await?;

        if visible.state.is_pending_acceptance() {
            info!(peering = %peering_id, region = %b.name, "ピアリング接続を承認");
            accepter.accept_peering(&peering_id).await?;
        }

        // active の確認が取れてからルートを敷く
        await_peering(
            requester,
            &peering_id,
            format!("peering {peering_id} active"),
            wait,
            |state| state.is_active(),
        )
        .await?;

        let rt_name_a = names::route_table(mesh, &a.name);
        ensure_peering_route(
            requester,
            &rt_name_a,
            &net_a.route_table_id,
            &b.vpc_cidr.to_string(),
            &peering_id,
        )
        .await?;
        let rt_name_b = names::route_table(mesh, &b.name);
        ensure_peering_route(
            accepter,
            &rt_name_b,
            &net_b.route_table_id,
            &a.vpc_cidr.to_string(),
            &peering_id,
        )
        .await?;

        Ok(PeeringReport {
            name,
            id: peering_id,
            requester_region: a.name.clone(),
            accepter_region: b.name.clone(),
        })
    }

    /// メッシュ内トラフィック (ICMP + 全 TCP) と SSH を許可する SG をそろえる。
    async fn ensure_security_group(
        &self,
        client: &C,
        region: &RegionSpec,
        net: &RegionNet,
    ) -> CloudResult<String> {
        let name = names::security_group(&self.spec.name, &region.name);
        let sg_id = match client.find_security_group(&name).await? {
            Some(sg) => {
                debug!(region = %region.name, sg = %sg.id, "既存のセキュリティグループを再利用");
                sg.id
            }
            None => {
                info!(region = %region.name, "セキュリティグループを作成");
                client
                    .create_security_group(&name, &net.vpc_id, "meshflow: intra-mesh traffic + ssh")
                    .await?
            }
        };

        let mut rules = vec![SgRule::ssh_anywhere()];
        for peer in self.spec.peers_of(&region.name) {
            rules.push(SgRule::icmp_from(
                peer.vpc_cidr.to_string(),
                format!("icmp from {}", peer.name),
            ));
            rules.push(SgRule::all_tcp_from(
                peer.vpc_cidr.to_string(),
                format!("tcp from {}", peer.name),
            ));
        }
        // 既存ルールと重複しても authorize は冪等に成功する
        client.authorize_ingress(&sg_id, &rules).await?;
        Ok(sg_id)
    }

    /// ノードインスタンスを 1 台そろえ、running まで待つ。
    async fn ensure_instance(
        &self,
        client: &C,
        region: &RegionSpec,
        net: &RegionNet,
        sg_id: &str,
    ) -> CloudResult<InstanceOutcome> {
        let wait = self.wait();
        let name = names::instance(&self.spec.name, &region.name);

        if let Some(info) = client.find_instance(&name).await? {
            if info.state.is_running() {
                debug!(region = %region.name, instance = %info.id, "既存のインスタンスを再利用");
                return Ok(InstanceOutcome {
                    id: info.id,
                    public_ip: info.public_ip,
                    private_ip: info.private_ip,
                });
            }
            // 起動途中のものは running まで待つだけでよい
            let info = wait_running(client, &info.id, wait).await?;
            return Ok(InstanceOutcome {
                id: info.id,
                public_ip: info.public_ip,
                private_ip: info.private_ip,
            });
        }

        let image = &self.spec.instance.image;
        let image_id = client.latest_image(&image.owner, &image.name).await?;
        info!(
            region = %region.name,
            image = %image_id,
            instance_type = %self.spec.instance.instance_type,
            "インスタンスを起動"
        );
        let request = RunInstanceRequest {
            name: name.clone(),
            image_id,
            instance_type: self.spec.instance.instance_type.clone(),
            subnet_id: net.subnet_id.clone(),
            security_group_id: sg_id.to_string(),
            key_name: region.key_name.clone(),
            user_data: self.spec.instance.user_data.clone(),
        };
        let instance_id = client.run_instance(&request).await?;
        let info = wait_running(client, &instance_id, wait).await?;
        Ok(InstanceOutcome {
            id: info.id,
            public_ip: info.public_ip,
            private_ip: info.private_ip,
        })
    }
}

/// ピアリング接続の状態が `ready` を満たすまで待つ。
/// 失敗系の状態 (rejected / failed / expired) を見たら即座にエラー。
async fn await_peering<C: RegionClient>(
    client: &C,
    peering_id: &str,
    what: String,
    wait: &WaitConfig,
    ready: fn(PeeringState) -> bool,
) -> CloudResult<PeeringInfo> {
    let id = peering_id.to_string();
    wait_until(&what, wait, move || {
        let id = id.clone();
        async move {
            match client.describe_peering(&id).await? {
                Some(p) if p.state.is_failed() => Err(CloudError::InvalidState {
                    kind: ResourceKind::PeeringConnection,
                    name: id,
                    state: p.state.to_string(),
                }),
                Some(p) if ready(p.state) => Ok(Some(p)),
                _ => Ok(None),
            }
        }
    })
    .await
}

/// 宛先 CIDR → ピアリング接続のルートを冪等に敷く。
/// 削除済みの接続を向いたまま残っているルートは張り替える。
async fn ensure_peering_route<C: RegionClient>(
    client: &C,
    rt_name: &str,
    route_table_id: &str,
    destination: &str,
    peering_id: &str,
) -> CloudResult<()> {
    if let Some(rt) = client.find_route_table(rt_name).await?
        && let Some(route) = rt.routes.iter().find(|r| r.destination == destination)
    {
        match &route.target {
            RouteTarget::PeeringConnection(id) if id == peering_id => return Ok(()),
            _ => {
                debug!(route_table = %route_table_id, destination = %destination, "古いルートを張り替え");
                client.delete_route(route_table_id, destination).await?;
            }
        }
    }
    client
        .create_route(
            route_table_id,
            destination,
            &RouteTarget::PeeringConnection(peering_id.to_string()),
        )
        .await
}

/// インスタンスが running になるまで待つ。terminated を見たら即エラー。
async fn wait_running<C: RegionClient>(
    client: &C,
    instance_id: &str,
    wait: &WaitConfig,
) -> CloudResult<InstanceInfo> {
    let id = instance_id.to_string();
    wait_until(&format!("instance {instance_id} running"), wait, move || {
        let id = id.clone();
        async move {
            match client.describe_instance(&id).await? {
                Some(info) if info.state.is_running() => Ok(Some(info)),
                Some(info) if info.state.is_terminated() => Err(CloudError::InvalidState {
                    kind: ResourceKind::Instance,
                    name: id,
                    state: info.state.to_string(),
                }),
                _ => Ok(None),
            }
        }
    })
    .await
}
