//! ステータス取得
//!
//! 名前タグで各リソースを引き、観測できたものだけを報告する。
//! 読み取り専用で、リソースの作成や変更は一切行わない。

use chrono::Utc;
use futures_util::future::join_all;
use meshflow_cloud::RegionClient;
use meshflow_core::RegionSpec;
use tracing::debug;

use crate::error::{CloudResult, Result};
use crate::names;
use crate::provisioner::Provisioner;
use crate::report::{MeshStatus, PeeringStatus, RegionStatus};

impl<C: RegionClient> Provisioner<C> {
    /// メッシュの現状を観測する。
    pub async fn status(&self) -> Result<MeshStatus> {
        let mesh = self.spec.name.clone();
        debug!(mesh = %mesh, "ステータスを取得");

        let mut targets: Vec<(&RegionSpec, &C)> = Vec::new();
        for region in &self.spec.regions {
            targets.push((region, self.client(&region.name)?));
        }

        let regions = join_all(targets.iter().copied().map(|(region, client)| async move {
            self.region_status(client, region).await
        }))
        .await
        .into_iter()
        .collect::<CloudResult<Vec<_>>>()?;

        let mut peering_futures = Vec::new();
        for (a, b) in self.spec.region_pairs() {
            let requester = self.client(&a.name)?;
            peering_futures.push(async move {
                let name = names::peering(&self.spec.name, &a.name, &b.name);
                let found = requester.find_peering(&name).await?;
                Ok(PeeringStatus {
                    name,
                    requester_region: a.name.clone(),
                    accepter_region: b.name.clone(),
                    id: found.as_ref().map(|p| p.id.clone()),
                    state: found.map(|p| p.state),
                })
            });
        }
        let peerings = join_all(peering_futures)
            .await
            .into_iter()
            .collect::<CloudResult<Vec<_>>>()?;

        Ok(MeshStatus {
            mesh,
            checked_at: Utc::now(),
            regions,
            peerings,
        })
    }

    async fn region_status(&self, client: &C, region: &RegionSpec) -> CloudResult<RegionStatus> {
        let mesh = &self.spec.name;
        let mut status = RegionStatus::absent(&region.name);

        if let Some(vpc) = client.find_vpc(&names::vpc(mesh, &region.name)).await? {
            status.vpc_id = Some(vpc.id);
            status.vpc_cidr = Some(vpc.cidr);
        }
        if let Some(subnet) = client.find_subnet(&names::subnet(mesh, &region.name)).await? {
            status.subnet_id = Some(subnet.id);
        }
        if let Some(igw) = client
            .find_internet_gateway(&names::internet_gateway(mesh, &region.name))
            .await?
        {
            status.internet_gateway_id = Some(igw.id);
        }
        if let Some(rt) = client
            .find_route_table(&names::route_table(mesh, &region.name))
            .await?
        {
            status.peering_routes = rt.peering_route_count();
            status.route_table_id = Some(rt.id);
        }
        if let Some(sg) = client
            .find_security_group(&names::security_group(mesh, &region.name))
            .await?
        {
            status.security_group_id = Some(sg.id);
        }
        if let Some(instance) = client.find_instance(&names::instance(mesh, &region.name)).await? {
            status.instance_id = Some(instance.id);
            status.instance_state = Some(instance.state.to_string());
            status.public_ip = instance.public_ip;
            status.private_ip = instance.private_ip;
        }
        Ok(status)
    }
}
