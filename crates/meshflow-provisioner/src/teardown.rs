//! 削除ワークフロー
//!
//! 構築の厳密な逆順で進む。各ステップは全リージョン (または全ペア) で
//! 完了してから次のステップへ移るので、依存リソースが残ったまま削除を
//! 試みることはない。見つからないリソースは黙って飛ばすため、途中で
//! 失敗しても再実行すれば続きから削除できる。

use std::future::Future;

use futures_util::future::join_all;
use meshflow_cloud::{CloudError, RegionClient, RouteTarget, wait_until};
use meshflow_core::{RegionSpec, WaitConfig};
use tracing::{debug, info, warn};

use crate::error::{CloudResult, ProvisionError, Result};
use crate::names;
use crate::provisioner::Provisioner;

impl<C: RegionClient> Provisioner<C> {
    /// メッシュの全リソースを削除する。
    ///
    /// 順序: インスタンス → SG → ピアリングルート → ピアリング接続 →
    /// ルートテーブル関連付け → ルートテーブル → IGW → サブネット → VPC
    pub async fn teardown(&self) -> Result<()> {
        let mesh = self.spec.name.clone();
        info!(mesh = %mesh, regions = self.spec.regions.len(), "メッシュの削除を開始");

        let mut targets: Vec<(&RegionSpec, &C)> = Vec::new();
        for region in &self.spec.regions {
            targets.push((region, self.client(&region.name)?));
        }
        let mut pair_targets: Vec<(&RegionSpec, &RegionSpec, &C, &C)> = Vec::new();
        for (a, b) in self.spec.region_pairs() {
            pair_targets.push((a, b, self.client(&a.name)?, self.client(&b.name)?));
        }

        // 1. インスタンス
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_instance(client, region).await,
                )
            }))
            .await,
        )?;

        // 2. セキュリティグループ
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_security_group(client, region).await,
                )
            }))
            .await,
        )?;

        // 3. ピアリングルート (接続より先に外す)
        surface(
            join_all(
                pair_targets
                    .iter()
                    .copied()
                    .map(|(a, b, requester, accepter)| async move {
                        (
                            format!("{}-{}", a.name, b.name),
                            self.teardown_peering_routes(requester, accepter, a, b)
                                .await,
                        )
                    }),
            )
            .await,
        )?;

        // 4. ピアリング接続 (削除は片側から一度でよい)
        surface(
            join_all(
                pair_targets
                    .iter()
                    .copied()
                    .map(|(a, b, requester, _)| async move {
                        (
                            format!("{}-{}", a.name, b.name),
                            self.teardown_peering(requester, a, b).await,
                        )
                    }),
            )
            .await,
        )?;

        // 5. ルートテーブルの関連付け
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_associations(client, region).await,
                )
            }))
            .await,
        )?;

        // 6. ルートテーブル
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_route_table(client, region).await,
                )
            }))
            .await,
        )?;

        // 7. インターネットゲートウェイ
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_internet_gateway(client, region).await,
                )
            }))
            .await,
        )?;

        // 8. サブネット
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_subnet(client, region).await,
                )
            }))
            .await,
        )?;

        // 9. VPC
        surface(
            join_all(targets.iter().copied().map(|(region, client)| async move {
                (
                    region.name.clone(),
                    self.teardown_vpc(client, region).await,
                )
            }))
            .await,
        )?;

        info!(mesh = %mesh, "メッシュを削除しました");
        Ok(())
    }

    async fn teardown_instance(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let name = names::instance(&self.spec.name, &region.name);
        let Some(instance) = client.find_instance(&name).await? else {
            debug!(region = %region.name, "インスタンスはすでにない");
            return Ok(());
        };
        info!(region = %region.name, instance = %instance.id, "インスタンスを終了");
        client.terminate_instance(&instance.id).await?;
        // サブネット削除をブロックしないよう terminated まで待つ
        let id = instance.id.clone();
        wait_until(
            &format!("instance {} terminated", instance.id),
            self.wait(),
            move || {
                let id = id.clone();
                async move {
                    match client.describe_instance(&id).await? {
                        None => Ok(Some(())),
                        Some(i) if i.state.is_terminated() => Ok(Some(())),
                        _ => Ok(None),
                    }
                }
            },
        )
        .await
    }

    async fn teardown_security_group(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let name = names::security_group(&self.spec.name, &region.name);
        let Some(sg) = client.find_security_group(&name).await? else {
            debug!(region = %region.name, "セキュリティグループはすでにない");
            return Ok(());
        };
        info!(region = %region.name, sg = %sg.id, "セキュリティグループを削除");
        // ENI の解放が終わるまで DependencyViolation が返ることがある
        let sg_id = &sg.id;
        delete_with_retry(format!("security group {sg_id} deleted"), self.wait(), || {
            client.delete_security_group(sg_id)
        })
        .await
    }

    async fn teardown_peering_routes(
        &self,
        requester: &C,
        accepter: &C,
        a: &RegionSpec,
        b: &RegionSpec,
    ) -> CloudResult<()> {
        let rt_a = names::route_table(&self.spec.name, &a.name);
        remove_peering_route(requester, &rt_a, &b.vpc_cidr.to_string()).await?;
        let rt_b = names::route_table(&self.spec.name, &b.name);
        remove_peering_route(accepter, &rt_b, &a.vpc_cidr.to_string()).await
    }

    async fn teardown_peering(
        &self,
        requester: &C,
        a: &RegionSpec,
        b: &RegionSpec,
    ) -> CloudResult<()> {
        let name = names::peering(&self.spec.name, &a.name, &b.name);
        let Some(peering) = requester.find_peering(&name).await? else {
            debug!(peering = %name, "ピアリング接続はすでにない");
            return Ok(());
        };
        info!(
            peering = %peering.id,
            requester = %a.name,
            accepter = %b.name,
            "ピアリング接続を削除"
        );
        match requester.delete_peering(&peering.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        }
        // 双方の VPC 削除をブロックしないよう、消えるまで待つ
        let id = peering.id.clone();
        wait_until(
            &format!("peering {} deleted", peering.id),
            self.wait(),
            move || {
                let id = id.clone();
                async move {
                    match requester.describe_peering(&id).await? {
                        None => Ok(Some(())),
                        Some(p) if p.state.is_gone() => Ok(Some(())),
                        _ => Ok(None),
                    }
                }
            },
        )
        .await
    }

    async fn teardown_associations(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let rt_name = names::route_table(&self.spec.name, &region.name);
        let Some(rt) = client.find_route_table(&rt_name).await? else {
            return Ok(());
        };
        for assoc in &rt.associations {
            debug!(region = %region.name, association = %assoc.id, "関連付けを解除");
            match client.disassociate_route_table(&assoc.id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn teardown_route_table(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let rt_name = names::route_table(&self.spec.name, &region.name);
        let Some(rt) = client.find_route_table(&rt_name).await? else {
            return Ok(());
        };
        info!(region = %region.name, route_table = %rt.id, "ルートテーブルを削除");
        match client.delete_route_table(&rt.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn teardown_internet_gateway(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let name = names::internet_gateway(&self.spec.name, &region.name);
        let Some(igw) = client.find_internet_gateway(&name).await? else {
            return Ok(());
        };
        if let Some(vpc_id) = &igw.attached_vpc {
            debug!(region = %region.name, igw = %igw.id, "IGW をデタッチ");
            client.detach_internet_gateway(&igw.id, vpc_id).await?;
        }
        info!(region = %region.name, igw = %igw.id, "IGW を削除");
        match client.delete_internet_gateway(&igw.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn teardown_subnet(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let name = names::subnet(&self.spec.name, &region.name);
        let Some(subnet) = client.find_subnet(&name).await? else {
            return Ok(());
        };
        info!(region = %region.name, subnet = %subnet.id, "サブネットを削除");
        let subnet_id = &subnet.id;
        delete_with_retry(format!("subnet {subnet_id} deleted"), self.wait(), || {
            client.delete_subnet(subnet_id)
        })
        .await
    }

    async fn teardown_vpc(&self, client: &C, region: &RegionSpec) -> CloudResult<()> {
        let name = names::vpc(&self.spec.name, &region.name);
        let Some(vpc) = client.find_vpc(&name).await? else {
            debug!(region = %region.name, "VPC はすでにない");
            return Ok(());
        };
        info!(region = %region.name, vpc = %vpc.id, "VPC を削除");
        let vpc_id = &vpc.id;
        delete_with_retry(format!("vpc {vpc_id} deleted"), self.wait(), || {
            client.delete_vpc(vpc_id)
        })
        .await
    }
}

/// ステップ内の全ユニットの結果を集計し、最初の失敗を返す。
/// 残りの失敗はログに出すだけ。
fn surface(results: Vec<(String, CloudResult<()>)>) -> Result<()> {
    let mut first: Option<CloudError> = None;
    for (unit, result) in results {
        if let Err(e) = result {
            warn!(unit = %unit, error = %e, "削除に失敗");
            first.get_or_insert(e);
        }
    }
    match first {
        None => Ok(()),
        Some(e) => Err(ProvisionError::Cloud(e)),
    }
}

/// ピアリング接続を向いたルートがあれば外す。
async fn remove_peering_route<C: RegionClient>(
    client: &C,
    rt_name: &str,
    destination: &str,
) -> CloudResult<()> {
    let Some(rt) = client.find_route_table(rt_name).await? else {
        return Ok(());
    };
    let has_route = rt.routes.iter().any(|r| {
        r.destination == destination && matches!(r.target, RouteTarget::PeeringConnection(_))
    });
    if !has_route {
        return Ok(());
    }
    debug!(route_table = %rt.id, destination = %destination, "ピアリングルートを削除");
    match client.delete_route(&rt.id, destination).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// 依存リソースの解放待ちで DependencyViolation が返る削除を、待機予算の
/// 範囲でリトライする。予算を使い切ったら最後の違反をそのまま返す。
async fn delete_with_retry<F, Fut>(what: String, wait: &WaitConfig, delete: F) -> CloudResult<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = CloudResult<()>>,
{
    let result = wait_until(&what, wait, || {
        let fut = delete();
        async move {
            match fut.await {
                Ok(()) => Ok(Some(())),
                Err(e) if e.is_not_found() => Ok(Some(())),
                Err(e) if e.is_dependency_violation() => Ok(None),
                Err(e) => Err(e),
            }
        }
    })
    .await;
    match result {
        Ok(()) => Ok(()),
        // 予算内に解放されなかった。実際の違反内容で失敗させる
        Err(CloudError::DependencyNotReady { .. }) => delete().await,
        Err(e) => Err(e),
    }
}
