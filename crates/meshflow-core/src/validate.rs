//! トポロジー検証
//!
//! プロビジョニング開始前にメッシュ定義を検証します。
//! ここで弾かれた設定はクラウドAPI呼び出しを一切発生させません。

use crate::error::{MeshError, Result};
use crate::model::MeshSpec;
use tracing::debug;

/// メッシュ定義を検証
///
/// - リージョンが1つ以上あるか
/// - リージョン名の重複
/// - VPCのCIDR同士の重複（全ペア）
/// - サブネットCIDRがVPCのCIDRに含まれているか
pub fn validate(spec: &MeshSpec) -> Result<()> {
    if spec.regions.is_empty() {
        return Err(MeshError::InvalidConfig(
            "at least one region is required".to_string(),
        ));
    }

    for (i, region) in spec.regions.iter().enumerate() {
        if spec.regions[..i].iter().any(|r| r.name == region.name) {
            return Err(MeshError::DuplicateRegion(region.name.clone()));
        }
    }

    for (i, a) in spec.regions.iter().enumerate() {
        for b in &spec.regions[i + 1..] {
            if a.vpc_cidr.overlaps(&b.vpc_cidr) {
                return Err(MeshError::CidrOverlap {
                    a: a.vpc_cidr.to_string(),
                    a_region: a.name.clone(),
                    b: b.vpc_cidr.to_string(),
                    b_region: b.name.clone(),
                });
            }
        }
    }

    for region in &spec.regions {
        if !region.vpc_cidr.contains(&region.subnet_cidr) {
            return Err(MeshError::SubnetOutsideVpc {
                subnet: region.subnet_cidr.to_string(),
                vpc: region.vpc_cidr.to_string(),
                region: region.name.clone(),
            });
        }
    }

    debug!(
        mesh = %spec.name,
        regions = spec.regions.len(),
        pairs = spec.region_pairs().len(),
        "topology validated"
    );
    Ok(())
}
