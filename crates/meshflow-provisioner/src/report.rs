//! 収束レポートとステータス
//!
//! `converge` は作成・確認したリソース ID を `MeshReport` にまとめて返し、
//! `status` は API から観測した現状を `MeshStatus` として返す。どちらも
//! CLI の `--json` 出力にそのままシリアライズされる。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use meshflow_cloud::PeeringState;
use serde::Serialize;

/// converge が構築 (または確認) したトポロジの全リソース。
#[derive(Debug, Clone, Serialize)]
pub struct MeshReport {
    pub mesh: String,
    pub converged_at: DateTime<Utc>,
    /// リージョン名 → そのリージョンのリソース ID 群
    pub regions: BTreeMap<String, RegionReport>,
    pub peerings: Vec<PeeringReport>,
}

impl MeshReport {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            converged_at: Utc::now(),
            regions: BTreeMap::new(),
            peerings: Vec::new(),
        }
    }

    /// リージョンのレポートを取得 (なければ空で作る)。
    pub fn region_mut(&mut self, region: &str) -> &mut RegionReport {
        self.regions.entry(region.to_string()).or_default()
    }
}

/// 1 リージョン分のリソース ID。部分収束では一部が `None` のまま残る。
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

/// 1 ペア分のピアリング接続。
#[derive(Debug, Clone, Serialize)]
pub struct PeeringReport {
    pub name: String,
    pub id: String,
    pub requester_region: String,
    pub accepter_region: String,
}

/// `status` が観測したメッシュの現状。
#[derive(Debug, Clone, Serialize)]
pub struct MeshStatus {
    pub mesh: String,
    pub checked_at: DateTime<Utc>,
    pub regions: Vec<RegionStatus>,
    pub peerings: Vec<PeeringStatus>,
}

impl MeshStatus {
    /// 存在するリソース数と期待リソース数。
    pub fn counts(&self) -> StatusCounts {
        let n = self.regions.len();
        let pairs = self.peerings.len();
        let present = self
            .regions
            .iter()
            .map(|r| r.present_count() + r.peering_routes)
            .sum::<usize>()
            + self.peerings.iter().filter(|p| p.id.is_some()).count();
        // リージョンあたり 6 リソース + ピアリングルート (N-1) 本 + 接続
        let expected = 6 * n + n.saturating_sub(1) * n + pairs;
        StatusCounts { present, expected }
    }

    /// トポロジが完全に収束しているか。
    pub fn is_converged(&self) -> bool {
        let counts = self.counts();
        counts.present == counts.expected
            && self.peerings.iter().all(|p| p.is_active())
            && self
                .regions
                .iter()
                .all(|r| r.instance_state.as_deref() == Some("running"))
    }
}

/// 1 リージョン分の観測結果。存在しないリソースは `None`。
#[derive(Debug, Clone, Serialize)]
pub struct RegionStatus {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table_id: Option<String>,
    /// ピアリング接続を向いているルートの本数
    pub peering_routes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

impl RegionStatus {
    pub fn absent(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            vpc_id: None,
            vpc_cidr: None,
            subnet_id: None,
            internet_gateway_id: None,
            route_table_id: None,
            peering_routes: 0,
            security_group_id: None,
            instance_id: None,
            instance_state: None,
            public_ip: None,
            private_ip: None,
        }
    }

    /// 存在が確認できた主要リソースの数 (VPC / サブネット / IGW / RT / SG / インスタンス)。
    pub fn present_count(&self) -> usize {
        [
            self.vpc_id.is_some(),
            self.subnet_id.is_some(),
            self.internet_gateway_id.is_some(),
            self.route_table_id.is_some(),
            self.security_group_id.is_some(),
            self.instance_id.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}

/// 1 ペア分のピアリング観測結果。
#[derive(Debug, Clone, Serialize)]
pub struct PeeringStatus {
    pub name: String,
    pub requester_region: String,
    pub accepter_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PeeringState>,
}

impl PeeringStatus {
    pub fn is_active(&self) -> bool {
        self.state.map(|s| s.is_active()).unwrap_or(false)
    }
}

/// 存在/期待リソース数のサマリ。
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub expected: usize,
}
