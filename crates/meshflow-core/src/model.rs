//! メッシュトポロジーモデル
//!
//! mesh.kdl で宣言されるリージョン間VPCメッシュの定義。
//! リージョンごとに VPC / サブネット / ゲートウェイ / インスタンスが1つずつ、
//! 全リージョンペアにピアリング接続が張られます（フルメッシュ）。

use crate::cidr::Ipv4Cidr;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// メッシュ定義（mesh.kdl 全体）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshSpec {
    /// メッシュ名（全リソース名とタグのプレフィックス）
    pub name: String,

    /// リージョン定義（記述順 = ピアリングのリクエスター指定順）
    pub regions: Vec<RegionSpec>,

    /// インスタンス設定（全リージョン共通）
    #[serde(default)]
    pub instance: InstanceSpec,

    /// 依存待機の設定
    #[serde(default)]
    pub wait: WaitConfig,
}

impl MeshSpec {
    /// ピアリング対象の全ペア（i < j、記述順）
    ///
    /// ペアの1番目がピアリングのリクエスター側になります。
    pub fn region_pairs(&self) -> Vec<(&RegionSpec, &RegionSpec)> {
        let mut pairs = Vec::new();
        for i in 0..self.regions.len() {
            for j in (i + 1)..self.regions.len() {
                pairs.push((&self.regions[i], &self.regions[j]));
            }
        }
        pairs
    }

    /// 指定リージョン以外の全リージョン
    pub fn peers_of(&self, region: &str) -> Vec<&RegionSpec> {
        self.regions.iter().filter(|r| r.name != region).collect()
    }

    /// リージョン定義を名前で取得
    pub fn region(&self, name: &str) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.name == name)
    }
}

/// リージョン定義
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSpec {
    /// リージョン名（us-east-1 など）
    pub name: String,

    /// VPCのCIDRブロック（他リージョンと重複不可）
    pub vpc_cidr: Ipv4Cidr,

    /// サブネットのCIDRブロック（VPCのCIDR内）
    pub subnet_cidr: Ipv4Cidr,

    /// SSHキーペア名（リージョンごと、省略可）
    pub key_name: Option<String>,
}

/// インスタンス設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// インスタンスタイプ
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// AMI選択フィルタ
    #[serde(default)]
    pub image: ImageFilter,

    /// ブートストラップスクリプトのパス（設定ファイルからの相対）
    pub bootstrap: Option<PathBuf>,

    /// 読み込み済みスクリプト本文（parse_mesh_file が解決）
    ///
    /// 中身は解釈せず、そのままインスタンスのuser dataとして渡されます。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

fn default_instance_type() -> String {
    "t3.micro".to_string()
}

impl Default for InstanceSpec {
    fn default() -> Self {
        Self {
            instance_type: default_instance_type(),
            image: ImageFilter::default(),
            bootstrap: None,
            user_data: None,
        }
    }
}

/// AMI選択フィルタ
///
/// owner と名前パターンにマッチするAMIのうち、作成日時が最新のものが
/// 選ばれます。デフォルトはCanonical公式のUbuntu 24.04。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFilter {
    /// AMI所有者のアカウントID
    #[serde(default = "default_image_owner")]
    pub owner: String,

    /// AMI名のパターン（ワイルドカード可）
    #[serde(default = "default_image_name")]
    pub name: String,
}

fn default_image_owner() -> String {
    // Canonical
    "099720109477".to_string()
}

fn default_image_name() -> String {
    "ubuntu/images/hvm-ssd-gp3/ubuntu-noble-24.04-amd64-server-*".to_string()
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            owner: default_image_owner(),
            name: default_image_name(),
        }
    }
}

/// 依存待機設定（Exponential Backoff）
///
/// ピアリングのactive化やインスタンス起動など、クラウド側の
/// 非同期完了を待つ全箇所で共有されます。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// 最大リトライ回数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 初期待機時間（ミリ秒）
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// 最大待機時間（ミリ秒）
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential倍率
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 {
    12
}
fn default_initial_delay() -> u64 {
    500
}
fn default_max_delay() -> u64 {
    10000 // 10秒
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl WaitConfig {
    /// 指定回数目の待機時間を計算（ミリ秒）
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}
