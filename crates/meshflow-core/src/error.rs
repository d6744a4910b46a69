use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なCIDR表記: {0}")]
    InvalidCidr(String),

    #[error("CIDRが重複しています: {a} ({a_region}) と {b} ({b_region})")]
    CidrOverlap {
        a: String,
        a_region: String,
        b: String,
        b_region: String,
    },

    #[error("サブネット {subnet} がVPCのCIDR {vpc} に含まれていません (リージョン: {region})")]
    SubnetOutsideVpc {
        subnet: String,
        vpc: String,
        region: String,
    },

    #[error("リージョンが重複しています: {0}")]
    DuplicateRegion(String),

    #[error("ブートストラップスクリプトが見つかりません: {0}")]
    BootstrapNotFound(PathBuf),

    #[error(
        "設定ファイルが見つかりません\n探索場所: mesh.local.kdl, mesh.kdl, .meshflow/, ~/.config/meshflow/\nヒント: mesh.kdl を含むディレクトリで実行するか、MESH_CONFIG_PATH を設定してください"
    )]
    ConfigNotFound,
}

pub type Result<T> = std::result::Result<T, MeshError>;
