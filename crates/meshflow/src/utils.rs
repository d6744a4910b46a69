//! コマンド共通の下回り

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use meshflow_cloud_aws::AwsRegionClient;
use meshflow_core::MeshSpec;

/// 設定ファイルを解決して読み込む
///
/// `--config` / `MESH_CONFIG_PATH` があればそれを、なければ
/// [`meshflow_core::find_mesh_file`] の探索順で解決します。
pub fn load_spec(config: Option<&Path>) -> anyhow::Result<(MeshSpec, PathBuf)> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => meshflow_core::find_mesh_file()?,
    };
    let spec = meshflow_core::parse_mesh_file(&path)?;
    Ok((spec, path))
}

/// spec の全リージョンにAWSクライアントを接続する
pub async fn connect_clients(spec: &MeshSpec) -> BTreeMap<String, AwsRegionClient> {
    let connections = spec.regions.iter().map(|region| {
        let mesh = spec.name.clone();
        let name = region.name.clone();
        async move { (name.clone(), AwsRegionClient::connect(mesh, name).await) }
    });
    futures_util::future::join_all(connections)
        .await
        .into_iter()
        .collect()
}
