//! 設定ファイル発見
//!
//! プロジェクトの mesh.kdl ファイルを探します。

use crate::error::{MeshError, Result};
use std::path::PathBuf;
use tracing::debug;

/// プロジェクトの mesh.kdl ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 MESH_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: mesh.local.kdl, mesh.kdl
/// 3. ./.meshflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/meshflow/mesh.kdl (グローバル設定)
pub fn find_mesh_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("MESH_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            debug!(path = %path.display(), "using MESH_CONFIG_PATH");
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["mesh.local.kdl", "mesh.kdl"];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.meshflow/ ディレクトリで検索
    let mesh_dir = current_dir.join(".meshflow");
    if mesh_dir.is_dir() {
        for filename in &candidates {
            let path = mesh_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/meshflow/mesh.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("meshflow").join("mesh.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(MeshError::ConfigNotFound)
}
