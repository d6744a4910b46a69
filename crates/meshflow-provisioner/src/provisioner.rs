//! プロビジョナー本体
//!
//! リージョン名 → クライアントの対応を持ち、`converge` / `teardown` /
//! `status` の入口になる。実際のワークフローは `converge.rs` などの
//! 各モジュールに分かれている。

use std::collections::BTreeMap;

use meshflow_cloud::RegionClient;
use meshflow_core::{MeshSpec, WaitConfig};

use crate::error::{ProvisionError, Result};

/// メッシュ 1 つ分の収束エンジン。
///
/// クライアントはリージョンごとに 1 つ。テストではインメモリ実装を、
/// 本番では AWS クライアントを渡す。
pub struct Provisioner<C: RegionClient> {
    pub(crate) spec: MeshSpec,
    pub(crate) clients: BTreeMap<String, C>,
}

impl<C: RegionClient> Provisioner<C> {
    /// spec の全リージョンにクライアントが揃っていることを確認して構築する。
    pub fn new(spec: MeshSpec, clients: BTreeMap<String, C>) -> Result<Self> {
        for region in &spec.regions {
            if !clients.contains_key(&region.name) {
                return Err(ProvisionError::MissingClient {
                    region: region.name.clone(),
                });
            }
        }
        Ok(Self { spec, clients })
    }

    pub fn spec(&self) -> &MeshSpec {
        &self.spec
    }

    pub(crate) fn wait(&self) -> &WaitConfig {
        &self.spec.wait
    }

    pub(crate) fn client(&self, region: &str) -> Result<&C> {
        self.clients
            .get(region)
            .ok_or_else(|| ProvisionError::MissingClient {
                region: region.to_string(),
            })
    }
}
