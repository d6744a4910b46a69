//! # MeshFlow Provisioner
//!
//! メッシュトポロジの収束エンジン。宣言されたトポロジ (`MeshSpec`) と
//! クラウド側の実状態を突き合わせ、足りないリソースだけを作成する。
//! すべてのリソースは決定的な名前タグで照合されるため、`converge` は
//! 何度実行しても同じトポロジに収束する。
//!
//! 収束は 5 つのフェーズで進む:
//!
//! 1. リージョン基盤 (VPC / サブネット / IGW / ルートテーブル) を並行構築
//! 2. 全リージョンペアのピアリング接続を要求し、アクセプター側で承認
//! 3. ピアリングが active になってから双方向ルートを敷設
//! 4. セキュリティグループ (メッシュ内 ICMP + TCP、SSH) を整備
//! 5. 接しているピアリングがすべて active のリージョンにインスタンスを起動
//!
//! フェーズ 2〜3 とフェーズ 4 は独立なので並行に走る。一部のユニットが
//! 失敗した場合は `ProvisionError::Partial` が成功済みリソースの一覧を
//! 持ち帰り、次回の `converge` がそこから再開する。
//!
//! 削除 (`teardown`) は構築の厳密な逆順で進む。依存リソースが残ったままの
//! 削除はプロバイダが拒否するため、各ステップは全リージョンで完了して
//! から次のステップへ進む。

pub mod error;
pub mod names;
pub mod provisioner;
pub mod report;

mod converge;
mod status;
mod teardown;

// Re-exports
pub use error::{ProvisionError, Result};
pub use provisioner::Provisioner;
pub use report::{
    MeshReport, MeshStatus, PeeringReport, PeeringStatus, RegionReport, RegionStatus, StatusCounts,
};
