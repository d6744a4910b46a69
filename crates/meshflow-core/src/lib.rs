//! Meshflow コアライブラリ
//!
//! mesh.kdl で宣言されるリージョン間VPCメッシュのモデル・パーサー・検証を
//! 提供します。クラウドAPIには一切触れません（それは meshflow-cloud 以降の
//! 役割です）。
//!
//! - [`model`] - メッシュ定義のデータモデル
//! - [`parser`] - KDL設定ファイルのパース
//! - [`cidr`] - IPv4 CIDRの解析と重複判定
//! - [`validate`] - プロビジョニング前の検証
//! - [`discovery`] - mesh.kdl の自動発見

pub mod cidr;
pub mod discovery;
pub mod error;
pub mod model;
pub mod parser;
pub mod validate;

pub use cidr::Ipv4Cidr;
pub use discovery::find_mesh_file;
pub use error::{MeshError, Result};
pub use model::{ImageFilter, InstanceSpec, MeshSpec, RegionSpec, WaitConfig};
pub use parser::{parse_mesh_file, parse_mesh_string};
pub use validate::validate;
