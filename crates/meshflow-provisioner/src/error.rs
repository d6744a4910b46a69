use meshflow_cloud::CloudError;
use meshflow_core::MeshError;
use thiserror::Error;

use crate::report::MeshReport;

#[derive(Error, Debug)]
pub enum ProvisionError {
    /// トポロジ定義が不正。クラウド API は一切呼ばれていない。
    #[error("検証エラー: {0}")]
    Validation(#[from] MeshError),

    /// クラウド操作の失敗。リトライ可否は中の `CloudError` が知っている。
    #[error("クラウド操作に失敗しました: {0}")]
    Cloud(#[from] CloudError),

    /// 一部のユニットだけが収束した。`report` に成功済みリソースの ID が
    /// 入っており、再度 converge すれば続きから再開できる。
    #[error(
        "収束が部分的に失敗しました: {source}\n\nヒント:\n  • 成功済みリソースはそのまま残っています\n  • 原因を解消してから `mesh up` を再実行すると続きから収束します"
    )]
    Partial {
        report: Box<MeshReport>,
        #[source]
        source: CloudError,
    },

    /// spec にあるリージョンのクライアントが渡されていない。
    #[error("リージョン '{region}' のクライアントがありません")]
    MissingClient { region: String },
}

impl ProvisionError {
    /// 再実行で解消しうる失敗かどうか。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cloud(e) => e.is_retryable(),
            Self::Partial { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// クラウド操作ヘルパーの内部戻り値。部分収束の集計で使う。
pub(crate) type CloudResult<T> = std::result::Result<T, CloudError>;
