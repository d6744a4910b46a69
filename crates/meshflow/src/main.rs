mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mesh")]
#[command(about = "宣言する。収束する。リージョンは、ひとつのメッシュになった。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス (省略時は mesh.kdl を自動発見)
    #[arg(
        short = 'c',
        long = "config",
        env = "MESH_CONFIG_PATH",
        global = true,
        value_name = "PATH"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// メッシュを収束させる (新規作成・再開・確認すべて同じコマンド)
    Up {
        /// レポートをJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// メッシュを削除する (依存の逆順で全リソースを削除)
    Down {
        /// 確認なしで削除を実行
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// メッシュの現状を観測して表示 (読み取り専用)
    Status {
        /// ステータスをJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 設定ファイルを検証 (クラウドには触れない)
    Validate,
    /// バージョンを表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdoutは--jsonの出力に使うので、ログはstderrへ (RUST_LOG で制御)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("meshflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    match cli.command {
        Commands::Up { json } => commands::up::handle(cli.config.as_deref(), json).await,
        Commands::Down { yes } => commands::down::handle(cli.config.as_deref(), yes).await,
        Commands::Status { json } => commands::status::handle(cli.config.as_deref(), json).await,
        Commands::Validate => commands::validate::handle(cli.config.as_deref()).await,
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }
}
