use std::path::Path;

use colored::Colorize;
use meshflow_provisioner::Provisioner;

use crate::utils;

pub async fn handle(config: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    let (spec, path) = utils::load_spec(config)?;

    println!("設定ファイル: {}", path.display().to_string().cyan());
    println!();
    println!(
        "{}",
        format!("メッシュ '{}' を削除します ({} リージョン):", spec.name, spec.regions.len())
            .bold()
    );
    for region in &spec.regions {
        println!("  • {}", region.name.cyan());
    }

    // 確認が取れるまでクラウドには接続しない
    if !yes {
        eprintln!();
        eprintln!(
            "{}",
            "⚠ インスタンス・ピアリング・VPC がすべて削除されます"
                .yellow()
                .bold()
        );
        eprintln!("  続行するには {} を付けてください", "--yes".bold());
        std::process::exit(1);
    }

    println!();
    println!("{}", "AWSに接続中...".blue());
    let clients = utils::connect_clients(&spec).await;
    let provisioner = Provisioner::new(spec, clients)?;

    println!("{}", "リソースを依存の逆順で削除中...".yellow());
    provisioner.teardown().await?;

    println!();
    println!(
        "{}",
        format!("✓ メッシュ '{}' を削除しました", provisioner.spec().name)
            .green()
            .bold()
    );
    Ok(())
}
