use std::path::Path;

use colored::Colorize;
use meshflow_provisioner::{MeshReport, ProvisionError, Provisioner};

use crate::utils;

pub async fn handle(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (spec, path) = utils::load_spec(config)?;

    if !json {
        println!("設定ファイル: {}", path.display().to_string().cyan());
        println!();
        println!(
            "{}",
            format!("メッシュ '{}' ({} リージョン):", spec.name, spec.regions.len()).bold()
        );
        for region in &spec.regions {
            println!("  • {} ({})", region.name.cyan(), region.vpc_cidr);
        }
        println!();
        println!("{}", "AWSに接続中...".blue());
    }

    let clients = utils::connect_clients(&spec).await;
    let provisioner = Provisioner::new(spec, clients)?;

    match provisioner.converge().await {
        Ok(report) => {
            print_report(&report, json)?;
            Ok(())
        }
        Err(ProvisionError::Partial { report, source }) => {
            eprintln!();
            eprintln!("{}", "⚠ 一部のリソースだけが収束しました".yellow().bold());
            eprintln!("  原因: {}", source);
            eprintln!();
            eprintln!(
                "{}",
                "もう一度 `mesh up` を実行すると続きから再開します".dimmed()
            );
            print_report(&report, json)?;
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// 収束レポートを表示する。`--json` ではレポートだけを標準出力へ流す。
fn print_report(report: &MeshReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("✓ メッシュ '{}' が収束しました！", report.mesh)
            .green()
            .bold()
    );

    for (region, entry) in &report.regions {
        println!();
        println!("{}", format!("■ {}", region).bold());
        line("VPC", entry.vpc_id.as_deref());
        match (entry.subnet_id.as_deref(), entry.availability_zone.as_deref()) {
            (Some(id), Some(az)) => println!("  サブネット: {} ({})", id.cyan(), az),
            (subnet, _) => line("サブネット", subnet),
        }
        line("IGW", entry.internet_gateway_id.as_deref());
        line("ルートテーブル", entry.route_table_id.as_deref());
        line("セキュリティグループ", entry.security_group_id.as_deref());
        line("インスタンス", entry.instance_id.as_deref());
        line("パブリックIP", entry.public_ip.as_deref());
        line("プライベートIP", entry.private_ip.as_deref());
    }

    if !report.peerings.is_empty() {
        println!();
        println!("{}", "■ ピアリング".bold());
        for peering in &report.peerings {
            println!(
                "  • {} ⇔ {} ({})",
                peering.requester_region.cyan(),
                peering.accepter_region.cyan(),
                peering.id.dimmed()
            );
        }
    }

    print_connectivity_hint(report);
    Ok(())
}

/// 疎通確認の例を表示する。ICMP はピアリング経由でしか通らないので
/// ping の宛先はプライベート IP になる。
fn print_connectivity_hint(report: &MeshReport) {
    let mut regions = report.regions.iter();
    let Some((first, entry)) = regions.next() else {
        return;
    };
    let Some(public_ip) = entry.public_ip.as_deref() else {
        return;
    };

    println!();
    println!("{}", "疎通確認:".bold());
    println!(
        "  ssh ubuntu@{}  {}",
        public_ip.cyan(),
        format!("# {} に入る", first).dimmed()
    );
    for (region, other) in regions {
        if let Some(private_ip) = other.private_ip.as_deref() {
            println!(
                "  ping {}  {}",
                private_ip.cyan(),
                format!("# {} のインスタンス", region).dimmed()
            );
        }
    }
}

fn line(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {}: {}", label, v.cyan()),
        None => println!("  {}: {}", label, "未作成".dimmed()),
    }
}
