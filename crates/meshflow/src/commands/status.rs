use std::path::Path;

use colored::Colorize;
use meshflow_provisioner::{MeshStatus, Provisioner};

use crate::utils;

pub async fn handle(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (spec, path) = utils::load_spec(config)?;

    if !json {
        println!("設定ファイル: {}", path.display().to_string().cyan());
        println!("{}", "メッシュの現状を観測中...".blue());
    }

    let clients = utils::connect_clients(&spec).await;
    let provisioner = Provisioner::new(spec, clients)?;
    let status = provisioner.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &MeshStatus) {
    let counts = status.counts();
    println!();
    println!("{}", format!("メッシュ: {}", status.mesh).bold());
    println!("リソース: {} / {}", counts.present, counts.expected);

    for region in &status.regions {
        println!();
        println!("{}", format!("■ {}", region.region).bold());
        match (region.vpc_id.as_deref(), region.vpc_cidr.as_deref()) {
            (Some(id), Some(cidr)) => {
                println!("  {} VPC: {} ({})", "✓".green(), id.cyan(), cidr)
            }
            (vpc, _) => line("VPC", vpc),
        }
        line("サブネット", region.subnet_id.as_deref());
        line("IGW", region.internet_gateway_id.as_deref());
        line("ルートテーブル", region.route_table_id.as_deref());
        println!("    ピアリングルート: {} 本", region.peering_routes);
        line("セキュリティグループ", region.security_group_id.as_deref());
        match (region.instance_id.as_deref(), region.instance_state.as_deref()) {
            (Some(id), Some(state)) => {
                println!("  {} インスタンス: {} ({})", "✓".green(), id.cyan(), state)
            }
            (instance, _) => line("インスタンス", instance),
        }
        if let Some(ip) = region.public_ip.as_deref() {
            println!("    パブリックIP: {}", ip.cyan());
        }
        if let Some(ip) = region.private_ip.as_deref() {
            println!("    プライベートIP: {}", ip.cyan());
        }
    }

    if !status.peerings.is_empty() {
        println!();
        println!("{}", "■ ピアリング".bold());
        for peering in &status.peerings {
            let mark = if peering.is_active() {
                "✓".green()
            } else {
                "…".yellow()
            };
            let state = peering
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "なし".to_string());
            println!(
                "  {} {} ⇔ {} ({})",
                mark,
                peering.requester_region.cyan(),
                peering.accepter_region.cyan(),
                state
            );
        }
    }

    println!();
    if status.is_converged() {
        println!("{}", "✓ メッシュは収束しています".green().bold());
    } else {
        println!("{}", "⚠ メッシュは未収束です".yellow().bold());
        println!("{}", "  `mesh up` を実行すると収束できます".dimmed());
    }
}

fn line(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {} {}: {}", "✓".green(), label, v.cyan()),
        None => println!("  {} {}: {}", "−".dimmed(), label, "なし".dimmed()),
    }
}
