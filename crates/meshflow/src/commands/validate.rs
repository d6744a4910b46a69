use std::path::Path;

use colored::Colorize;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    // 設定ファイルを解決
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => match meshflow_core::find_mesh_file() {
            Ok(path) => path,
            Err(e) => {
                eprintln!();
                eprintln!("{}", "✗ 設定ファイルが見つかりません".red().bold());
                eprintln!("  {}", e);
                eprintln!();
                eprintln!("mesh.kdl が存在するディレクトリで実行してください");
                std::process::exit(1);
            }
        },
    };

    println!("設定ファイル: {}", path.display().to_string().cyan());

    // パース
    let spec = match meshflow_core::parse_mesh_file(&path) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    // トポロジの整合性チェック (CIDR 重複や最低リージョン数)
    if let Err(e) = meshflow_core::validate(&spec) {
        eprintln!();
        eprintln!("{}", "✗ 検証エラー".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  メッシュ: {}", spec.name.cyan());
    println!("  リージョン: {}個", spec.regions.len());
    for region in &spec.regions {
        println!(
            "    - {} (VPC {} / サブネット {})",
            region.name.cyan(),
            region.vpc_cidr,
            region.subnet_cidr
        );
    }
    let pairs = spec.region_pairs();
    println!("  ピアリング: {}ペア", pairs.len());
    for (requester, accepter) in &pairs {
        println!("    - {} ⇔ {}", requester.name.cyan(), accepter.name.cyan());
    }
    println!("  インスタンス: {}", spec.instance.instance_type.cyan());

    Ok(())
}
