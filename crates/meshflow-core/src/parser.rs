//! KDLパーサー
//!
//! mesh.kdl をパースして [`MeshSpec`] を生成します。
//! ノード名は kebab-case と snake_case の両方を受け付けます。

use crate::cidr::Ipv4Cidr;
use crate::error::{MeshError, Result};
use crate::model::{InstanceSpec, MeshSpec, RegionSpec, WaitConfig};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};

/// KDLファイルをパースして MeshSpec を生成
///
/// `bootstrap` が指定されていれば設定ファイルの親ディレクトリを基準に
/// 解決し、スクリプト本文を `instance.user_data` に読み込みます。
pub fn parse_mesh_file<P: AsRef<Path>>(path: P) -> Result<MeshSpec> {
    let content = fs::read_to_string(path.as_ref())?;
    let mut spec = parse_mesh_string(&content)?;

    if let Some(script) = &spec.instance.bootstrap {
        let base = path.as_ref().parent().unwrap_or_else(|| Path::new("."));
        let resolved = base.join(script);
        if !resolved.exists() {
            return Err(MeshError::BootstrapNotFound(resolved));
        }
        spec.instance.user_data = Some(fs::read_to_string(&resolved)?);
    }

    Ok(spec)
}

/// KDL文字列をパース
///
/// `bootstrap` のパスは保持しますが、本文の読み込みはファイル基準の
/// 解決が必要なため [`parse_mesh_file`] のみが行います。
pub fn parse_mesh_string(content: &str) -> Result<MeshSpec> {
    let doc: KdlDocument = content.parse()?;

    let mut name = None;
    let mut instance = InstanceSpec::default();
    let mut wait = WaitConfig::default();
    let mut regions = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "mesh" => {
                let parsed = parse_mesh(node)?;
                name = Some(parsed.0);
                instance = parsed.1;
                wait = parsed.2;
            }
            "region" => {
                regions.push(parse_region(node)?);
            }
            _ => {
                // 不明なノードはスキップ
            }
        }
    }

    let name = name.ok_or_else(|| MeshError::InvalidConfig("mesh node is required".to_string()))?;
    if regions.is_empty() {
        return Err(MeshError::InvalidConfig(
            "at least one region is required".to_string(),
        ));
    }

    Ok(MeshSpec {
        name,
        regions,
        instance,
        wait,
    })
}

/// mesh ノードをパース
fn parse_mesh(node: &KdlNode) -> Result<(String, InstanceSpec, WaitConfig)> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| MeshError::InvalidConfig("mesh requires a name".to_string()))?
        .to_string();

    let mut instance = InstanceSpec::default();
    let mut wait = WaitConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "instance-type" | "instance_type" => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_string())
                    {
                        instance.instance_type = value.to_string();
                    }
                }
                "image" => {
                    if let Some(image_children) = child.children() {
                        for image_child in image_children.nodes() {
                            match image_child.name().value() {
                                "owner" => {
                                    if let Some(value) = image_child
                                        .entries()
                                        .first()
                                        .and_then(|e| e.value().as_string())
                                    {
                                        instance.image.owner = value.to_string();
                                    }
                                }
                                "name" => {
                                    if let Some(value) = image_child
                                        .entries()
                                        .first()
                                        .and_then(|e| e.value().as_string())
                                    {
                                        instance.image.name = value.to_string();
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                "bootstrap" => {
                    instance.bootstrap = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(PathBuf::from);
                }
                "wait" => {
                    if let Some(wait_children) = child.children() {
                        parse_wait(wait_children, &mut wait);
                    }
                }
                _ => {}
            }
        }
    }

    Ok((name, instance, wait))
}

/// wait ブロックをパース
fn parse_wait(children: &KdlDocument, wait: &mut WaitConfig) {
    for child in children.nodes() {
        match child.name().value() {
            "max-retries" | "max_retries" => {
                if let Some(entry) = child.entries().first()
                    && let Some(value) = entry.value().as_integer()
                {
                    wait.max_retries = value as u32;
                }
            }
            "initial-delay" | "initial_delay" => {
                if let Some(entry) = child.entries().first()
                    && let Some(value) = entry.value().as_integer()
                {
                    wait.initial_delay_ms = value as u64;
                }
            }
            "max-delay" | "max_delay" => {
                if let Some(entry) = child.entries().first()
                    && let Some(value) = entry.value().as_integer()
                {
                    wait.max_delay_ms = value as u64;
                }
            }
            "multiplier" => {
                if let Some(entry) = child.entries().first() {
                    if let Some(value) = entry.value().as_float() {
                        wait.multiplier = value;
                    } else if let Some(value) = entry.value().as_integer() {
                        wait.multiplier = value as f64;
                    }
                }
            }
            _ => {}
        }
    }
}

/// region ノードをパース
fn parse_region(node: &KdlNode) -> Result<RegionSpec> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| MeshError::InvalidConfig("region requires a name".to_string()))?
        .to_string();

    let mut vpc_cidr = None;
    let mut subnet_cidr = None;
    let mut key_name = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vpc-cidr" | "vpc_cidr" => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_string())
                    {
                        vpc_cidr = Some(Ipv4Cidr::parse(value)?);
                    }
                }
                "subnet-cidr" | "subnet_cidr" => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_string())
                    {
                        subnet_cidr = Some(Ipv4Cidr::parse(value)?);
                    }
                }
                "key-name" | "key_name" => {
                    key_name = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                _ => {}
            }
        }
    }

    let vpc_cidr = vpc_cidr.ok_or_else(|| {
        MeshError::InvalidConfig(format!("region \"{name}\" requires vpc-cidr"))
    })?;
    let subnet_cidr = subnet_cidr.ok_or_else(|| {
        MeshError::InvalidConfig(format!("region \"{name}\" requires subnet-cidr"))
    })?;

    Ok(RegionSpec {
        name,
        vpc_cidr,
        subnet_cidr,
        key_name,
    })
}
