//! IPv4 CIDRの解析と重複判定
//!
//! メッシュ内のVPC・サブネットCIDRはプロビジョニング開始前に
//! 重複・包含チェックされます。`std::net::Ipv4Addr` のビット演算のみで
//! 実装しており、外部クレートには依存しません。

use crate::error::{MeshError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 CIDRブロック（例: 10.0.0.0/16）
///
/// ホスト部が0でないアドレス（10.0.1.5/16 など）はパース時点で弾きます。
/// クラウド側はネットワークアドレスしか受け付けないため、
/// ここで正規化せずエラーにして設定ミスを早期に知らせます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// CIDR文字列をパース
    pub fn parse(s: &str) -> Result<Self> {
        let (addr_part, prefix_part) = s
            .split_once('/')
            .ok_or_else(|| MeshError::InvalidCidr(s.to_string()))?;

        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| MeshError::InvalidCidr(s.to_string()))?;
        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| MeshError::InvalidCidr(s.to_string()))?;

        if prefix > 32 {
            return Err(MeshError::InvalidCidr(s.to_string()));
        }

        let cidr = Self { addr, prefix };
        if u32::from(addr) & !cidr.mask() != 0 {
            // ホスト部にビットが立っている
            return Err(MeshError::InvalidCidr(s.to_string()));
        }

        Ok(cidr)
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// ネットワークアドレス
    pub fn network(&self) -> u32 {
        u32::from(self.addr) & self.mask()
    }

    /// ブロック内の最終アドレス
    pub fn last(&self) -> u32 {
        self.network() | !self.mask()
    }

    /// プレフィックス長
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// 他のCIDRブロックを完全に含むか
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.network() <= other.network() && other.last() <= self.last()
    }

    /// アドレス範囲が1つでも重なるか
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.network() <= other.last() && other.network() <= self.last()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ipv4Cidr::parse(&s).map_err(serde::de::Error::custom)
    }
}
