//! リソースの決定的な命名
//!
//! すべてのリソースは `{メッシュ名}-{リージョン}-{種別}` の名前タグを持ち、
//! converge はこの名前で既存リソースを照合する。名前の生成がここに集まって
//! いるので、命名規則を変えるとメッシュ全体が別物として扱われる点に注意。

/// VPC 名: `{mesh}-{region}-vpc`
pub fn vpc(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-vpc")
}

/// サブネット名: `{mesh}-{region}-subnet`
pub fn subnet(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-subnet")
}

/// インターネットゲートウェイ名: `{mesh}-{region}-igw`
pub fn internet_gateway(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-igw")
}

/// ルートテーブル名: `{mesh}-{region}-rt`
pub fn route_table(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-rt")
}

/// セキュリティグループ名: `{mesh}-{region}-sg`
pub fn security_group(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-sg")
}

/// インスタンス名: `{mesh}-{region}-node`
pub fn instance(mesh: &str, region: &str) -> String {
    format!("{mesh}-{region}-node")
}

/// ピアリング接続名: `{mesh}-{requester}-{accepter}-peer`
///
/// リクエスター (設定順で先のリージョン) が常に先に来るので、
/// ペアごとに一意な名前になる。
pub fn peering(mesh: &str, requester: &str, accepter: &str) -> String {
    format!("{mesh}-{requester}-{accepter}-peer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_deterministic() {
        assert_eq!(vpc("labnet", "us-east-1"), "labnet-us-east-1-vpc");
        assert_eq!(subnet("labnet", "us-east-1"), "labnet-us-east-1-subnet");
        assert_eq!(
            internet_gateway("labnet", "eu-west-1"),
            "labnet-eu-west-1-igw"
        );
        assert_eq!(route_table("labnet", "eu-west-1"), "labnet-eu-west-1-rt");
        assert_eq!(
            security_group("labnet", "ap-northeast-1"),
            "labnet-ap-northeast-1-sg"
        );
        assert_eq!(
            instance("labnet", "ap-northeast-1"),
            "labnet-ap-northeast-1-node"
        );
    }

    #[test]
    fn test_peering_name_orders_requester_first() {
        assert_eq!(
            peering("labnet", "us-east-1", "eu-west-1"),
            "labnet-us-east-1-eu-west-1-peer"
        );
    }
}
