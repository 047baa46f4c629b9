use alloy_primitives::Address;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HolderKind {
    Wallet,
    Pair,
    Unknown,
}

impl HolderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderKind::Wallet => "WALLET",
            HolderKind::Pair => "PAIR",
            HolderKind::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub owner_address: Address,
    pub balance: f64,
    #[serde(rename = "type")]
    pub kind: HolderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// For pairs: the constituent on the other side from the reported token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_token_address: Option<Address>,
}

/// A pool holding the reported token, priced in WETH on both sides
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueLink {
    pub pair_address: Address,
    pub token0_content: String,
    pub token1_content: String,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: f64,
    pub reserve1: f64,
    pub current_price_token0: Option<f64>,
    pub current_price_token1: Option<f64>,
    #[serde(rename = "TVL")]
    pub tvl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenReport {
    pub token_address: Address,
    pub balances: Vec<TokenBalance>,
    /// WETH side of the token/WETH pool
    pub reserve0: f64,
    /// Token side of the token/WETH pool
    pub reserve1: f64,
    pub current_price: Option<f64>,
    pub valuelinks: Vec<ValueLink>,
    /// Token name
    pub content: String,
    pub creator_address: Option<Address>,
    /// Holders whose classification hit an RPC failure; they are listed as UNKNOWN
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_holders: Vec<Address>,
}

impl TokenReport {
    pub fn is_partial(&self) -> bool {
        !self.failed_holders.is_empty()
    }
}

/// Outcome of the forgiving entry point: a report, or an empty object when
/// anything went wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportOutcome {
    Report(Box<TokenReport>),
    Empty {},
}

impl ReportOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, ReportOutcome::Empty {})
    }

    pub fn report(&self) -> Option<&TokenReport> {
        match self {
            ReportOutcome::Report(report) => Some(report.as_ref()),
            ReportOutcome::Empty {} => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_outcome_serializes_to_empty_object() {
        let outcome = ReportOutcome::Empty {};
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({}));
        assert!(outcome.is_empty());
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_balance_field_names() {
        let balance = TokenBalance {
            owner_address: Address::repeat_byte(0x01),
            balance: 1.5,
            kind: HolderKind::Pair,
            nickname: None,
            additional_token_name: Some("Other".to_string()),
            additional_token_address: Some(Address::repeat_byte(0x02)),
        };

        let value = serde_json::to_value(&balance).unwrap();
        assert_eq!(value["type"], "PAIR");
        assert_eq!(value["balance"], 1.5);
        assert_eq!(value["additional_token_name"], "Other");
        assert!(value.get("nickname").is_none());
    }

    #[test]
    fn test_value_link_tvl_key() {
        let link = ValueLink {
            pair_address: Address::repeat_byte(0x03),
            token0_content: "A".to_string(),
            token1_content: "B".to_string(),
            token0: Address::repeat_byte(0x04),
            token1: Address::repeat_byte(0x05),
            reserve0: 10.0,
            reserve1: 20.0,
            current_price_token0: Some(2.0),
            current_price_token1: Some(1.0),
            tvl: Some(40.0),
        };

        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["TVL"], 40.0);
        assert!(value.get("tvl").is_none());
    }
}
