//! Ledger data model shared by the fetcher, the store and the UI

use std::collections::BTreeMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Receipt outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Success,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failed => "Failed",
        }
    }
}

/// Coarse classification computed from the raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    #[default]
    Normal,
    ContractCreation,
    ContractCall,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Normal => "normal",
            TxKind::ContractCreation => "contractCreation",
            TxKind::ContractCall => "contractCall",
        }
    }

    pub fn is_contract(&self) -> bool {
        !matches!(self, TxKind::Normal)
    }
}

/// One ledger entry for the tracked address.
///
/// `identifier` is the transaction hash and the only key used to match an
/// entry across refreshes. `label` and `description` belong to the user; every
/// other field comes from the explorer and is replaced on each refresh.
///
/// Every field defaults so that older or partially written records still
/// decode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub identifier: String,
    pub occurred_at: String,
    pub counterparty_from: String,
    /// Empty for contract creation
    pub counterparty_to: String,
    /// Decimal ETH
    pub amount: String,
    /// Decimal ETH, gas used × gas price
    pub fee_paid: String,
    pub outcome: Outcome,
    pub kind: TxKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_selector: Option<String>,
    pub counterparty_from_label: String,
    pub counterparty_to_label: String,
    pub label: String,
    pub description: String,

    // Raw explorer fields kept for display and heuristics
    pub timestamp: u64,
    pub block_number: u64,
    pub gas_used: String,
    pub gas_price: String,
    pub input: String,
}

impl Transaction {
    pub fn has_call_data(&self) -> bool {
        !self.input.is_empty() && self.input != "0x"
    }

    pub fn amount_eth(&self) -> f64 {
        self.amount.trim().parse().unwrap_or(0.0)
    }

    pub fn fee_eth(&self) -> f64 {
        self.fee_paid.trim().parse().unwrap_or(0.0)
    }

    pub fn is_outgoing_from(&self, address: &str) -> bool {
        !address.is_empty() && self.counterparty_from.eq_ignore_ascii_case(address)
    }

    pub fn is_incoming_to(&self, address: &str) -> bool {
        !address.is_empty() && self.counterparty_to.eq_ignore_ascii_case(address)
    }
}

/// The active address and the nickname the user gave it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletReference {
    pub address: String,
    pub display_name: String,
}

impl WalletReference {
    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
        }
    }

    pub fn name_or_default(&self) -> &str {
        if self.display_name.trim().is_empty() {
            "Unnamed Wallet"
        } else {
            &self.display_name
        }
    }
}

/// Lowercase `0x`-prefixed form used as the key for address lookups
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", payload.to_lowercase())
}

pub fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    let start: String = value.chars().take(6).collect();
    let end: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    format!("{}..{}", start, end)
}

/// `0x` followed by 40 hex digits, any case
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    address.starts_with("0x") && address.len() == 42 && address.parse::<Address>().is_ok()
}

/// Who an address is: the user's nickname, "You" for the tracked wallet,
/// then the explorer's name tag. `None` when nothing is known.
pub fn counterparty_name(
    address: &str,
    wallet: &str,
    nicknames: &BTreeMap<String, String>,
    tag: &str,
) -> Option<String> {
    if address.trim().is_empty() {
        return None;
    }
    if let Some(nick) = nicknames.get(&normalize_address(address)) {
        return Some(nick.clone());
    }
    if !wallet.is_empty() && address.trim().eq_ignore_ascii_case(wallet.trim()) {
        return Some("You".to_string());
    }
    let tag = tag.trim();
    (!tag.is_empty()).then(|| tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let tx: Transaction = serde_json::from_str(r#"{"identifier":"0xabc","label":"Coffee"}"#).unwrap();
        assert_eq!(tx.identifier, "0xabc");
        assert_eq!(tx.label, "Coffee");
        assert_eq!(tx.kind, TxKind::Normal);
        assert!(tx.invoked_method.is_none());
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        let json = serde_json::to_string(&TxKind::ContractCreation).unwrap();
        assert_eq!(json, "\"contractCreation\"");
    }

    #[test]
    fn test_direction_is_case_insensitive() {
        let tx = Transaction {
            counterparty_from: "0xAbC".into(),
            counterparty_to: "0xdef".into(),
            ..Default::default()
        };
        assert!(tx.is_outgoing_from("0xabc"));
        assert!(tx.is_incoming_to("0xDEF"));
        assert!(!tx.is_incoming_to(""));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" 0XABcd "), "0xabcd");
        assert_eq!(normalize_address("abcd"), "0xabcd");
    }

    #[test]
    fn test_short_addr() {
        assert_eq!(
            short_addr("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234..5678"
        );
        assert_eq!(short_addr("0x1234"), "0x1234");
    }

    #[test]
    fn test_counterparty_name_precedence() {
        let mut nicks = BTreeMap::new();
        nicks.insert("0xbb".to_string(), "Landlord".to_string());
        assert_eq!(counterparty_name("0xBB", "0xaa", &nicks, "Tag").as_deref(), Some("Landlord"));
        assert_eq!(counterparty_name("0xAA", "0xaa", &nicks, "Tag").as_deref(), Some("You"));
        assert_eq!(counterparty_name("0xcc", "0xaa", &nicks, " Router ").as_deref(), Some("Router"));
        assert_eq!(counterparty_name("0xcc", "0xaa", &nicks, ""), None);
        assert_eq!(counterparty_name("", "0xaa", &nicks, "x"), None);
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"));
        assert!(!is_valid_address("7a250d5630b4cf539739df2c5dacb4c659f2488d"));
        assert!(!is_valid_address("0x7a250d"));
        assert!(!is_valid_address("0xzz250d5630b4cf539739df2c5dacb4c659f2488d"));
    }
}
