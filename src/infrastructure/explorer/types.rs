//! Explorer wire types and conversion into ledger transactions

use alloy_primitives::utils::format_ether;
use alloy_primitives::U256;
use chrono::DateTime;
use serde::Deserialize;

use crate::domain::{classify, Outcome, Transaction};

/// `{status, message, result}` wrapper used by every explorer endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExplorerEnvelope {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

impl ExplorerEnvelope {
    pub fn is_ok(&self) -> bool {
        self.status == "1"
    }

    /// Best-effort error text; the explorer puts details in `result` when
    /// `message` is just "NOTOK"
    pub fn error_text(&self) -> String {
        match self.result.as_str() {
            Some(detail) if !detail.is_empty() => format!("{}: {}", self.message, detail),
            _ => self.message.clone(),
        }
    }
}

/// One entry of `module=account&action=txlist`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTx {
    pub block_number: String,
    pub time_stamp: String,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub gas_used: Option<String>,
    pub input: String,
    pub is_error: String,
    #[serde(rename = "txreceipt_status")]
    pub txreceipt_status: String,
}

impl RawTx {
    fn effective_gas_used(&self) -> &str {
        match self.gas_used.as_deref().map(str::trim) {
            Some(used) if !used.is_empty() => used,
            _ => self.gas.trim(),
        }
    }

    fn outcome(&self) -> Outcome {
        match self.txreceipt_status.trim() {
            "1" => Outcome::Success,
            // Receipts before Byzantium carry no status; fall back to isError
            "" if self.is_error.trim() == "0" => Outcome::Success,
            _ => Outcome::Failed,
        }
    }
}

/// Convert an explorer record into a ledger entry with empty annotations.
pub fn normalize(raw: &RawTx) -> Transaction {
    let gas_used = raw.effective_gas_used().to_string();
    let fee = parse_u256(&gas_used).saturating_mul(parse_u256(&raw.gas_price));
    let timestamp = raw.time_stamp.trim().parse::<u64>().unwrap_or(0);
    let to = raw.to.as_deref().map(str::trim).unwrap_or("");
    let class = classify(Some(to), &raw.input);

    Transaction {
        identifier: raw.hash.clone(),
        occurred_at: format_timestamp(timestamp),
        counterparty_from: raw.from.clone(),
        counterparty_to: if to == "0x" { String::new() } else { to.to_string() },
        amount: wei_to_eth(parse_u256(&raw.value)),
        fee_paid: wei_to_eth(fee),
        outcome: raw.outcome(),
        kind: class.kind,
        invoked_method: Some(class.method),
        method_selector: class.selector,
        counterparty_from_label: String::new(),
        counterparty_to_label: String::new(),
        label: String::new(),
        description: String::new(),
        timestamp,
        block_number: raw.block_number.trim().parse().unwrap_or(0),
        gas_used,
        gas_price: raw.gas_price.clone(),
        input: raw.input.clone(),
    }
}

pub fn parse_u256(value: &str) -> U256 {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(value, 10),
    };
    parsed.unwrap_or(U256::ZERO)
}

/// Wei as a decimal ETH string without trailing zeros ("1.5", "0.0")
pub fn wei_to_eth(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{int}.0")
            } else {
                format!("{int}.{frac}")
            }
        }
        None => format!("{formatted}.0"),
    }
}

pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%b %d, %Y %H:%M").to_string())
        .unwrap_or_default()
}
