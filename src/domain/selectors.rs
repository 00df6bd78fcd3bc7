//! Static 4-byte selector table and payload classification

use super::transaction::TxKind;

pub const UNKNOWN_METHOD: &str = "Unknown Method";
pub const CONTRACT_CREATION: &str = "Contract Creation";
pub const PLAIN_TRANSFER: &str = "Transfer";

/// selector (lowercase, 0x-prefixed) -> method name
const KNOWN_SELECTORS: &[(&str, &str)] = &[
    // ERC-20
    ("0xa9059cbb", "transfer"),
    ("0x23b872dd", "transferFrom"),
    ("0x095ea7b3", "approve"),
    ("0x70a08231", "balanceOf"),
    ("0xdd62ed3e", "allowance"),
    ("0x313ce567", "decimals"),
    ("0x06fdde03", "name"),
    ("0x95d89b41", "symbol"),
    ("0x18160ddd", "totalSupply"),
    // ERC-721 / ERC-1155
    ("0x42842e0e", "safeTransferFrom"),
    ("0xb88d4fde", "safeTransferFrom"),
    ("0xf242432a", "safeTransferFrom"),
    ("0x2eb2c2d6", "safeBatchTransferFrom"),
    // WETH
    ("0xd0e30db0", "deposit"),
    ("0x2e1a7d4d", "withdraw"),
    // Uniswap V2 style routers
    ("0x7c025200", "swap"),
    ("0x38ed1739", "swapExactTokensForTokens"),
    ("0x7ff36ab5", "swapExactETHForTokens"),
    ("0x4a25d94a", "swapTokensForExactETH"),
    ("0x18cbafe5", "swapExactTokensForETH"),
    ("0xfb3bdb41", "swapETHForExactTokens"),
    ("0x5c11d795", "swapExactTokensForTokensSupportingFeeOnTransferTokens"),
    ("0x791ac947", "swapExactTokensForETHSupportingFeeOnTransferTokens"),
    // Mints
    ("0xa0712d68", "mint"),
    ("0x40c10f19", "mint"),
    ("0x6a627842", "mint"),
];

/// Result of classifying a raw transaction payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: TxKind,
    pub method: String,
    pub selector: Option<String>,
}

pub fn lookup_selector(selector: &str) -> Option<&'static str> {
    let selector = selector.trim().to_lowercase();
    KNOWN_SELECTORS
        .iter()
        .find(|(sel, _)| *sel == selector)
        .map(|(_, name)| *name)
}

/// Classify a transaction from its recipient and call data alone.
pub fn classify(to: Option<&str>, input: &str) -> Classification {
    let to = to.map(str::trim).unwrap_or("");
    if to.is_empty() || to == "0x" {
        return Classification {
            kind: TxKind::ContractCreation,
            method: CONTRACT_CREATION.to_string(),
            selector: None,
        };
    }

    let input = input.trim();
    if input.len() > 2 && input != "0x" {
        // 0x + 8 hex chars; shorter payloads keep whatever is there
        let selector: String = input.chars().take(10).collect::<String>().to_lowercase();
        let method = lookup_selector(&selector).unwrap_or(UNKNOWN_METHOD);
        return Classification {
            kind: TxKind::ContractCall,
            method: method.to_string(),
            selector: Some(selector),
        };
    }

    Classification {
        kind: TxKind::Normal,
        method: PLAIN_TRANSFER.to_string(),
        selector: None,
    }
}
