//! Offline suggestions used when no completion key is configured
//!
//! Output depends only on the transaction and its position, so the same list
//! always yields the same suggestions.

use super::Suggestion;
use crate::domain::{Outcome, Transaction, TxKind};

const CATEGORIES: &[&str] = &[
    "Exchange Deposit",
    "Exchange Withdrawal",
    "DeFi Staking",
    "NFT Purchase",
    "Trading Fee",
    "Token Swap",
    "Savings Deposit",
    "Loan Repayment",
    "Payment for Services",
    "Donation",
];

const CONTRACT_CATEGORIES: &[&str] = &[
    "Smart Contract Call: Token Approval",
    "Smart Contract Call: Swap Tokens",
    "Smart Contract Call: Liquidity Provision",
    "Smart Contract Call: Governance Vote",
    "Smart Contract Call: Yield Farming",
    "Smart Contract Call: NFT Minting",
    "Smart Contract Creation",
];

const DESCRIPTIONS: &[&str] = &[
    "Transfer of ETH to an exchange wallet with standard gas fees",
    "Withdrawal of ETH from exchange to personal wallet, paid higher gas for priority",
    "Deposited tokens into a staking contract, higher gas due to complex contract interaction",
    "Purchased an NFT collection item with significant gas fees during network congestion",
    "Paid trading fees for DEX operations, small gas cost relative to trading volume",
    "Swapped tokens using a decentralized exchange with moderate gas costs",
    "Deposited funds into a savings protocol with minimal gas fees",
    "Repaid a DeFi loan with standard transaction gas",
    "Made a payment for digital services with low gas priority",
    "Donation to a crypto charity project, standard gas fees",
];

const CONTRACT_DESCRIPTIONS: &[&str] = &[
    "Approved a token for trading on a DEX, low gas cost operation",
    "Swapped tokens using Uniswap with higher gas due to price slippage protection",
    "Added liquidity to a trading pair, high gas due to multiple contract interactions",
    "Cast a vote in a DAO governance proposal, moderate gas cost",
    "Staked tokens in a yield farming protocol with standard gas",
    "Minted an NFT with premium gas during a popular drop",
    "Deployed a new smart contract to the Ethereum network",
];

const REASONS: &[&str] = &[
    "Pattern matches typical exchange deposit with normal gas usage",
    "Withdrawal address is associated with a personal wallet, gas fees appropriate for transaction type",
    "Contract interaction with a known staking protocol, gas fee indicates complex operation",
    "Transaction to a known NFT marketplace contract with gas usage typical of NFT purchases",
    "Small ETH amount sent to contract with gas fees in expected range for trading",
    "Zero ETH value with contract interaction signature and gas fees consistent with token swaps",
    "Destination is a known savings protocol with minimal gas cost indicating simple deposit",
    "Repayment pattern to lending protocol with standard gas for transaction type",
    "Small fixed amount with regular gas indicating payment for services",
    "Round number amount sent to a charity address with appropriate gas for simple transfer",
];

const CONTRACT_REASONS: &[&str] = &[
    "Standard token approval method signature in contract data with gas usage typical for approvals",
    "Input data contains swap function signatures, gas cost reflects complexity of swap operation",
    "Multiple token transfers in a single transaction with gas fees indicating adding liquidity",
    "Small gas operation to governance contract with vote function signature",
    "Contract interaction with farming protocol, gas reflects staking operation complexity",
    "Interaction with NFT contract containing mint function, high gas due to storage costs",
    "High gas cost transaction with empty \"to\" field indicates contract deployment",
];

const HIGH_FEE_ETH: f64 = 0.01;
const MODERATE_FEE_ETH: f64 = 0.005;

/// Sum of the identifier's characters, or of the index when the identifier
/// is empty
pub fn seed(transaction: &Transaction, index: usize) -> usize {
    let source = if transaction.identifier.is_empty() {
        index.to_string()
    } else {
        transaction.identifier.clone()
    };
    source.chars().map(|c| c as usize).sum()
}

pub fn suggest_all(transactions: &[Transaction]) -> Vec<Suggestion> {
    transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| suggest_one(tx, index))
        .collect()
}

pub fn suggest_one(tx: &Transaction, index: usize) -> Suggestion {
    let looks_like_contract =
        tx.kind.is_contract() || tx.has_call_data() || tx.fee_eth() > MODERATE_FEE_ETH;
    let (categories, descriptions, reasons) = if looks_like_contract {
        (CONTRACT_CATEGORIES, CONTRACT_DESCRIPTIONS, CONTRACT_REASONS)
    } else {
        (CATEGORIES, DESCRIPTIONS, REASONS)
    };

    let seed = seed(tx, index);
    let mut label = categories[seed % categories.len()].to_string();
    let mut description = descriptions[(seed + 1) % descriptions.len()].to_string();
    let mut reason = reasons[(seed + 2) % reasons.len()].to_string();

    if tx.kind == TxKind::ContractCall {
        if let Some(method) = tx.invoked_method.as_deref().filter(|m| !m.is_empty()) {
            label = format!("Smart Contract Call: {}", capitalize(method));
            description = format!("Called the {method} function on a smart contract");
            reason = format!(
                "Transaction identified as a contract call with method {method} (ID: {})",
                tx.method_selector.as_deref().unwrap_or("unknown")
            );
        }
    }

    if tx.kind == TxKind::ContractCreation {
        label = "Smart Contract Creation".to_string();
        description = "Deployed a new smart contract to the Ethereum network".to_string();
        reason = "Transaction has no recipient address and contains contract bytecode, \
                  indicating contract deployment"
            .to_string();
    }

    let from_name = tx.counterparty_from_label.trim();
    let to_name = tx.counterparty_to_label.trim();
    if !from_name.is_empty() || !to_name.is_empty() {
        let mut parties = Vec::new();
        let mut entities = Vec::new();
        if !from_name.is_empty() {
            parties.push(format!("from {from_name}"));
            entities.push(format!("from known entity \"{from_name}\""));
        }
        if !to_name.is_empty() {
            parties.push(format!("to {to_name}"));
            entities.push(format!("to known entity \"{to_name}\""));
        }
        description = format!("{description} {}", parties.join(" "));
        reason = format!("{reason} Transaction {}.", entities.join(" "));
    }

    if !tx.fee_paid.trim().is_empty() {
        let fee = tx.fee_eth();
        if fee > HIGH_FEE_ETH {
            description.push_str(&format!(" (high gas fee: {fee:.4} ETH)"));
            reason.push_str(&format!(
                ". The high gas fees of {fee:.4} ETH suggest complex contract interactions."
            ));
        } else if fee > MODERATE_FEE_ETH {
            description.push_str(&format!(" (moderate gas fee: {fee:.4} ETH)"));
            reason.push_str(&format!(
                ". Moderate gas fees of {fee:.4} ETH are typical for this operation."
            ));
        } else {
            description.push_str(&format!(" (low gas fee: {fee:.4} ETH)"));
            reason.push_str(&format!(
                ". Low gas fees of {fee:.4} ETH indicate a simple transaction."
            ));
        }
    }

    if tx.has_call_data() {
        reason.push_str(
            " Transaction includes input data which suggests interaction with contract functions.",
        );
    }

    if tx.outcome == Outcome::Failed {
        description = format!("Failed: {description}");
        reason.push_str(" Transaction failed, possibly due to contract errors or gas limitations.");
    }

    Suggestion {
        index,
        label,
        description,
        reason,
        token_match: None,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(identifier: &str) -> Transaction {
        Transaction {
            identifier: identifier.into(),
            counterparty_from: "0xaa".into(),
            counterparty_to: "0xbb".into(),
            amount: "0.5".into(),
            fee_paid: "0.00042".into(),
            input: "0x".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_uses_identifier_or_index() {
        assert_eq!(seed(&tx("ab"), 7), ('a' as usize) + ('b' as usize));
        assert_eq!(seed(&tx(""), 12), ('1' as usize) + ('2' as usize));
    }

    #[test]
    fn test_deterministic() {
        let list = vec![tx("0x01"), tx("0x02"), tx("")];
        assert_eq!(suggest_all(&list), suggest_all(&list));
    }

    #[test]
    fn test_plain_transfer_uses_plain_pools() {
        let t = tx("0xabc");
        let s = suggest_one(&t, 0);
        let seed = seed(&t, 0);
        assert_eq!(s.label, CATEGORIES[seed % CATEGORIES.len()]);
        assert!(s.description.ends_with("(low gas fee: 0.0004 ETH)"));
        assert!(!s.reason.contains("input data"));
    }

    #[test]
    fn test_contract_call_uses_method_name() {
        let mut t = tx("0xabc");
        t.kind = TxKind::ContractCall;
        t.invoked_method = Some("approve".into());
        t.method_selector = Some("0x095ea7b3".into());
        t.input = "0x095ea7b3".into();
        let s = suggest_one(&t, 0);
        assert_eq!(s.label, "Smart Contract Call: Approve");
        assert!(s.reason.contains("(ID: 0x095ea7b3)"));
        assert!(s.reason.contains("includes input data"));
    }

    #[test]
    fn test_contract_creation_overrides() {
        let mut t = tx("0xabc");
        t.kind = TxKind::ContractCreation;
        t.invoked_method = Some("Contract Creation".into());
        assert_eq!(suggest_one(&t, 0).label, "Smart Contract Creation");
    }

    #[test]
    fn test_fee_tiers_names_and_failure() {
        let mut t = tx("0xabc");
        t.fee_paid = "0.02".into();
        t.counterparty_to_label = "Uniswap V2: Router".into();
        t.outcome = Outcome::Failed;
        let s = suggest_one(&t, 0);
        assert!(s.description.starts_with("Failed: "));
        assert!(s.description.contains("to Uniswap V2: Router (high gas fee: 0.0200 ETH)"));
        assert!(s.reason.contains("to known entity \"Uniswap V2: Router\"."));
        // High fees alone push a transfer into the contract pools
        assert!(CONTRACT_CATEGORIES.contains(&s.label.as_str()));

        t.fee_paid = "0.007".into();
        assert!(suggest_one(&t, 0).description.contains("moderate gas fee: 0.0070 ETH"));
    }
}
