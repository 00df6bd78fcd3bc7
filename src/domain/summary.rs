//! Totals shown in the summary panel and the PDF report

use serde::Serialize;

use super::transaction::{Outcome, Transaction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WalletSummary {
    pub total_sent: f64,
    pub total_received: f64,
    /// Fees paid on outgoing transactions only
    pub total_fees: f64,
    /// received - sent - fees, derived from the history alone
    pub balance: f64,
    pub count: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl WalletSummary {
    pub fn compute(transactions: &[Transaction], wallet: &str) -> Self {
        let mut summary = Self {
            count: transactions.len(),
            ..Self::default()
        };

        for tx in transactions {
            if tx.is_outgoing_from(wallet) {
                summary.total_sent += tx.amount_eth();
                summary.total_fees += tx.fee_eth();
            }
            if tx.is_incoming_to(wallet) {
                summary.total_received += tx.amount_eth();
            }
            match tx.outcome {
                Outcome::Success => summary.succeeded += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }

        summary.balance = summary.total_received - summary.total_sent - summary.total_fees;
        summary
    }
}
