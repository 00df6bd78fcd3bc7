//! CSV Export
//!
//! One row per transaction, annotations included.

use std::path::Path;

use anyhow::{Context, Result};

use super::Report;

const HEADER: [&str; 15] = [
    "hash",
    "date",
    "block_number",
    "from",
    "from_name",
    "to",
    "to_name",
    "direction",
    "amount_eth",
    "fee_eth",
    "status",
    "type",
    "method",
    "label",
    "description",
];

/// Write transactions to CSV file
pub fn write_transactions(path: &Path, report: &Report<'_>) -> Result<usize> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;

    wtr.write_record(HEADER)?;

    for tx in report.transactions {
        wtr.write_record([
            tx.identifier.clone(),
            tx.occurred_at.clone(),
            tx.block_number.to_string(),
            tx.counterparty_from.clone(),
            report.from_name(tx),
            tx.counterparty_to.clone(),
            report.to_name(tx),
            report.direction(tx).to_string(),
            tx.amount.clone(),
            tx.fee_paid.clone(),
            tx.outcome.as_str().to_string(),
            tx.kind.as_str().to_string(),
            tx.invoked_method.clone().unwrap_or_default(),
            tx.label.clone(),
            tx.description.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(report.transactions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Transaction, WalletReference};
    use std::collections::BTreeMap;

    #[test]
    fn test_write_transactions() {
        let wallet = WalletReference::new("0xaa", "Main");
        let names = BTreeMap::new();
        let txs = vec![Transaction {
            identifier: "0x1".into(),
            counterparty_from: "0xbb".into(),
            counterparty_to: "0xaa".into(),
            amount: "1.5".into(),
            label: "Salary, March".into(),
            ..Default::default()
        }];
        let report = Report {
            wallet: &wallet,
            transactions: &txs,
            nicknames: &names,
            summary: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(write_transactions(&path, &report).unwrap(), 1);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADER.len());
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "0x1");
        assert_eq!(&row[6], "You");
        assert_eq!(&row[7], "In");
        assert_eq!(&row[13], "Salary, March");
    }
}
