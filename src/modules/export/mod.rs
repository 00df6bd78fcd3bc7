//! Export Module
//!
//! Writes the ledger as a PDF report, a CSV sheet or a JSON document.
//!
//! - 'x' in the TUI writes a PDF, `txmark export` picks any format
//! - Files are saved to `<data_dir>/exports/` unless a path is given

mod csv_export;
mod json_export;
mod pdf_export;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

use crate::config;
use crate::domain::{counterparty_name, short_addr, Transaction, WalletReference, WalletSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Pdf,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Everything an exporter needs about the wallet being reported
pub struct Report<'a> {
    pub wallet: &'a WalletReference,
    pub transactions: &'a [Transaction],
    pub nicknames: &'a BTreeMap<String, String>,
    pub summary: Option<WalletSummary>,
}

impl Report<'_> {
    /// "Out" when the wallet sent it, "In" otherwise
    pub fn direction(&self, tx: &Transaction) -> &'static str {
        if tx.is_outgoing_from(&self.wallet.address) {
            "Out"
        } else {
            "In"
        }
    }

    pub fn from_name(&self, tx: &Transaction) -> String {
        self.name(&tx.counterparty_from, &tx.counterparty_from_label)
    }

    pub fn to_name(&self, tx: &Transaction) -> String {
        self.name(&tx.counterparty_to, &tx.counterparty_to_label)
    }

    fn name(&self, address: &str, tag: &str) -> String {
        counterparty_name(address, &self.wallet.address, self.nicknames, tag).unwrap_or_default()
    }
}

/// Get the export directory path, creating it if needed
pub fn export_dir() -> Result<PathBuf> {
    let dir = config::data_dir()
        .map(|dir| dir.join("exports"))
        .unwrap_or_else(|| PathBuf::from(".txmark").join("exports"));
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// `<Wallet_Name>_transactions-<timestamp>.<ext>`
pub fn generate_filename(wallet_name: &str, extension: &str) -> String {
    let stem: String = wallet_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|&c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let stem = if stem.is_empty() { "wallet".to_string() } else { stem };
    let timestamp = Local::now().format("%Y-%m-%d-%H%M%S");
    format!("{stem}_transactions-{timestamp}.{extension}")
}

/// Write the report and return where it went.
pub fn export(report: &Report<'_>, format: ExportFormat, out: Option<&Path>) -> Result<PathBuf> {
    if report.transactions.is_empty() {
        bail!("No transactions to export");
    }

    let path = match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            path.to_path_buf()
        }
        None => export_dir()?.join(generate_filename(
            report.wallet.name_or_default(),
            format.extension(),
        )),
    };

    let count = match format {
        ExportFormat::Pdf => pdf_export::write_report(&path, report)?,
        ExportFormat::Csv => csv_export::write_transactions(&path, report)?,
        ExportFormat::Json => json_export::write_document(&path, report)?,
    };
    info!(
        count,
        wallet = %short_addr(&report.wallet.address),
        path = %path.display(),
        "exported transactions"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_filename() {
        let name = generate_filename("My Main  Wallet", "pdf");
        assert!(name.starts_with("My_Main_Wallet_transactions-"));
        assert!(name.ends_with(".pdf"));
        assert!(generate_filename("///", "csv").starts_with("wallet_transactions-"));
    }

    #[test]
    fn test_empty_export_is_refused() {
        let wallet = WalletReference::new("0xaa", "w");
        let names = BTreeMap::new();
        let report = Report {
            wallet: &wallet,
            transactions: &[],
            nicknames: &names,
            summary: None,
        };
        let dir = tempfile::tempdir().unwrap();
        let err = export(&report, ExportFormat::Csv, Some(&dir.path().join("x.csv"))).unwrap_err();
        assert!(err.to_string().contains("No transactions"));
    }

    #[test]
    fn test_direction_and_names() {
        let wallet = WalletReference::new("0xAA", "w");
        let mut names = BTreeMap::new();
        names.insert("0xbb".to_string(), "Bob".to_string());
        let tx = Transaction {
            counterparty_from: "0xaa".into(),
            counterparty_to: "0xbb".into(),
            ..Default::default()
        };
        let txs = [tx];
        let report = Report {
            wallet: &wallet,
            transactions: &txs,
            nicknames: &names,
            summary: None,
        };
        assert_eq!(report.direction(&txs[0]), "Out");
        assert_eq!(report.from_name(&txs[0]), "You");
        assert_eq!(report.to_name(&txs[0]), "Bob");
    }
}
