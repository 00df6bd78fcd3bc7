//! JSON Export
//!
//! Writes the wallet, its summary and the annotated transactions as one
//! document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::Report;
use crate::domain::{Transaction, WalletReference, WalletSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    wallet: &'a WalletReference,
    generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<WalletSummary>,
    transactions: Vec<ExportableTx<'a>>,
}

/// Stored transaction plus the resolved counterparty names
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportableTx<'a> {
    #[serde(flatten)]
    tx: &'a Transaction,
    direction: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    from_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    to_name: String,
}

pub fn write_document(path: &Path, report: &Report<'_>) -> Result<usize> {
    let doc = ExportDocument {
        wallet: report.wallet,
        generated_at: Utc::now().to_rfc3339(),
        summary: report.summary,
        transactions: report
            .transactions
            .iter()
            .map(|tx| ExportableTx {
                tx,
                direction: report.direction(tx),
                from_name: report.from_name(tx),
                to_name: report.to_name(tx),
            })
            .collect(),
    };

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writer.flush()?;
    Ok(doc.transactions.len())
}
