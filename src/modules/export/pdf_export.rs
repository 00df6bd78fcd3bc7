//! PDF Export
//!
//! Layout is computed first as plain rows and pages, then drawn with a
//! monospace builtin font so column widths are a fixed character count.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
};

use super::Report;
use crate::domain::WalletSummary;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 10.0;
const ROW_H: f32 = 5.0;
const BOTTOM: f32 = 20.0;
const TABLE_FONT: f32 = 6.0;
/// Courier advance is 0.6 em; 1pt = 0.3528mm
const CHAR_MM: f32 = TABLE_FONT * 0.6 * 0.3528;

/// Header and width in mm of every table column
pub const COLUMNS: [(&str, f32); 7] = [
    ("Date", 25.0),
    ("From", 30.0),
    ("To", 30.0),
    ("Amount", 25.0),
    ("Type", 15.0),
    ("Label", 30.0),
    ("Description", 35.0),
];

/// Where the table starts (mm from the top) on the first and later pages
const FIRST_TOP_WITH_SUMMARY: f32 = 95.0;
const FIRST_TOP: f32 = 55.0;
const CONTINUED_TOP: f32 = 15.0;

pub type Row = [String; 7];

#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    pub title: String,
    pub header_lines: Vec<String>,
    pub summary_lines: Option<[String; 4]>,
    pub pages: Vec<Vec<Row>>,
}

fn column_chars(width_mm: f32) -> usize {
    ((width_mm / CHAR_MM) as usize).saturating_sub(1)
}

fn rows_fitting(top: f32) -> usize {
    // One line per page goes to the column header
    (((PAGE_H - top - BOTTOM) / ROW_H) as usize).saturating_sub(1)
}

/// Builtin fonts only cover WinAnsi; keep the report to printable ASCII
fn ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect()
}

fn truncate(text: &str, max: usize) -> String {
    let text = ascii(text.trim());
    if text.len() <= max {
        return text;
    }
    if max <= 3 {
        return text[..max].to_string();
    }
    format!("{}...", &text[..max - 3])
}

fn truncate_address(address: &str) -> String {
    if address.len() <= 20 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 6..])
}

fn summary_lines(summary: &WalletSummary) -> [String; 4] {
    [
        format!("Current Balance: {:.6} ETH", summary.balance),
        format!("Total Sent: {:.6} ETH", summary.total_sent),
        format!("Total Received: {:.6} ETH", summary.total_received),
        format!("Total Gas Fees: {:.6} ETH", summary.total_fees),
    ]
}

/// Pure layout of the report; no I/O.
pub fn layout(report: &Report<'_>, generated: &str) -> PdfLayout {
    let wallet = report.wallet;
    let address = if wallet.address.is_empty() {
        "No address".to_string()
    } else {
        truncate_address(&wallet.address)
    };
    let header_lines = vec![
        format!("Wallet: {}", ascii(wallet.name_or_default())),
        format!("Address: {address}"),
        format!("Generated: {generated}"),
        format!("Total Transactions: {}", report.transactions.len()),
    ];

    let rows: Vec<Row> = report
        .transactions
        .iter()
        .map(|tx| {
            let from = report.from_name(tx);
            let to = report.to_name(tx);
            let cells = [
                tx.occurred_at.clone(),
                if from.is_empty() { truncate_address(&tx.counterparty_from) } else { from },
                if to.is_empty() { truncate_address(&tx.counterparty_to) } else { to },
                format!("{:.6} ETH", tx.amount_eth()),
                report.direction(tx).to_string(),
                tx.label.clone(),
                tx.description.clone(),
            ];
            let mut row: Row = Default::default();
            for (slot, (cell, (_, width))) in row.iter_mut().zip(cells.iter().zip(COLUMNS)) {
                *slot = truncate(cell, column_chars(width));
            }
            row
        })
        .collect();

    let first_top = if report.summary.is_some() {
        FIRST_TOP_WITH_SUMMARY
    } else {
        FIRST_TOP
    };
    let mut pages = Vec::new();
    let mut rest = rows.as_slice();
    let mut capacity = rows_fitting(first_top).max(1);
    loop {
        let take = capacity.min(rest.len());
        pages.push(rest[..take].to_vec());
        rest = &rest[take..];
        if rest.is_empty() {
            break;
        }
        capacity = rows_fitting(CONTINUED_TOP).max(1);
    }

    PdfLayout {
        title: "Crypto Transaction Report".to_string(),
        header_lines,
        summary_lines: report.summary.as_ref().map(summary_lines),
        pages,
    }
}

fn rule(layer: &PdfLayerReference, y_from_top: f32) {
    let y = Mm(PAGE_H - y_from_top);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN_X + 4.0), y), false),
            (Point::new(Mm(PAGE_W - MARGIN_X - 4.0), y), false),
        ],
        is_closed: false,
    });
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, size: f32, x: f32, y_from_top: f32, s: &str) {
    layer.use_text(s, size, Mm(x), Mm(PAGE_H - y_from_top), font);
}

fn draw_table(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    top: f32,
    rows: &[Row],
) {
    let mut x = MARGIN_X;
    for (header, width) in COLUMNS {
        text(layer, bold, TABLE_FONT + 0.5, x, top, header);
        x += width;
    }
    for (i, row) in rows.iter().enumerate() {
        let y = top + ROW_H * (i as f32 + 1.0);
        let mut x = MARGIN_X;
        for (cell, (_, width)) in row.iter().zip(COLUMNS) {
            text(layer, regular, TABLE_FONT, x, y, cell);
            x += width;
        }
    }
}

pub fn write_report(path: &Path, report: &Report<'_>) -> Result<usize> {
    let generated = Local::now().format("%Y-%m-%d").to_string();
    let layout = layout(report, &generated);
    render(&layout, path)?;
    Ok(report.transactions.len())
}

fn render(layout: &PdfLayout, path: &Path) -> Result<()> {
    let (doc, page, layer) = PdfDocument::new(&layout.title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| anyhow!("load font: {e:?}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::CourierBold)
        .map_err(|e| anyhow!("load font: {e:?}"))?;

    let first = doc.get_page(page).get_layer(layer);
    text(&first, &bold, 18.0, 60.0, 15.0, &layout.title);
    for (i, line) in layout.header_lines.iter().enumerate() {
        text(&first, &regular, 12.0, 14.0, 25.0 + 7.0 * i as f32, line);
    }
    let table_top = match &layout.summary_lines {
        Some(lines) => {
            rule(&first, 52.0);
            text(&first, &bold, 14.0, 20.0, 60.0, "Wallet Summary");
            text(&first, &regular, 10.0, 20.0, 70.0, &lines[0]);
            text(&first, &regular, 10.0, 110.0, 70.0, &lines[1]);
            text(&first, &regular, 10.0, 20.0, 80.0, &lines[2]);
            text(&first, &regular, 10.0, 110.0, 80.0, &lines[3]);
            rule(&first, 90.0);
            FIRST_TOP_WITH_SUMMARY
        }
        None => {
            rule(&first, 50.0);
            FIRST_TOP
        }
    };

    let total = layout.pages.len();
    let footer = |layer: &PdfLayerReference, number: usize| {
        let line = format!("Page {number} of {total} - Generated by txmark");
        text(layer, &regular, 8.0, 80.0, 290.0, &line);
    };
    if let Some(rows) = layout.pages.first() {
        draw_table(&first, &regular, &bold, table_top, rows);
        footer(&first, 1);
    }
    for (index, rows) in layout.pages.iter().enumerate().skip(1) {
        let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        draw_table(&layer, &regular, &bold, CONTINUED_TOP, rows);
        footer(&layer, index + 1);
    }

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("write {}: {e:?}", path.display()))?;
    Ok(())
}
