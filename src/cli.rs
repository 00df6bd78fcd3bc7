//! One-shot subcommands. Each opens the store, does its job and exits.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use txmark::config::Config;
use txmark::domain::{
    counterparty_name, is_valid_address, short_addr, WalletReference, WalletSummary,
};
use txmark::infrastructure::completion::{CompletionApi, OpenAiClient};
use txmark::infrastructure::explorer::{EtherscanClient, ExplorerApi, TransactionFetcher};
use txmark::infrastructure::runtime::check_explorer;
use txmark::modules::annotate::{request_suggestions, Annotator, SuggestOptions};
use txmark::modules::export::{self, ExportFormat, Report};
use txmark::modules::refresh::apply_fetch;
use txmark::store::LocalStore;

#[derive(Debug, Parser)]
#[command(
    name = "txmark",
    version,
    about = "txmark: a local-first Ethereum transaction ledger"
)]
pub struct Args {
    /// Config file (default: $TXMARK_CONFIG or ~/.config/txmark/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite store to use instead of the configured one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Interactive terminal UI (default)
    Tui,
    /// Track an address and fetch its history
    Connect {
        address: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the wallet and its transactions (nicknames are kept)
    Disconnect,
    /// Fetch the latest history and merge it into the store
    Refresh,
    /// Print the stored transactions
    List,
    /// Set the label and/or description of the transaction at INDEX
    Annotate {
        index: usize,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Give an address a nickname (empty removes it)
    Name { address: String, nickname: String },
    /// Ask for label suggestions
    Suggest {
        /// Write every suggestion into the store
        #[arg(long)]
        apply: bool,
    },
    /// Totals for the tracked wallet
    Summary,
    /// Write a report file
    Export {
        #[arg(long, value_enum, default_value = "pdf")]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show configuration, store and explorer status
    Status,
}

pub fn run(
    command: CliCommand,
    config: &Config,
    config_path: Option<&Path>,
    store: &LocalStore,
    store_path: &Path,
) -> Result<()> {
    match command {
        CliCommand::Tui => Ok(()),
        CliCommand::Connect { address, name } => connect(config, store, &address, name.as_deref()),
        CliCommand::Disconnect => {
            store.clear_all()?;
            println!("Disconnected");
            Ok(())
        }
        CliCommand::Refresh => refresh(config, store),
        CliCommand::List => list(store),
        CliCommand::Annotate {
            index,
            label,
            description,
        } => annotate(store, index, label.as_deref(), description.as_deref()),
        CliCommand::Name { address, nickname } => {
            if !is_valid_address(&address) {
                bail!("Invalid address: {address}");
            }
            store.set_custom_name(&address, &nickname)?;
            println!("{} -> {}", address, nickname.trim());
            Ok(())
        }
        CliCommand::Suggest { apply } => suggest(config, store, apply),
        CliCommand::Summary => summary(store),
        CliCommand::Export { format, out } => {
            let wallet = require_wallet(store)?;
            let transactions = store.transactions();
            let nicknames = store.custom_names();
            let report = Report {
                wallet: &wallet,
                transactions: &transactions,
                nicknames: &nicknames,
                summary: Some(WalletSummary::compute(&transactions, &wallet.address)),
            };
            let path = export::export(&report, format, out.as_deref())?;
            println!("{}", path.display());
            Ok(())
        }
        CliCommand::Status => status(config, config_path, store, store_path),
    }
}

fn require_wallet(store: &LocalStore) -> Result<WalletReference> {
    store
        .wallet_reference()
        .context("No wallet connected; run `txmark connect <address>`")
}

fn runtime() -> Result<Runtime> {
    Runtime::new().context("start tokio runtime")
}

fn connect(config: &Config, store: &LocalStore, address: &str, name: Option<&str>) -> Result<()> {
    let address = address.trim();
    if !is_valid_address(address) {
        bail!("Invalid address: {address} (expected 0x + 40 hex digits)");
    }
    if let Some(previous) = store.wallet_reference() {
        if !previous.address.eq_ignore_ascii_case(address) {
            info!(previous = %short_addr(&previous.address), "switching wallet");
            store.clear_all()?;
        }
    }
    let wallet = WalletReference::new(address, name.unwrap_or("").trim());
    store.save_wallet_reference(&wallet)?;
    println!("Connected {} ({})", wallet.name_or_default(), wallet.address);
    refresh(config, store)
}

fn refresh(config: &Config, store: &LocalStore) -> Result<()> {
    let wallet = require_wallet(store)?;
    let explorer = EtherscanClient::new(&config.explorer.base_url, config.explorer_key())?;
    let mut fetcher = TransactionFetcher::new(explorer);

    let outcome = runtime()?.block_on(fetcher.fetch(&wallet.address));
    let report = apply_fetch(store, outcome);
    if let Some(notice) = report.notice.as_deref() {
        eprintln!("{notice}");
    }
    if report.updated {
        println!(
            "{} transactions ({} annotated)",
            report.transactions.len(),
            report.preserved
        );
    }
    Ok(())
}

fn list(store: &LocalStore) -> Result<()> {
    let wallet = require_wallet(store)?;
    let transactions = store.transactions();
    let nicknames = store.custom_names();
    if transactions.is_empty() {
        println!("No transactions stored; run `txmark refresh`");
        return Ok(());
    }
    for (index, tx) in transactions.iter().enumerate() {
        let outgoing = tx.is_outgoing_from(&wallet.address);
        let (other, tag) = if outgoing {
            (&tx.counterparty_to, &tx.counterparty_to_label)
        } else {
            (&tx.counterparty_from, &tx.counterparty_from_label)
        };
        let who = counterparty_name(other, &wallet.address, &nicknames, tag)
            .unwrap_or_else(|| short_addr(other));
        println!(
            "{index:>4}  {:<17}  {:<3}  {:>14} ETH  {:<20}  {}",
            tx.occurred_at,
            if outgoing { "OUT" } else { "IN" },
            tx.amount,
            who,
            tx.label
        );
    }
    Ok(())
}

fn annotate(
    store: &LocalStore,
    index: usize,
    label: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    if label.is_none() && description.is_none() {
        bail!("Nothing to change; pass --label and/or --description");
    }
    let mut transactions = store.transactions();
    if !Annotator::new(store).edit(&mut transactions, index, label, description)? {
        bail!("No transaction at index {index} ({} stored)", transactions.len());
    }
    println!("Updated #{index}");
    Ok(())
}

fn suggest(config: &Config, store: &LocalStore, apply: bool) -> Result<()> {
    let mut transactions = store.transactions();
    if transactions.is_empty() {
        bail!("No transactions stored; run `txmark refresh`");
    }
    let client = OpenAiClient::new(
        &config.completion.base_url,
        config.completion_key(),
        &config.completion.model,
    )?;
    let options = SuggestOptions::from(&config.completion);

    let run = runtime()?.block_on(request_suggestions(&client, &transactions, &options));
    if let Some(notice) = run.notice() {
        eprintln!("{notice}");
    }
    for suggestion in &run.suggestions {
        println!(
            "{:>4}  {:<40}  {}",
            suggestion.index, suggestion.label, suggestion.description
        );
    }

    if apply {
        let applied = Annotator::new(store).apply_all(&mut transactions, &run.suggestions)?;
        println!("Applied {applied} suggestions");
    }
    Ok(())
}

fn summary(store: &LocalStore) -> Result<()> {
    let wallet = require_wallet(store)?;
    let summary = WalletSummary::compute(&store.transactions(), &wallet.address);
    println!("{} ({})", wallet.name_or_default(), wallet.address);
    println!("  Transactions  {}", summary.count);
    println!("  Succeeded     {}", summary.succeeded);
    println!("  Failed        {}", summary.failed);
    println!("  Sent          {:.6} ETH", summary.total_sent);
    println!("  Received      {:.6} ETH", summary.total_received);
    println!("  Gas fees      {:.6} ETH", summary.total_fees);
    println!("  Balance       {:.6} ETH", summary.balance);
    Ok(())
}

fn status(
    config: &Config,
    config_path: Option<&Path>,
    store: &LocalStore,
    store_path: &Path,
) -> Result<()> {
    let explorer = EtherscanClient::new(&config.explorer.base_url, config.explorer_key())?;
    let completion = OpenAiClient::new(
        &config.completion.base_url,
        config.completion_key(),
        &config.completion.model,
    )?;

    let config_path = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".into());
    println!("Config      {config_path}");
    println!("Store       {}", store_path.display());
    println!(
        "Explorer    {} (key: {})",
        config.explorer.base_url,
        if explorer.has_credential() { "set" } else { "missing" }
    );
    println!(
        "Completion  {} model {} (key: {})",
        config.completion.base_url,
        config.completion.model,
        if completion.has_credential() { "set" } else { "missing" }
    );

    match store.wallet_reference() {
        Some(wallet) => {
            println!("Wallet      {} ({})", wallet.name_or_default(), wallet.address);
            println!("Stored      {} transactions", store.transactions().len());
            let (reachable, detail) = runtime()?.block_on(check_explorer(&explorer, &wallet.address));
            if !reachable {
                warn!("explorer check failed: {detail}");
            }
            println!("Reachable   {} ({detail})", if reachable { "yes" } else { "no" });
        }
        None => println!("Wallet      none"),
    }
    Ok(())
}
