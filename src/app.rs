use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::{
    is_valid_address, normalize_address, short_addr, Transaction, WalletReference, WalletSummary,
};
use crate::infrastructure::runtime::{RuntimeCommand, RuntimeEvent};
use crate::modules::annotate::{Annotator, Suggestion};
use crate::modules::export::{self, ExportFormat, Report};
use crate::modules::refresh::apply_fetch;
use crate::store::LocalStore;

const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Prompt(PromptKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Label,
    Description,
    Nickname,
    Connect,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Label => "label",
            PromptKind::Description => "description",
            PromptKind::Nickname => "nickname",
            PromptKind::Connect => "connect (address [name])",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

/// Last explorer reachability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerCheck {
    pub reachable: bool,
    pub detail: String,
}

/// TUI state. Owns the store; network work is queued as [`RuntimeCommand`]s
/// and drained by the main loop with [`App::take_commands`].
pub struct App {
    store: LocalStore,
    pub wallet: Option<WalletReference>,
    pub transactions: Vec<Transaction>,
    pub nicknames: BTreeMap<String, String>,
    pub suggestions: Vec<Suggestion>,
    pub selected: usize,

    pub input_mode: InputMode,
    pub input: String,
    /// Address the nickname prompt will name
    prompt_target: Option<String>,

    /// Transient, expires after a few seconds
    pub status: Option<StatusMessage>,
    /// Sticky until dismissed with Esc
    pub notice: Option<String>,
    pub explorer: Option<ExplorerCheck>,

    refresh_generation: u64,
    analysis_generation: u64,
    pub loading: bool,
    pub analyzing: bool,

    pub show_help: bool,
    pub should_quit: bool,
    outbox: Vec<RuntimeCommand>,
}

impl App {
    pub fn new(store: LocalStore) -> Self {
        let wallet = store.wallet_reference();
        let transactions = store.transactions();
        let nicknames = store.custom_names();
        info!(
            wallet = %wallet.as_ref().map(|w| short_addr(&w.address)).unwrap_or_default(),
            stored = transactions.len(),
            "loaded local state"
        );
        Self {
            store,
            wallet,
            transactions,
            nicknames,
            suggestions: Vec::new(),
            selected: 0,
            input_mode: InputMode::Normal,
            input: String::new(),
            prompt_target: None,
            status: None,
            notice: None,
            explorer: None,
            refresh_generation: 0,
            analysis_generation: 0,
            loading: false,
            analyzing: false,
            show_help: false,
            should_quit: false,
            outbox: Vec::new(),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // === Status / notice ===

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            if status.since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    /// Drain queued worker commands
    pub fn take_commands(&mut self) -> Vec<RuntimeCommand> {
        std::mem::take(&mut self.outbox)
    }

    // === Selection ===

    pub fn move_selection_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.selected + 1 < self.transactions.len() {
            self.selected += 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.transactions.len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.transactions.len() {
            self.selected = self.transactions.len().saturating_sub(1);
        }
    }

    pub fn selected_tx(&self) -> Option<&Transaction> {
        self.transactions.get(self.selected)
    }

    pub fn selected_hash(&self) -> Option<&str> {
        self.selected_tx()
            .map(|tx| tx.identifier.as_str())
            .filter(|hash| !hash.is_empty())
    }

    pub fn suggestion_for(&self, index: usize) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.index == index)
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.suggestion_for(self.selected)
    }

    pub fn wallet_address(&self) -> &str {
        self.wallet.as_ref().map(|w| w.address.as_str()).unwrap_or("")
    }

    pub fn summary(&self) -> Option<WalletSummary> {
        let wallet = self.wallet.as_ref()?;
        Some(WalletSummary::compute(&self.transactions, &wallet.address))
    }

    /// The side of the selected transaction that isn't the wallet
    pub fn selected_counterparty(&self) -> Option<String> {
        let tx = self.selected_tx()?;
        let other = if tx.is_outgoing_from(self.wallet_address()) {
            &tx.counterparty_to
        } else {
            &tx.counterparty_from
        };
        let other = if other.trim().is_empty() {
            &tx.counterparty_from
        } else {
            other
        };
        (!other.trim().is_empty()).then(|| other.clone())
    }

    // === Wallet ===

    /// First actions once the worker is up
    pub fn start(&mut self) {
        match self.wallet.as_ref() {
            Some(wallet) => {
                self.outbox.push(RuntimeCommand::CheckExplorer {
                    address: wallet.address.clone(),
                });
                self.request_refresh();
            }
            None => self.set_status("Press c to connect a wallet", StatusLevel::Info),
        }
    }

    pub fn connect(&mut self, address: &str, name: &str) {
        let address = address.trim();
        if !is_valid_address(address) {
            self.set_status("Invalid address (expected 0x + 40 hex)", StatusLevel::Warn);
            return;
        }

        let switching = self
            .wallet
            .as_ref()
            .is_some_and(|w| !w.address.eq_ignore_ascii_case(address));
        if switching {
            if let Err(err) = self.store.clear_all() {
                warn!("could not clear previous wallet: {err:#}");
            }
            self.transactions.clear();
            self.suggestions.clear();
            self.selected = 0;
            // Suggestions still in flight were indexed against the old list
            self.analysis_generation += 1;
            self.analyzing = false;
        }

        let name = if name.trim().is_empty() {
            self.wallet
                .as_ref()
                .filter(|_| !switching)
                .map(|w| w.display_name.clone())
                .unwrap_or_default()
        } else {
            name.trim().to_string()
        };
        let wallet = WalletReference::new(address, name);
        if let Err(err) = self.store.save_wallet_reference(&wallet) {
            self.set_status(format!("Store error: {err}"), StatusLevel::Error);
        }
        info!(wallet = %short_addr(address), "connected wallet");
        self.set_status(
            format!("Connected {}", wallet.name_or_default()),
            StatusLevel::Info,
        );
        self.wallet = Some(wallet);
        self.outbox.push(RuntimeCommand::CheckExplorer {
            address: address.to_string(),
        });
        self.request_refresh();
    }

    /// Forget the wallet and its transactions
    pub fn disconnect(&mut self) {
        if let Err(err) = self.store.clear_all() {
            self.set_status(format!("Store error: {err}"), StatusLevel::Error);
            return;
        }
        // Anything still in flight belongs to the old wallet
        self.refresh_generation += 1;
        self.analysis_generation += 1;
        self.loading = false;
        self.analyzing = false;
        self.wallet = None;
        self.transactions.clear();
        self.suggestions.clear();
        self.selected = 0;
        self.explorer = None;
        self.set_status("Disconnected", StatusLevel::Info);
    }

    // === Worker requests ===

    pub fn request_refresh(&mut self) {
        let Some(wallet) = self.wallet.as_ref() else {
            self.set_status("Connect a wallet first (c)", StatusLevel::Warn);
            return;
        };
        self.refresh_generation += 1;
        self.loading = true;
        self.outbox.push(RuntimeCommand::Refresh {
            address: wallet.address.clone(),
            generation: self.refresh_generation,
        });
        self.set_status("Refreshing transactions…", StatusLevel::Info);
    }

    pub fn request_analysis(&mut self) {
        if self.transactions.is_empty() {
            self.set_status("No transactions to analyze", StatusLevel::Warn);
            return;
        }
        self.analysis_generation += 1;
        self.analyzing = true;
        self.suggestions.clear();
        self.outbox.push(RuntimeCommand::Analyze {
            transactions: self.transactions.clone(),
            generation: self.analysis_generation,
        });
        self.set_status(
            format!("Requesting suggestions for {} transactions…", self.transactions.len()),
            StatusLevel::Info,
        );
    }

    pub fn handle_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Fetched {
                address,
                generation,
                outcome,
            } => {
                if generation != self.refresh_generation
                    || !address.eq_ignore_ascii_case(self.wallet_address())
                {
                    debug!(generation, current = self.refresh_generation, "dropping stale fetch");
                    return;
                }
                self.loading = false;
                let report = apply_fetch(&self.store, outcome);
                if report.updated {
                    // Indexes would point at the wrong rows after a merge
                    if !self.suggestions.is_empty() || self.analyzing {
                        self.analysis_generation += 1;
                        self.analyzing = false;
                        self.suggestions.clear();
                    }
                    self.set_status(
                        format!("Loaded {} transactions", report.transactions.len()),
                        StatusLevel::Info,
                    );
                }
                self.transactions = report.transactions;
                self.clamp_selection();
                if let Some(notice) = report.notice {
                    self.set_notice(notice);
                }
            }
            RuntimeEvent::SuggestionsReady { generation, run } => {
                if generation != self.analysis_generation {
                    debug!(generation, current = self.analysis_generation, "dropping stale suggestions");
                    return;
                }
                self.analyzing = false;
                self.set_status(
                    format!("{} suggestions ready", run.suggestions.len()),
                    StatusLevel::Info,
                );
                if let Some(notice) = run.notice() {
                    self.set_notice(notice);
                }
                self.suggestions = run.suggestions;
            }
            RuntimeEvent::ExplorerStatus { reachable, detail } => {
                if !reachable {
                    self.set_status(format!("Explorer: {detail}"), StatusLevel::Warn);
                }
                self.explorer = Some(ExplorerCheck { reachable, detail });
            }
            RuntimeEvent::Error { message } => {
                self.loading = false;
                self.analyzing = false;
                self.set_notice(message);
            }
        }
    }

    // === Annotation ===

    pub fn apply_selected_suggestion(&mut self) {
        let Some(suggestion) = self.selected_suggestion().cloned() else {
            self.set_status("No suggestion for this transaction", StatusLevel::Warn);
            return;
        };
        let result = Annotator::new(&self.store).apply_one(&mut self.transactions, &suggestion);
        match result {
            Ok(true) => {
                self.suggestions.retain(|s| s.index != suggestion.index);
                self.set_status(format!("Applied \"{}\"", suggestion.label), StatusLevel::Info);
            }
            Ok(false) => self.set_status("Suggestion no longer matches a row", StatusLevel::Warn),
            Err(err) => self.set_status(format!("Save failed: {err}"), StatusLevel::Error),
        }
    }

    pub fn apply_all_suggestions(&mut self) {
        if self.suggestions.is_empty() {
            self.set_status("No suggestions to apply", StatusLevel::Warn);
            return;
        }
        let result = Annotator::new(&self.store).apply_all(&mut self.transactions, &self.suggestions);
        match result {
            Ok(applied) => {
                self.suggestions.clear();
                self.set_status(format!("Applied {applied} suggestions"), StatusLevel::Info);
            }
            Err(err) => self.set_status(format!("Save failed: {err}"), StatusLevel::Error),
        }
    }

    // === Prompts ===

    pub fn enter_prompt(&mut self, kind: PromptKind) {
        let prefill = match kind {
            PromptKind::Label | PromptKind::Description => {
                let Some(tx) = self.selected_tx() else {
                    self.set_status("No transaction selected", StatusLevel::Warn);
                    return;
                };
                if kind == PromptKind::Label {
                    tx.label.clone()
                } else {
                    tx.description.clone()
                }
            }
            PromptKind::Nickname => {
                let Some(address) = self.selected_counterparty() else {
                    self.set_status("No counterparty to name", StatusLevel::Warn);
                    return;
                };
                let current = self
                    .nicknames
                    .get(&normalize_address(&address))
                    .cloned()
                    .unwrap_or_default();
                self.prompt_target = Some(address);
                current
            }
            PromptKind::Connect => String::new(),
        };
        self.input_mode = InputMode::Prompt(kind);
        self.input = prefill;
    }

    pub fn exit_prompt(&mut self) {
        self.input_mode = InputMode::Normal;
        self.prompt_target = None;
        self.input.clear();
    }

    pub fn prompt_context(&self) -> Option<&str> {
        self.prompt_target.as_deref()
    }

    pub fn apply_prompt(&mut self, kind: PromptKind) {
        let input = self.input.trim().to_string();
        match kind {
            PromptKind::Label | PromptKind::Description => {
                let (label, description) = if kind == PromptKind::Label {
                    (Some(input.as_str()), None)
                } else {
                    (None, Some(input.as_str()))
                };
                let index = self.selected;
                let result = Annotator::new(&self.store).edit(
                    &mut self.transactions,
                    index,
                    label,
                    description,
                );
                match result {
                    Ok(true) => self.set_status(format!("Saved {}", kind.title()), StatusLevel::Info),
                    Ok(false) => self.set_status("No transaction selected", StatusLevel::Warn),
                    Err(err) => self.set_status(format!("Save failed: {err}"), StatusLevel::Error),
                }
            }
            PromptKind::Nickname => {
                let Some(address) = self.prompt_target.clone() else {
                    self.set_status("Missing nickname context", StatusLevel::Error);
                    self.exit_prompt();
                    return;
                };
                match self.store.set_custom_name(&address, &input) {
                    Ok(()) => {
                        self.nicknames = self.store.custom_names();
                        if input.is_empty() {
                            self.set_status("Nickname removed", StatusLevel::Info);
                        } else {
                            self.set_status(
                                format!("{} is now \"{input}\"", short_addr(&address)),
                                StatusLevel::Info,
                            );
                        }
                    }
                    Err(err) => self.set_status(format!("Save failed: {err}"), StatusLevel::Error),
                }
            }
            PromptKind::Connect => {
                let mut parts = input.splitn(2, char::is_whitespace);
                let address = parts.next().unwrap_or("").to_string();
                let name = parts.next().unwrap_or("").to_string();
                self.exit_prompt();
                self.connect(&address, &name);
                return;
            }
        }
        self.exit_prompt();
    }

    // === Export ===

    pub fn export_pdf(&mut self) {
        let Some(wallet) = self.wallet.as_ref() else {
            self.set_status("Connect a wallet first (c)", StatusLevel::Warn);
            return;
        };
        let report = Report {
            wallet,
            transactions: &self.transactions,
            nicknames: &self.nicknames,
            summary: Some(WalletSummary::compute(&self.transactions, &wallet.address)),
        };
        match export::export(&report, ExportFormat::Pdf, None) {
            Ok(path) => self.set_status(format!("Exported {}", path.display()), StatusLevel::Info),
            Err(err) => self.set_status(format!("Export failed: {err:#}"), StatusLevel::Error),
        }
    }
}
