//! Annotation engine - manual edits and suggested labels
//!
//! Every change goes through [`Annotator`], which persists the full list in
//! one write and then tells the caller the list changed.

pub mod heuristics;
pub mod suggest;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Transaction, TokenReference};
use crate::store::TransactionSink;

pub use suggest::{request_suggestions, FailedBatch, SuggestOptions, SuggestionRun};

/// Token contract a suggestion's transaction touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&TokenReference> for TokenMatch {
    fn from(token: &TokenReference) -> Self {
        Self {
            symbol: token.symbol.to_string(),
            name: token.name.to_string(),
            kind: token.kind.as_str().to_string(),
        }
    }
}

/// A proposed label for the transaction at `index` in the full list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub index: usize,
    pub label: String,
    pub description: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_match: Option<TokenMatch>,
}

pub type ChangeNotifier<'a> = Box<dyn FnMut(&[Transaction]) + 'a>;

pub struct Annotator<'a, S: TransactionSink + ?Sized> {
    sink: &'a S,
    notify: Option<ChangeNotifier<'a>>,
}

impl<'a, S: TransactionSink + ?Sized> Annotator<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink, notify: None }
    }

    pub fn with_notifier(mut self, notify: impl FnMut(&[Transaction]) + 'a) -> Self {
        self.notify = Some(Box::new(notify));
        self
    }

    /// Returns false (and writes nothing) when the index is out of range.
    pub fn apply_one(&mut self, transactions: &mut [Transaction], suggestion: &Suggestion) -> Result<bool> {
        if !set_annotation(transactions, suggestion.index, &suggestion.label, &suggestion.description) {
            warn!(index = suggestion.index, len = transactions.len(), "suggestion index out of range");
            return Ok(false);
        }
        debug!(index = suggestion.index, label = %suggestion.label, "applied suggestion");
        self.commit(transactions)?;
        Ok(true)
    }

    /// Applies every in-range suggestion with a single write. Returns how
    /// many were applied.
    pub fn apply_all(&mut self, transactions: &mut [Transaction], suggestions: &[Suggestion]) -> Result<usize> {
        let mut applied = 0;
        for suggestion in suggestions {
            if set_annotation(transactions, suggestion.index, &suggestion.label, &suggestion.description) {
                applied += 1;
            } else {
                warn!(index = suggestion.index, "skipping suggestion out of range");
            }
        }
        if applied > 0 {
            self.commit(transactions)?;
        }
        info!(applied, skipped = suggestions.len() - applied, "applied suggestions");
        Ok(applied)
    }

    /// Manual edit; `None` leaves that field alone.
    pub fn edit(
        &mut self,
        transactions: &mut [Transaction],
        index: usize,
        label: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let Some(tx) = transactions.get_mut(index) else {
            warn!(index, len = transactions.len(), "edit index out of range");
            return Ok(false);
        };
        if let Some(label) = label {
            tx.label = label.trim().to_string();
        }
        if let Some(description) = description {
            tx.description = description.trim().to_string();
        }
        self.commit(transactions)?;
        Ok(true)
    }

    fn commit(&mut self, transactions: &[Transaction]) -> Result<()> {
        self.sink.persist(transactions)?;
        if let Some(notify) = self.notify.as_mut() {
            notify(transactions);
        }
        Ok(())
    }
}

fn set_annotation(transactions: &mut [Transaction], index: usize, label: &str, description: &str) -> bool {
    match transactions.get_mut(index) {
        Some(tx) => {
            tx.label = label.to_string();
            tx.description = description.to_string();
            true
        }
        None => false,
    }
}
