//! One refresh pass: fetch result + stored list -> merged, persisted list

use tracing::{info, warn};

use crate::domain::{reconcile, Transaction};
use crate::infrastructure::explorer::{FetchOutcome, FetchStatus};
use crate::store::LocalStore;

#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// What the UI should show now
    pub transactions: Vec<Transaction>,
    /// False when the stored list was returned unchanged
    pub updated: bool,
    /// Entries whose annotations survived the merge
    pub preserved: usize,
    pub notice: Option<String>,
}

/// Merge a fetch into the store.
///
/// Only a successful fetch is authoritative: it is reconciled against the
/// prior list (read once) and written back (once). Any other outcome leaves
/// the store alone and returns the last known list with a notice.
pub fn apply_fetch(store: &LocalStore, outcome: FetchOutcome) -> RefreshReport {
    let prior = store.transactions();

    let notice = match &outcome.status {
        FetchStatus::Ok => None,
        FetchStatus::NoCredential => Some(
            "No explorer API key configured; showing stored transactions".to_string(),
        ),
        FetchStatus::Failed(reason) => Some(format!(
            "Could not fetch transactions ({reason}); showing stored transactions"
        )),
    };
    if let Some(notice) = notice {
        warn!(stored = prior.len(), "{notice}");
        return RefreshReport {
            transactions: prior,
            updated: false,
            preserved: 0,
            notice: Some(notice),
        };
    }

    let merged = reconcile(outcome.transactions, &prior);
    let preserved = merged
        .iter()
        .filter(|tx| !tx.label.is_empty() || !tx.description.is_empty())
        .count();

    let notice = match store.save_transactions(&merged) {
        Ok(()) => None,
        Err(err) => {
            warn!("could not persist refreshed transactions: {err:#}");
            Some(format!("Refreshed, but saving failed: {err}"))
        }
    };
    info!(count = merged.len(), preserved, "refresh applied");

    RefreshReport {
        transactions: merged,
        updated: true,
        preserved,
        notice,
    }
}
