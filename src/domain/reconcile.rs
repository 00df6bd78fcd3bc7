//! Merge a fresh fetch with the previously stored list

use std::collections::HashMap;

use tracing::debug;

use super::transaction::Transaction;

/// Combine `fresh` with `prior` so that fetched data wins for every field
/// except the user's annotations.
///
/// The output has the length and order of `fresh`. A prior entry matches on
/// the exact `identifier`; when several prior entries share one, the first is
/// used. A non-empty prior `label`/`description` replaces the fresh value, an
/// empty one leaves the fresh value alone. Prior-only entries are dropped.
pub fn reconcile(fresh: Vec<Transaction>, prior: &[Transaction]) -> Vec<Transaction> {
    let mut by_id: HashMap<&str, &Transaction> = HashMap::with_capacity(prior.len());
    for tx in prior {
        by_id.entry(tx.identifier.as_str()).or_insert(tx);
    }

    let mut matched = 0usize;
    let merged: Vec<Transaction> = fresh
        .into_iter()
        .map(|mut tx| {
            if let Some(old) = by_id.get(tx.identifier.as_str()) {
                matched += 1;
                if !old.label.is_empty() {
                    tx.label = old.label.clone();
                }
                if !old.description.is_empty() {
                    tx.description = old.description.clone();
                }
            }
            tx
        })
        .collect();

    debug!(
        fresh = merged.len(),
        prior = prior.len(),
        matched,
        "reconciled transaction list"
    );
    merged
}
