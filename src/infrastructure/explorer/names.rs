//! Counterparty name resolution with a per-instance cache

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use super::client::ExplorerApi;
use crate::domain::normalize_address;
use crate::domain::tokens::known_address_tag;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(500);

/// Resolves address names through the explorer, a few at a time.
///
/// A definitive "no name" is cached as an empty string; failed lookups are
/// not cached and get retried on the next call.
#[derive(Debug)]
pub struct NameResolver {
    cache: HashMap<String, String>,
    batch_size: usize,
    pause: Duration,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_BATCH_PAUSE)
    }
}

impl NameResolver {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self {
            cache: HashMap::new(),
            batch_size: batch_size.max(1),
            pause,
        }
    }

    pub fn cached(&self, address: &str) -> Option<&str> {
        self.cache.get(&normalize_address(address)).map(String::as_str)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Returns lowercase address -> name for every address that has one.
    pub async fn resolve_many<'a, E, I>(&mut self, api: &E, addresses: I) -> HashMap<String, String>
    where
        E: ExplorerApi + ?Sized,
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut resolved = HashMap::new();
        let mut pending = Vec::new();

        for address in addresses {
            let trimmed = address.trim();
            if trimmed.is_empty() || trimmed == "0x" {
                continue;
            }
            let key = normalize_address(trimmed);
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(name) = self.cache.get(&key) {
                if !name.is_empty() {
                    resolved.insert(key, name.clone());
                }
                continue;
            }
            if let Some(tag) = known_address_tag(&key) {
                self.cache.insert(key.clone(), tag.to_string());
                resolved.insert(key, tag.to_string());
                continue;
            }
            pending.push(key);
        }

        if pending.is_empty() || !api.has_credential() {
            return resolved;
        }

        debug!(count = pending.len(), "resolving counterparty names");
        for (i, batch) in pending.chunks(self.batch_size).enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            let results = join_all(batch.iter().map(|address| api.name_tag(address))).await;
            for (address, result) in batch.iter().zip(results) {
                // Failures stay uncached so the next fetch asks again
                let name = match result {
                    Ok(name) => name.unwrap_or_default(),
                    Err(err) => {
                        debug!(%address, "name lookup failed: {err}");
                        continue;
                    }
                };
                if !name.is_empty() {
                    resolved.insert(address.clone(), name.clone());
                }
                self.cache.insert(address.clone(), name);
            }
        }

        resolved
    }
}
