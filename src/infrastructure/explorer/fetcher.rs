//! Fetch, normalize and enrich an address's history

use std::time::Duration;

use tracing::{error, info, warn};

use super::client::ExplorerApi;
use super::names::NameResolver;
use super::types::normalize;
use crate::domain::{normalize_address, Transaction};

/// How a fetch ended. Only `Ok` carries authoritative data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    NoCredential,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub transactions: Vec<Transaction>,
    pub status: FetchStatus,
}

impl FetchOutcome {
    fn empty(status: FetchStatus) -> Self {
        Self {
            transactions: Vec::new(),
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }
}

/// Explorer adapter owning its name cache for its whole lifetime
pub struct TransactionFetcher<E> {
    api: E,
    names: NameResolver,
}

impl<E: ExplorerApi> TransactionFetcher<E> {
    pub fn new(api: E) -> Self {
        Self {
            api,
            names: NameResolver::default(),
        }
    }

    pub fn with_name_batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.names = NameResolver::new(batch_size, pause);
        self
    }

    pub fn api(&self) -> &E {
        &self.api
    }

    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    /// Never fails: problems are reported through [`FetchStatus`] with an
    /// empty list.
    pub async fn fetch(&mut self, address: &str) -> FetchOutcome {
        let address = address.trim();
        if address.is_empty() {
            return FetchOutcome::empty(FetchStatus::Failed("no address to fetch".into()));
        }
        if !self.api.has_credential() {
            warn!("no explorer API key configured; skipping fetch");
            return FetchOutcome::empty(FetchStatus::NoCredential);
        }

        info!(address, "fetching transactions");
        let raw = match self.api.txlist(address).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(address, "transaction fetch failed: {err}");
                return FetchOutcome::empty(FetchStatus::Failed(err.to_string()));
            }
        };

        let mut transactions: Vec<Transaction> = raw.iter().map(normalize).collect();
        // Stable, so equal keys keep the explorer's order
        transactions.sort_by(|a, b| {
            (b.timestamp, b.block_number).cmp(&(a.timestamp, a.block_number))
        });

        let addresses: Vec<&str> = transactions
            .iter()
            .flat_map(|tx| [tx.counterparty_from.as_str(), tx.counterparty_to.as_str()])
            .collect();
        let names = self.names.resolve_many(&self.api, addresses).await;

        for tx in &mut transactions {
            tx.counterparty_from_label = lookup(&names, &tx.counterparty_from);
            tx.counterparty_to_label = lookup(&names, &tx.counterparty_to);
        }

        info!(
            count = transactions.len(),
            named = names.len(),
            "fetched transactions"
        );
        FetchOutcome {
            transactions,
            status: FetchStatus::Ok,
        }
    }
}

fn lookup(names: &std::collections::HashMap<String, String>, address: &str) -> String {
    if address.trim().is_empty() {
        return String::new();
    }
    names
        .get(&normalize_address(address))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxKind;
    use crate::infrastructure::explorer::client::ExplorerError;
    use crate::infrastructure::explorer::types::RawTx;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    const ME: &str = "0x00000000000000000000000000000000000000aa";
    const ROUTER: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";
    const FRIEND: &str = "0x00000000000000000000000000000000000000bb";
    const BROKEN: &str = "0x00000000000000000000000000000000000000cc";

    #[derive(Default)]
    struct FakeExplorer {
        credential: bool,
        txs: Vec<RawTx>,
        fail_txlist: bool,
        names: HashMap<String, String>,
        // Addresses whose first lookup is throttled
        throttled_once: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeExplorer {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExplorerApi for FakeExplorer {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn txlist(&self, address: &str) -> Result<Vec<RawTx>, ExplorerError> {
            self.calls.lock().unwrap().push(format!("txlist:{address}"));
            if self.fail_txlist {
                return Err(ExplorerError::Status(502));
            }
            Ok(self.txs.clone())
        }

        async fn name_tag(&self, address: &str) -> Result<Option<String>, ExplorerError> {
            self.calls.lock().unwrap().push(format!("name:{address}"));
            if address == BROKEN {
                return Err(ExplorerError::Status(500));
            }
            if self.throttled_once.lock().unwrap().remove(address) {
                return Err(ExplorerError::Api("NOTOK: Max rate limit reached".into()));
            }
            Ok(self.names.get(address).cloned())
        }

        async fn balance(&self, _address: &str) -> Result<String, ExplorerError> {
            Ok("0".into())
        }
    }

    fn raw(hash: &str, ts: &str, from: &str, to: &str, input: &str) -> RawTx {
        RawTx {
            hash: hash.into(),
            time_stamp: ts.into(),
            block_number: ts.into(),
            from: from.into(),
            to: Some(to.into()),
            value: "1000000000000000000".into(),
            gas: "21000".into(),
            gas_price: "1".into(),
            gas_used: Some("21000".into()),
            input: input.into(),
            is_error: "0".into(),
            txreceipt_status: "1".into(),
        }
    }

    fn fetcher(api: FakeExplorer) -> TransactionFetcher<FakeExplorer> {
        TransactionFetcher::new(api).with_name_batching(5, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_no_credential_short_circuits() {
        let mut f = fetcher(FakeExplorer::default());
        let out = f.fetch(ME).await;
        assert_eq!(out.status, FetchStatus::NoCredential);
        assert!(out.transactions.is_empty());
        assert!(f.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_thrown() {
        let mut f = fetcher(FakeExplorer {
            credential: true,
            fail_txlist: true,
            ..Default::default()
        });
        let out = f.fetch(ME).await;
        assert!(matches!(out.status, FetchStatus::Failed(ref msg) if msg.contains("502")));
        assert!(out.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_normalizes_sorts_and_names() {
        let mut names = HashMap::new();
        names.insert(FRIEND.to_string(), "Alice".to_string());
        let mut f = fetcher(FakeExplorer {
            credential: true,
            txs: vec![
                raw("0xold", "100", ME, FRIEND, "0x"),
                raw("0xnew", "200", ME, ROUTER, "0x7ff36ab5000000"),
                raw("0xmid", "150", BROKEN, ME, "0x"),
            ],
            names,
            ..Default::default()
        });

        let out = f.fetch(ME).await;
        assert!(out.is_ok());
        let ids: Vec<_> = out.transactions.iter().map(|t| t.identifier.as_str()).collect();
        assert_eq!(ids, ["0xnew", "0xmid", "0xold"]);

        let newest = &out.transactions[0];
        assert_eq!(newest.kind, TxKind::ContractCall);
        assert_eq!(newest.invoked_method.as_deref(), Some("swapExactETHForTokens"));
        assert_eq!(newest.counterparty_to_label, "Uniswap V2: Router");
        assert_eq!(out.transactions[2].counterparty_to_label, "Alice");
        assert_eq!(out.transactions[1].counterparty_from_label, "");
        assert!(out.transactions.iter().all(|t| t.label.is_empty()));

        // Known tags never hit the API
        let calls = f.api().calls();
        assert!(!calls.iter().any(|c| c.contains(ROUTER)));
        assert!(calls.contains(&format!("name:{BROKEN}")));
    }

    #[tokio::test]
    async fn test_name_cache_survives_between_fetches() {
        let mut f = fetcher(FakeExplorer {
            credential: true,
            txs: vec![raw("0x1", "1", ME, FRIEND, "0x")],
            ..Default::default()
        });
        f.fetch(ME).await;
        f.fetch(ME).await;
        let name_calls = f
            .api()
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("name:"))
            .count();
        // ME and FRIEND once each
        assert_eq!(name_calls, 2);
        assert_eq!(f.names().cached(FRIEND), Some(""));
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_on_next_fetch() {
        let mut names = HashMap::new();
        names.insert(FRIEND.to_string(), "Binance 14".to_string());
        let mut f = fetcher(FakeExplorer {
            credential: true,
            txs: vec![raw("0x1", "1", ME, FRIEND, "0x")],
            names,
            throttled_once: Mutex::new(HashSet::from([FRIEND.to_string()])),
            ..Default::default()
        });

        let first = f.fetch(ME).await;
        assert_eq!(first.transactions[0].counterparty_to_label, "");
        assert_eq!(f.names().cached(FRIEND), None);

        let second = f.fetch(ME).await;
        assert_eq!(second.transactions[0].counterparty_to_label, "Binance 14");
        assert_eq!(f.names().cached(FRIEND), Some("Binance 14"));

        f.fetch(ME).await;
        let friend_calls = f
            .api()
            .calls()
            .into_iter()
            .filter(|c| *c == format!("name:{FRIEND}"))
            .count();
        assert_eq!(friend_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolver_pauses_between_batches() {
        let api = FakeExplorer {
            credential: true,
            ..Default::default()
        };
        let addresses: Vec<String> = (0..12).map(|i| format!("0x{:040x}", i + 1)).collect();

        let mut resolver = NameResolver::new(5, Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        resolver
            .resolve_many(&api, addresses.iter().map(String::as_str))
            .await;

        // Three batches, two pauses
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
        assert_eq!(api.calls().len(), 12);
    }

    #[tokio::test]
    async fn test_resolver_batches_and_dedupes() {
        let api = FakeExplorer {
            credential: true,
            ..Default::default()
        };
        let addresses: Vec<String> = (0..12).map(|i| format!("0x{:040x}", i + 1)).collect();
        let mut input: Vec<&str> = addresses.iter().map(String::as_str).collect();
        input.extend(["", "0x", addresses[0].as_str()]);

        let mut resolver = NameResolver::new(5, Duration::ZERO);
        let resolved = resolver.resolve_many(&api, input).await;
        assert!(resolved.is_empty());
        assert_eq!(api.calls().len(), 12);
        assert_eq!(resolver.cache_len(), 12);
    }
}
