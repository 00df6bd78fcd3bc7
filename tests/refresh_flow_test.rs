//! Fetch -> reconcile -> store, driven through the library with a fake explorer

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use txmark::domain::Transaction;
use txmark::infrastructure::explorer::{ExplorerApi, ExplorerError, RawTx, TransactionFetcher};
use txmark::modules::refresh::apply_fetch;
use txmark::store::LocalStore;

const WALLET: &str = "0x00000000000000000000000000000000000000aa";
const SHOP: &str = "0x00000000000000000000000000000000000000bb";

#[derive(Default)]
struct FakeExplorer {
    credential: bool,
    txs: Vec<RawTx>,
    fail: bool,
    names: HashMap<String, String>,
    calls: Mutex<usize>,
}

#[async_trait]
impl ExplorerApi for FakeExplorer {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn txlist(&self, _address: &str) -> Result<Vec<RawTx>, ExplorerError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(ExplorerError::Status(503));
        }
        Ok(self.txs.clone())
    }

    async fn name_tag(&self, address: &str) -> Result<Option<String>, ExplorerError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.names.get(address).cloned())
    }

    async fn balance(&self, _address: &str) -> Result<String, ExplorerError> {
        Ok("0".into())
    }
}

fn raw(hash: &str, block: u64, wei: &str) -> RawTx {
    RawTx {
        hash: hash.into(),
        block_number: block.to_string(),
        time_stamp: (1_700_000_000 + block).to_string(),
        from: WALLET.into(),
        to: Some(SHOP.into()),
        value: wei.into(),
        gas: "21000".into(),
        gas_price: "1000000000".into(),
        gas_used: Some("21000".into()),
        input: "0x".into(),
        is_error: "0".into(),
        txreceipt_status: "1".into(),
    }
}

fn labeled(id: &str, amount: &str, label: &str) -> Transaction {
    Transaction {
        identifier: id.into(),
        amount: amount.into(),
        label: label.into(),
        ..Default::default()
    }
}

fn fetcher(api: FakeExplorer) -> TransactionFetcher<FakeExplorer> {
    TransactionFetcher::new(api).with_name_batching(5, Duration::ZERO)
}

#[tokio::test]
async fn test_refresh_keeps_labels_and_takes_fresh_amounts() {
    let store = LocalStore::open_in_memory().unwrap();
    store
        .save_transactions(&[labeled("0xabc", "1.0", "Coffee")])
        .unwrap();

    let mut names = HashMap::new();
    names.insert(SHOP.to_string(), "Coffee Shop".to_string());
    let mut fetcher = fetcher(FakeExplorer {
        credential: true,
        txs: vec![
            raw("0xabc", 10, "1500000000000000000"),
            raw("0xdef", 11, "0"),
        ],
        names,
        ..Default::default()
    });

    let outcome = fetcher.fetch(WALLET).await;
    assert!(outcome.is_ok());
    let report = apply_fetch(&store, outcome);

    assert!(report.updated);
    assert!(report.notice.is_none());
    assert_eq!(report.preserved, 1);

    let stored = store.transactions();
    assert_eq!(stored.len(), 2);
    // Newest block first
    assert_eq!(stored[0].identifier, "0xdef");
    assert_eq!(stored[0].label, "");

    let coffee = &stored[1];
    assert_eq!(coffee.label, "Coffee");
    assert_eq!(coffee.amount, "1.5");
    assert_eq!(coffee.counterparty_to_label, "Coffee Shop");
}

#[tokio::test]
async fn test_refresh_twice_is_stable() {
    let store = LocalStore::open_in_memory().unwrap();
    let mut fetcher = fetcher(FakeExplorer {
        credential: true,
        txs: vec![raw("0x1", 1, "1000000000000000000")],
        ..Default::default()
    });

    let first = apply_fetch(&store, fetcher.fetch(WALLET).await);
    let second = apply_fetch(&store, fetcher.fetch(WALLET).await);
    assert_eq!(first.transactions, second.transactions);
    assert_eq!(store.transactions(), second.transactions);
}

#[tokio::test]
async fn test_missing_credential_makes_no_call_and_keeps_store() {
    let store = LocalStore::open_in_memory().unwrap();
    store.save_transactions(&[labeled("0x1", "2", "Rent")]).unwrap();

    let api = FakeExplorer {
        txs: vec![raw("0x9", 1, "0")],
        ..Default::default()
    };
    let mut fetcher = fetcher(api);
    let report = apply_fetch(&store, fetcher.fetch(WALLET).await);

    assert_eq!(*fetcher.api().calls.lock().unwrap(), 0);
    assert!(!report.updated);
    assert!(report.notice.is_some());
    assert_eq!(report.transactions, store.transactions());
    assert_eq!(store.transactions()[0].label, "Rent");
}

#[tokio::test]
async fn test_failed_fetch_falls_back_to_stored_list() {
    let store = LocalStore::open_in_memory().unwrap();
    store.save_transactions(&[labeled("0x1", "2", "Rent")]).unwrap();

    let mut fetcher = fetcher(FakeExplorer {
        credential: true,
        fail: true,
        ..Default::default()
    });
    let report = apply_fetch(&store, fetcher.fetch(WALLET).await);

    assert!(!report.updated);
    assert_eq!(report.transactions.len(), 1);
    assert!(report.notice.unwrap().contains("503"));
}

#[tokio::test]
async fn test_corrupt_stored_list_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("txmark.sqlite3");
    {
        let store = LocalStore::open(&path).unwrap();
        store.save_transactions(&[labeled("0x1", "2", "Rent")]).unwrap();
    }
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE kv SET value = '{not json' WHERE key = 'transactions'",
            [],
        )
        .unwrap();
    }

    let store = LocalStore::open(&path).unwrap();
    assert!(store.transactions().is_empty());

    let mut fetcher = fetcher(FakeExplorer {
        credential: true,
        txs: vec![raw("0x1", 1, "0")],
        ..Default::default()
    });
    let report = apply_fetch(&store, fetcher.fetch(WALLET).await);
    assert!(report.updated);
    assert_eq!(store.transactions().len(), 1);
    assert_eq!(store.transactions()[0].label, "");
}
