use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{normalize_address, Transaction, WalletReference};

pub const SCHEMA_VERSION: u32 = 1;

const KEY_WALLET: &str = "wallet";
const KEY_TRANSACTIONS: &str = "transactions";
const KEY_CUSTOM_NAMES: &str = "customAddressNames";

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    data: serde_json::Value,
}

/// Anything that can persist the full transaction list in one write
pub trait TransactionSink {
    fn persist(&self, transactions: &[Transaction]) -> Result<()>;
}

/// SQLite-backed key-value store holding the wallet, its transactions and
/// the user's address nicknames.
///
/// Reads never fail: a missing key, an unreadable row or a record that no
/// longer decodes is reported as absent.
#[derive(Debug)]
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    // === Wallet ===

    pub fn wallet_reference(&self) -> Option<WalletReference> {
        self.read(KEY_WALLET)
    }

    pub fn save_wallet_reference(&self, wallet: &WalletReference) -> Result<()> {
        self.write(KEY_WALLET, wallet)
    }

    // === Transactions ===

    pub fn transactions(&self) -> Vec<Transaction> {
        self.read(KEY_TRANSACTIONS).unwrap_or_default()
    }

    pub fn save_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        self.write(KEY_TRANSACTIONS, &transactions)
    }

    // === Address nicknames ===

    pub fn custom_names(&self) -> BTreeMap<String, String> {
        self.read(KEY_CUSTOM_NAMES).unwrap_or_default()
    }

    /// An empty name removes the nickname
    pub fn set_custom_name(&self, address: &str, name: &str) -> Result<()> {
        let mut names = self.custom_names();
        let key = normalize_address(address);
        let name = name.trim();
        if name.is_empty() {
            names.remove(&key);
        } else {
            names.insert(key, name.to_string());
        }
        self.write(KEY_CUSTOM_NAMES, &names)
    }

    /// Forget the wallet and its transactions. Nicknames are kept.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM kv WHERE key IN (?1, ?2)",
            params![KEY_WALLET, KEY_TRANSACTIONS],
        )?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.read_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, "store read failed: {err:#}");
                return None;
            }
        };
        match decode_record(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, "discarding undecodable record: {err:#}");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string(&EnvelopeOut {
            version: SCHEMA_VERSION,
            data,
        })
        .with_context(|| format!("encode {key}"))?;
        self.write_raw(key, &json)?;
        debug!(key, bytes = json.len(), "store write");
        Ok(())
    }

    pub(crate) fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub(crate) fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value,
                updated_at=strftime('%s', 'now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );",
        )?;
        Ok(())
    }
}

impl TransactionSink for LocalStore {
    fn persist(&self, transactions: &[Transaction]) -> Result<()> {
        self.save_transactions(transactions)
    }
}

/// Decode a stored value. Versioned envelopes must carry the current version;
/// bare values written before envelopes existed are accepted as-is.
fn decode_record<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(raw).context("parse json")?;
    let is_envelope = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("version") && obj.contains_key("data"));

    if is_envelope {
        let envelope: EnvelopeIn = serde_json::from_value(value).context("decode envelope")?;
        if envelope.version != SCHEMA_VERSION {
            anyhow::bail!("unsupported record version {}", envelope.version);
        }
        return serde_json::from_value(envelope.data).context("decode record");
    }

    serde_json::from_value(value).context("decode legacy record")
}
