//! Domain layer - ledger model and the pure logic around it
//!
//! Nothing in here performs I/O: the reconciler, selector classification,
//! token table and summary totals all work on plain data.

pub mod reconcile;
pub mod selectors;
pub mod summary;
pub mod tokens;
pub mod transaction;

pub use reconcile::reconcile;
pub use selectors::{classify, Classification};
pub use summary::WalletSummary;
pub use tokens::{find_token_by_address, TokenReference};
pub use transaction::{
    counterparty_name, is_valid_address, normalize_address, short_addr, Outcome, Transaction, TxKind, WalletReference,
};
