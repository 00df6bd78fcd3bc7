//! Block-explorer adapter: REST client, normalization and name enrichment

mod client;
mod fetcher;
mod names;
mod types;

pub use client::{EtherscanClient, ExplorerApi, ExplorerError};
pub use fetcher::{FetchOutcome, FetchStatus, TransactionFetcher};
pub use names::NameResolver;
pub use types::{format_timestamp, normalize, parse_u256, wei_to_eth, ExplorerEnvelope, RawTx};
