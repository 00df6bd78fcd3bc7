//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Etherscan-compatible explorer client and the transaction fetcher
//! - OpenAI-compatible completion client
//! - Tokio runtime bridge for async operations

pub mod completion;
pub mod explorer;
pub mod runtime;

pub use completion::{CompletionApi, CompletionError, OpenAiClient};
pub use explorer::{EtherscanClient, ExplorerApi, FetchOutcome, FetchStatus, TransactionFetcher};
pub use runtime::{RuntimeBridge, RuntimeCommand, RuntimeEvent};
