mod local;

pub use local::{LocalStore, TransactionSink, SCHEMA_VERSION};
