//! txmark: a local-first Ethereum transaction ledger.
//!
//! The binary wires these modules into a terminal UI and a set of one-shot
//! subcommands; integration tests drive them directly.

pub mod app;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod modules;
pub mod store;
pub mod ui;
