//! Feature modules built on the domain and store layers
//!
//! - annotate: manual edits, suggestion batching and offline heuristics
//! - export: PDF / CSV / JSON reports
//! - refresh: merge a fetch into the stored list

pub mod annotate;
pub mod export;
pub mod refresh;
