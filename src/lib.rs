//! # mule-detector
//!
//! Offline graph-based detection engine for money-muling patterns.
//!
//! Given a tabular batch of monetary transactions, the engine builds a
//! directed multigraph and produces, in one pass, a ranked list of
//! suspect accounts together with the structural "rings" that implicate
//! them: circular fund routing, smurfing hubs, and layered shell chains.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: accounts, transactions, rings
//! - **ingest** — CSV loading, schema validation, row cleaning
//! - **graph** — The directed transaction multigraph
//! - **detect** — Cycle, smurfing, and shell-chain detectors
//! - **scoring** — Per-account score fusion and false-positive filtering
//! - **report** — Final ranked report and download view
//! - **engine** — The `analyze` pipeline
//! - **simulation** — Synthetic dataset generation for testing

pub mod core;
pub mod detect;
pub mod engine;
pub mod graph;
pub mod ingest;
pub mod report;
pub mod scoring;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::account::AccountId;
    pub use crate::core::ring::{FlaggedAccount, PatternTag, Ring, RingKind};
    pub use crate::core::transaction::{Transaction, TransactionId, TransactionTable};
    pub use crate::engine::{analyze, analyze_table};
    pub use crate::graph::transaction_graph::TransactionGraph;
    pub use crate::ingest::AnalysisError;
    pub use crate::report::Report;
}
