//! The directed transaction multigraph the detectors run on.

pub mod transaction_graph;
