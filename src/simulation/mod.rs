//! Synthetic transaction batches for testing and benchmarking.

pub mod dataset;
