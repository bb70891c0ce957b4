//! The three independent pattern detectors.
//!
//! Each detector consumes the frozen multigraph (and nothing else),
//! allocates its own prefix-scoped ring ids, and returns findings in a
//! deterministic order given the same input.

pub mod cycle;
pub mod shell_chain;
pub mod smurfing;
