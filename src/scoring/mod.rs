//! Evidence fusion: per-account suspicion scoring and false-positive
//! suppression.

pub mod false_positive;
pub mod scorer;
