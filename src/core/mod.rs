//! Foundational types: accounts, transactions, rings, flagged accounts.

pub mod account;
pub mod ring;
pub mod transaction;
