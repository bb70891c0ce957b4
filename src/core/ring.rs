use crate::core::account::AccountId;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Round a value to two decimal places, the precision all report values
/// carry.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Direction of a smurfing hub: funds concentrating into it or
/// dispersing out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmurfPattern {
    FanIn,
    FanOut,
}

impl SmurfPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FanIn => "fan_in",
            Self::FanOut => "fan_out",
        }
    }
}

impl fmt::Display for SmurfPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific payload of a detection finding.
#[derive(Debug, Clone)]
pub enum RingKind {
    /// A directed cycle of 3–5 distinct accounts that closed within the
    /// time limit.
    Cycle {
        cycle_length: usize,
        completed_hours: f64,
    },
    /// A hub that concentrated or dispersed funds across many unique
    /// counterparties inside one sliding window.
    Smurf {
        pattern: SmurfPattern,
        hub: AccountId,
        peak_count: usize,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    },
    /// A pass-through path whose intermediate accounts are low-degree
    /// shells.
    ShellChain {
        chain_length: usize,
        shell_nodes: Vec<AccountId>,
    },
}

/// A detection finding: a set of accounts implicated together, with a
/// detector-local risk rating in [0, 100].
#[derive(Debug, Clone)]
pub struct Ring {
    pub ring_id: String,
    pub members: Vec<AccountId>,
    pub total_amount: f64,
    pub risk_score: f64,
    pub kind: RingKind,
}

impl Ring {
    /// The pattern-type label exposed in the report.
    pub fn pattern_type(&self) -> &'static str {
        match &self.kind {
            RingKind::Cycle { .. } => "cycle",
            RingKind::Smurf { pattern, .. } => pattern.as_str(),
            RingKind::ShellChain { .. } => "shell_chain",
        }
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.members.iter().any(|m| m == account)
    }
}

/// Allocates ring ids within one detector: `RING_C_001`, `RING_C_002`, …
///
/// Counters are scoped per prefix so detectors can run independently
/// without coordinating id allocation.
#[derive(Debug)]
pub struct RingSequence {
    prefix: char,
    next: usize,
}

impl RingSequence {
    pub fn cycles() -> Self {
        Self::new('C')
    }

    pub fn smurfs() -> Self {
        Self::new('S')
    }

    pub fn shell_chains() -> Self {
        Self::new('H')
    }

    fn new(prefix: char) -> Self {
        Self { prefix, next: 1 }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("RING_{}_{:03}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Which detector a pattern tag traces back to, for the multi-detector
/// bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorFamily {
    Cycle,
    Smurf,
    Shell,
    Velocity,
}

/// Human-readable pattern tag attached to a flagged account.
///
/// Tags are accumulated in insertion order and de-duplicated keeping the
/// first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTag {
    CycleLength(usize),
    HighVelocity,
    ModerateVelocity,
    FanIn,
    FanOut,
    ShellChain,
    FpMerchantDownweight,
    FpPayrollDownweight,
}

impl PatternTag {
    /// The detector family this tag counts toward, if any. The filter
    /// annotations count toward none.
    pub fn family(&self) -> Option<DetectorFamily> {
        match self {
            Self::CycleLength(_) => Some(DetectorFamily::Cycle),
            Self::FanIn | Self::FanOut => Some(DetectorFamily::Smurf),
            Self::ShellChain => Some(DetectorFamily::Shell),
            Self::HighVelocity | Self::ModerateVelocity => Some(DetectorFamily::Velocity),
            Self::FpMerchantDownweight | Self::FpPayrollDownweight => None,
        }
    }
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleLength(k) => write!(f, "cycle_length_{}", k),
            Self::HighVelocity => f.write_str("high_velocity"),
            Self::ModerateVelocity => f.write_str("moderate_velocity"),
            Self::FanIn => f.write_str("fan_in"),
            Self::FanOut => f.write_str("fan_out"),
            Self::ShellChain => f.write_str("shell_chain"),
            Self::FpMerchantDownweight => f.write_str("fp_merchant_downweight"),
            Self::FpPayrollDownweight => f.write_str("fp_payroll_downweight"),
        }
    }
}

impl Serialize for PatternTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An account flagged by the engine, with its fused suspicion data.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedAccount {
    pub account_id: AccountId,
    /// Fused rating in [0, 100].
    pub suspicion_score: f64,
    pub detected_patterns: Vec<PatternTag>,
    /// Highest-risk ring containing this account, or `"UNKNOWN"`.
    pub ring_id: String,
    /// All rings containing this account, first-occurrence order.
    pub ring_ids: Vec<String>,
}
