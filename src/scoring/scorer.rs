//! Computes a final suspicion score for every account that appears in a
//! ring.
//!
//! Score breakdown (max 100):
//!   cycle membership      up to 40 pts
//!   smurfing pattern      up to 25 pts
//!   velocity spike        up to 20 pts
//!   shell chain           up to 15 pts
//!   multi-detector bonus  10 pts when 2+ detector families agree

use crate::core::account::AccountId;
use crate::core::ring::{
    round2, DetectorFamily, FlaggedAccount, PatternTag, Ring, RingKind, SmurfPattern,
};
use crate::core::transaction::TransactionTable;
use chrono::{DateTime, Duration, Utc};
use log::info;
use std::collections::{HashMap, HashSet};

pub const WEIGHT_CYCLE: f64 = 40.0;
pub const WEIGHT_SMURF: f64 = 25.0;
pub const WEIGHT_VELOCITY: f64 = 20.0;
pub const WEIGHT_SHELL: f64 = 15.0;
/// Bonus when an account is implicated by 2+ different detector families.
pub const WEIGHT_MULTI_DETECT: f64 = 10.0;

/// Per-account contributions accumulated across rings. Each detector's
/// contribution is the maximum over that detector's rings, normalized to
/// the detector weight.
#[derive(Debug, Default)]
struct Accumulator {
    ring_ids: Vec<String>,
    patterns: Vec<PatternTag>,
    cycle_score: f64,
    smurf_score: f64,
    shell_score: f64,
}

/// Fuse ring memberships and transaction velocity into one
/// `FlaggedAccount` per implicated account.
///
/// Accounts are returned in first-flagged order (cycle rings, then
/// smurf, then shell, rings in detection order), which is deterministic
/// for a given input.
pub fn score_accounts(
    table: &TransactionTable,
    cycle_rings: &[Ring],
    smurf_rings: &[Ring],
    shell_rings: &[Ring],
) -> Vec<FlaggedAccount> {
    let mut order: Vec<AccountId> = Vec::new();
    let mut accumulators: HashMap<AccountId, Accumulator> = HashMap::new();

    for ring in cycle_rings {
        let RingKind::Cycle {
            cycle_length,
            completed_hours,
        } = &ring.kind
        else {
            continue;
        };
        let tag = PatternTag::CycleLength(*cycle_length);
        let speed_tag = if *completed_hours <= 24.0 {
            Some(PatternTag::HighVelocity)
        } else if *completed_hours <= 72.0 {
            Some(PatternTag::ModerateVelocity)
        } else {
            None
        };
        let contribution = ring.risk_score / 100.0 * WEIGHT_CYCLE;

        for member in &ring.members {
            let entry = entry_for(&mut accumulators, &mut order, member);
            entry.ring_ids.push(ring.ring_id.clone());
            entry.patterns.push(tag);
            if let Some(speed_tag) = speed_tag {
                entry.patterns.push(speed_tag);
            }
            entry.cycle_score = entry.cycle_score.max(contribution);
        }
    }

    for ring in smurf_rings {
        let RingKind::Smurf { pattern, .. } = &ring.kind else {
            continue;
        };
        let tag = match pattern {
            SmurfPattern::FanIn => PatternTag::FanIn,
            SmurfPattern::FanOut => PatternTag::FanOut,
        };
        let contribution = ring.risk_score / 100.0 * WEIGHT_SMURF;

        for member in &ring.members {
            let entry = entry_for(&mut accumulators, &mut order, member);
            entry.ring_ids.push(ring.ring_id.clone());
            entry.patterns.push(tag);
            entry.smurf_score = entry.smurf_score.max(contribution);
        }
    }

    for ring in shell_rings {
        if !matches!(ring.kind, RingKind::ShellChain { .. }) {
            continue;
        }
        let contribution = ring.risk_score / 100.0 * WEIGHT_SHELL;

        for member in &ring.members {
            let entry = entry_for(&mut accumulators, &mut order, member);
            entry.ring_ids.push(ring.ring_id.clone());
            entry.patterns.push(PatternTag::ShellChain);
            entry.shell_score = entry.shell_score.max(contribution);
        }
    }

    let risk_of: HashMap<&String, f64> = cycle_rings
        .iter()
        .chain(smurf_rings)
        .chain(shell_rings)
        .map(|r| (&r.ring_id, r.risk_score))
        .collect();

    let mut flagged = Vec::with_capacity(order.len());
    for account in &order {
        let data = &accumulators[account];

        let velocity_pts = velocity_spike(table, account) * WEIGHT_VELOCITY;

        let families: HashSet<DetectorFamily> =
            data.patterns.iter().filter_map(|t| t.family()).collect();
        let multi_bonus = if families.len() >= 2 {
            WEIGHT_MULTI_DETECT
        } else {
            0.0
        };

        let total =
            data.cycle_score + data.smurf_score + data.shell_score + velocity_pts + multi_bonus;

        flagged.push(FlaggedAccount {
            account_id: account.clone(),
            suspicion_score: round2(total).min(100.0),
            detected_patterns: dedup_keep_first(&data.patterns),
            ring_id: primary_ring(&data.ring_ids, &risk_of),
            ring_ids: dedup_keep_first(&data.ring_ids),
        });
    }

    info!("scorer: {} accounts scored", flagged.len());
    flagged
}

fn entry_for<'a>(
    accumulators: &'a mut HashMap<AccountId, Accumulator>,
    order: &mut Vec<AccountId>,
    account: &AccountId,
) -> &'a mut Accumulator {
    accumulators.entry(account.clone()).or_insert_with(|| {
        order.push(account.clone());
        Accumulator::default()
    })
}

/// Spike ratio in [0, 1] for accounts whose peak 24-hour activity
/// exceeds three times their daily average. Accounts with fewer than 3
/// transactions never spike.
///
/// Peak counting is a two-pointer scan over the account's sorted
/// timestamps; the window is inclusive at both ends.
fn velocity_spike(table: &TransactionTable, account: &AccountId) -> f64 {
    let mut times: Vec<DateTime<Utc>> = table.involving(account).map(|t| t.timestamp()).collect();
    if times.len() < 3 {
        return 0.0;
    }
    times.sort_unstable();

    let span_days =
        (times[times.len() - 1] - times[0]).num_milliseconds() as f64 / 86_400_000.0;
    let total_days = span_days.max(1.0);
    let avg_daily = times.len() as f64 / total_days;

    let window = Duration::hours(24);
    let mut peak = 0usize;
    let mut hi = 0usize;
    for lo in 0..times.len() {
        let end = times[lo] + window;
        while hi < times.len() && times[hi] <= end {
            hi += 1;
        }
        peak = peak.max(hi - lo);
    }

    if avg_daily > 0.0 && peak as f64 > avg_daily * 3.0 {
        ((peak as f64 / avg_daily) / 20.0).min(1.0)
    } else {
        0.0
    }
}

/// Highest-risk ring id from the list; ties keep the first one seen.
fn primary_ring(ring_ids: &[String], risk_of: &HashMap<&String, f64>) -> String {
    let mut best: Option<(&String, f64)> = None;
    for rid in ring_ids {
        let risk = risk_of.get(rid).copied().unwrap_or(0.0);
        match best {
            Some((_, best_risk)) if risk <= best_risk => {}
            _ => best = Some((rid, risk)),
        }
    }
    best.map(|(rid, _)| rid.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

fn dedup_keep_first<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
