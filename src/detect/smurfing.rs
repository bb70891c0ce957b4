//! Detects smurfing — unusual aggregation or dispersal of funds.
//!
//! Fan-in: 10+ different senders into one receiver within 72 hours.
//! Fan-out: one sender to 10+ different receivers within 72 hours.
//!
//! The scan uses a sliding 72-hour window per node rather than lifetime
//! counts, so steady long-running activity does not trip the threshold.

use crate::core::account::AccountId;
use crate::core::ring::{round2, Ring, RingKind, RingSequence, SmurfPattern};
use crate::graph::transaction_graph::TransactionGraph;
use chrono::{DateTime, Duration, Utc};
use log::info;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Minimum unique counterparties within one window.
pub const SMURF_THRESHOLD: usize = 10;
/// Sliding window size in hours.
pub const TIME_WINDOW_HOURS: i64 = 72;

/// One directional transfer seen from the hub's perspective.
struct Event {
    counterparty: NodeIndex,
    amount: f64,
    timestamp: DateTime<Utc>,
}

/// Scan every node for fan-in and fan-out hubs.
///
/// A node may produce both a fan-in and a fan-out ring; ids are assigned
/// in (fan-in, fan-out) order per node, nodes in graph order.
pub fn detect_smurfing(graph: &TransactionGraph) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut seq = RingSequence::smurfs();

    for node in graph.node_indices() {
        let incoming: Vec<Event> = graph
            .in_edges(node)
            .map(|(source, edge)| Event {
                counterparty: source,
                amount: edge.amount,
                timestamp: edge.timestamp,
            })
            .collect();
        if let Some(ring) = scan_events(graph, node, incoming, SmurfPattern::FanIn, &mut seq) {
            rings.push(ring);
        }

        let outgoing: Vec<Event> = graph
            .out_edges(node)
            .map(|(target, edge)| Event {
                counterparty: target,
                amount: edge.amount,
                timestamp: edge.timestamp,
            })
            .collect();
        if let Some(ring) = scan_events(graph, node, outgoing, SmurfPattern::FanOut, &mut seq) {
            rings.push(ring);
        }
    }

    info!("smurfing detector: {} rings found", rings.len());
    rings
}

/// Slide a 72-hour window across the node's events and find the window
/// with the most unique counterparties. Ties go to the earliest window.
///
/// Two-pointer scan over the time-sorted events: the right bound only
/// ever advances, and a counting map tracks unique counterparties in
/// O(1) per step. Both window endpoints are inclusive.
fn scan_events(
    graph: &TransactionGraph,
    node: NodeIndex,
    mut events: Vec<Event>,
    pattern: SmurfPattern,
    seq: &mut RingSequence,
) -> Option<Ring> {
    if events.is_empty() {
        return None;
    }
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.counterparty.cmp(&b.counterparty))
    });

    let window = Duration::hours(TIME_WINDOW_HOURS);
    let mut counts: HashMap<NodeIndex, usize> = HashMap::new();
    let mut hi = 0;
    let mut best_count = 0;
    let mut best_range = (0, 0);

    for lo in 0..events.len() {
        let end = events[lo].timestamp + window;
        while hi < events.len() && events[hi].timestamp <= end {
            *counts.entry(events[hi].counterparty).or_insert(0) += 1;
            hi += 1;
        }
        if counts.len() > best_count {
            best_count = counts.len();
            best_range = (lo, hi);
        }
        if let Some(count) = counts.get_mut(&events[lo].counterparty) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&events[lo].counterparty);
            }
        }
    }

    if best_count < SMURF_THRESHOLD {
        return None;
    }

    let peak = &events[best_range.0..best_range.1];
    let total_amount: f64 = peak.iter().map(|e| e.amount).sum();
    let window_start = peak[0].timestamp;
    let window_end = window_start + window;

    // Hub first, then the window's counterparties sorted by account id
    // so the member list is stable across runs.
    let mut counterparties: Vec<AccountId> = {
        let mut unique: Vec<NodeIndex> = peak.iter().map(|e| e.counterparty).collect();
        unique.sort_unstable();
        unique.dedup();
        unique
            .into_iter()
            .filter(|&n| n != node)
            .map(|n| graph.account(n).clone())
            .collect()
    };
    counterparties.sort();
    let mut members = vec![graph.account(node).clone()];
    members.append(&mut counterparties);

    let risk = smurfing_risk_score(best_count, total_amount);
    Some(Ring {
        ring_id: seq.next_id(),
        members,
        total_amount: round2(total_amount),
        risk_score: round2(risk),
        kind: RingKind::Smurf {
            pattern,
            hub: graph.account(node).clone(),
            peak_count: best_count,
            window_start,
            window_end,
        },
    })
}

/// Scores smurfing 0–100: more unique counterparties and larger totals
/// rate higher, both capped.
fn smurfing_risk_score(unique_count: usize, total_amount: f64) -> f64 {
    let count_score = (((unique_count - SMURF_THRESHOLD) * 4 + 40) as f64).min(60.0);
    let amount_score = (total_amount.max(1.0).log10() * 5.0).min(40.0);
    (count_score + amount_score).min(100.0)
}
