//! Detects circular fund routing — money that flows in a loop, e.g.
//! `A → B → C → A`.
//!
//! Cycles of 3 to 5 accounts qualify; the loop must close within seven
//! days and move more than a minimum total to filter out micro test
//! payments.

use crate::core::ring::{round2, Ring, RingKind, RingSequence};
use crate::graph::transaction_graph::TransactionGraph;
use chrono::{DateTime, Utc};
use log::info;
use petgraph::graph::NodeIndex;

pub const MIN_CYCLE_LENGTH: usize = 3;
pub const MAX_CYCLE_LENGTH: usize = 5;
/// A cycle must complete within this many days.
pub const MAX_CYCLE_DAYS: f64 = 7.0;
/// Minimum total amount across all edges of the cycle.
pub const MIN_CYCLE_AMOUNT: f64 = 500.0;

/// Enumerate bounded elementary cycles and emit one ring per cycle that
/// passes the time and amount filters.
///
/// Every parallel edge between consecutive members contributes to the
/// total amount and to the timestamp bounds — a faster sub-loop that
/// uses only some of the parallel edges is not enumerated separately.
pub fn detect_cycles(graph: &TransactionGraph) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut seq = RingSequence::cycles();

    for members in enumerate_bounded_cycles(graph) {
        let k = members.len();

        // Collect every parallel edge along the loop, wrap-around included.
        let mut total_amount = 0.0;
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut latest: Option<DateTime<Utc>> = None;
        for i in 0..k {
            for edge in graph.edges_between(members[i], members[(i + 1) % k]) {
                total_amount += edge.amount;
                earliest = Some(earliest.map_or(edge.timestamp, |t| t.min(edge.timestamp)));
                latest = Some(latest.map_or(edge.timestamp, |t| t.max(edge.timestamp)));
            }
        }
        let (Some(earliest), Some(latest)) = (earliest, latest) else {
            continue;
        };

        let duration_hours = hours_between(earliest, latest);
        if duration_hours / 24.0 > MAX_CYCLE_DAYS {
            continue;
        }
        if total_amount < MIN_CYCLE_AMOUNT {
            continue;
        }

        let risk = cycle_risk_score(k, duration_hours, total_amount);
        rings.push(Ring {
            ring_id: seq.next_id(),
            members: members.iter().map(|&n| graph.account(n).clone()).collect(),
            total_amount: round2(total_amount),
            risk_score: round2(risk),
            kind: RingKind::Cycle {
                cycle_length: k,
                completed_hours: round2(duration_hours),
            },
        });
    }

    info!("cycle detector: {} rings found", rings.len());
    rings
}

fn hours_between(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> f64 {
    (latest - earliest).num_milliseconds() as f64 / 3_600_000.0
}

/// Enumerate every elementary directed cycle of length 3–5, each exactly
/// once, rooted at its minimal node in graph order.
///
/// Johnson-style: Tarjan's SCCs prune the search (a cycle never leaves
/// its component), and each DFS from a root only visits nodes greater
/// than the root, so a cycle is discovered only from its smallest member.
/// The search short-circuits as soon as a path grows beyond the maximum
/// cycle length.
fn enumerate_bounded_cycles(graph: &TransactionGraph) -> Vec<Vec<NodeIndex>> {
    let components = petgraph::algo::tarjan_scc(graph.inner());
    let mut scc_id = vec![usize::MAX; graph.node_count()];
    let mut scc_size = vec![0usize; graph.node_count()];
    for (id, component) in components.iter().enumerate() {
        for &node in component {
            scc_id[node.index()] = id;
            scc_size[node.index()] = component.len();
        }
    }

    let mut cycles = Vec::new();
    for root in graph.node_indices() {
        // A cycle of >= 3 distinct nodes needs an SCC of at least 3.
        if scc_size[root.index()] < MIN_CYCLE_LENGTH {
            continue;
        }
        let mut path = vec![root];
        extend_cycle_search(graph, &scc_id, root, &mut path, &mut cycles);
    }
    cycles
}

fn extend_cycle_search(
    graph: &TransactionGraph,
    scc_id: &[usize],
    root: NodeIndex,
    path: &mut Vec<NodeIndex>,
    cycles: &mut Vec<Vec<NodeIndex>>,
) {
    let current = path[path.len() - 1];
    for next in graph.successors(current) {
        if next == root {
            if path.len() >= MIN_CYCLE_LENGTH {
                cycles.push(path.clone());
            }
        } else if next > root
            && path.len() < MAX_CYCLE_LENGTH
            && scc_id[next.index()] == scc_id[root.index()]
            && !path.contains(&next)
        {
            path.push(next);
            extend_cycle_search(graph, scc_id, root, path, cycles);
            path.pop();
        }
    }
}

/// Scores a cycle 0–100. Shorter and faster loops rate higher; the
/// amount contribution is log-scaled and capped.
fn cycle_risk_score(length: usize, duration_hours: f64, total_amount: f64) -> f64 {
    let length_score = match length {
        3 => 40.0,
        4 => 30.0,
        _ => 20.0,
    };
    let speed_score = if duration_hours <= 24.0 {
        40.0
    } else if duration_hours <= 72.0 {
        30.0
    } else {
        15.0
    };
    let amount_score = (total_amount.max(1.0).log10() * 4.0).min(20.0);
    (length_score + speed_score + amount_score).min(100.0)
}
