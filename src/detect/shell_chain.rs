//! Detects layered shell networks — chains of low-activity pass-through
//! accounts:
//!
//! ```text
//! ORIGIN → SHELL_1 → SHELL_2 → DESTINATION
//! ```
//!
//! A shell account has very few total edges (in + out, parallel edges
//! counted) and exists seemingly only to relay money onward. Endpoints
//! of a chain are exempt from the shell requirement.

use crate::core::ring::{round2, Ring, RingKind, RingSequence};
use crate::graph::transaction_graph::TransactionGraph;
use log::{info, warn};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// Maximum total degree (in + out) for an account to count as a shell.
pub const MAX_SHELL_DEGREE: usize = 3;
/// Minimum number of hops (edges) to flag a chain.
pub const MIN_CHAIN_LENGTH: usize = 3;
/// Traversal depth limit.
pub const MAX_CHAIN_LENGTH: usize = 8;
/// Upper bound on retained chains; dense shell subgraphs can otherwise
/// produce an exponential number of them.
pub const MAX_RETAINED_CHAINS: usize = 10_000;

/// Walk depth-first from every node, following successors through shell
/// intermediaries, and emit one ring per distinct chain found.
///
/// The traversal uses an explicit stack; the path-membership check keeps
/// chains simple and the depth cap bounds the walk. When an extension
/// would put a non-shell account in an intermediate position, the chain
/// is considered broken there: the path so far is still recorded if long
/// enough, and that branch is not explored further.
pub fn detect_shell_chains(graph: &TransactionGraph) -> Vec<Ring> {
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.total_degree(n))
        .collect();

    let mut collector = ChainCollector {
        recorded: HashSet::new(),
        seq: RingSequence::shell_chains(),
        rings: Vec::new(),
        truncated: false,
    };

    for start in graph.node_indices() {
        walk_from(graph, &degrees, start, &mut collector);
    }

    if collector.truncated {
        warn!(
            "shell-chain detector: retained-chain bound of {} reached, further chains dropped",
            MAX_RETAINED_CHAINS
        );
    }
    info!("shell-chain detector: {} rings found", collector.rings.len());
    collector.rings
}

fn is_shell(degrees: &[usize], node: NodeIndex) -> bool {
    degrees[node.index()] <= MAX_SHELL_DEGREE
}

struct Frame {
    path: Vec<NodeIndex>,
    successors: Vec<NodeIndex>,
    cursor: usize,
}

/// Explicit-stack DFS from one start node, pre-order.
fn walk_from(
    graph: &TransactionGraph,
    degrees: &[usize],
    start: NodeIndex,
    collector: &mut ChainCollector,
) {
    let mut stack = vec![Frame {
        path: vec![start],
        successors: graph.successors(start),
        cursor: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.cursor >= frame.successors.len() {
            stack.pop();
            continue;
        }
        let neighbor = frame.successors[frame.cursor];
        frame.cursor += 1;

        // Revisiting a path node would close a loop, not a chain.
        if frame.path.contains(&neighbor) {
            continue;
        }

        let mut extended = frame.path.clone();
        extended.push(neighbor);
        let hops = extended.len() - 1;

        // Everything between the endpoints must be a shell.
        let intermediates_ok = extended[1..extended.len() - 1]
            .iter()
            .all(|&n| is_shell(degrees, n));
        if !intermediates_ok {
            // Chain broken by a busy intermediate. The path up to the
            // previous node may still be worth recording.
            if hops - 1 >= MIN_CHAIN_LENGTH {
                let parent = extended[..extended.len() - 1].to_vec();
                collector.record(graph, degrees, parent);
            }
            continue;
        }

        if hops >= MIN_CHAIN_LENGTH {
            collector.record(graph, degrees, extended.clone());
        }

        if hops < MAX_CHAIN_LENGTH {
            let successors = graph.successors(neighbor);
            stack.push(Frame {
                path: extended,
                successors,
                cursor: 0,
            });
        }
    }
}

struct ChainCollector {
    /// Ordered node sequences already reported, across all start nodes.
    recorded: HashSet<Vec<NodeIndex>>,
    seq: RingSequence,
    rings: Vec<Ring>,
    truncated: bool,
}

impl ChainCollector {
    fn record(&mut self, graph: &TransactionGraph, degrees: &[usize], chain: Vec<NodeIndex>) {
        if self.rings.len() >= MAX_RETAINED_CHAINS {
            self.truncated = true;
            return;
        }
        if !self.recorded.insert(chain.clone()) {
            return;
        }

        let shell_nodes: Vec<_> = chain[1..chain.len() - 1]
            .iter()
            .filter(|&&n| is_shell(degrees, n))
            .map(|&n| graph.account(n).clone())
            .collect();
        let total_amount = chain_amount(graph, &chain);
        let hops = chain.len() - 1;
        let risk = shell_risk_score(hops, shell_nodes.len(), total_amount);

        self.rings.push(Ring {
            ring_id: self.seq.next_id(),
            members: chain.iter().map(|&n| graph.account(n).clone()).collect(),
            total_amount: round2(total_amount),
            risk_score: round2(risk),
            kind: RingKind::ShellChain {
                chain_length: hops,
                shell_nodes,
            },
        });
    }
}

/// Sum over consecutive pairs of the largest parallel-edge amount — a
/// proxy for the main transfer on each hop, unlike the all-edges sum the
/// cycle detector uses.
fn chain_amount(graph: &TransactionGraph, chain: &[NodeIndex]) -> f64 {
    let mut total = 0.0;
    for pair in chain.windows(2) {
        let best = graph
            .edges_between(pair[0], pair[1])
            .iter()
            .map(|e| e.amount)
            .fold(f64::NEG_INFINITY, f64::max);
        if best.is_finite() {
            total += best;
        }
    }
    total
}

/// Scores a chain 0–100: more hops mean more layering, more shells mean
/// more deliberate obfuscation, and the amount is log-scaled.
fn shell_risk_score(hops: usize, shell_count: usize, total_amount: f64) -> f64 {
    let hop_score = ((hops * 8) as f64).min(40.0);
    let shell_score = ((shell_count * 10) as f64).min(30.0);
    let amount_score = (total_amount.max(1.0).log10() * 5.0).min(30.0);
    (hop_score + shell_score + amount_score).min(100.0)
}
