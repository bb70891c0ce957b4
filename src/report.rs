//! Assembles the final ranked report and its external download view.

use crate::core::account::AccountId;
use crate::core::ring::{round2, FlaggedAccount, PatternTag, Ring};
use crate::graph::transaction_graph::TransactionGraph;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One entry of the ranked account list.
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousAccount {
    pub account_id: AccountId,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<PatternTag>,
    pub ring_id: String,
}

/// One entry of the ring list.
#[derive(Debug, Clone, Serialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<AccountId>,
    pub pattern_type: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// Node listing for visualization. Internal-only: lives behind the
/// underscore-prefixed report key.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: AccountId,
    pub suspicious: bool,
    pub suspicion_score: f64,
    pub ring_id: Option<String>,
    pub in_degree: usize,
    pub out_degree: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: AccountId,
    pub target: AccountId,
    pub amount: f64,
    pub timestamp: String,
    pub txn_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// The full analysis result. Keys whose name begins with an underscore
/// are internal and excluded from the download view.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
    #[serde(rename = "_graph_data")]
    pub graph_data: GraphData,
}

impl Report {
    /// The report as JSON with every internal (underscore-prefixed)
    /// top-level key removed — the shape served for download.
    pub fn download_view(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(map) = &mut value {
            map.retain(|key, _| !key.starts_with('_'));
        }
        value
    }
}

/// Assemble the report from the filtered accounts and rings.
///
/// Accounts sort by score descending with account id as the tie-break;
/// rings de-duplicate by id keeping first occurrence and sort by risk
/// descending with ring id as the tie-break.
pub fn build_report(
    graph: &TransactionGraph,
    accounts: Vec<FlaggedAccount>,
    rings: Vec<Ring>,
    processing_time_seconds: f64,
) -> Report {
    let mut suspicious_accounts: Vec<SuspiciousAccount> = accounts
        .iter()
        .map(|acc| SuspiciousAccount {
            account_id: acc.account_id.clone(),
            suspicion_score: acc.suspicion_score,
            detected_patterns: acc.detected_patterns.clone(),
            ring_id: acc.ring_id.clone(),
        })
        .collect();
    suspicious_accounts.sort_by(|a, b| {
        b.suspicion_score
            .total_cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let mut seen_ring_ids = HashSet::new();
    let mut fraud_rings: Vec<FraudRing> = Vec::new();
    for ring in &rings {
        if !seen_ring_ids.insert(ring.ring_id.clone()) {
            continue;
        }
        fraud_rings.push(FraudRing {
            ring_id: ring.ring_id.clone(),
            member_accounts: ring.members.clone(),
            pattern_type: ring.pattern_type().to_string(),
            risk_score: ring.risk_score,
        });
    }
    fraud_rings.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.ring_id.cmp(&b.ring_id))
    });

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
        processing_time_seconds: round2(processing_time_seconds),
    };

    let graph_data = export_graph(graph, &suspicious_accounts, &fraud_rings, &accounts);

    Report {
        suspicious_accounts,
        fraud_rings,
        summary,
        graph_data,
    }
}

fn export_graph(
    graph: &TransactionGraph,
    suspicious: &[SuspiciousAccount],
    fraud_rings: &[FraudRing],
    accounts: &[FlaggedAccount],
) -> GraphData {
    let suspicious_ids: HashSet<&AccountId> = suspicious.iter().map(|a| &a.account_id).collect();
    let score_of: HashMap<&AccountId, f64> = accounts
        .iter()
        .map(|a| (&a.account_id, a.suspicion_score))
        .collect();

    let mut ring_membership: HashMap<&AccountId, &str> = HashMap::new();
    for ring in fraud_rings {
        for member in &ring.member_accounts {
            ring_membership.insert(member, &ring.ring_id);
        }
    }

    let nodes = graph
        .node_indices()
        .map(|n| {
            let id = graph.account(n);
            GraphNode {
                id: id.clone(),
                suspicious: suspicious_ids.contains(id),
                suspicion_score: score_of.get(id).copied().unwrap_or(0.0),
                ring_id: ring_membership.get(id).map(|r| r.to_string()),
                in_degree: graph.in_degree(n),
                out_degree: graph.out_degree(n),
            }
        })
        .collect();

    let mut edges = Vec::with_capacity(graph.edge_count());
    for n in graph.node_indices() {
        for (target, edge) in graph.out_edges(n) {
            edges.push(GraphEdge {
                source: graph.account(n).clone(),
                target: graph.account(target).clone(),
                amount: edge.amount,
                timestamp: edge.timestamp.to_string(),
                txn_id: edge.txn_id.to_string(),
            });
        }
    }

    GraphData { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ring::RingKind;
    use crate::core::transaction::{parse_timestamp, Transaction, TransactionId, TransactionTable};

    fn sample_graph() -> TransactionGraph {
        let table: TransactionTable = vec![
            Transaction::new(
                TransactionId::new("T1"),
                AccountId::new("A"),
                AccountId::new("B"),
                100.0,
                parse_timestamp("2026-02-01T00:00:00").unwrap(),
            ),
            Transaction::new(
                TransactionId::new("T2"),
                AccountId::new("B"),
                AccountId::new("C"),
                200.0,
                parse_timestamp("2026-02-01T01:00:00").unwrap(),
            ),
        ]
        .into_iter()
        .collect();
        TransactionGraph::from_table(&table)
    }

    fn flagged(id: &str, score: f64) -> FlaggedAccount {
        FlaggedAccount {
            account_id: AccountId::new(id),
            suspicion_score: score,
            detected_patterns: vec![PatternTag::ShellChain],
            ring_id: "RING_H_001".to_string(),
            ring_ids: vec!["RING_H_001".to_string()],
        }
    }

    fn shell_ring(id: &str, risk: f64) -> Ring {
        Ring {
            ring_id: id.to_string(),
            members: vec![AccountId::new("A"), AccountId::new("B"), AccountId::new("C")],
            total_amount: 300.0,
            risk_score: risk,
            kind: RingKind::ShellChain {
                chain_length: 3,
                shell_nodes: vec![AccountId::new("B")],
            },
        }
    }

    #[test]
    fn test_accounts_sorted_by_score_then_id() {
        let graph = sample_graph();
        let report = build_report(
            &graph,
            vec![flagged("B", 50.0), flagged("C", 80.0), flagged("A", 50.0)],
            vec![],
            0.01,
        );
        let order: Vec<_> = report
            .suspicious_accounts
            .iter()
            .map(|a| a.account_id.to_string())
            .collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_rings_deduplicated_and_sorted() {
        let graph = sample_graph();
        let report = build_report(
            &graph,
            vec![],
            vec![
                shell_ring("RING_H_001", 40.0),
                shell_ring("RING_H_002", 90.0),
                shell_ring("RING_H_001", 40.0),
            ],
            0.01,
        );
        let ids: Vec<_> = report.fraud_rings.iter().map(|r| r.ring_id.clone()).collect();
        assert_eq!(ids, vec!["RING_H_002", "RING_H_001"]);
        assert_eq!(report.summary.fraud_rings_detected, 2);
    }

    #[test]
    fn test_summary_counts() {
        let graph = sample_graph();
        let report = build_report(&graph, vec![flagged("A", 50.0)], vec![], 1.234);
        assert_eq!(report.summary.total_accounts_analyzed, 3);
        assert_eq!(report.summary.suspicious_accounts_flagged, 1);
        assert_eq!(report.summary.processing_time_seconds, 1.23);
    }

    #[test]
    fn test_graph_data_degrees_and_flags() {
        let graph = sample_graph();
        let report = build_report(&graph, vec![flagged("B", 50.0)], vec![], 0.0);

        assert_eq!(report.graph_data.nodes.len(), 3);
        assert_eq!(report.graph_data.edges.len(), 2);

        let b = report
            .graph_data
            .nodes
            .iter()
            .find(|n| n.id == AccountId::new("B"))
            .unwrap();
        assert!(b.suspicious);
        assert_eq!(b.suspicion_score, 50.0);
        assert_eq!(b.in_degree, 1);
        assert_eq!(b.out_degree, 1);
    }

    #[test]
    fn test_download_view_strips_internal_keys() {
        let graph = sample_graph();
        let report = build_report(&graph, vec![flagged("A", 50.0)], vec![], 0.0);

        let full = serde_json::to_value(&report).unwrap();
        assert!(full.get("_graph_data").is_some());

        let download = report.download_view();
        assert!(download.get("_graph_data").is_none());
        assert!(download.get("suspicious_accounts").is_some());
        assert!(download.get("fraud_rings").is_some());
        assert!(download.get("summary").is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let graph = sample_graph();
        let report = build_report(&graph, vec![flagged("A", 50.0)], vec![shell_ring("RING_H_001", 60.0)], 0.0);
        let value = serde_json::to_value(&report).unwrap();

        let account = &value["suspicious_accounts"][0];
        assert_eq!(account["account_id"], "A");
        assert_eq!(account["detected_patterns"][0], "shell_chain");
        assert_eq!(account["ring_id"], "RING_H_001");

        let ring = &value["fraud_rings"][0];
        assert_eq!(ring["pattern_type"], "shell_chain");
        assert_eq!(ring["member_accounts"][0], "A");
    }
}
