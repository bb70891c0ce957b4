use crate::core::account::AccountId;
use crate::core::transaction::{Transaction, TransactionId, TransactionTable};
use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Attributes carried by one edge of the multigraph — one edge per
/// transaction, parallel edges preserved (no coalescing).
#[derive(Debug, Clone)]
pub struct TxnEdge {
    pub txn_id: TransactionId,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Directed multigraph of accounts.
///
/// Nodes are accounts; each retained transaction contributes exactly one
/// directed edge sender → receiver. Node indices follow first appearance
/// in the cleaned table, which is the "graph order" all detectors iterate
/// in — given the same input the whole pipeline is deterministic.
///
/// The graph is constructed once and frozen before any detector runs.
///
/// # Examples
///
/// ```
/// use mule_detector::core::account::AccountId;
/// use mule_detector::core::transaction::{parse_timestamp, Transaction, TransactionId, TransactionTable};
/// use mule_detector::graph::transaction_graph::TransactionGraph;
///
/// let table: TransactionTable = vec![
///     Transaction::new(
///         TransactionId::new("T1"),
///         AccountId::new("A"),
///         AccountId::new("B"),
///         100.0,
///         parse_timestamp("2026-02-01T00:00:00").unwrap(),
///     ),
/// ]
/// .into_iter()
/// .collect();
///
/// let graph = TransactionGraph::from_table(&table);
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionGraph {
    graph: DiGraph<AccountId, TxnEdge>,
    nodes: HashMap<AccountId, NodeIndex>,
}

impl TransactionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize the multigraph from a cleaned transaction table.
    pub fn from_table(table: &TransactionTable) -> Self {
        let mut graph = Self::new();
        for txn in table.rows() {
            graph.add_transaction(txn);
        }
        graph
    }

    /// Add one transaction as a directed edge, interning both endpoints.
    pub fn add_transaction(&mut self, txn: &Transaction) {
        let from = self.intern(txn.sender());
        let to = self.intern(txn.receiver());
        self.graph.add_edge(
            from,
            to,
            TxnEdge {
                txn_id: txn.id().clone(),
                amount: txn.amount(),
                timestamp: txn.timestamp(),
            },
        );
    }

    fn intern(&mut self, account: &AccountId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(account) {
            return idx;
        }
        let idx = self.graph.add_node(account.clone());
        self.nodes.insert(account.clone(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in graph order (first appearance in the table).
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn account(&self, node: NodeIndex) -> &AccountId {
        &self.graph[node]
    }

    pub fn node(&self, account: &AccountId) -> Option<NodeIndex> {
        self.nodes.get(account).copied()
    }

    pub fn contains_account(&self, account: &AccountId) -> bool {
        self.nodes.contains_key(account)
    }

    /// Unique successors of `node`, sorted by account id.
    pub fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        out.sort_by(|&a, &b| self.graph[a].cmp(&self.graph[b]));
        out.dedup();
        out
    }

    /// Unique predecessors of `node`, sorted by account id.
    pub fn predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        out.sort_by(|&a, &b| self.graph[a].cmp(&self.graph[b]));
        out.dedup();
        out
    }

    /// All parallel edges from `from` to `to`.
    pub fn edges_between(&self, from: NodeIndex, to: NodeIndex) -> Vec<&TxnEdge> {
        self.graph
            .edges_connecting(from, to)
            .map(|e| e.weight())
            .collect()
    }

    /// Outgoing edges of `node` as (target, attributes) pairs.
    pub fn out_edges(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, &TxnEdge)> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Incoming edges of `node` as (source, attributes) pairs.
    pub fn in_edges(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, &TxnEdge)> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    /// In-degree counting parallel edges.
    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Incoming).count()
    }

    /// Out-degree counting parallel edges.
    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Outgoing).count()
    }

    /// Total degree (in + out), counting parallel edges.
    pub fn total_degree(&self, node: NodeIndex) -> usize {
        self.in_degree(node) + self.out_degree(node)
    }

    /// The underlying petgraph structure, for graph algorithms.
    pub fn inner(&self) -> &DiGraph<AccountId, TxnEdge> {
        &self.graph
    }
}
