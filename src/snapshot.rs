//! Serializable snapshots of a reference graph.
//!
//! A `GraphSnapshot` lists nodes and edges in insertion order. When the
//! metadata type serializes, so does the snapshot, and its fingerprint is a
//! canonical xxh64 digest of the whole thing.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, to_canonical_bytes, try_canonical_hash_hex};
use crate::store::IndexedGraph;
use crate::types::{GraphEdge, GraphNode, GraphResult};
use crate::RETENTION_GRAPH_SCHEMA_VERSION;

/// Flat copy of a graph, suitable for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot<M> {
    /// Schema version used for types.
    pub schema_version: String,
    /// Nodes in insertion order.
    pub nodes: Vec<GraphNode<M>>,
    /// Edges in insertion order.
    pub edges: Vec<GraphEdge<M>>,
}

impl<M: Clone> GraphSnapshot<M> {
    /// Capture the current contents of `graph`.
    pub fn capture(graph: &IndexedGraph<M>) -> Self {
        Self {
            schema_version: RETENTION_GRAPH_SCHEMA_VERSION.to_string(),
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().cloned().collect(),
        }
    }
}

impl<M: Clone> IndexedGraph<M> {
    /// Flat, serializable copy of this graph.
    pub fn snapshot(&self) -> GraphSnapshot<M> {
        GraphSnapshot::capture(self)
    }
}

impl<M> GraphSnapshot<M> {
    /// Rebuild a graph from this snapshot.
    ///
    /// Fails if an edge refers to a node the snapshot does not contain, or if
    /// an id repeats.
    pub fn into_graph(self) -> GraphResult<IndexedGraph<M>> {
        let mut graph = IndexedGraph::new();
        for node in self.nodes {
            graph.add_node(node)?;
        }
        for edge in self.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl<M: Serialize> GraphSnapshot<M> {
    /// Serialize to canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    /// Content fingerprint of the snapshot.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Like [`fingerprint`](Self::fingerprint), but reports metadata that
    /// cannot be serialized instead of panicking.
    pub fn try_fingerprint(&self) -> serde_json::Result<String> {
        try_canonical_hash_hex(self)
    }
}
