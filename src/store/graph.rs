//! Labeled directed multigraph with id indexes.
//!
//! Wraps a petgraph `StableDiGraph` so nodes and edges can be looked up by
//! their string ids in O(1). Parallel edges are allowed. Nothing is ever
//! removed, so petgraph index order equals insertion order.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::types::{EdgeId, GraphEdge, GraphError, GraphNode, GraphResult, NodeId};

/// Reference graph storage.
#[derive(Debug, Clone)]
pub struct IndexedGraph<M> {
    graph: StableDiGraph<GraphNode<M>, GraphEdge<M>>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
}

impl<M> Default for IndexedGraph<M> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::default(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
        }
    }
}

impl<M> IndexedGraph<M> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Its id must not be present yet.
    pub fn add_node(&mut self, node: GraphNode<M>) -> GraphResult<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(GraphError::DuplicateDefinition(format!("node {}", node.id)));
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        Ok(())
    }

    /// Add an edge between two existing nodes.
    pub fn add_edge(&mut self, edge: GraphEdge<M>) -> GraphResult<()> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(GraphError::DuplicateDefinition(format!("edge {}", edge.id)));
        }
        let from = self.index_of(&edge.from)?;
        let to = self.index_of(&edge.to)?;
        let id = edge.id.clone();
        let idx = self.graph.add_edge(from, to, edge);
        self.edge_index.insert(id, idx);
        Ok(())
    }

    fn index_of(&self, id: &NodeId) -> GraphResult<NodeIndex> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NotFound(format!("node {id}")))
    }

    /// Look up a node.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode<M>> {
        self.node_index.get(id).and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Look up an edge.
    pub fn edge(&self, id: &EdgeId) -> Option<&GraphEdge<M>> {
        self.edge_index.get(id).and_then(|&idx| self.graph.edge_weight(idx))
    }

    /// Whether a node with this id exists.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    /// Whether an edge with this id exists.
    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_index.contains_key(id)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<M>> {
        self.graph.node_indices().filter_map(|idx| self.graph.node_weight(idx))
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge<M>> {
        self.graph.edge_indices().filter_map(|idx| self.graph.edge_weight(idx))
    }

    /// Edges pointing at `id`.
    pub fn inbound<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a GraphEdge<M>> + 'a {
        self.directed(id, Direction::Incoming)
    }

    /// Edges leaving `id`.
    pub fn outbound<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a GraphEdge<M>> + 'a {
        self.directed(id, Direction::Outgoing)
    }

    fn directed<'a>(
        &'a self,
        id: &NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = &'a GraphEdge<M>> + 'a {
        self.node_index
            .get(id)
            .copied()
            .into_iter()
            .flat_map(move |idx| {
                self.graph
                    .edges_directed(idx, direction)
                    .map(|edge| edge.weight())
            })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
