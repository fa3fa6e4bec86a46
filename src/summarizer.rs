//! Target-directed graph summarizer.
//!
//! Reduces a reference graph to the nodes and edges that lie on some path from
//! the held-values root to the target.
//!
//! ## Algorithm
//!
//! 1. Walk backward from the target over inbound edges accepted by the
//!    filter. Each followed edge contributes its source *and every joint
//!    owner* to the frontier, since a tuple's strength depends on more than
//!    its direct parent
//! 2. Walk forward from the root over outbound edges accepted by the filter
//! 3. Keep the nodes found by both walks, and the backward edges whose
//!    endpoints both survived
//!
//! No path is enumerated, so the cost stays linear even when the number of
//! distinct root-to-target paths is exponential. Every explanatory path is
//! preserved, not just the shortest.

use std::collections::{HashSet, VecDeque};

use crate::store::IndexedGraph;
use crate::types::{EdgeId, GraphEdge, GraphResult, NodeId};

/// Nodes and edges found by the backward walk.
#[derive(Debug, Default)]
struct BackwardSlice {
    nodes: HashSet<NodeId>,
    edges: HashSet<EdgeId>,
}

fn walk_backward<M, F>(graph: &IndexedGraph<M>, target: &NodeId, follow: &F) -> BackwardSlice
where
    F: Fn(&GraphEdge<M>) -> bool,
{
    let mut slice = BackwardSlice::default();
    let mut frontier: VecDeque<NodeId> = VecDeque::new();
    slice.nodes.insert(target.clone());
    frontier.push_back(target.clone());

    while let Some(current) = frontier.pop_front() {
        for edge in graph.inbound(&current) {
            if !follow(edge) {
                continue;
            }
            slice.edges.insert(edge.id.clone());
            for owner in std::iter::once(&edge.from).chain(edge.joint_owners.iter()) {
                if slice.nodes.insert(owner.clone()) {
                    frontier.push_back(owner.clone());
                }
            }
        }
    }

    slice
}

fn walk_forward<M, F>(graph: &IndexedGraph<M>, root: &NodeId, follow: &F) -> HashSet<NodeId>
where
    F: Fn(&GraphEdge<M>) -> bool,
{
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<NodeId> = VecDeque::new();
    visited.insert(root.clone());
    frontier.push_back(root.clone());

    while let Some(current) = frontier.pop_front() {
        for edge in graph.outbound(&current) {
            if follow(edge) && visited.insert(edge.to.clone()) {
                frontier.push_back(edge.to.clone());
            }
        }
    }

    visited
}

/// Slice `graph` down to the root-to-target paths made of edges accepted by
/// `follow`.
///
/// Returns an empty graph when the target is not reachable from the root
/// under the filter.
pub fn summarize_to_target<M, F>(
    graph: &IndexedGraph<M>,
    root: &NodeId,
    target: &NodeId,
    follow: F,
) -> GraphResult<IndexedGraph<M>>
where
    M: Clone,
    F: Fn(&GraphEdge<M>) -> bool,
{
    let backward = walk_backward(graph, target, &follow);
    if !backward.nodes.contains(root) {
        return Ok(IndexedGraph::new());
    }
    let forward = walk_forward(graph, root, &follow);
    if !forward.contains(target) {
        return Ok(IndexedGraph::new());
    }

    let mut summary = IndexedGraph::new();
    for node in graph.nodes() {
        if backward.nodes.contains(&node.id) && forward.contains(&node.id) {
            summary.add_node(node.clone())?;
        }
    }
    for edge in graph.edges() {
        if backward.edges.contains(&edge.id)
            && summary.contains_node(&edge.from)
            && summary.contains_node(&edge.to)
        {
            summary.add_edge(edge.clone())?;
        }
    }

    tracing::debug!(
        nodes = summary.node_count(),
        edges = summary.edge_count(),
        source_nodes = graph.node_count(),
        source_edges = graph.edge_count(),
        "Summarized graph to target"
    );

    Ok(summary)
}
