//! Reference graph store.
//!
//! `GraphStore` owns one analysis run: the identity registry, the graph, the
//! ownership tracker and the strong-edge index. It enforces the protocol
//!
//! ```text
//! AwaitingTargetAndHeldValues → AcceptingDefinitions → MarkingStrongReferences
//!     → MarkedStrongReferences → Summarizing → Summarized
//! ```
//!
//! with `Error` reachable from anywhere. Every error moves the store into
//! `Error`; after that, every call fails with a protocol error.

pub mod graph;
pub mod state;
mod define;

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;

use crate::config::GraphConfig;
use crate::hooks::{GraphHooks, NoOpHooks};
use crate::ownership::{OwnershipError, OwnershipTracker, ResolutionStats};
use crate::registry::{IdentityRegistry, SequenceCounters, WeakKey};
use crate::summarizer::summarize_to_target;
use crate::types::{EdgeId, GraphEdge, GraphError, GraphNode, GraphResult, NodeId};

pub use graph::IndexedGraph;
pub use state::GraphState;

/// Reference graph for one retention analysis.
///
/// `K` is the producer's identity handle; `M` is the metadata attached to
/// nodes and edges, stored and returned verbatim.
pub struct GraphStore<K, M> {
    config: GraphConfig,
    state: Cell<GraphState>,
    registry: IdentityRegistry<K>,
    graph: IndexedGraph<M>,
    edge_counters: SequenceCounters,
    tracker: OwnershipTracker<NodeId, EdgeId>,
    /// Edges whose owner sets were all strong during resolution.
    strong_edges: HashSet<EdgeId>,
    hooks: Box<dyn GraphHooks<M>>,
}

impl<K: WeakKey, M> Default for GraphStore<K, M> {
    fn default() -> Self {
        Self::with_config(GraphConfig::default())
    }
}

impl<K: WeakKey, M> GraphStore<K, M> {
    /// Create an empty store with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom budget caps.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            state: Cell::new(GraphState::default()),
            registry: IdentityRegistry::new(),
            graph: IndexedGraph::new(),
            edge_counters: SequenceCounters::default(),
            tracker: OwnershipTracker::new(),
            strong_edges: HashSet::new(),
            hooks: Box::new(NoOpHooks),
        }
    }

    /// Install instrumentation hooks.
    pub fn with_hooks<H: GraphHooks<M> + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state.get()
    }

    /// Budget caps in effect.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ── protocol ────────────────────────────────────────────────────────────

    /// Move into `Error`, notify hooks, and hand the error back for returning.
    fn fail(&self, err: GraphError) -> GraphError {
        tracing::error!(
            kind = err.kind(),
            error = %err,
            state = %self.state.get(),
            "Retention graph entering error state"
        );
        self.hooks.before_fatal(&err);
        self.state.set(GraphState::Error);
        err
    }

    fn guarded<T>(&self, result: GraphResult<T>) -> GraphResult<T> {
        result.map_err(|err| self.fail(err))
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: impl Fn(GraphState) -> bool,
    ) -> GraphResult<()> {
        let state = self.state.get();
        if state.is_error() || !allowed(state) {
            return Err(GraphError::Protocol { operation, state });
        }
        Ok(())
    }

    fn require_accepting(&self, operation: &'static str) -> GraphResult<()> {
        self.require(operation, |s| s == GraphState::AcceptingDefinitions)
    }

    fn require_defined(&self, operation: &'static str) -> GraphResult<()> {
        self.require(operation, |s| s.has_reached(GraphState::AcceptingDefinitions))
    }

    fn require_marked(&self, operation: &'static str) -> GraphResult<()> {
        self.require(operation, |s| s.has_reached(GraphState::MarkedStrongReferences))
    }

    /// Tracker misuse is a protocol error in the current state; an empty
    /// owner set is malformed input.
    fn ownership_error(&self, operation: &'static str, err: OwnershipError) -> GraphError {
        match err {
            OwnershipError::EmptyOwnerSet => GraphError::Invariant(err.to_string()),
            OwnershipError::DefinitionAfterResolution | OwnershipError::AlreadyResolved => {
                GraphError::Protocol {
                    operation,
                    state: self.state.get(),
                }
            }
        }
    }

    fn pair(&self, operation: &'static str) -> GraphResult<(NodeId, NodeId)> {
        self.registry
            .target_and_held_values()
            .cloned()
            .ok_or(GraphError::Protocol {
                operation,
                state: self.state.get(),
            })
    }

    // ── resolution ──────────────────────────────────────────────────────────

    /// Resolve strong reachability from the held values.
    ///
    /// Ends the definition phase; may run only once.
    pub fn mark_strong_references(&mut self) -> GraphResult<ResolutionStats> {
        let result = self.mark_strong_references_inner();
        self.guarded(result)
    }

    fn mark_strong_references_inner(&mut self) -> GraphResult<ResolutionStats> {
        const OP: &str = "mark_strong_references";
        self.require_accepting(OP)?;
        let (_, held_values) = self.pair(OP)?;
        self.state.set(GraphState::MarkingStrongReferences);

        let strong_edges = &mut self.strong_edges;
        let hooks = &self.hooks;
        let stats = self
            .tracker
            .resolve(
                held_values,
                |satisfied| {
                    strong_edges.insert(satisfied.edge.clone());
                },
                |id| hooks.node_enqueued(id),
            )
            .map_err(|err| self.ownership_error(OP, err))?;

        self.state.set(GraphState::MarkedStrongReferences);
        tracing::info!(
            resolved = stats.resolved_keys,
            strong_edges = stats.satisfied_edges,
            pending_edges = stats.pending_edges,
            weak_edges = self.tracker.weak_edge_count(),
            "Marked strong references"
        );
        Ok(stats)
    }

    /// Whether the identity `key` is strongly held.
    pub fn is_held_strongly(&self, key: &K) -> GraphResult<bool> {
        let result = self.require_marked("is_held_strongly").and_then(|()| {
            let id = self.registry.id_for(key)?;
            Ok(self.tracker.is_resolved(id))
        });
        self.guarded(result)
    }

    /// Whether the node `id` (identity or tuple) is strongly held.
    pub fn is_node_held_strongly(&self, id: &NodeId) -> GraphResult<bool> {
        let result = self.require_marked("is_node_held_strongly").and_then(|()| {
            if !self.graph.contains_node(id) {
                return Err(GraphError::NotFound(format!("node {id}")));
            }
            Ok(self.tracker.is_resolved(id))
        });
        self.guarded(result)
    }

    /// Whether the edge `id` propagated strength during resolution.
    pub fn is_edge_held_strongly(&self, id: &EdgeId) -> GraphResult<bool> {
        let result = self.require_marked("is_edge_held_strongly").and_then(|()| {
            if !self.graph.contains_edge(id) {
                return Err(GraphError::NotFound(format!("edge {id}")));
            }
            Ok(self.strong_edges.contains(id))
        });
        self.guarded(result)
    }

    // ── summarization ───────────────────────────────────────────────────────

    /// Reduce the graph to the held-values → target paths.
    ///
    /// With `strong_only`, only edges that propagated strength count, and the
    /// result is empty unless the target is strongly held. Without it, any
    /// edge counts. May run only once, after resolution.
    pub fn summarize_graph_to_target(&mut self, strong_only: bool) -> GraphResult<IndexedGraph<M>>
    where
        M: Clone,
    {
        let result = self.summarize_inner(strong_only);
        self.guarded(result)
    }

    fn summarize_inner(&mut self, strong_only: bool) -> GraphResult<IndexedGraph<M>>
    where
        M: Clone,
    {
        const OP: &str = "summarize_graph_to_target";
        self.require(OP, |s| s == GraphState::MarkedStrongReferences)?;
        let (target, held_values) = self.pair(OP)?;
        self.state.set(GraphState::Summarizing);

        let summary = if strong_only {
            if self.tracker.is_resolved(&target) {
                let strong_edges = &self.strong_edges;
                summarize_to_target(&self.graph, &held_values, &target, |edge| {
                    strong_edges.contains(&edge.id)
                })?
            } else {
                IndexedGraph::new()
            }
        } else {
            summarize_to_target(&self.graph, &held_values, &target, |_| true)?
        };

        self.state.set(GraphState::Summarized);
        tracing::info!(
            strong_only,
            nodes = summary.node_count(),
            edges = summary.edge_count(),
            "Summarized graph to target"
        );
        Ok(summary)
    }

    // ── inspection ──────────────────────────────────────────────────────────

    /// Look up an edge by id.
    pub fn get_edge_relationship(&self, id: &EdgeId) -> GraphResult<&GraphEdge<M>> {
        let result = self.require_defined("get_edge_relationship").and_then(|()| {
            self.graph
                .edge(id)
                .ok_or_else(|| GraphError::NotFound(format!("edge {id}")))
        });
        self.guarded(result)
    }

    /// Node id of a registered identity.
    pub fn get_weak_key_id(&self, key: &K) -> GraphResult<NodeId> {
        let result = self
            .require_defined("get_weak_key_id")
            .and_then(|()| self.registry.id_for(key).cloned());
        self.guarded(result)
    }

    /// Whether `key` is registered. Never fails.
    pub fn has_weak_key(&self, key: &K) -> bool {
        self.registry.contains(key)
    }

    /// Deep copy of the whole graph.
    pub fn clone_graph(&self) -> GraphResult<IndexedGraph<M>>
    where
        M: Clone,
    {
        let result = self
            .require_defined("clone_graph")
            .map(|()| self.graph.clone());
        self.guarded(result)
    }

    /// Borrow the graph without copying it.
    pub fn graph(&self) -> &IndexedGraph<M> {
        &self.graph
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode<M>> {
        self.graph.node(id)
    }

    /// Id of the target node, once defined.
    pub fn target_id(&self) -> Option<&NodeId> {
        self.registry.target_and_held_values().map(|(target, _)| target)
    }

    /// Id of the held-values node, once defined.
    pub fn held_values_id(&self) -> Option<&NodeId> {
        self.registry.target_and_held_values().map(|(_, held)| held)
    }

    /// Number of nodes, tuples included.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<K, M> fmt::Debug for GraphStore<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("state", &self.state.get())
            .field("config", &self.config)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("strong_edges", &self.strong_edges.len())
            .finish()
    }
}
