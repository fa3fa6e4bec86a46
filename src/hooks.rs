//! Observational instrumentation hooks.
//!
//! Hooks see node and edge definitions, every key entering the resolution
//! queue, and every fatal error just before it is returned. They cannot
//! change what the graph does.

use std::sync::{Arc, Mutex};

use crate::types::{EdgeId, EdgeType, GraphEdge, GraphError, GraphNode, NodeId, NodeKind};

/// Instrumentation interface for a [`GraphStore`](crate::GraphStore).
///
/// Every method defaults to doing nothing.
pub trait GraphHooks<M> {
    /// A node was defined.
    fn node_defined(&self, _node: &GraphNode<M>) {}

    /// An edge was defined.
    fn edge_defined(&self, _edge: &GraphEdge<M>) {}

    /// A node entered the resolution queue.
    fn node_enqueued(&self, _id: &NodeId) {}

    /// A fatal error is about to be returned.
    fn before_fatal(&self, _error: &GraphError) {}
}

impl<M, H: GraphHooks<M> + ?Sized> GraphHooks<M> for Arc<H> {
    fn node_defined(&self, node: &GraphNode<M>) {
        (**self).node_defined(node)
    }

    fn edge_defined(&self, edge: &GraphEdge<M>) {
        (**self).edge_defined(edge)
    }

    fn node_enqueued(&self, id: &NodeId) {
        (**self).node_enqueued(id)
    }

    fn before_fatal(&self, error: &GraphError) {
        (**self).before_fatal(error)
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHooks;

impl<M> GraphHooks<M> for NoOpHooks {}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// A node was defined.
    NodeDefined(NodeId, NodeKind),
    /// An edge was defined.
    EdgeDefined(EdgeId, EdgeType),
    /// A node entered the resolution queue.
    NodeEnqueued(NodeId),
    /// A fatal error of the given kind was raised.
    Fatal(&'static str),
}

/// Hooks that record every invocation, for tests and debugging sessions.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<HookEvent>>,
}

impl RecordingHooks {
    fn push(&self, event: HookEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<HookEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Ids in the order they entered the resolution queue.
    pub fn enqueued(&self) -> Vec<NodeId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::NodeEnqueued(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl<M> GraphHooks<M> for RecordingHooks {
    fn node_defined(&self, node: &GraphNode<M>) {
        self.push(HookEvent::NodeDefined(node.id.clone(), node.kind));
    }

    fn edge_defined(&self, edge: &GraphEdge<M>) {
        self.push(HookEvent::EdgeDefined(edge.id.clone(), edge.edge_type));
    }

    fn node_enqueued(&self, id: &NodeId) {
        self.push(HookEvent::NodeEnqueued(id.clone()));
    }

    fn before_fatal(&self, error: &GraphError) {
        self.push(HookEvent::Fatal(error.kind()));
    }
}
