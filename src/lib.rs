//! # retention-graph
//!
//! Joint-ownership reachability analysis for object reference graphs.
//!
//! The retention graph answers one question:
//!
//! > Is the target object kept alive through **strong** references from a
//! > set of held values, and if so, along which paths?
//!
//! ## Core Contract
//!
//! 1. A producer registers identities (objects, symbols, private names) and
//!    the references between them, each flagged strong or weak
//! 2. Multi-party relationships (weak-map entries, finalization registrations,
//!    private fields) become tuple nodes, so an edge has at most two joint
//!    owners and is strong only when *all* of them are
//! 3. Resolution propagates strength from the held values to a fixpoint
//! 4. Summarization reduces the graph to the held-values → target paths
//!
//! ## Architecture
//!
//! ```text
//! Producer → GraphStore (define_*) → OwnershipTracker → strong edge set
//!                                                           ↓
//!                                  summarize_graph_to_target → IndexedGraph
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same definitions in the same order → identical ids and identical snapshots
//! - Ids are `prefix:sequence` with an independent counter per prefix
//! - Resolution order is FIFO from the held-values node

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod registry;
pub mod ownership;
pub mod store;
pub mod summarizer;
pub mod hooks;
pub mod config;
pub mod canonical;
pub mod snapshot;

// Re-exports
pub use types::{
    NodeId, EdgeId, GraphNode, NodeKind, GraphEdge, EdgeType, EdgeDescriptor, JointOwners,
    ValueRef, KeyValueEntry, FinalizationEntry, PrivateFieldEntry, TupleIds,
    GraphError, GraphResult,
};
pub use registry::{WeakKey, IdentityRegistry};
pub use ownership::{OwnershipTracker, OwnershipError, ResolutionStats, SatisfiedEdge};
pub use store::{GraphStore, GraphState, IndexedGraph};
pub use summarizer::summarize_to_target;
pub use hooks::{GraphHooks, NoOpHooks, RecordingHooks, HookEvent};
pub use config::GraphConfig;
pub use canonical::{
    to_canonical_bytes, canonical_hash, canonical_hash_hex, try_to_canonical_bytes,
    try_canonical_hash_hex,
};
pub use snapshot::GraphSnapshot;

/// Schema version for serialized graph snapshots.
/// Increment on breaking changes to any snapshot type.
pub const RETENTION_GRAPH_SCHEMA_VERSION: &str = "1.0.0";

/// Default config version identifier.
pub const DEFAULT_CONFIG_VERSION: &str = "retention_graph_config_v1";
