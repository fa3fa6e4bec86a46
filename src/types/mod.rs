//! Core types for the reference graph.

pub mod id;
pub mod node;
pub mod edge;
pub mod entry;
pub mod error;

pub use id::{NodeId, EdgeId};
pub use node::{GraphNode, NodeKind};
pub use edge::{GraphEdge, EdgeType, EdgeDescriptor, JointOwners};
pub use entry::{ValueRef, KeyValueEntry, FinalizationEntry, PrivateFieldEntry, TupleIds};
pub use error::{GraphError, GraphResult};
