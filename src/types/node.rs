//! Node types for the reference graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::NodeId;

/// Kind of a node in the reference graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The value under investigation.
    Target,
    /// The root set presumed reachable.
    HeldValues,
    /// A plain object identity.
    Object,
    /// A symbol identity.
    Symbol,
    /// A private-name marker.
    PrivateName,
    /// Synthetic node for a map/set-style key-value entry.
    KeyValueTuple,
    /// Synthetic node for a finalization registry record.
    FinalizationTuple,
    /// Synthetic node for a private field on an object.
    PrivateFieldTuple,
}

impl NodeKind {
    /// Id prefix for nodes of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::HeldValues => "heldValues",
            Self::Object => "object",
            Self::Symbol => "symbol",
            Self::PrivateName => "privateName",
            Self::KeyValueTuple => "keyValueTuple",
            Self::FinalizationTuple => "finalizationTuple",
            Self::PrivateFieldTuple => "privateFieldTuple",
        }
    }

    /// Whether this kind stands for an external identity (as opposed to a tuple).
    pub fn is_identity(&self) -> bool {
        !self.is_tuple()
    }

    /// Whether this kind is a synthetic tuple node.
    pub fn is_tuple(&self) -> bool {
        matches!(
            self,
            Self::KeyValueTuple | Self::FinalizationTuple | Self::PrivateFieldTuple
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Node in the reference graph.
///
/// `metadata` is producer-supplied and returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode<M> {
    /// Unique node identifier.
    pub id: NodeId,
    /// Node kind.
    pub kind: NodeKind,
    /// Opaque producer payload.
    pub metadata: M,
}

impl<M> GraphNode<M> {
    /// Create a new node.
    pub fn new(id: NodeId, kind: NodeKind, metadata: M) -> Self {
        Self { id, kind, metadata }
    }
}
