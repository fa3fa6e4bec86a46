//! Inputs and outputs for multi-party relationships.
//!
//! A map entry, a finalization registration and a private field each involve
//! more than two parties. The store decomposes them through a tuple node so
//! that no edge needs more than two joint owners.

use serde::{Deserialize, Serialize};

use super::edge::EdgeType;
use super::id::{EdgeId, NodeId};

/// A value taking part in a relationship: either a registered identity or a
/// primitive that the graph only describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRef<K> {
    /// A weak key registered with the graph.
    Identity(K),
    /// A primitive, recorded by description only.
    Primitive(String),
}

impl<K> ValueRef<K> {
    /// Shorthand for a primitive value.
    pub fn primitive(description: impl Into<String>) -> Self {
        Self::Primitive(description.into())
    }

    /// The identity, if this is one.
    pub fn as_identity(&self) -> Option<&K> {
        match self {
            Self::Identity(key) => Some(key),
            Self::Primitive(_) => None,
        }
    }

    /// The primitive description, if this is one.
    pub fn as_primitive(&self) -> Option<&str> {
        match self {
            Self::Identity(_) => None,
            Self::Primitive(description) => Some(description),
        }
    }
}

/// One entry of a map-like collection.
#[derive(Debug, Clone)]
pub struct KeyValueEntry<K, M> {
    /// Entry key.
    pub key: ValueRef<K>,
    /// Entry value.
    pub value: ValueRef<K>,
    /// False for weak-keyed collections. Must be true for a primitive key.
    pub is_strong_reference_to_key: bool,
    /// Metadata for the tuple node and the container edge.
    pub tuple_metadata: M,
    /// Metadata for the key edge; required when the key is an identity.
    pub key_metadata: Option<M>,
    /// Metadata for the value edge; required when the value is an identity.
    pub value_metadata: Option<M>,
}

/// One registration in a finalization registry.
#[derive(Debug, Clone)]
pub struct FinalizationEntry<K, M> {
    /// The registered target, watched weakly.
    pub target: K,
    /// The value handed to the cleanup callback.
    pub held_value: ValueRef<K>,
    /// Optional unregister token, watched weakly.
    pub unregister_token: Option<K>,
    /// Metadata for the tuple node and the container edge.
    pub tuple_metadata: M,
    /// Metadata for the target edge.
    pub target_metadata: M,
    /// Metadata for the held value edge; required when it is an identity.
    pub held_value_metadata: Option<M>,
    /// Metadata for the token edge; required when a token is present.
    pub unregister_token_metadata: Option<M>,
}

/// A private field (or private accessor) installed on an object.
#[derive(Debug, Clone)]
pub struct PrivateFieldEntry<K, M> {
    /// The private name identity.
    pub private_name: K,
    /// The field value, or the getter function when `is_getter` is set.
    pub value: ValueRef<K>,
    /// Whether `value` is a getter function.
    pub is_getter: bool,
    /// Metadata for the tuple node and the container edge.
    pub tuple_metadata: M,
    /// Metadata for the private-name edge.
    pub key_metadata: M,
    /// Metadata for the value edge; required when the value is an identity.
    pub value_metadata: Option<M>,
}

/// Ids produced by a tuple definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleIds {
    /// The tuple node.
    pub tuple: NodeId,
    /// Container to tuple edge.
    pub container_edge: EdgeId,
    /// Tuple to part edges, in definition order.
    pub part_edges: Vec<(EdgeType, EdgeId)>,
}

impl TupleIds {
    /// Id of the part edge of the given type, if one was created.
    pub fn edge_for(&self, edge_type: EdgeType) -> Option<&EdgeId> {
        self.part_edges
            .iter()
            .find(|(t, _)| *t == edge_type)
            .map(|(_, id)| id)
    }
}
