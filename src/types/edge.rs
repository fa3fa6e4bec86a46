//! Edge types for the reference graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::id::{EdgeId, NodeId};

/// Type of edge in the reference graph.
///
/// The set is closed: every relationship a producer can report maps onto one
/// of these, and each owns its own id counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Object property holding a value.
    PropertyValue,
    /// Object property backed by a getter function.
    PropertyGetter,
    /// Symbol used as a property key.
    SymbolKey,
    /// Instance to its constructor.
    ConstructorOf,
    /// Function closure to a captured scope value.
    ScopeValue,
    /// Internal slot (e.g. a weak reference target).
    InternalSlot,
    /// Map to one of its key-value tuples.
    MapToTuple,
    /// Key-value tuple to its key.
    MapKey,
    /// Key-value tuple to its value.
    MapValue,
    /// Set to one of its elements.
    SetElement,
    /// Finalization registry to one of its registration tuples.
    FinalizationRegistryToTuple,
    /// Registration tuple to the registered target.
    FinalizationToTarget,
    /// Registration tuple to its held value.
    FinalizationToHeldValue,
    /// Registration tuple to its unregister token.
    FinalizationToUnregisterToken,
    /// Object to one of its private-field tuples.
    ObjectToPrivateTuple,
    /// Private-field tuple to its private name.
    PrivateKey,
    /// Private-field tuple to the field value.
    PrivateValue,
    /// Private-field tuple to a private getter.
    PrivateGetter,
}

impl EdgeType {
    /// Every edge type, in declaration order.
    pub const ALL: [EdgeType; 18] = [
        Self::PropertyValue,
        Self::PropertyGetter,
        Self::SymbolKey,
        Self::ConstructorOf,
        Self::ScopeValue,
        Self::InternalSlot,
        Self::MapToTuple,
        Self::MapKey,
        Self::MapValue,
        Self::SetElement,
        Self::FinalizationRegistryToTuple,
        Self::FinalizationToTarget,
        Self::FinalizationToHeldValue,
        Self::FinalizationToUnregisterToken,
        Self::ObjectToPrivateTuple,
        Self::PrivateKey,
        Self::PrivateValue,
        Self::PrivateGetter,
    ];

    /// Id prefix for edges of this type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PropertyValue => "propertyValue",
            Self::PropertyGetter => "propertyGetter",
            Self::SymbolKey => "symbolKey",
            Self::ConstructorOf => "constructorOf",
            Self::ScopeValue => "scopeValue",
            Self::InternalSlot => "internalSlot",
            Self::MapToTuple => "mapToTuple",
            Self::MapKey => "mapKey",
            Self::MapValue => "mapValue",
            Self::SetElement => "setElement",
            Self::FinalizationRegistryToTuple => "finalizationRegistryToTuple",
            Self::FinalizationToTarget => "finalizationToTarget",
            Self::FinalizationToHeldValue => "finalizationToHeldValue",
            Self::FinalizationToUnregisterToken => "finalizationToUnregisterToken",
            Self::ObjectToPrivateTuple => "objectToPrivateTuple",
            Self::PrivateKey => "privateKey",
            Self::PrivateValue => "privateValue",
            Self::PrivateGetter => "privateGetter",
        }
    }

    /// Parse edge type from its id prefix.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.prefix() == s)
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The nodes that must all be strongly held before an edge propagates strength.
///
/// Holds one or two ids; the primary parent is always a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JointOwners(BTreeSet<NodeId>);

impl JointOwners {
    /// Owner set with a single member.
    pub fn single(owner: NodeId) -> Self {
        Self(BTreeSet::from([owner]))
    }

    /// Owner set for a primary parent and an optional second parent.
    pub fn with_second(primary: NodeId, second: Option<NodeId>) -> Self {
        let mut owners = BTreeSet::from([primary]);
        owners.extend(second);
        Self(owners)
    }

    /// Whether `id` is one of the owners.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains(id)
    }

    /// Iterate the owners in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.0.iter()
    }

    /// Number of owners.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty. Never true for a defined edge.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Edge in the reference graph.
///
/// Represents a directed reference from `from` to `to`. Edges are append-only;
/// nothing about an edge changes after it is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge<M> {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// Type of edge.
    pub edge_type: EdgeType,
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Human-readable relationship name (property name, slot name, ...).
    pub label: String,
    /// Description of a primitive value carried by the relationship, if any.
    pub value_description: Option<String>,
    /// Opaque producer payload.
    pub metadata: M,
    /// Whether the modeled language treats this reference as strong.
    pub is_strong_reference: bool,
    /// Nodes that must all be strong before this edge can make `to` strong.
    pub joint_owners: JointOwners,
}

/// Producer-supplied description of a single relationship.
///
/// Carries everything about an edge except its endpoints, which the typed
/// definition operations take separately.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDescriptor<M> {
    /// Relationship name.
    pub label: String,
    /// Description of a primitive value, if any.
    pub value_description: Option<String>,
    /// Opaque producer payload.
    pub metadata: M,
    /// Retention rule of the modeled language for this reference.
    pub is_strong_reference: bool,
}

impl<M> EdgeDescriptor<M> {
    /// A strong relationship.
    pub fn strong(label: impl Into<String>, metadata: M) -> Self {
        Self {
            label: label.into(),
            value_description: None,
            metadata,
            is_strong_reference: true,
        }
    }

    /// A weak relationship.
    pub fn weak(label: impl Into<String>, metadata: M) -> Self {
        Self {
            label: label.into(),
            value_description: None,
            metadata,
            is_strong_reference: false,
        }
    }

    /// Attach a value description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.value_description = Some(description.into());
        self
    }
}
