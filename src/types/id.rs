//! Node and edge identifiers.
//!
//! Ids render as `<prefix>:<sequence>`. The prefix names the node kind or
//! edge type that minted the id and every prefix owns an independent counter,
//! so `object:0` and `symbol:0` can coexist. Dispatch never parses the prefix;
//! the kind lives on the node or edge itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in the reference graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Build an id from a prefix and a sequence number.
    pub fn new(prefix: &str, sequence: u64) -> Self {
        Self(format!("{prefix}:{sequence}"))
    }

    /// Get the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the prefix part of the id.
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an edge in the reference graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(String);

impl EdgeId {
    /// Build an id from a prefix and a sequence number.
    pub fn new(prefix: &str, sequence: u64) -> Self {
        Self(format!("{prefix}:{sequence}"))
    }

    /// Get the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the prefix part of the id.
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
