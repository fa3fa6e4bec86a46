//! Graph configuration: budget caps for one analysis run.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_CONFIG_VERSION;

/// Budget caps for a [`GraphStore`](crate::GraphStore).
///
/// A producer walking a large heap can run away; the caps turn that into an
/// `Invariant` error instead of unbounded growth. Tuple nodes count against
/// `max_nodes` like any other node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Config version identifier.
    pub version: String,
    /// Maximum number of nodes.
    pub max_nodes: usize,
    /// Maximum number of edges.
    pub max_edges: usize,
}

impl GraphConfig {
    /// Create a config with custom caps.
    pub fn new(max_nodes: usize, max_edges: usize) -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            max_nodes,
            max_edges,
        }
    }

    /// No caps at all.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, usize::MAX)
    }

    /// Compute a hash of the config parameters, for run provenance.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new(1_000_000, 4_000_000)
    }
}
