//! Lifecycle of a graph store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`GraphStore`](super::GraphStore).
///
/// States only move forward, in declaration order, except that any state may
/// drop into `Error`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphState {
    /// Nothing defined yet; only the target/held-values pair is accepted.
    AwaitingTargetAndHeldValues,
    /// Nodes and edges may be defined.
    AcceptingDefinitions,
    /// Resolution is running.
    MarkingStrongReferences,
    /// Resolution finished; strength queries are answered.
    MarkedStrongReferences,
    /// The summarizer is running.
    Summarizing,
    /// The summary has been produced.
    Summarized,
    /// An invariant was violated; the instance must be discarded.
    Error,
}

impl GraphState {
    /// Whether this is the terminal error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Whether the lifecycle has reached `other` (and is not in error).
    pub fn has_reached(&self, other: GraphState) -> bool {
        !self.is_error() && *self >= other
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::AwaitingTargetAndHeldValues
    }
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingTargetAndHeldValues => "AwaitingTargetAndHeldValues",
            Self::AcceptingDefinitions => "AcceptingDefinitions",
            Self::MarkingStrongReferences => "MarkingStrongReferences",
            Self::MarkedStrongReferences => "MarkedStrongReferences",
            Self::Summarizing => "Summarizing",
            Self::Summarized => "Summarized",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}
