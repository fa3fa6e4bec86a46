//! Error taxonomy for the reference graph.
//!
//! Every variant is fatal: a `GraphStore` that returns one of these has moved
//! into its terminal error state and must be discarded.

use crate::store::GraphState;

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An operation was invoked in the wrong state.
    #[error("Protocol error: {operation} is not allowed in state {state}")]
    Protocol {
        /// Name of the rejected operation.
        operation: &'static str,
        /// State the graph was in when the operation was attempted.
        state: GraphState,
    },
    /// An identity or id was never registered.
    #[error("Not found: {0}")]
    NotFound(String),
    /// An identity was defined more than once.
    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),
    /// A malformed relationship was supplied.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl GraphError {
    /// Short name of the error kind, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => "protocol",
            Self::NotFound(_) => "not_found",
            Self::DuplicateDefinition(_) => "duplicate_definition",
            Self::Invariant(_) => "invariant",
        }
    }
}

/// Result alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::Protocol {
            operation: "define_object",
            state: GraphState::MarkedStrongReferences,
        };
        assert_eq!(
            err.to_string(),
            "Protocol error: define_object is not allowed in state MarkedStrongReferences"
        );
        assert_eq!(err.kind(), "protocol");
        assert_eq!(GraphError::NotFound("x".into()).kind(), "not_found");
    }
}
