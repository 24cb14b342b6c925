//! Error types for treesearch

use thiserror::Error;

/// Main error type for search and coordination
#[derive(Debug, Error)]
pub enum SearchError {
    /// A seeded start prefix is infeasible under the problem's own rules
    #[error("Illegal prefix {prefix:?}: rejected at depth {depth}")]
    IllegalPrefix { prefix: Vec<usize>, depth: usize },

    /// Error in engine or coordinator configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An OS thread could not be started
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The dispatch thread died before producing a result
    #[error("Coordinator thread panicked")]
    CoordinatorPanicked,
}

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
