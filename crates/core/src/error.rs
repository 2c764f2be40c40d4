//! Error types for the Folio domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Context store errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Generated-output parsing ---
    #[error("Enhancement block error: {0}")]
    Block(#[from] BlockError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("A context already exists for conversation {0}")]
    AlreadyExists(String),

    #[error("No context for conversation {0}")]
    NotFound(String),

    #[error("Context import failed: {0}")]
    Import(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("Malformed enhancement block #{index}: {reason}")]
    Malformed { index: usize, reason: String },
}
