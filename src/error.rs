//! Error taxonomy for the query-orchestration pipeline.
//!
//! Callers branch on the variant, never on message text:
//!
//! - [`RagError::Validation`] — malformed caller input; the only kind that
//!   crosses the HTTP boundary as a 4xx.
//! - [`RagError::Configuration`] — missing credentials or corpus; fails
//!   `initialize()` and is reported via status, never at query time.
//! - [`RagError::NotReady`] — `query()` called before a successful
//!   `initialize()`; converted to a fallback answer by the coordinator.
//! - [`RagError::Retrieval`] — an embedding/index/generation collaborator
//!   failed during a query; absorbed at the orchestrator boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed caller input. The message is the exact reason string
    /// surfaced in the HTTP 400 `detail` field.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials, or a missing corpus resource.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A query arrived while the orchestrator is uninitialized.
    #[error("RAG system not initialized")]
    NotReady,

    /// A collaborator (embedding, index, generation) failed mid-query.
    #[error("retrieval failure: {0}")]
    Retrieval(String),
}

impl RagError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }
}
