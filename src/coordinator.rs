//! Top-level query routing: gate, then retrieval, then fallback.
//!
//! The coordinator is the propagation boundary for the whole pipeline:
//! validation failures are the only errors it returns. Everything else —
//! not ready, collaborator failure, timeout — is logged and converted into
//! deterministic fallback content so the chat experience stays coherent
//! even when every collaborator is unreachable.

use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::error::RagError;
use crate::fallback;
use crate::gate;
use crate::orchestrator::RetrievalOrchestrator;

/// A complete chat answer for one message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub is_gym_related: bool,
    pub sources: Vec<String>,
}

pub struct QueryCoordinator {
    config: Arc<Config>,
    orchestrator: Arc<RetrievalOrchestrator>,
}

impl QueryCoordinator {
    pub fn new(config: Arc<Config>, orchestrator: Arc<RetrievalOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<RetrievalOrchestrator> {
        &self.orchestrator
    }

    /// Route one raw message to an answer.
    ///
    /// The only error returned is [`RagError::Validation`]; all retrieval
    /// failures resolve to fallback content.
    pub async fn handle(&self, raw: &str) -> Result<ChatOutcome, RagError> {
        let message = gate::validate(raw)?;

        // Off-topic messages bypass retrieval entirely under the strict
        // gate (the default product policy).
        if !message.gym_related && self.config.gate.strict {
            return Ok(ChatOutcome {
                response: fallback::redirect().to_string(),
                is_gym_related: false,
                sources: Vec::new(),
            });
        }

        if self.orchestrator.is_ready().await {
            match self.orchestrator.query(&message.text).await {
                Ok(result) if result.success => {
                    return Ok(ChatOutcome {
                        response: result.response,
                        is_gym_related: message.gym_related,
                        sources: result.sources,
                    });
                }
                Ok(result) => {
                    warn!(
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "RAG query failed, serving fallback"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "RAG query rejected, serving fallback");
                }
            }
        }

        Ok(ChatOutcome {
            response: fallback::respond(&message.text, message.gym_related),
            is_gym_related: message.gym_related,
            sources: Vec::new(),
        })
    }
}
