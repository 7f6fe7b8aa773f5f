//! # GymPro
//!
//! A retrieval-augmented fitness assistant. Messages pass through a topic
//! relevance gate, then a RAG pipeline (chunked corpus, vector index,
//! generation binding); when retrieval is unavailable or fails, a
//! deterministic fallback responder keeps answers coherent and on-topic.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │ ContentGate │──▶│ QueryCoordinator │──▶│ Orchestrator │
//! │ validate +  │   │  route / mask    │   │ init / query │
//! │ classify    │   │  failures        │   │ / reset      │
//! └────────────┘   └───────┬─────────┘   └──────┬───────┘
//!                          ▼                    ▼
//!                   ┌────────────┐      ┌──────────────┐
//!                   │  Fallback   │      │ Embed + Index │
//!                   │  Responder  │      │ + Generation  │
//!                   └────────────┘      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential checks |
//! | [`error`] | Error taxonomy for pipeline failures |
//! | [`gate`] | Message validation and topic classification |
//! | [`fallback`] | Deterministic canned guidance |
//! | [`chunk`] | Overlapping corpus chunker |
//! | [`embedding`] | Embedding collaborator (Gemini / offline hash) |
//! | [`generation`] | Generation collaborator (Gemini / offline extractive) |
//! | [`prompt`] | RAG prompt template |
//! | [`index`] | In-memory vector similarity index |
//! | [`orchestrator`] | Lifecycle state machine and status reporting |
//! | [`coordinator`] | Top-level query routing |
//! | [`server`] | Axum HTTP API |

pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod generation;
pub mod index;
pub mod orchestrator;
pub mod prompt;
pub mod server;
