//! Chat orchestration core
//!
//! Answers chat requests with either one model agent or a coordinator/query
//! agent pair handing the task between them, streaming text as it is produced.
//!
//! ## Architecture
//!
//! - `domain/` - Core types (Message, ToolCall, ChatStream, ChatPort)
//! - `history` - Caller history <-> model messages
//! - `llm/` - LLM provider implementations with streaming
//! - `plugins/` - Tools the model can call
//! - `core/` - Turn runner and the single-agent engine
//! - `orchestration/` - Handoff engine

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod handler;
pub mod history;
pub mod llm;
pub mod orchestration;
pub mod plugins;
#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use error::*;
pub use handler::ChatAgentService;
