//! Domain types for the chat orchestration core
//!
//! Core abstractions shared by the completion engines.

mod message;
mod response;
mod tool_call;

pub use message::*;
pub use response::*;
pub use tool_call::*;

use async_trait::async_trait;

use crate::agents::error::AgentResult;
use crate::domain::ChatHistory;

/// Contract every completion engine offers to the HTTP layer
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Answer `message`, yielding text chunks as they are produced
    fn stream_completion(&self, message: &str, history: Option<ChatHistory>) -> ChatStream;

    /// Answer `message` and return the text with the updated history
    async fn get_completion(
        &self,
        message: &str,
        history: Option<ChatHistory>,
    ) -> AgentResult<(String, ChatHistory)>;
}
