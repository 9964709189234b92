//! Completion engines
//!
//! - `TurnRunner`: one agent turn with automatic tool rounds
//! - `SingleAgentEngine`: one agent answering every request

mod single_agent;
mod turn;

pub use single_agent::SingleAgentEngine;
pub use turn::{Sampling, TurnOutput, TurnRunner};

use serde_json::Value;
use tracing::warn;

use crate::agents::domain::FinishReason;

/// Reply used when the provider's content filter blocked every word
pub const CONTENT_FILTER_APOLOGY: &str =
    "I'm sorry, but I can't respond to that request because it was blocked by the content filter.";

/// Final text of a turn, substituting the apology when the filter left nothing
pub(crate) fn settle_text(agent: &str, output: &TurnOutput) -> String {
    if output.finish_reason != FinishReason::ContentFilter {
        return output.text.clone();
    }

    let detail = output.content_filter.clone().unwrap_or(Value::Null);
    warn!(agent, detail = %detail, "Content filter triggered");

    if output.text.is_empty() {
        CONTENT_FILTER_APOLOGY.to_string()
    } else {
        output.text.clone()
    }
}
