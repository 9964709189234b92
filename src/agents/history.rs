//! Conversion between caller chat history and model messages

use crate::agents::domain::{Message, Role};
use crate::domain::{ChatHistory, MessageRole};

/// Convert caller history into model messages.
///
/// `default_system_message` is inserted first only when the history carries no
/// system message of its own; otherwise caller order is kept as is.
pub fn to_internal(history: &ChatHistory, default_system_message: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);

    if !history.has_system_message() {
        messages.push(Message::system(default_system_message));
    }

    messages.extend(history.messages.iter().map(|m| match m.role {
        MessageRole::System => Message::system(&m.content),
        MessageRole::User => Message::user(&m.content),
        MessageRole::Assistant => Message::assistant(&m.content),
    }));

    messages
}

/// Convert model messages back into caller history.
///
/// Tool traffic has no caller-facing form and is dropped, including the
/// assistant messages that requested tool calls.
pub fn from_internal(messages: &[Message]) -> ChatHistory {
    let mut history = ChatHistory::new();

    for message in messages {
        match message.role {
            Role::System => history.add_system_message(&message.content),
            Role::User => history.add_user_message(&message.content),
            Role::Assistant if message.tool_calls.is_some() => {}
            Role::Assistant => history.add_assistant_message(&message.content),
            Role::Tool => {}
        }
    }

    history
}
