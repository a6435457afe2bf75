// Chat transports: the voice gateway's streaming completion endpoint and the
// web widget's JSON endpoint. Both end in the same agent.

pub mod fast_path;
pub mod handlers;
pub mod sse;

use serde::Deserialize;
use serde_json::Value;

use crate::llm_client::{Message, Role};

/// Marker of an identity block injected into a system message.
const INSTRUCTION_MARKER: &str = "User ID:";

/// One inbound chat message. `content` is usually a string; other shapes
/// (content-part arrays) are carried but ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Value,
}

impl ChatMessage {
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

/// Text of the most recent user message.
pub fn last_user_message(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .and_then(ChatMessage::text)
}

/// System messages carrying a `User ID:` block, joined for the resolver.
pub fn instruction_text(messages: &[ChatMessage]) -> Option<String> {
    let blocks: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .filter_map(ChatMessage::text)
        .filter(|t| t.contains(INSTRUCTION_MARKER))
        .collect();
    (!blocks.is_empty()).then(|| blocks.join("\n"))
}

/// User and assistant turns with non-blank text, starting at the first user turn.
pub fn to_history(messages: &[ChatMessage]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| {
            let role = match m.role.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                _ => return None,
            };
            let text = m.text().filter(|t| !t.trim().is_empty())?;
            Some(Message::text(role, text))
        })
        .skip_while(|m| m.role != Role::User)
        .collect()
}
