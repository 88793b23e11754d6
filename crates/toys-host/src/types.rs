//! Wire and domain types for the Shelley API

use serde::{Deserialize, Serialize};

/// `llm_data` content entries of this type carry plain text
const TEXT_CONTENT_TYPE: i64 = 2;

/// Body of a create-conversation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Task text the sub-agent is seeded with
    pub message: String,
    /// Model the conversation runs on
    pub model: String,
    /// Working directory for the sub-agent
    pub cwd: String,
}

/// Interpreted state of a remote conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// The agent still has an open turn
    OpenTurn,
    /// The agent ended its turn; carries the final assistant text
    FinalMessage(String),
    /// The host reports an execution error
    Error(String),
}

impl ConversationState {
    /// Whether no further transitions will follow
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::OpenTurn)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedConversation {
    pub conversation_id: String,
}

/// Raw conversation payload from `GET /conversation/{id}`
///
/// Only the fields needed to decide completion are decoded; anything else
/// the host sends is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(default)]
    pub agent_working: Option<bool>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One message of a conversation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub end_of_turn: bool,
    #[serde(default)]
    pub llm_data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmData {
    #[serde(rename = "Content", default)]
    content: Vec<LlmContent>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmContent {
    #[serde(rename = "Type", default)]
    kind: i64,
    #[serde(rename = "Text", default)]
    text: Option<String>,
}

impl ConversationSnapshot {
    /// Interpret this payload as a conversation state.
    ///
    /// An explicit error wins; a conversation is final once the agent is no
    /// longer working and has ended a turn; everything else is an open turn.
    pub fn state(&self) -> ConversationState {
        if let Some(err) = self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return ConversationState::Error(err.to_string());
        }
        if let Some(msg) = self.messages.iter().rev().find(|m| m.kind == "error") {
            let text = msg
                .llm_data
                .as_deref()
                .and_then(first_text)
                .unwrap_or_else(|| "remote execution error".to_string());
            return ConversationState::Error(text);
        }

        if self.agent_working != Some(false) {
            return ConversationState::OpenTurn;
        }

        let mut turn_ends = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.kind == "agent" && m.end_of_turn)
            .peekable();
        if turn_ends.peek().is_none() {
            return ConversationState::OpenTurn;
        }
        // A closing turn with no text (tool use only) falls back to the most
        // recent earlier answer.
        let text = turn_ends
            .find_map(|m| m.llm_data.as_deref().and_then(first_text))
            .unwrap_or_default();
        ConversationState::FinalMessage(text)
    }
}

/// First text block of an `llm_data` JSON document.
fn first_text(llm_data: &str) -> Option<String> {
    let data: LlmData = serde_json::from_str(llm_data).ok()?;
    data.content
        .into_iter()
        .find(|c| c.kind == TEXT_CONTENT_TYPE && c.text.as_deref().is_some_and(|t| !t.is_empty()))
        .and_then(|c| c.text)
}
