//! Prompt assembly for each provider.
//!
//! The API-hosted provider takes a role-tagged message list. The local
//! runtime has no role channel, so the conversation is flattened into a
//! transcript with fixed section headers. Header text and section order are
//! part of the contract with the backend and must not drift.

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationModel, Role};
use crate::provider::ProviderKind;

/// Opening line of every flattened transcript.
pub const TRANSCRIPT_PREAMBLE: &str =
    "You are a helpful assistant. Follow the SYSTEM INSTRUCTIONS strictly.";
/// Header of the system instruction section.
pub const SYSTEM_INSTRUCTIONS_HEADER: &str = "SYSTEM INSTRUCTIONS:";
/// Header of the history section.
pub const CONVERSATION_HISTORY_HEADER: &str = "CONVERSATION HISTORY:";
/// Header of the new user message section.
pub const USER_REQUEST_HEADER: &str = "USER REQUEST:";
/// Marker cueing the model to continue as the assistant.
pub const RESPONSE_MARKER: &str = "ASSISTANT RESPONSE:";

/// A single role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::System, content)
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::User, content)
}

/// Provider-native prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPrompt {
    /// Ordered role-tagged messages.
    Messages(Vec<ChatMessage>),
    /// Single flattened instruction transcript.
    Transcript(String),
}

impl ProviderPrompt {
    /// Short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Messages(_) => "messages",
            Self::Transcript(_) => "transcript",
        }
    }

    /// Total characters of prompt text.
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Self::Messages(messages) => messages.iter().map(|m| m.content.len()).sum(),
            Self::Transcript(text) => text.len(),
        }
    }
}

/// Assembles the prompt shape `provider` expects.
#[must_use]
pub fn assemble(provider: ProviderKind, conversation: &ConversationModel) -> ProviderPrompt {
    match provider {
        ProviderKind::PrimaryApi => ProviderPrompt::Messages(build_messages(conversation)),
        ProviderKind::LocalRuntime => ProviderPrompt::Transcript(build_transcript(conversation)),
    }
}

/// Builds the role-tagged message list.
///
/// Order: optional system message, retained history turns role-for-role,
/// then the new user message.
#[must_use]
pub fn build_messages(conversation: &ConversationModel) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.history.len() + 2);

    if let Some(system) = conversation.system_prompt() {
        messages.push(system_message(system));
    }
    messages.extend(
        conversation
            .retained_turns()
            .map(|(role, content)| ChatMessage::new(role, content)),
    );
    messages.push(user_message(&conversation.user_message));

    messages
}

/// Builds the flattened instruction transcript.
///
/// Sections, in order: preamble, system instructions (when present),
/// conversation history (when at least one turn survives), user request,
/// response marker.
#[must_use]
pub fn build_transcript(conversation: &ConversationModel) -> String {
    let mut prompt = format!("{TRANSCRIPT_PREAMBLE}\n\n");

    if let Some(system) = conversation.system_prompt() {
        prompt.push_str(&format!("{SYSTEM_INSTRUCTIONS_HEADER}\n{system}\n\n"));
    }

    let history: String = conversation
        .retained_turns()
        .map(|(role, content)| format!("{}: {content}\n", role.label()))
        .collect();
    if !history.is_empty() {
        prompt.push_str(&format!("{CONVERSATION_HISTORY_HEADER}\n{history}\n"));
    }

    prompt.push_str(&format!(
        "{USER_REQUEST_HEADER}\n{}\n\n{RESPONSE_MARKER}\n",
        conversation.user_message
    ));

    prompt
}
