//! Provider-agnostic conversation model.
//!
//! A [`ConversationModel`] is built once per inbound request and never
//! mutated afterwards. Roles are parsed case-insensitively at ingestion;
//! turns whose role is absent or unrecognised are kept in the model but
//! skipped when a prompt is assembled.

use serde::{Deserialize, Deserializer, Serialize};

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

impl Role {
    /// Parses a role name (case-insensitive).
    ///
    /// Returns `None` for anything other than `system`, `user` or `assistant`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Speaker label used in flattened transcripts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single prior turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Normalised role; `None` when the caller sent an absent or unknown role.
    #[serde(default, deserialize_with = "deserialize_role")]
    pub role: Option<Role>,
    /// Turn text; `None` when the caller omitted it.
    #[serde(default)]
    pub content: Option<String>,
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Role::parse))
}

impl ConversationTurn {
    /// Creates a turn from a free-text role name.
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: Role::parse(role),
            content: Some(content.into()),
        }
    }

    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Creates a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: Some(content.into()),
        }
    }

    /// Returns the role and text when this turn is usable in a prompt.
    #[must_use]
    pub fn retained(&self) -> Option<(Role, &str)> {
        Some((self.role?, self.content.as_deref()?))
    }
}

/// Everything needed to assemble a prompt for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationModel {
    /// Optional system instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Prior turns in chronological order.
    #[serde(default, alias = "conversationHistory")]
    pub history: Vec<ConversationTurn>,
    /// The new user message, always rendered last.
    #[serde(alias = "message")]
    pub user_message: String,
}

impl ConversationModel {
    /// Creates a model holding only a user message.
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            history: Vec::new(),
            user_message: user_message.into(),
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the prior turns.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    /// Returns the system instruction when present and non-empty.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|s| !s.is_empty())
    }

    /// Iterates the history turns that survive normalisation, in order.
    pub fn retained_turns(&self) -> impl Iterator<Item = (Role, &str)> {
        self.history.iter().filter_map(ConversationTurn::retained)
    }
}
