use serde::Serialize;
use web_time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMethod {
    Typed,
    Spoken,
    FormSubmitted,
}

impl InputMethod {
    pub fn action(self) -> TurnAction {
        match self {
            Self::Spoken => TurnAction::Voice,
            Self::Typed | Self::FormSubmitted => TurnAction::Text,
        }
    }
}

/// `action` field of the conversation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnAction {
    Text,
    Voice,
}

/// One transcript entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub input_method: InputMethod,
    /// Display only.
    pub timestamp: SystemTime,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>, input_method: InputMethod) -> Self {
        Self {
            role,
            content: content.into(),
            input_method,
            timestamp: SystemTime::now(),
        }
    }

    pub fn user(content: impl Into<String>, input_method: InputMethod) -> Self {
        Self::new(Role::User, content, input_method)
    }

    /// Assistant turns carry the method of the user turn they answer.
    pub fn assistant(content: impl Into<String>, input_method: InputMethod) -> Self {
        Self::new(Role::Assistant, content, input_method)
    }

    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp
            .duration_since(web_time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}
