use serde_json::Value;

use crate::messages::Messages;

/// Reply fields accepted from the backend, in priority order.
pub const REPLY_FIELDS: [&str; 3] = ["response", "message", "text"];

/// Outcome of one conversation turn as the user will see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    Text(String),
    /// Success without a usable reply field.
    Placeholder,
    HttpFailure { status: u16 },
    NetworkFailure,
}

impl TurnReply {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::HttpFailure { .. } | Self::NetworkFailure)
    }

    pub fn display_text<'a>(&'a self, messages: &Messages) -> &'a str {
        match self {
            Self::Text(text) => text,
            Self::Placeholder => messages.processing_placeholder,
            Self::HttpFailure { .. } => messages.http_failure,
            Self::NetworkFailure => messages.network_failure,
        }
    }
}

/// First non-empty string among [`REPLY_FIELDS`], if the body is a JSON object.
pub fn extract_reply_text(body: &str) -> Option<String> {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(error = %error, "conversation reply is not JSON");
            return None;
        }
    };

    let object = value.as_object()?;
    REPLY_FIELDS.iter().find_map(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}
