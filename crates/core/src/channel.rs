use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize};
use snafu::Snafu;

use chatlet_storage::SubjectId;

use crate::launch::ChannelMode;

/// Control messages accepted from the trusted parent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "PROPERTY_CONTEXT")]
    PropertyContext {
        #[serde(rename = "urlId", default, deserialize_with = "deserialize_subject")]
        subject: Option<SubjectId>,
    },
    #[serde(other)]
    Unrecognized,
}

/// Messages this widget posts to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "CHAT_READY")]
    ChatReady,
    #[serde(rename = "closeChatbot")]
    CloseChatbot,
}

// Parents built on loosely typed pages send listing ids as numbers as often as strings.
fn deserialize_subject<'de, D>(deserializer: D) -> Result<Option<SubjectId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(value)) => SubjectId::from_optional(Some(&value)),
        Some(serde_json::Value::Number(value)) => SubjectId::from_optional(Some(&value.to_string())),
        _ => None,
    })
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChannelError {
    #[snafu(display("failed to post {message:?} to parent at '{target_origin}': {details}"))]
    PostMessage {
        stage: &'static str,
        message: OutboundMessage,
        target_origin: String,
        details: String,
    },
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// `window.parent` as seen from inside the frame.
pub trait ParentWindow {
    fn post_message(&self, message: OutboundMessage, target_origin: &str) -> ChannelResult<()>;
}

/// Instruction produced by an authenticated inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentCommand {
    SetSubject(Option<SubjectId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceState {
    Unannounced,
    Announced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    PostedToParent,
    PostFailed,
    ToggleLocally,
}

pub struct OriginGatedChannel {
    mode: ChannelMode,
    trusted_origin: String,
    close_target_origin: String,
    parent: Option<Rc<dyn ParentWindow>>,
    state: AnnounceState,
}

impl OriginGatedChannel {
    pub fn new(
        mode: ChannelMode,
        trusted_origin: impl Into<String>,
        close_target_origin: impl Into<String>,
        parent: Option<Rc<dyn ParentWindow>>,
    ) -> Self {
        Self {
            mode,
            trusted_origin: trusted_origin.into(),
            close_target_origin: close_target_origin.into(),
            parent,
            state: AnnounceState::Unannounced,
        }
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn state(&self) -> AnnounceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AnnounceState::Announced)
    }

    /// Posts `CHAT_READY` to the trusted origin. Standalone pages skip the post.
    ///
    /// Repeated calls post again; the state stays `Announced`.
    pub fn announce_ready(&mut self) -> bool {
        if !self.mode.is_embedded() {
            return false;
        }

        let posted = self.post(OutboundMessage::ChatReady, &self.trusted_origin);
        self.state = AnnounceState::Announced;
        posted
    }

    /// Authenticates and decodes one `message` event.
    ///
    /// Anything from an origin other than the trusted one is dropped before the
    /// payload is deserialized.
    pub fn receive<'de, D>(&self, origin: &str, data: D) -> Option<ParentCommand>
    where
        D: Deserializer<'de>,
    {
        if origin != self.trusted_origin {
            tracing::debug!(origin, "dropped message from untrusted origin");
            return None;
        }

        let message = match InboundMessage::deserialize(data) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(error = %error, "ignored malformed parent message");
                return None;
            }
        };

        match message {
            InboundMessage::PropertyContext { subject } => Some(ParentCommand::SetSubject(subject)),
            InboundMessage::Unrecognized => None,
        }
    }

    /// Embedded widgets ask the parent to close them; standalone pages toggle themselves.
    pub fn request_close(&self) -> CloseOutcome {
        if !self.mode.is_embedded() {
            return CloseOutcome::ToggleLocally;
        }

        if self.post(OutboundMessage::CloseChatbot, &self.close_target_origin) {
            CloseOutcome::PostedToParent
        } else {
            CloseOutcome::PostFailed
        }
    }

    fn post(&self, message: OutboundMessage, target_origin: &str) -> bool {
        let Some(parent) = &self.parent else {
            tracing::warn!(?message, "embedded widget has no parent window handle");
            return false;
        };

        match parent.post_message(message, target_origin) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %error, "parent message was not delivered");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    pub(crate) const TRUSTED: &str = "https://homes.example";

    #[derive(Default)]
    pub(crate) struct RecordingParent {
        pub(crate) posted: RefCell<Vec<(OutboundMessage, String)>>,
    }

    impl ParentWindow for RecordingParent {
        fn post_message(&self, message: OutboundMessage, target_origin: &str) -> ChannelResult<()> {
            self.posted
                .borrow_mut()
                .push((message, target_origin.to_string()));
            Ok(())
        }
    }

    fn embedded(parent: &Rc<RecordingParent>) -> OriginGatedChannel {
        let handle: Rc<dyn ParentWindow> = parent.clone();
        OriginGatedChannel::new(ChannelMode::Embedded, TRUSTED, TRUSTED, Some(handle))
    }

    #[test]
    fn outbound_messages_use_wire_type_names() {
        assert_eq!(
            serde_json::to_value(OutboundMessage::ChatReady).expect("encode"),
            json!({"type": "CHAT_READY"})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::CloseChatbot).expect("encode"),
            json!({"type": "closeChatbot"})
        );
    }

    #[test]
    fn readiness_is_posted_to_trusted_origin_only() {
        let parent = Rc::new(RecordingParent::default());
        let mut channel = embedded(&parent);
        assert_eq!(channel.state(), AnnounceState::Unannounced);

        assert!(channel.announce_ready());
        assert!(channel.announce_ready());

        assert!(channel.is_ready());
        assert_eq!(
            *parent.posted.borrow(),
            vec![
                (OutboundMessage::ChatReady, TRUSTED.to_string()),
                (OutboundMessage::ChatReady, TRUSTED.to_string()),
            ]
        );
    }

    #[test]
    fn standalone_announcement_is_a_no_op() {
        let mut channel = OriginGatedChannel::new(ChannelMode::Standalone, TRUSTED, TRUSTED, None);
        assert!(!channel.announce_ready());
        assert_eq!(channel.request_close(), CloseOutcome::ToggleLocally);
    }

    #[test]
    fn untrusted_origins_are_dropped_without_decoding() {
        let parent = Rc::new(RecordingParent::default());
        let channel = embedded(&parent);
        let data = json!({"type": "PROPERTY_CONTEXT", "urlId": "999"});

        for origin in [
            "https://evil.example",
            "https://homes.example.evil.example",
            "https://homes.example:443",
            "http://homes.example",
            "https://homes.exampl",
            "null",
        ] {
            assert_eq!(channel.receive(origin, &data), None, "{origin}");
        }
    }

    #[test]
    fn property_context_sets_subject() {
        let parent = Rc::new(RecordingParent::default());
        let channel = embedded(&parent);

        assert_eq!(
            channel.receive(TRUSTED, &json!({"type": "PROPERTY_CONTEXT", "urlId": "42"})),
            Some(ParentCommand::SetSubject(SubjectId::from_optional(Some("42"))))
        );
        assert_eq!(
            channel.receive(TRUSTED, &json!({"type": "PROPERTY_CONTEXT", "urlId": 7})),
            Some(ParentCommand::SetSubject(SubjectId::from_optional(Some("7"))))
        );
        assert_eq!(
            channel.receive(TRUSTED, &json!({"type": "PROPERTY_CONTEXT", "urlId": ""})),
            Some(ParentCommand::SetSubject(None))
        );
        assert_eq!(
            channel.receive(TRUSTED, &json!({"type": "PROPERTY_CONTEXT"})),
            Some(ParentCommand::SetSubject(None))
        );
    }

    #[test]
    fn unknown_or_malformed_payloads_are_ignored() {
        let parent = Rc::new(RecordingParent::default());
        let channel = embedded(&parent);

        for data in [
            json!({"type": "SOMETHING_ELSE", "urlId": "1"}),
            json!({"urlId": "1"}),
            json!("PROPERTY_CONTEXT"),
            json!(null),
        ] {
            assert_eq!(channel.receive(TRUSTED, &data), None, "{data}");
        }
    }

    #[test]
    fn close_request_goes_to_configured_target() {
        let parent = Rc::new(RecordingParent::default());
        let handle: Rc<dyn ParentWindow> = parent.clone();
        let channel = OriginGatedChannel::new(ChannelMode::Embedded, TRUSTED, "*", Some(handle));

        assert_eq!(channel.request_close(), CloseOutcome::PostedToParent);
        assert_eq!(
            *parent.posted.borrow(),
            vec![(OutboundMessage::CloseChatbot, "*".to_string())]
        );
    }
}
