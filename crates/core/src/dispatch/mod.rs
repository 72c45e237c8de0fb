//! Outbound delivery: context notifications and conversation turns.
//!
//! Both paths are single-attempt. Context notifications are telemetry and
//! never report failure; conversation turns always resolve to a [`TurnReply`].

mod reply;
mod transport;

use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};
use serde::Serialize;
use snafu::ResultExt;

use chatlet_storage::{SessionId, SubjectId};

use crate::settings::{ContextPayloadShape, WidgetSettings};
use crate::turn::TurnAction;

pub use reply::{REPLY_FIELDS, TurnReply, extract_reply_text};
pub use transport::{
    Beacon, EncodeBodySnafu, HttpClient, HttpRequest, HttpResponse, LocalBoxFuture, NetworkSnafu,
    TransportError, TransportResult,
};

/// Facts reported when the subject changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextNotice {
    pub subject: SubjectId,
    pub session_id: SessionId,
    pub full_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextPayload<'a> {
    url_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

impl<'a> ContextPayload<'a> {
    fn new(notice: &'a ContextNotice, shape: ContextPayloadShape) -> Self {
        match shape {
            ContextPayloadShape::Minimal => Self {
                url_id: notice.subject.as_str(),
                full_url: None,
                session_id: None,
            },
            ContextPayloadShape::Full => Self {
                url_id: notice.subject.as_str(),
                full_url: notice.full_url.as_deref(),
                session_id: Some(notice.session_id.as_str()),
            },
        }
    }
}

/// Everything the conversation endpoint needs for one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTurn {
    pub chat_input: String,
    pub action: TurnAction,
    pub session_id: SessionId,
    pub subject: Option<SubjectId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationPayload<'a> {
    chat_input: &'a str,
    action: TurnAction,
    session_id: &'a str,
    url_id: Option<&'a str>,
}

impl<'a> From<&'a OutboundTurn> for ConversationPayload<'a> {
    fn from(turn: &'a OutboundTurn) -> Self {
        Self {
            chat_input: &turn.chat_input,
            action: turn.action,
            session_id: turn.session_id.as_str(),
            url_id: turn.subject.as_ref().map(SubjectId::as_str),
        }
    }
}

/// How a context notification left the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDelivery {
    Beacon,
    BackgroundFetch,
    Skipped,
}

pub struct Dispatcher {
    conversation_endpoint: String,
    context_endpoint: String,
    payload_shape: ContextPayloadShape,
    http: Rc<dyn HttpClient>,
    beacon: Option<Rc<dyn Beacon>>,
    spawner: Rc<dyn LocalSpawn>,
}

impl Dispatcher {
    pub fn new(
        settings: &WidgetSettings,
        http: Rc<dyn HttpClient>,
        beacon: Option<Rc<dyn Beacon>>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        Self {
            conversation_endpoint: settings.conversation_endpoint.clone(),
            context_endpoint: settings.context_endpoint.clone(),
            payload_shape: settings.context_payload,
            http,
            beacon,
            spawner,
        }
    }

    /// Best-effort, single attempt, never surfaces failure.
    ///
    /// Prefers the beacon; falls back to a detached keepalive POST when no
    /// beacon exists or the host refuses to queue the payload.
    pub fn notify_context_changed(&self, notice: &ContextNotice) -> ContextDelivery {
        if self.context_endpoint.is_empty() {
            tracing::debug!(subject = %notice.subject, "no context endpoint configured");
            return ContextDelivery::Skipped;
        }

        let body = match serde_json::to_string(&ContextPayload::new(notice, self.payload_shape))
            .context(EncodeBodySnafu {
                stage: "encode-context-payload",
            }) {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(error = %error, "context notification dropped");
                return ContextDelivery::Skipped;
            }
        };

        if let Some(beacon) = &self.beacon {
            if beacon.send(&self.context_endpoint, &body) {
                tracing::debug!(subject = %notice.subject, "context notification queued as beacon");
                return ContextDelivery::Beacon;
            }
            tracing::debug!("beacon refused context notification; using background fetch");
        }

        let http = Rc::clone(&self.http);
        let request = HttpRequest::json(&self.context_endpoint, body).with_keepalive();
        let subject = notice.subject.clone();
        let spawned = self.spawner.spawn_local(async move {
            match http.post_json(request).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(subject = %subject, "context notification delivered");
                }
                Ok(response) => {
                    tracing::debug!(
                        subject = %subject,
                        status = response.status,
                        "context endpoint rejected notification"
                    );
                }
                Err(error) => {
                    tracing::debug!(subject = %subject, error = %error, "context notification lost");
                }
            }
        });

        match spawned {
            Ok(()) => ContextDelivery::BackgroundFetch,
            Err(error) => {
                tracing::warn!(error = %error, "could not schedule context notification");
                ContextDelivery::Skipped
            }
        }
    }

    /// Posts one turn and maps every outcome to something displayable.
    ///
    /// No retry and no timeout: the future settles when the host request does.
    pub async fn send_turn(&self, turn: &OutboundTurn) -> TurnReply {
        let body = match serde_json::to_string(&ConversationPayload::from(turn)).context(
            EncodeBodySnafu {
                stage: "encode-conversation-payload",
            },
        ) {
            Ok(body) => body,
            Err(error) => {
                tracing::error!(error = %error, "conversation turn could not be encoded");
                return TurnReply::NetworkFailure;
            }
        };

        let request = HttpRequest::json(&self.conversation_endpoint, body);
        match self.http.post_json(request).await {
            Ok(response) if response.is_success() => match extract_reply_text(&response.body) {
                Some(text) => TurnReply::Text(text),
                None => {
                    tracing::warn!(body = %response.body, "conversation reply has no known text field");
                    TurnReply::Placeholder
                }
            },
            Ok(response) => {
                tracing::error!(
                    status = response.status,
                    body = %response.body,
                    "conversation endpoint returned an error"
                );
                TurnReply::HttpFailure {
                    status: response.status,
                }
            }
            Err(error) => {
                tracing::error!(error = %error, "conversation request failed");
                TurnReply::NetworkFailure
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use futures::executor::{LocalPool, block_on};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    pub(crate) const CONVERSATION_URL: &str = "https://hooks.example/chat";
    pub(crate) const CONTEXT_URL: &str = "https://hooks.example/page";

    /// Replays scripted outcomes and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedHttp {
        pub(crate) requests: RefCell<Vec<HttpRequest>>,
        pub(crate) outcomes: RefCell<VecDeque<TransportResult<HttpResponse>>>,
    }

    impl ScriptedHttp {
        pub(crate) fn respond(&self, status: u16, body: &str) {
            self.outcomes
                .borrow_mut()
                .push_back(Ok(HttpResponse::new(status, body)));
        }

        pub(crate) fn fail(&self) {
            self.outcomes.borrow_mut().push_back(Err(TransportError::Network {
                stage: "scripted",
                url: CONVERSATION_URL.to_string(),
                details: "TypeError: Failed to fetch".to_string(),
            }));
        }

        pub(crate) fn bodies_to(&self, url: &str) -> Vec<Value> {
            self.requests
                .borrow()
                .iter()
                .filter(|request| request.url == url)
                .map(|request| serde_json::from_str(&request.body).expect("json body"))
                .collect()
        }
    }

    impl HttpClient for ScriptedHttp {
        fn post_json<'a>(
            &'a self,
            request: HttpRequest,
        ) -> LocalBoxFuture<'a, TransportResult<HttpResponse>> {
            self.requests.borrow_mut().push(request);
            let outcome = self
                .outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(204, "")));
            Box::pin(async move { outcome })
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingBeacon {
        pub(crate) accept: bool,
        pub(crate) sent: RefCell<Vec<(String, Value)>>,
    }

    impl Beacon for RecordingBeacon {
        fn send(&self, url: &str, json_body: &str) -> bool {
            self.sent.borrow_mut().push((
                url.to_string(),
                serde_json::from_str(json_body).expect("json body"),
            ));
            self.accept
        }
    }

    fn settings(shape: ContextPayloadShape) -> WidgetSettings {
        WidgetSettings {
            trusted_parent_origin: "https://homes.example".to_string(),
            conversation_endpoint: CONVERSATION_URL.to_string(),
            context_endpoint: CONTEXT_URL.to_string(),
            context_payload: shape,
            ..WidgetSettings::default()
        }
    }

    fn notice() -> ContextNotice {
        ContextNotice {
            subject: SubjectId::parse("42").expect("subject"),
            session_id: SessionId::parse("123456789012345").expect("session"),
            full_url: Some("https://chat.example/?urlId=42".to_string()),
        }
    }

    fn turn(text: &str, action: TurnAction, subject: Option<&str>) -> OutboundTurn {
        OutboundTurn {
            chat_input: text.to_string(),
            action,
            session_id: SessionId::parse("123456789012345").expect("session"),
            subject: SubjectId::from_optional(subject),
        }
    }

    #[test]
    fn beacon_is_preferred_for_context_notifications() {
        let pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        let beacon = Rc::new(RecordingBeacon {
            accept: true,
            ..RecordingBeacon::default()
        });
        let dispatcher = Dispatcher::new(
            &settings(ContextPayloadShape::Full),
            http.clone(),
            Some(beacon.clone()),
            Rc::new(pool.spawner()),
        );

        assert_eq!(
            dispatcher.notify_context_changed(&notice()),
            ContextDelivery::Beacon
        );
        assert_eq!(
            *beacon.sent.borrow(),
            vec![(
                CONTEXT_URL.to_string(),
                json!({
                    "urlId": "42",
                    "fullUrl": "https://chat.example/?urlId=42",
                    "sessionId": "123456789012345",
                })
            )]
        );
        assert!(http.requests.borrow().is_empty());
    }

    #[test]
    fn fetch_fallback_is_keepalive_and_swallows_errors() {
        let mut pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        http.fail();
        let dispatcher = Dispatcher::new(
            &settings(ContextPayloadShape::Minimal),
            http.clone(),
            None,
            Rc::new(pool.spawner()),
        );

        assert_eq!(
            dispatcher.notify_context_changed(&notice()),
            ContextDelivery::BackgroundFetch
        );
        pool.run_until_stalled();

        let requests = http.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].keepalive);
        drop(requests);
        assert_eq!(http.bodies_to(CONTEXT_URL), vec![json!({"urlId": "42"})]);
    }

    #[test]
    fn refused_beacon_falls_back_to_fetch() {
        let mut pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        let beacon = Rc::new(RecordingBeacon::default());
        let dispatcher = Dispatcher::new(
            &settings(ContextPayloadShape::Full),
            http.clone(),
            Some(beacon.clone()),
            Rc::new(pool.spawner()),
        );

        assert_eq!(
            dispatcher.notify_context_changed(&notice()),
            ContextDelivery::BackgroundFetch
        );
        pool.run_until_stalled();
        assert_eq!(beacon.sent.borrow().len(), 1);
        assert_eq!(http.bodies_to(CONTEXT_URL).len(), 1);
    }

    #[test]
    fn missing_context_endpoint_skips_notification() {
        let pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        let mut settings = settings(ContextPayloadShape::Full);
        settings.context_endpoint.clear();
        let dispatcher = Dispatcher::new(&settings, http.clone(), None, Rc::new(pool.spawner()));

        assert_eq!(
            dispatcher.notify_context_changed(&notice()),
            ContextDelivery::Skipped
        );
        assert!(http.requests.borrow().is_empty());
    }

    #[test]
    fn turn_payload_matches_wire_contract() {
        let pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        http.respond(200, r#"{"message":"hi there"}"#);
        http.respond(200, r#"{"response":"ok"}"#);
        let dispatcher = Dispatcher::new(
            &settings(ContextPayloadShape::Full),
            http.clone(),
            None,
            Rc::new(pool.spawner()),
        );

        let first = block_on(dispatcher.send_turn(&turn("hello", TurnAction::Text, None)));
        let second = block_on(dispatcher.send_turn(&turn("olá", TurnAction::Voice, Some("42"))));

        assert_eq!(first, TurnReply::Text("hi there".to_string()));
        assert_eq!(second, TurnReply::Text("ok".to_string()));
        assert_eq!(
            http.bodies_to(CONVERSATION_URL),
            vec![
                json!({
                    "chatInput": "hello",
                    "action": "text",
                    "sessionId": "123456789012345",
                    "urlId": null,
                }),
                json!({
                    "chatInput": "olá",
                    "action": "voice",
                    "sessionId": "123456789012345",
                    "urlId": "42",
                }),
            ]
        );
        assert!(!http.requests.borrow()[0].keepalive);
    }

    #[test]
    fn turn_failures_map_to_fixed_outcomes() {
        let pool = LocalPool::new();
        let http = Rc::new(ScriptedHttp::default());
        http.respond(502, "upstream exploded");
        http.fail();
        http.respond(200, "not json");
        http.respond(200, r#"{"output":"wrong field"}"#);
        let dispatcher = Dispatcher::new(
            &settings(ContextPayloadShape::Full),
            http.clone(),
            None,
            Rc::new(pool.spawner()),
        );
        let turn = turn("hello", TurnAction::Text, None);

        assert_eq!(
            block_on(dispatcher.send_turn(&turn)),
            TurnReply::HttpFailure { status: 502 }
        );
        assert_eq!(
            block_on(dispatcher.send_turn(&turn)),
            TurnReply::NetworkFailure
        );
        assert_eq!(block_on(dispatcher.send_turn(&turn)), TurnReply::Placeholder);
        assert_eq!(block_on(dispatcher.send_turn(&turn)), TurnReply::Placeholder);
        assert_eq!(http.requests.borrow().len(), 4);
    }
}
