#![deny(unsafe_code)]

//! Embed communication and delivery core for the chat widget.
//!
//! Host capabilities (storage, parent window, HTTP, beacon, speech, view)
//! are traits; the browser bindings live in `chatlet-wasm`.

pub mod channel;
pub mod context;
pub mod dispatch;
pub mod form;
pub mod identity;
pub mod input;
pub mod launch;
pub mod messages;
pub mod settings;
pub mod speech;
pub mod turn;
pub mod view;
mod widget;

pub use chatlet_storage as storage;

pub use channel::{
    AnnounceState, ChannelError, ChannelResult, CloseOutcome, InboundMessage, OriginGatedChannel,
    OutboundMessage, ParentCommand, ParentWindow, PostMessageSnafu,
};
pub use context::ContextModel;
pub use dispatch::{
    Beacon, ContextDelivery, ContextNotice, Dispatcher, HttpClient, HttpRequest, HttpResponse,
    LocalBoxFuture, NetworkSnafu, OutboundTurn, TransportError, TransportResult, TurnReply,
};
pub use form::{FormId, LeadForm, ReplyKind};
pub use identity::{Entropy, IdentityStore, OsEntropy};
pub use input::{InputMachine, TurnPhase, VoicePhase, is_submit_key};
pub use launch::{ChannelMode, LaunchParams};
pub use messages::{Locale, Messages};
pub use settings::{ContextPayloadShape, CloseTarget, SettingsError, WidgetSettings};
pub use speech::{
    RecognizerOptions, RecognizerSnafu, SpeechCapability, SpeechError, SpeechErrorKind,
    SpeechRecognizer, join_transcript,
};
pub use turn::{ConversationTurn, InputMethod, Role, TurnAction};
pub use view::TranscriptView;
pub use widget::{ChatWidget, WidgetHost};
