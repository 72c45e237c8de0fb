use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use futures::task::LocalSpawn;

use chatlet_storage::{SessionId, SharedStore, SubjectId};

use crate::channel::{CloseOutcome, OriginGatedChannel, ParentCommand, ParentWindow};
use crate::context::ContextModel;
use crate::dispatch::{
    Beacon, ContextDelivery, ContextNotice, Dispatcher, HttpClient, OutboundTurn, TurnReply,
};
use crate::form::{FormId, LeadForm, ReplyKind};
use crate::identity::IdentityStore;
use crate::input::{InputMachine, InputTransition, TurnTicket, VoiceCommand, VoiceTransition};
use crate::launch::{ChannelMode, LaunchParams};
use crate::messages::Messages;
use crate::settings::{SettingsResult, WidgetSettings};
use crate::speech::{SpeechCapability, SpeechErrorKind};
use crate::turn::{ConversationTurn, InputMethod};
use crate::view::TranscriptView;

/// Host capabilities, gathered once at start-up.
pub struct WidgetHost {
    pub store: SharedStore,
    pub parent: Option<Rc<dyn ParentWindow>>,
    /// `window.self !== window.top`.
    pub framed: bool,
    pub launch: LaunchParams,
    pub http: Rc<dyn HttpClient>,
    pub beacon: Option<Rc<dyn Beacon>>,
    pub spawner: Rc<dyn LocalSpawn>,
    pub speech: SpeechCapability,
    pub view: Rc<dyn TranscriptView>,
}

struct WidgetState {
    settings: WidgetSettings,
    messages: &'static Messages,
    launch: LaunchParams,
    identity: RefCell<IdentityStore>,
    channel: RefCell<OriginGatedChannel>,
    context: RefCell<ContextModel>,
    input: RefCell<InputMachine>,
    dispatcher: Dispatcher,
    speech: SpeechCapability,
    view: Rc<dyn TranscriptView>,
    panel_visible: Cell<bool>,
    open_forms: RefCell<BTreeSet<FormId>>,
    next_form_id: Cell<u64>,
}

/// The single per-page widget instance.
///
/// Cheap to clone; every clone drives the same state. Event handlers never
/// hold a borrow across an await, so parent messages and voice events can be
/// handled while a turn is in flight.
#[derive(Clone)]
pub struct ChatWidget {
    state: Rc<WidgetState>,
}

struct PendingTurn {
    ticket: TurnTicket,
    turn: OutboundTurn,
    method: InputMethod,
}

/// Re-enables input when a turn settles, including when its future is dropped.
struct SettleGuard<'a> {
    state: &'a WidgetState,
    ticket: TurnTicket,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if let Err(rejection) = self
            .state
            .input
            .borrow_mut()
            .apply(InputTransition::Settle(self.ticket))
        {
            tracing::warn!(?rejection, "turn settled out of order");
        }
        self.state.view.set_pending(false);
        self.state.view.set_input_enabled(true);
    }
}

impl ChatWidget {
    pub fn new(settings: WidgetSettings, host: WidgetHost) -> SettingsResult<Self> {
        let settings = settings.normalized();
        settings.validate()?;

        let mode = ChannelMode::resolve(host.launch.force_embed, host.framed);
        let keys = settings.storage_keys();
        let identity = IdentityStore::new(Rc::clone(&host.store), keys.session);
        let context =
            ContextModel::resolve_initial(host.launch.subject.clone(), host.store, keys.subject);
        let channel = OriginGatedChannel::new(
            mode,
            settings.trusted_parent_origin.clone(),
            settings.close_target_origin().to_string(),
            host.parent,
        );
        let dispatcher = Dispatcher::new(&settings, host.http, host.beacon, host.spawner);
        let input = InputMachine::new(host.speech.is_available());

        tracing::info!(?mode, speech = host.speech.is_available(), "chat widget created");

        Ok(Self {
            state: Rc::new(WidgetState {
                messages: Messages::for_locale(settings.locale),
                settings,
                launch: host.launch,
                identity: RefCell::new(identity),
                channel: RefCell::new(channel),
                context: RefCell::new(context),
                input: RefCell::new(input),
                dispatcher,
                speech: host.speech,
                view: host.view,
                panel_visible: Cell::new(mode.is_embedded()),
                open_forms: RefCell::new(BTreeSet::new()),
                next_form_id: Cell::new(1),
            }),
        })
    }

    /// Resolves identity, announces readiness and reports a subject known at launch.
    pub fn boot(&self) {
        let session_id = self.session_id();
        let announced = self.state.channel.borrow_mut().announce_ready();
        let view = &self.state.view;
        view.set_panel_visible(self.state.panel_visible.get());
        view.set_voice_available(self.state.speech.is_available());
        view.set_input_enabled(true);

        tracing::info!(
            session_id = %session_id,
            announced,
            subject = ?self.subject(),
            "chat widget booted"
        );
        self.flush_context_notification();
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.state.settings
    }

    pub fn mode(&self) -> ChannelMode {
        self.state.channel.borrow().mode()
    }

    pub fn session_id(&self) -> SessionId {
        self.state.identity.borrow_mut().get_or_create_session_id()
    }

    pub fn subject(&self) -> Option<SubjectId> {
        self.state.context.borrow().subject().cloned()
    }

    pub fn is_sending(&self) -> bool {
        self.state.input.borrow().is_sending()
    }

    /// Entry point for `message` events. Returns whether the message was acted on.
    pub fn handle_parent_message<'de, D>(&self, origin: &str, data: D) -> bool
    where
        D: serde::Deserializer<'de>,
    {
        let command = self.state.channel.borrow().receive(origin, data);
        match command {
            Some(ParentCommand::SetSubject(subject)) => {
                self.set_subject(subject);
                true
            }
            None => false,
        }
    }

    pub fn set_subject(&self, subject: Option<SubjectId>) {
        self.state.context.borrow_mut().set_subject(subject);
        self.flush_context_notification();
    }

    /// Sends the context notification if the subject changed since the last one.
    pub fn flush_context_notification(&self) -> Option<ContextDelivery> {
        let subject = self.state.context.borrow_mut().take_pending_notification()?;
        let notice = ContextNotice {
            subject,
            session_id: self.session_id(),
            full_url: self.state.launch.page_url.clone(),
        };
        Some(self.state.dispatcher.notify_context_changed(&notice))
    }

    pub fn request_close(&self) -> CloseOutcome {
        let outcome = self.state.channel.borrow().request_close();
        if outcome == CloseOutcome::ToggleLocally {
            let visible = !self.state.panel_visible.get();
            self.state.panel_visible.set(visible);
            self.state.view.set_panel_visible(visible);
        }
        outcome
    }

    pub fn on_draft_changed(&self, draft: &str) {
        let has_text = !draft.trim().is_empty();
        if let Err(rejection) = self
            .state
            .input
            .borrow_mut()
            .apply(InputTransition::Edit { has_text })
        {
            tracing::debug!(?rejection, "draft edit ignored");
        }
    }

    pub async fn submit_typed(&self, text: &str) -> Option<TurnReply> {
        let pending = self.begin_turn(text, InputMethod::Typed)?;
        Some(self.finish_turn(pending).await)
    }

    pub async fn submit_form(&self, form_id: FormId, form: LeadForm) -> Option<TurnReply> {
        if !self.state.open_forms.borrow().contains(&form_id) {
            tracing::debug!(?form_id, "submit for unknown lead form ignored");
            return None;
        }
        if form.is_blank() {
            return None;
        }

        let content = match form.to_turn_content() {
            Ok(content) => content,
            Err(error) => {
                tracing::error!(error = %error, "lead form could not be encoded");
                return None;
            }
        };

        let pending = self.begin_turn(&content, InputMethod::FormSubmitted)?;
        self.state.open_forms.borrow_mut().remove(&form_id);
        self.state.view.remove_lead_form(form_id);
        Some(self.finish_turn(pending).await)
    }

    pub fn toggle_voice(&self) {
        let Some(recognizer) = self.state.speech.recognizer() else {
            return;
        };

        let command = self
            .state
            .input
            .borrow_mut()
            .apply_voice(VoiceTransition::Activate);
        match command {
            Ok(VoiceCommand::Start) => {
                self.state.view.set_voice_capturing(true);
                if let Err(error) = recognizer.start() {
                    tracing::warn!(error = %error, "speech capture did not start");
                    self.on_voice_ended();
                }
            }
            Ok(VoiceCommand::Stop) => {
                if let Err(error) = recognizer.stop() {
                    tracing::warn!(error = %error, "speech capture did not stop");
                    self.on_voice_ended();
                }
            }
            Ok(VoiceCommand::None) => {}
            Err(rejection) => tracing::debug!(?rejection, "voice toggle ignored"),
        }
    }

    pub fn on_voice_started(&self) {
        self.apply_voice_event(VoiceTransition::CaptureStarted);
        self.state.view.set_voice_capturing(true);
    }

    pub fn on_voice_ended(&self) {
        self.apply_voice_event(VoiceTransition::CaptureEnded);
        self.state.view.set_voice_capturing(false);
    }

    pub fn on_voice_error(&self, kind: SpeechErrorKind) {
        tracing::warn!(?kind, "speech recognition error");
        let message = self.state.messages.speech_error(&kind);
        self.state
            .view
            .append_turn(&ConversationTurn::assistant(message, InputMethod::Spoken));
    }

    pub async fn on_voice_result(&self, transcript: &str) -> Option<TurnReply> {
        self.state.view.set_draft(transcript);
        let pending = self.begin_turn(transcript, InputMethod::Spoken)?;
        Some(self.finish_turn(pending).await)
    }

    fn apply_voice_event(&self, transition: VoiceTransition) {
        if let Err(rejection) = self.state.input.borrow_mut().apply_voice(transition) {
            tracing::debug!(?rejection, ?transition, "voice event ignored");
        }
    }

    fn begin_turn(&self, content: &str, method: InputMethod) -> Option<PendingTurn> {
        let content = content.trim();
        let began = self
            .state
            .input
            .borrow_mut()
            .apply(InputTransition::BeginSend {
                has_text: !content.is_empty(),
            });
        let ticket = match began {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return None,
            Err(rejection) => {
                tracing::debug!(?rejection, ?method, "submission ignored");
                return None;
            }
        };

        let view = &self.state.view;
        view.append_turn(&ConversationTurn::user(content, method));
        view.set_draft("");
        view.set_input_enabled(false);
        view.set_pending(true);

        Some(PendingTurn {
            ticket,
            method,
            turn: OutboundTurn {
                chat_input: content.to_string(),
                action: method.action(),
                session_id: self.session_id(),
                subject: self.subject(),
            },
        })
    }

    async fn finish_turn(&self, pending: PendingTurn) -> TurnReply {
        let guard = SettleGuard {
            state: &self.state,
            ticket: pending.ticket,
        };
        let reply = self.state.dispatcher.send_turn(&pending.turn).await;
        self.render_reply(&reply, pending.method);
        drop(guard);
        reply
    }

    fn render_reply(&self, reply: &TurnReply, method: InputMethod) {
        let view = &self.state.view;
        let TurnReply::Text(text) = reply else {
            let message = reply.display_text(self.state.messages);
            view.append_turn(&ConversationTurn::assistant(message, method));
            return;
        };

        match ReplyKind::classify(text, &self.state.settings.form_sentinel) {
            ReplyKind::Text(text) => {
                view.append_turn(&ConversationTurn::assistant(text, method));
            }
            ReplyKind::LeadForm { text } => {
                if !text.is_empty() {
                    view.append_turn(&ConversationTurn::assistant(text, method));
                }
                let form_id = FormId::new(self.state.next_form_id.get());
                self.state.next_form_id.set(form_id.0 + 1);
                self.state.open_forms.borrow_mut().insert(form_id);
                view.show_lead_form(form_id);
            }
        }
    }
}
