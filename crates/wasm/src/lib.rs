#![deny(unsafe_code)]

//! Browser bindings for the chat widget core.
//!
//! The page constructs a [`ChatWidgetHandle`] with its settings and a
//! transcript view object, then calls `boot()`.

mod js;
mod parent;
mod spawn;
mod speech;
mod storage;
mod transport;
mod view;

use std::rc::Rc;

use chatlet_core::{
    Beacon, ChatWidget, FormId, LaunchParams, LeadForm, ParentWindow, RecognizerOptions,
    SpeechCapability, SpeechRecognizer, TranscriptView, TurnReply, WidgetHost, WidgetSettings,
    is_submit_key,
};
use chatlet_storage::{FallbackStore, SharedStore};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{MessageEvent, Window};

pub use parent::{WindowParent, is_framed};
pub use spawn::WasmSpawner;
pub use speech::{SpeechBindings, WebSpeechRecognizer};
pub use storage::LocalStorageStore;
pub use transport::{FetchClient, NavigatorBeacon};
pub use view::JsTranscriptView;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

fn window() -> Result<Window, JsError> {
    web_sys::window().ok_or_else(|| JsError::new("chat widget requires a browser window"))
}

fn reply_to_js(reply: Option<TurnReply>) -> JsValue {
    match reply {
        Some(TurnReply::Text(text)) => JsValue::from_str(&text),
        Some(_) | None => JsValue::NULL,
    }
}

#[wasm_bindgen]
pub struct ChatWidgetHandle {
    widget: ChatWidget,
    window: Window,
    message_listener: Option<Closure<dyn FnMut(MessageEvent)>>,
    speech_bindings: Option<SpeechBindings>,
}

#[wasm_bindgen]
impl ChatWidgetHandle {
    /// `settings` may be `undefined`, in which case every field takes its default.
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue, view: JsTranscriptView) -> Result<ChatWidgetHandle, JsError> {
        let settings: WidgetSettings = if settings.is_undefined() || settings.is_null() {
            WidgetSettings::default()
        } else {
            serde_wasm_bindgen::from_value(settings)?
        };

        let window = window()?;
        let href = window.location().href().unwrap_or_default();
        let launch = LaunchParams::parse(&href, &settings);

        let store: SharedStore = Rc::new(FallbackStore::new(LocalStorageStore::new(window.clone())));
        let parent: Option<Rc<dyn ParentWindow>> =
            Some(Rc::new(WindowParent::new(window.clone())));

        let recognizer = WebSpeechRecognizer::detect(
            &window,
            &RecognizerOptions::single_utterance(settings.speech_language.clone()),
        )
        .map(Rc::new);
        let speech = match &recognizer {
            Some(recognizer) => {
                SpeechCapability::Available(Rc::clone(recognizer) as Rc<dyn SpeechRecognizer>)
            }
            None => SpeechCapability::Unavailable,
        };

        let view: Rc<dyn TranscriptView> = Rc::new(view);
        let host = WidgetHost {
            store,
            parent,
            framed: is_framed(&window),
            launch,
            http: Rc::new(FetchClient::new(window.clone())),
            beacon: NavigatorBeacon::detect(&window).map(|beacon| Rc::new(beacon) as Rc<dyn Beacon>),
            spawner: Rc::new(WasmSpawner),
            speech,
            view,
        };

        let widget = ChatWidget::new(settings, host)?;
        let speech_bindings = match &recognizer {
            Some(recognizer) => Some(recognizer.bind(&widget).map_err(|error| {
                JsError::new(&format!("speech listeners: {}", js::describe(&error)))
            })?),
            None => None,
        };

        Ok(Self {
            widget,
            window,
            message_listener: None,
            speech_bindings,
        })
    }

    /// Installs the parent message listener and announces readiness.
    pub fn boot(&mut self) -> Result<(), JsError> {
        if self.message_listener.is_none() {
            let widget = self.widget.clone();
            let listener = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let data = event.data();
                let handled = widget.handle_parent_message(
                    &event.origin(),
                    serde_wasm_bindgen::Deserializer::from(data),
                );
                if !handled {
                    tracing::trace!("parent message ignored");
                }
            });
            self.window
                .add_event_listener_with_callback("message", listener.as_ref().unchecked_ref())
                .map_err(|error| {
                    JsError::new(&format!("message listener: {}", js::describe(&error)))
                })?;
            self.message_listener = Some(listener);
        }

        self.widget.boot();
        Ok(())
    }

    /// Resolves to the assistant text, or `null` when nothing was sent or the
    /// turn failed (the failure message is already in the transcript).
    #[wasm_bindgen(js_name = submitText)]
    pub fn submit_text(&self, text: String) -> js_sys::Promise {
        let widget = self.widget.clone();
        future_to_promise(async move { Ok(reply_to_js(widget.submit_typed(&text).await)) })
    }

    #[wasm_bindgen(js_name = submitLeadForm)]
    pub fn submit_lead_form(&self, form_id: f64, name: String, email: String) -> js_sys::Promise {
        let widget = self.widget.clone();
        let form_id = FormId::new(form_id as u64);
        future_to_promise(async move {
            let reply = widget
                .submit_form(form_id, LeadForm::new(name, email))
                .await;
            Ok(reply_to_js(reply))
        })
    }

    #[wasm_bindgen(js_name = draftChanged)]
    pub fn draft_changed(&self, draft: &str) {
        self.widget.on_draft_changed(draft);
    }

    #[wasm_bindgen(js_name = toggleVoice)]
    pub fn toggle_voice(&self) {
        self.widget.toggle_voice();
    }

    #[wasm_bindgen(js_name = requestClose)]
    pub fn request_close(&self) {
        let outcome = self.widget.request_close();
        tracing::debug!(?outcome, "close requested");
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> String {
        self.widget.session_id().into_string()
    }

    #[wasm_bindgen(js_name = isSending)]
    pub fn is_sending(&self) -> bool {
        self.widget.is_sending()
    }

    /// Enter without Shift submits; Shift+Enter inserts a newline.
    #[wasm_bindgen(js_name = isSubmitKey)]
    pub fn submit_key(key: &str, shift: bool) -> bool {
        is_submit_key(key, shift)
    }
}

impl Drop for ChatWidgetHandle {
    fn drop(&mut self) {
        if let Some(listener) = self.message_listener.take() {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", listener.as_ref().unchecked_ref());
        }
        self.speech_bindings.take();
    }
}
