use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, Window};

use chatlet_core::{
    ChatWidget, RecognizerOptions, RecognizerSnafu, SpeechError, SpeechErrorKind,
    SpeechRecognizer, join_transcript,
};

use crate::js::describe;

const CONSTRUCTORS: [&str; 2] = ["SpeechRecognition", "webkitSpeechRecognition"];

/// Web Speech API recognizer, prefixed or not.
pub struct WebSpeechRecognizer {
    inner: JsValue,
}

impl WebSpeechRecognizer {
    /// Returns `None` when the browser exposes no recognizer constructor.
    pub fn detect(window: &Window, options: &RecognizerOptions) -> Option<Self> {
        let constructor = CONSTRUCTORS.iter().find_map(|name| {
            js_sys::Reflect::get(window, &JsValue::from_str(name))
                .ok()
                .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
        })?;

        let inner = match js_sys::Reflect::construct(&constructor, &js_sys::Array::new()) {
            Ok(inner) => inner,
            Err(error) => {
                tracing::warn!(error = %describe(&error), "speech recognizer could not be created");
                return None;
            }
        };

        let configured = [
            ("lang", JsValue::from_str(&options.language)),
            ("interimResults", JsValue::from_bool(options.interim_results)),
            ("continuous", JsValue::from_bool(options.continuous)),
        ]
        .into_iter()
        .all(|(property, value)| {
            js_sys::Reflect::set(&inner, &JsValue::from_str(property), &value).unwrap_or(false)
        });
        if !configured {
            tracing::warn!("speech recognizer rejected its configuration");
            return None;
        }

        Some(Self { inner })
    }

    fn call(&self, action: &'static str, stage: &'static str) -> Result<(), SpeechError> {
        let method = js_sys::Reflect::get(&self.inner, &JsValue::from_str(action))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        let Some(method) = method else {
            return RecognizerSnafu {
                stage,
                action,
                details: "method missing",
            }
            .fail();
        };

        method
            .call0(&self.inner)
            .map(|_| ())
            .map_err(|error| SpeechError::Recognizer {
                stage,
                action,
                details: describe(&error),
            })
    }

    /// Routes recognizer events into the widget. Listeners live as long as
    /// the returned bindings.
    pub fn bind(&self, widget: &ChatWidget) -> Result<SpeechBindings, JsValue> {
        let target: EventTarget = self.inner.clone().unchecked_into();

        let started = {
            let widget = widget.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| widget.on_voice_started())
        };
        let ended = {
            let widget = widget.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| widget.on_voice_ended())
        };
        let failed = {
            let widget = widget.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let code = js_sys::Reflect::get(&event, &JsValue::from_str("error"))
                    .ok()
                    .and_then(|code| code.as_string())
                    .unwrap_or_default();
                widget.on_voice_error(SpeechErrorKind::from_code(&code));
            })
        };
        let recognized = {
            let widget = widget.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let transcript = result_transcript(&event);
                let widget = widget.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    widget.on_voice_result(&transcript).await;
                });
            })
        };

        let listeners = vec![
            ("start", started),
            ("end", ended),
            ("error", failed),
            ("result", recognized),
        ];
        for (kind, listener) in &listeners {
            target.add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())?;
        }

        Ok(SpeechBindings { target, listeners })
    }
}

impl SpeechRecognizer for WebSpeechRecognizer {
    fn start(&self) -> Result<(), SpeechError> {
        self.call("start", "web-speech-start")
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.call("stop", "web-speech-stop")
    }
}

pub struct SpeechBindings {
    target: EventTarget,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

impl Drop for SpeechBindings {
    fn drop(&mut self) {
        for (kind, listener) in &self.listeners {
            let _ = self
                .target
                .remove_event_listener_with_callback(kind, listener.as_ref().unchecked_ref());
        }
    }
}

/// `results[i][0].transcript` for every result from `resultIndex` on.
fn result_transcript(event: &Event) -> String {
    let event: &JsValue = event;
    let get = |target: &JsValue, key: &str| js_sys::Reflect::get(target, &JsValue::from_str(key));

    let Ok(results) = get(event, "results") else {
        return String::new();
    };
    let length = get(&results, "length")
        .ok()
        .and_then(|length| length.as_f64())
        .unwrap_or(0.0) as u32;
    let first = get(event, "resultIndex")
        .ok()
        .and_then(|index| index.as_f64())
        .unwrap_or(0.0) as u32;

    let segments = (first..length).filter_map(|index| {
        let result = js_sys::Reflect::get_u32(&results, index).ok()?;
        let best = js_sys::Reflect::get_u32(&result, 0).ok()?;
        get(&best, "transcript").ok()?.as_string()
    });
    join_transcript(segments)
}
