use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys::Window;

use chatlet_core::{ChannelError, ChannelResult, OutboundMessage, ParentWindow};

use crate::js::describe;

pub struct WindowParent {
    window: Window,
}

impl WindowParent {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn failure(message: OutboundMessage, target_origin: &str, error: &JsValue) -> ChannelError {
        ChannelError::PostMessage {
            stage: "window-parent-post-message",
            message,
            target_origin: target_origin.to_string(),
            details: describe(error),
        }
    }
}

impl ParentWindow for WindowParent {
    fn post_message(&self, message: OutboundMessage, target_origin: &str) -> ChannelResult<()> {
        let payload = message
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|error| Self::failure(message, target_origin, &JsValue::from(error)))?;

        let parent = match self.window.parent() {
            Ok(Some(parent)) => parent,
            Ok(None) => {
                return Err(Self::failure(
                    message,
                    target_origin,
                    &JsValue::from_str("window has no parent"),
                ));
            }
            Err(error) => return Err(Self::failure(message, target_origin, &error)),
        };

        parent
            .post_message(&payload, target_origin)
            .map_err(|error| Self::failure(message, target_origin, &error))
    }
}

/// `window.self !== window.top`; an inaccessible top counts as framed.
pub fn is_framed(window: &Window) -> bool {
    match window.top() {
        Ok(Some(top)) => !js_sys::Object::is(&top, window),
        Ok(None) => false,
        Err(_) => true,
    }
}
