use wasm_bindgen::prelude::*;

use chatlet_core::{ConversationTurn, FormId, InputMethod, Role, TranscriptView};

use crate::js::describe;

#[wasm_bindgen]
extern "C" {
    /// Page-supplied renderer. Every method is optional in spirit but must
    /// exist; a throwing method is logged and skipped.
    #[wasm_bindgen(typescript_type = "TranscriptView")]
    pub type JsTranscriptView;

    #[wasm_bindgen(method, catch, js_name = appendTurn)]
    fn js_append_turn(
        this: &JsTranscriptView,
        role: &str,
        content: &str,
        input_method: &str,
        timestamp_millis: f64,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = showLeadForm)]
    fn js_show_lead_form(this: &JsTranscriptView, form_id: f64) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeLeadForm)]
    fn js_remove_lead_form(this: &JsTranscriptView, form_id: f64) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setInputEnabled)]
    fn js_set_input_enabled(this: &JsTranscriptView, enabled: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setPending)]
    fn js_set_pending(this: &JsTranscriptView, pending: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setDraft)]
    fn js_set_draft(this: &JsTranscriptView, text: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setVoiceAvailable)]
    fn js_set_voice_available(this: &JsTranscriptView, available: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setVoiceCapturing)]
    fn js_set_voice_capturing(this: &JsTranscriptView, capturing: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setPanelVisible)]
    fn js_set_panel_visible(this: &JsTranscriptView, visible: bool) -> Result<(), JsValue>;
}

fn logged(call: &'static str, result: Result<(), JsValue>) {
    if let Err(error) = result {
        tracing::warn!(call, error = %describe(&error), "transcript view call failed");
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn input_method_name(method: InputMethod) -> &'static str {
    match method {
        InputMethod::Typed => "typed",
        InputMethod::Spoken => "spoken",
        InputMethod::FormSubmitted => "form",
    }
}

impl TranscriptView for JsTranscriptView {
    fn append_turn(&self, turn: &ConversationTurn) {
        logged(
            "appendTurn",
            self.js_append_turn(
                role_name(turn.role),
                &turn.content,
                input_method_name(turn.input_method),
                turn.timestamp_millis() as f64,
            ),
        );
    }

    fn show_lead_form(&self, form_id: FormId) {
        logged("showLeadForm", self.js_show_lead_form(form_id.0 as f64));
    }

    fn remove_lead_form(&self, form_id: FormId) {
        logged("removeLeadForm", self.js_remove_lead_form(form_id.0 as f64));
    }

    fn set_input_enabled(&self, enabled: bool) {
        logged("setInputEnabled", self.js_set_input_enabled(enabled));
    }

    fn set_pending(&self, pending: bool) {
        logged("setPending", self.js_set_pending(pending));
    }

    fn set_draft(&self, text: &str) {
        logged("setDraft", self.js_set_draft(text));
    }

    fn set_voice_available(&self, available: bool) {
        logged("setVoiceAvailable", self.js_set_voice_available(available));
    }

    fn set_voice_capturing(&self, capturing: bool) {
        logged("setVoiceCapturing", self.js_set_voice_capturing(capturing));
    }

    fn set_panel_visible(&self, visible: bool) {
        logged("setPanelVisible", self.js_set_panel_visible(visible));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_the_page_contract() {
        assert_eq!(role_name(Role::User), "user");
        assert_eq!(role_name(Role::Assistant), "assistant");
        assert_eq!(input_method_name(InputMethod::Typed), "typed");
        assert_eq!(input_method_name(InputMethod::Spoken), "spoken");
        assert_eq!(input_method_name(InputMethod::FormSubmitted), "form");
    }
}
