use crate::form::FormId;
use crate::turn::ConversationTurn;

/// Presentation collaborator. Rendering, markdown and sanitization live on
/// the other side of this trait.
pub trait TranscriptView {
    fn append_turn(&self, turn: &ConversationTurn);
    fn show_lead_form(&self, form_id: FormId);
    fn remove_lead_form(&self, form_id: FormId);
    fn set_input_enabled(&self, enabled: bool);
    fn set_pending(&self, pending: bool);
    fn set_draft(&self, text: &str);
    fn set_voice_available(&self, available: bool);
    fn set_voice_capturing(&self, capturing: bool);
    fn set_panel_visible(&self, visible: bool);
}
