use serde::{Deserialize, Serialize};

use crate::speech::SpeechErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-PT", alias = "pt")]
    PtPt,
    #[serde(rename = "en", alias = "en-US", alias = "en-GB")]
    En,
}

/// Fixed user-facing strings. None of them carry error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    pub processing_placeholder: &'static str,
    pub http_failure: &'static str,
    pub network_failure: &'static str,
    pub speech_error_prefix: &'static str,
    pub no_speech: &'static str,
    pub audio_capture: &'static str,
    pub not_allowed: &'static str,
    pub speech_other: &'static str,
}

const PT_PT: Messages = Messages {
    processing_placeholder: "Estou a processar…",
    http_failure: "Desculpa, tive um problema a processar o pedido.",
    network_failure: "Sem ligação ao servidor. Tenta novamente em instantes.",
    speech_error_prefix: "Erro de voz. ",
    no_speech: "Sem fala detetada.",
    audio_capture: "Microfone indisponível.",
    not_allowed: "Permissão negada.",
    speech_other: "Tenta outra vez.",
};

const EN: Messages = Messages {
    processing_placeholder: "I'm processing your request…",
    http_failure: "Sorry, I had a problem processing your request.",
    network_failure: "No connection to the server. Please try again shortly.",
    speech_error_prefix: "Voice error. ",
    no_speech: "No speech detected.",
    audio_capture: "Microphone unavailable.",
    not_allowed: "Permission denied.",
    speech_other: "Please try again.",
};

impl Messages {
    pub fn for_locale(locale: Locale) -> &'static Messages {
        match locale {
            Locale::PtPt => &PT_PT,
            Locale::En => &EN,
        }
    }

    pub fn speech_error(&self, kind: &SpeechErrorKind) -> String {
        let detail = match kind {
            SpeechErrorKind::NoSpeech => self.no_speech,
            SpeechErrorKind::AudioCapture => self.audio_capture,
            SpeechErrorKind::NotAllowed => self.not_allowed,
            SpeechErrorKind::Other(_) => self.speech_other,
        };
        format!("{}{}", self.speech_error_prefix, detail)
    }
}
