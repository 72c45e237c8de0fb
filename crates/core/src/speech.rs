use std::rc::Rc;

use snafu::Snafu;

/// Recognizer configuration handed to the host capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerOptions {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognizerOptions {
    /// One final result per activation.
    pub fn single_utterance(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// Capture failure reported by the recognizer's error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Other(String),
}

impl SpeechErrorKind {
    /// Maps Web Speech error codes.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SpeechError {
    #[snafu(display("speech recognizer failed to {action}: {details}"))]
    Recognizer {
        stage: &'static str,
        action: &'static str,
        details: String,
    },
}

/// Host speech capture. Results arrive later through the widget's
/// `on_voice_*` callbacks.
pub trait SpeechRecognizer {
    fn start(&self) -> Result<(), SpeechError>;
    fn stop(&self) -> Result<(), SpeechError>;
}

/// Selected once at start-up.
#[derive(Clone, Default)]
pub enum SpeechCapability {
    Available(Rc<dyn SpeechRecognizer>),
    #[default]
    Unavailable,
}

impl SpeechCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn recognizer(&self) -> Option<&Rc<dyn SpeechRecognizer>> {
        match self {
            Self::Available(recognizer) => Some(recognizer),
            Self::Unavailable => None,
        }
    }
}

impl std::fmt::Debug for SpeechCapability {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => formatter.write_str("SpeechCapability::Available"),
            Self::Unavailable => formatter.write_str("SpeechCapability::Unavailable"),
        }
    }
}

/// Joins the segments of one recognition result.
pub fn join_transcript<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|segment| segment.as_ref().trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_kinds() {
        assert_eq!(SpeechErrorKind::from_code("no-speech"), SpeechErrorKind::NoSpeech);
        assert_eq!(
            SpeechErrorKind::from_code("audio-capture"),
            SpeechErrorKind::AudioCapture
        );
        assert_eq!(
            SpeechErrorKind::from_code("not-allowed"),
            SpeechErrorKind::NotAllowed
        );
        assert_eq!(
            SpeechErrorKind::from_code("network"),
            SpeechErrorKind::Other("network".into())
        );
    }

    #[test]
    fn transcript_segments_are_space_joined() {
        assert_eq!(join_transcript(["quero ver", " a casa "]), "quero ver a casa");
        assert_eq!(join_transcript(Vec::<String>::new()), "");
    }
}
