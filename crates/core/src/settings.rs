use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use url::Url;

use chatlet_storage::{DEFAULT_SESSION_KEY, DEFAULT_SUBJECT_KEY, StorageKeys};

use crate::messages::Locale;

pub const DEFAULT_SUBJECT_QUERY_PARAM: &str = "urlId";
pub const DEFAULT_EMBED_QUERY_PARAM: &str = "embed";
pub const DEFAULT_SPEECH_LANGUAGE: &str = "pt-PT";
pub const DEFAULT_FORM_SENTINEL: &str = "[[LEAD_FORM]]";
pub const ENV_PREFIX: &str = "CHATLET_";

/// Which fields the context-notification payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPayloadShape {
    /// `{urlId}` only.
    Minimal,
    /// `{urlId, fullUrl, sessionId}`.
    #[default]
    Full,
}

/// Target origin used for the outbound close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseTarget {
    #[default]
    Trusted,
    /// `"*"`, for parents served from more than one origin.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default)]
    pub trusted_parent_origin: String,
    #[serde(default)]
    pub conversation_endpoint: String,
    /// Empty disables context notifications.
    #[serde(default)]
    pub context_endpoint: String,
    #[serde(default = "default_session_storage_key")]
    pub session_storage_key: String,
    #[serde(default = "default_subject_storage_key")]
    pub subject_storage_key: String,
    #[serde(default = "default_subject_query_param")]
    pub subject_query_param: String,
    #[serde(default = "default_embed_query_param")]
    pub embed_query_param: String,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_speech_language")]
    pub speech_language: String,
    #[serde(default)]
    pub context_payload: ContextPayloadShape,
    #[serde(default = "default_form_sentinel")]
    pub form_sentinel: String,
    #[serde(default)]
    pub close_target: CloseTarget,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            trusted_parent_origin: String::new(),
            conversation_endpoint: String::new(),
            context_endpoint: String::new(),
            session_storage_key: default_session_storage_key(),
            subject_storage_key: default_subject_storage_key(),
            subject_query_param: default_subject_query_param(),
            embed_query_param: default_embed_query_param(),
            locale: Locale::default(),
            speech_language: default_speech_language(),
            context_payload: ContextPayloadShape::default(),
            form_sentinel: default_form_sentinel(),
            close_target: CloseTarget::default(),
        }
    }
}

impl WidgetSettings {
    /// Loads defaults, then an optional JSON file, then `CHATLET_*` variables.
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if path.exists() {
                figment = figment.merge(Json::file(path));
            } else {
                tracing::info!("settings file not found at {:?}, using defaults", path);
            }
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let settings = figment
            .extract::<Self>()
            .map_err(Box::new)
            .context(ExtractSnafu {
                stage: "extract-widget-settings",
            })?
            .normalized();
        settings.validate()?;
        Ok(settings)
    }

    /// Trims every string and restores defaults for blank optional values.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        self.trusted_parent_origin = self.trusted_parent_origin.trim().to_string();
        self.conversation_endpoint = self.conversation_endpoint.trim().to_string();
        self.context_endpoint = self.context_endpoint.trim().to_string();
        self.session_storage_key =
            non_blank_or(self.session_storage_key, defaults.session_storage_key);
        self.subject_storage_key =
            non_blank_or(self.subject_storage_key, defaults.subject_storage_key);
        self.subject_query_param =
            non_blank_or(self.subject_query_param, defaults.subject_query_param);
        self.embed_query_param = non_blank_or(self.embed_query_param, defaults.embed_query_param);
        self.speech_language = non_blank_or(self.speech_language, defaults.speech_language);
        self.form_sentinel = non_blank_or(self.form_sentinel, defaults.form_sentinel);
        self
    }

    /// Checks the values the widget cannot run without.
    ///
    /// The trusted origin must already be in serialized origin form
    /// (`scheme://host[:port]`), because inbound messages are matched against
    /// it with exact string equality.
    pub fn validate(&self) -> SettingsResult<()> {
        ensure!(
            !self.trusted_parent_origin.is_empty(),
            MissingValueSnafu {
                stage: "validate-trusted-origin",
                field: "trusted_parent_origin",
            }
        );
        let parsed = Url::parse(&self.trusted_parent_origin).context(InvalidUrlSnafu {
            stage: "parse-trusted-origin",
            field: "trusted_parent_origin",
            value: self.trusted_parent_origin.clone(),
        })?;
        let canonical = parsed.origin().ascii_serialization();
        ensure!(
            canonical == self.trusted_parent_origin,
            NonCanonicalOriginSnafu {
                stage: "validate-trusted-origin",
                value: self.trusted_parent_origin.clone(),
                canonical,
            }
        );

        ensure!(
            !self.conversation_endpoint.is_empty(),
            MissingValueSnafu {
                stage: "validate-conversation-endpoint",
                field: "conversation_endpoint",
            }
        );
        Url::parse(&self.conversation_endpoint).context(InvalidUrlSnafu {
            stage: "parse-conversation-endpoint",
            field: "conversation_endpoint",
            value: self.conversation_endpoint.clone(),
        })?;

        if !self.context_endpoint.is_empty() {
            Url::parse(&self.context_endpoint).context(InvalidUrlSnafu {
                stage: "parse-context-endpoint",
                field: "context_endpoint",
                value: self.context_endpoint.clone(),
            })?;
        }

        ensure!(
            self.session_storage_key != self.subject_storage_key,
            SharedStorageKeySnafu {
                stage: "validate-storage-keys",
                key: self.session_storage_key.clone(),
            }
        );
        Ok(())
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(&self.session_storage_key, &self.subject_storage_key)
    }

    /// Target origin for `closeChatbot`.
    pub fn close_target_origin(&self) -> &str {
        match self.close_target {
            CloseTarget::Trusted => &self.trusted_parent_origin,
            CloseTarget::Any => "*",
        }
    }
}

fn non_blank_or(value: String, fallback: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed.to_string()
    }
}

fn default_session_storage_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

fn default_subject_storage_key() -> String {
    DEFAULT_SUBJECT_KEY.to_string()
}

fn default_subject_query_param() -> String {
    DEFAULT_SUBJECT_QUERY_PARAM.to_string()
}

fn default_embed_query_param() -> String {
    DEFAULT_EMBED_QUERY_PARAM.to_string()
}

fn default_speech_language() -> String {
    DEFAULT_SPEECH_LANGUAGE.to_string()
}

fn default_form_sentinel() -> String {
    DEFAULT_FORM_SENTINEL.to_string()
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to extract widget settings"))]
    Extract {
        stage: &'static str,
        source: Box<figment::Error>,
    },
    #[snafu(display("setting '{field}' is required"))]
    MissingValue {
        stage: &'static str,
        field: &'static str,
    },
    #[snafu(display("setting '{field}' is not a valid URL: '{value}'"))]
    InvalidUrl {
        stage: &'static str,
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[snafu(display("trusted origin '{value}' must be written as '{canonical}'"))]
    NonCanonicalOrigin {
        stage: &'static str,
        value: String,
        canonical: String,
    },
    #[snafu(display("session and subject ids cannot share storage key '{key}'"))]
    SharedStorageKey { stage: &'static str, key: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn valid() -> WidgetSettings {
        WidgetSettings {
            trusted_parent_origin: "https://homes.example".to_string(),
            conversation_endpoint: "https://hooks.example/chat".to_string(),
            context_endpoint: "https://hooks.example/page".to_string(),
            ..WidgetSettings::default()
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: WidgetSettings = serde_json::from_str(
            r#"{"trusted_parent_origin":"https://homes.example","context_payload":"minimal"}"#,
        )
        .expect("parse");

        assert_eq!(parsed.session_storage_key, "sperare_chat_uid");
        assert_eq!(parsed.subject_storage_key, "urlId");
        assert_eq!(parsed.context_payload, ContextPayloadShape::Minimal);
        assert_eq!(parsed.close_target, CloseTarget::Trusted);
        assert_eq!(parsed.locale, Locale::PtPt);
    }

    #[test]
    fn normalization_trims_and_restores_blank_values() {
        let settings = WidgetSettings {
            trusted_parent_origin: "  https://homes.example ".to_string(),
            speech_language: "   ".to_string(),
            ..valid()
        }
        .normalized();

        assert_eq!(settings.trusted_parent_origin, "https://homes.example");
        assert_eq!(settings.speech_language, DEFAULT_SPEECH_LANGUAGE);
    }

    #[test]
    fn validation_requires_canonical_origin() {
        assert!(valid().validate().is_ok());

        for origin in ["", "https://homes.example/", "https://HOMES.example", "homes.example"] {
            let settings = WidgetSettings {
                trusted_parent_origin: origin.to_string(),
                ..valid()
            };
            assert!(settings.validate().is_err(), "{origin:?} should be rejected");
        }
    }

    #[test]
    fn validation_rejects_shared_storage_keys() {
        let settings = WidgetSettings {
            subject_storage_key: "sperare_chat_uid".to_string(),
            ..valid()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::SharedStorageKey { .. })
        ));
    }

    #[test]
    fn close_target_follows_setting() {
        let mut settings = valid();
        assert_eq!(settings.close_target_origin(), "https://homes.example");
        settings.close_target = CloseTarget::Any;
        assert_eq!(settings.close_target_origin(), "*");
    }
}
