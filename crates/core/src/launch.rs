use url::Url;

use chatlet_storage::SubjectId;

use crate::settings::WidgetSettings;

/// Whether the widget runs as the top-level document or inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Standalone,
    Embedded,
}

impl ChannelMode {
    pub fn resolve(force_embed: bool, framed: bool) -> Self {
        if force_embed || framed {
            Self::Embedded
        } else {
            Self::Standalone
        }
    }

    pub fn is_embedded(self) -> bool {
        matches!(self, Self::Embedded)
    }
}

/// Values read from the widget's own launch URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchParams {
    pub page_url: Option<String>,
    pub subject: Option<SubjectId>,
    pub force_embed: bool,
}

impl LaunchParams {
    pub fn from_url(url: &Url, settings: &WidgetSettings) -> Self {
        let mut subject = None;
        let mut force_embed = false;

        // First occurrence wins, like `URLSearchParams::get`.
        for (key, value) in url.query_pairs() {
            if subject.is_none() && key == settings.subject_query_param.as_str() {
                subject = Some(SubjectId::from_optional(Some(&value)));
            } else if key == settings.embed_query_param.as_str() && !force_embed {
                force_embed = value == "1";
            }
        }

        Self {
            page_url: Some(url.as_str().to_string()),
            subject: subject.flatten(),
            force_embed,
        }
    }

    /// Unparseable input yields empty parameters.
    pub fn parse(raw_url: &str, settings: &WidgetSettings) -> Self {
        match Url::parse(raw_url) {
            Ok(url) => Self::from_url(&url, settings),
            Err(error) => {
                tracing::warn!(raw_url, error = %error, "launch URL could not be parsed");
                Self::default()
            }
        }
    }
}
