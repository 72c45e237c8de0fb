/// Key under which the browser-stable session id is persisted.
pub const DEFAULT_SESSION_KEY: &str = "sperare_chat_uid";

/// Key under which the last known subject id is persisted.
pub const DEFAULT_SUBJECT_KEY: &str = "urlId";

/// The two disjoint keys shared by the identity store and the context model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub session: String,
    pub subject: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            session: DEFAULT_SESSION_KEY.to_string(),
            subject: DEFAULT_SUBJECT_KEY.to_string(),
        }
    }
}

impl StorageKeys {
    pub fn new(session: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            subject: subject.into(),
        }
    }
}
