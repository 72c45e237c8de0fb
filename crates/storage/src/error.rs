use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("storage id '{raw}' is invalid for {id_type}: {details}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        details: &'static str,
    },
    #[snafu(display("storage backend refused key '{key}': {details}"))]
    Unavailable {
        stage: &'static str,
        key: String,
        details: String,
    },
    #[snafu(display("failed to read storage file {path}"))]
    ReadFile {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse storage file {path}"))]
    ParseFile {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("failed to serialize storage entries"))]
    SerializeEntries {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write storage file {path}"))]
    WriteFile {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
