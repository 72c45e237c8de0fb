use snafu::Snafu;

use chatlet_core::SettingsError;
use chatlet_storage::StorageError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProbeError {
    #[snafu(display("missing command; expected 'turn <text>' or 'context <urlId>'"))]
    MissingCommand { stage: &'static str },

    #[snafu(display("unknown command '{raw}'"))]
    UnknownCommand { stage: &'static str, raw: String },

    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },

    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },

    #[snafu(display("'{command}' does not accept '{raw}'"))]
    UnsupportedFlag {
        stage: &'static str,
        command: &'static str,
        raw: String,
    },

    #[snafu(display("invalid urlId '{raw}': {source}"))]
    InvalidSubject {
        stage: &'static str,
        raw: String,
        source: StorageError,
    },

    #[snafu(display("failed to load settings: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },

    #[snafu(display("failed to build HTTP client: {source}"))]
    HttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
}

pub type ProbeResult<T> = Result<T, ProbeError>;
