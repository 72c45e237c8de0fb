use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub body: String,
    /// Ask the host to keep the request alive past page unload.
    pub keepalive: bool,
}

impl HttpRequest {
    pub fn json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            keepalive: false,
        }
    }

    pub fn with_keepalive(mut self) -> Self {
        self.keepalive = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    #[snafu(display("request to {url} did not complete: {details}"))]
    Network {
        stage: &'static str,
        url: String,
        details: String,
    },
    #[snafu(display("failed to encode request body"))]
    EncodeBody {
        stage: &'static str,
        source: serde_json::Error,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;

/// JSON-over-HTTP POST, provided by the host (`fetch` in browsers).
///
/// Only failures to obtain a response are errors; every HTTP status is a response.
pub trait HttpClient {
    fn post_json<'a>(&'a self, request: HttpRequest)
    -> LocalBoxFuture<'a, TransportResult<HttpResponse>>;
}

/// `navigator.sendBeacon`: queue a POST that survives page teardown.
pub trait Beacon {
    /// Returns whether the host accepted the payload for delivery.
    fn send(&self, url: &str, json_body: &str) -> bool;
}
