use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};

use chatlet_core::{
    HttpClient, HttpRequest, HttpResponse, LocalBoxFuture, TransportError, TransportResult,
};

/// `reqwest` behind the widget's HTTP seam. `keepalive` has no native meaning.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post(&self, request: &HttpRequest) -> reqwest::Result<HttpResponse> {
        let response = self
            .client
            .post(&request.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.body.clone())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse::new(status, body))
    }
}

impl HttpClient for ReqwestClient {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> LocalBoxFuture<'a, TransportResult<HttpResponse>> {
        Box::pin(async move {
            self.post(&request)
                .await
                .map_err(|error| TransportError::Network {
                    stage: "reqwest-post",
                    url: request.url.clone(),
                    details: error.to_string(),
                })
        })
    }
}

/// Spawns onto the current `tokio::task::LocalSet`.
///
/// Must only be used from inside `LocalSet::run_until`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl LocalSpawn for TokioSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        drop(tokio::task::spawn_local(future));
        Ok(())
    }
}
