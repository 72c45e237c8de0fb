use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Headers, Navigator, RequestInit, Response, Window};

use chatlet_core::{
    Beacon, HttpClient, HttpRequest, HttpResponse, LocalBoxFuture, TransportError, TransportResult,
};

use crate::js::describe;

/// `fetch` with a JSON body. `keepalive` maps straight onto the request init.
pub struct FetchClient {
    window: Window,
}

impl FetchClient {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, JsValue> {
        let headers = Headers::new()?;
        headers.set("Content-Type", "application/json")?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&request.body));
        init.set_keepalive(request.keepalive);

        let response: Response = JsFuture::from(self.window.fetch_with_str_and_init(&request.url, &init))
            .await?
            .dyn_into()?;
        let body = JsFuture::from(response.text()?)
            .await?
            .as_string()
            .unwrap_or_default();

        Ok(HttpResponse::new(response.status(), body))
    }
}

impl HttpClient for FetchClient {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> LocalBoxFuture<'a, TransportResult<HttpResponse>> {
        Box::pin(async move {
            self.fetch(&request)
                .await
                .map_err(|error| TransportError::Network {
                    stage: "browser-fetch",
                    url: request.url.clone(),
                    details: describe(&error),
                })
        })
    }
}

/// `navigator.sendBeacon`, present in every current browser but probed anyway.
pub struct NavigatorBeacon {
    navigator: Navigator,
}

impl NavigatorBeacon {
    pub fn detect(window: &Window) -> Option<Self> {
        let navigator = window.navigator();
        let supported = js_sys::Reflect::has(&navigator, &JsValue::from_str("sendBeacon"))
            .unwrap_or(false);
        supported.then_some(Self { navigator })
    }
}

impl Beacon for NavigatorBeacon {
    fn send(&self, url: &str, json_body: &str) -> bool {
        let parts = js_sys::Array::of1(&JsValue::from_str(json_body));
        let options = BlobPropertyBag::new();
        options.set_type("application/json");

        let blob = match Blob::new_with_str_sequence_and_options(&parts, &options) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::debug!(error = %describe(&error), "beacon payload could not be built");
                return false;
            }
        };

        // Some engines throw for non-safelisted blob types; the caller falls back to fetch.
        match self.navigator.send_beacon_with_opt_blob(url, Some(&blob)) {
            Ok(queued) => queued,
            Err(error) => {
                tracing::debug!(error = %describe(&error), "sendBeacon threw");
                false
            }
        }
    }
}
