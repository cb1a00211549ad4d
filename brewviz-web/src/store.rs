//! Hosted insert endpoint reached through `fetch`.

use brewviz_core::error::RemoteError;
use brewviz_core::{RemoteStore, Table};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

/// PostgREST-style endpoint: `POST {url}/rest/v1/{table}`
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, table: Table, body: &str) -> Result<Request, JsValue> {
        let headers = Headers::new()?;
        headers.set("Content-Type", "application/json")?;
        headers.set("apikey", &self.api_key)?;
        headers.set("Authorization", &format!("Bearer {}", self.api_key))?;
        headers.set("Prefer", "return=minimal")?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_headers(&headers);
        opts.set_body(&JsValue::from_str(body));

        Request::new_with_str_and_init(&self.endpoint(table), &opts)
    }
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

impl RemoteStore for RestStore {
    async fn insert(&self, table: Table, row: serde_json::Value) -> Result<(), RemoteError> {
        let request = self
            .request(table, &row.to_string())
            .map_err(|e| RemoteError::Other(describe(&e)))?;

        let window = web_sys::window().ok_or(RemoteError::Unavailable)?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| RemoteError::Connectivity(describe(&e)))?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| RemoteError::Other("response is not a Response".to_string()))?;

        if resp.ok() {
            return Ok(());
        }

        let body = match resp.text() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .ok()
                .and_then(|text| text.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        Err(RemoteError::from_response(resp.status(), &body))
    }
}
