//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, the concrete implementation of the
//! `HttpTransport` port from the `core` crate, built on `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use todo_core::http::{HttpMethod, HttpRequest, HttpResponse};
use todo_core::ports::{HttpTransport, PortError, PortResult};
use tracing::debug;
use url::Url;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `HttpTransport` port.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport` for the backend rooted at `base_url`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Joins a request path under the base URL. Leading slashes on the path are
    /// ignored so `/todos` resolves to `<base>/todos`.
    fn url_for(&self, path: &str) -> PortResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| PortError::Unexpected(format!("Invalid request path '{path}': {e}")))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> PortResult<HttpResponse> {
        let url = self.url_for(&request.path)?;
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            PortError::Network(format!("{} {} failed: {e}", request.method, request.path))
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            PortError::Network(format!("Failed to read response body: {e}"))
        })?;

        debug!(method = %request.method, path = %request.path, status, "HTTP response");
        Ok(HttpResponse::new(status, body))
    }
}
