//! Shared HTTP transport for exchange clients.
//!
//! Performs one request and turns whatever happens into either decoded data
//! or a [`RawError`] worded in the classifier's signature vocabulary. It
//! never retries; that is the scheduler's job.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::TransportConfig;
use crate::error::ExchangeError;
use crate::resilience::classifier::{
    CONNECT_TIMEOUT, CONNECTION_REFUSED, CONNECTION_RESET, HOST_NOT_FOUND, SOCKET_HANG_UP,
    SOCKET_TIMEOUT,
};
use crate::resilience::{RawError, inspect_body};

/// HTTP transport bound to one exchange API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from config.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &TransportConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a request to `path`; the caller adds query, body and auth.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    /// GET `path` with query parameters and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a [`RawError`] for transport failures, non-2xx responses and
    /// error bodies.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RawError> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    /// POST a form to `path` and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a [`RawError`] for transport failures, non-2xx responses and
    /// error bodies.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, RawError> {
        self.send(self.request(Method::POST, path).form(form)).await
    }

    /// Send a prepared request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a [`RawError`] for transport failures, non-2xx responses and
    /// error bodies.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RawError> {
        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Exchange returned an error status");
            return Err(RawError::http(status.as_u16(), text));
        }

        inspect_body(&text)?;

        serde_json::from_str(&text).map_err(|e| {
            RawError::message(format!("invalid response payload: {e}")).with_body(text.clone())
        })
    }
}

/// Map a reqwest failure onto a transport signature.
///
/// Once the connection is established the request may already have been
/// written, so any later failure is reported as a hang-up (in flight), not
/// as a reset.
fn transport_error(error: &reqwest::Error) -> RawError {
    let signature = if error.is_timeout() {
        if error.is_connect() {
            CONNECT_TIMEOUT
        } else {
            SOCKET_TIMEOUT
        }
    } else if error.is_connect() {
        if is_dns_failure(error) {
            HOST_NOT_FOUND
        } else {
            CONNECTION_REFUSED
        }
    } else if error.is_request() || error.is_body() || error.is_decode() {
        SOCKET_HANG_UP
    } else {
        CONNECTION_RESET
    };

    RawError::message(format!("{signature}: {error}"))
}

fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(error);
    while let Some(inner) = source {
        let text = inner.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}
