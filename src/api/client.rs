// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! HTTP client for the library service
//!
//! A thin, configured wrapper over `reqwest::Client`:
//! - Base URL management (the service root, e.g. `http://localhost:8000/api`)
//! - Default timeout and connection pooling
//! - JSON body handling with parse-context extraction on decode failures
//! - Multipart upload support for the import path
//!
//! The wrapper deliberately has no retry layer: read paths degrade to empty
//! results at the call sites and the progress write path has its own bounded
//! timeout, so a transparent retry here would only stretch worst-case
//! latency the UI already budgets for.

use crate::error::{PageTurnError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for ApiClient
/// Provides a builder pattern for client customization
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn builder(base_url: Url) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    fn defaults(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: "PageTurn/0.1 (core)".to_string(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new(base_url: Url) -> Self {
        Self {
            config: ClientConfig::defaults(base_url),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Configured HTTP client for the library service
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client with default configuration for the given service root
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self> {
        Self::with_config(ClientConfig::defaults(base_url))
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| PageTurnError::invalid_input(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client, config })
    }

    /// Service root this client talks to
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Resolve an endpoint path against the base URL
    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| PageTurnError::invalid_input(format!("Bad endpoint '{}': {}", endpoint, e)))
    }

    /// Perform a GET request with query parameters
    pub async fn get<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, endpoint))?;

        self.handle_response(response, endpoint).await
    }

    /// Perform a GET request without query parameters
    pub async fn get_plain<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.get(endpoint, &[] as &[(&str, &str)]).await
    }

    /// Perform a POST request with JSON body
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_json(Method::POST, endpoint, body, None).await
    }

    /// Perform a PATCH request with JSON body and a per-request deadline.
    ///
    /// The deadline overrides the client default; the progress-sync path uses
    /// this to keep interactive use bounded on a slow network.
    pub async fn patch<T, B>(&self, endpoint: &str, body: &B, deadline: Duration) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_json(Method::PATCH, endpoint, body, Some(deadline))
            .await
    }

    /// Perform a DELETE request, discarding any response body
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, endpoint))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(error_from_status(response, endpoint).await)
        }
    }

    /// Perform a POST request with a multipart form (file import paths)
    pub async fn post_multipart<T: DeserializeOwned>(&self, endpoint: &str, form: Form) -> Result<T> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, endpoint))?;

        self.handle_response(response, endpoint).await
    }

    async fn request_json<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
        deadline: Option<Duration>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;
        let mut builder = self.client.request(method, url).json(body);
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_transport_error(e, endpoint))?;

        self.handle_response(response, endpoint).await
    }

    /// Parse a response, extracting context around any decode failure
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_status(response, endpoint).await);
        }

        let text = response.text().await.map_err(|e| {
            PageTurnError::api_failed(
                format!("Failed to read response body: {}", e),
                Some(status.as_u16()),
                Some(endpoint.to_string()),
            )
        })?;

        match serde_json::from_str::<T>(&text) {
            Ok(data) => Ok(data),
            Err(e) => {
                // Keep a window around the error location for debugging
                let error_col = e.column();
                let start = error_col.saturating_sub(200);
                let end = (error_col + 200).min(text.len());
                let context = text.get(start..end).unwrap_or("");

                Err(PageTurnError::InvalidApiResponse {
                    message: format!("Parse error: {} at col {}. Context: ...{}...", e, error_col, context),
                    response_body: Some(text),
                })
            }
        }
    }
}

/// Map a reqwest transport failure onto the error taxonomy
fn classify_transport_error(error: reqwest::Error, endpoint: &str) -> PageTurnError {
    if error.is_timeout() {
        return PageTurnError::network_error(
            format!("Request to {} timed out: {}", endpoint, error),
            true,
        );
    }

    let transient = error.is_connect() || error.is_request();
    PageTurnError::network_error(format!("Request to {} failed: {}", endpoint, error), transient)
}

/// Build an error from a non-success HTTP response
async fn error_from_status(response: Response, endpoint: &str) -> PageTurnError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => PageTurnError::api_failed(
            format!("Not found: {}", endpoint),
            Some(status.as_u16()),
            Some(endpoint.to_string()),
        ),
        _ => PageTurnError::api_failed(
            format!("Request failed: {}", body),
            Some(status.as_u16()),
            Some(endpoint.to_string()),
        ),
    }
}
