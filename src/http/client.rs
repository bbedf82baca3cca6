//! Square REST API client
//!
//! A thin bearer-authenticated wrapper over reqwest. Every call goes through
//! the retry policy; non-2xx responses surface as `Error::Api` carrying the
//! raw response body so retry classification can inspect it.

use super::retry::RetryPolicy;
use crate::config::Environment;
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client for the Square REST API
pub struct SquareClient {
    http: Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl SquareClient {
    /// Create a client for the given environment
    pub fn new(environment: Environment, access_token: impl Into<String>) -> Self {
        Self::with_base_url(environment.base_url(), access_token)
    }

    /// Create a client against an explicit base URL (tests point this at a
    /// mock server)
    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("square-tap/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (tests shrink the budget)
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// POST a JSON body, returning the parsed response body
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.retry
            .run(|| async {
                let response = self.send(Method::POST, path, &[], Some(body)).await?;
                response.json::<Value>().await.map_err(Error::Http)
            })
            .await
    }

    /// GET with query parameters, returning the parsed response body
    pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.retry
            .run(|| async {
                let response = self.send(Method::GET, path, query, None).await?;
                response.json::<Value>().await.map_err(Error::Http)
            })
            .await
    }

    /// GET returning both the parsed body and the response headers. Used by
    /// v1 endpoints whose continuation token lives in the `link` header.
    pub async fn get_with_headers(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<(Value, HeaderMap)> {
        self.retry
            .run(|| async {
                let response = self.send(Method::GET, path, query, None).await?;
                let headers = response.headers().clone();
                let body = response.json::<Value>().await.map_err(Error::Http)?;
                Ok((body, headers))
            })
            .await
    }

    /// Issue a single attempt; non-2xx becomes `Error::Api`
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.access_token)
            .header("content-type", "application/json");

        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("HTTP status code when it errors out: {}", status.as_u16());
            return Err(Error::api(status.as_u16(), body));
        }

        debug!("Request succeeded: {} {}", method, url);
        Ok(response)
    }
}

impl std::fmt::Debug for SquareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
