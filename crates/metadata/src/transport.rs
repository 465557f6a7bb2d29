//! HTTP transport used by the endpoint layer.
//!
//! The endpoint functions only build an [`HttpRequest`] and classify the
//! returned [`HttpResponse`]; sending is delegated to a [`Transport`] so the
//! providers can be driven without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::MetadataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Whether a previously seen response may be reused.
    pub cache: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            cache: false,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Adds a query pair; empty values are dropped.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.trim().is_empty() {
            self.query.push((key.to_string(), value.trim().to_string()));
        }
        self
    }

    pub fn opt_param<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    /// Attaches `Authorization: Bearer` when a token is held.
    pub fn bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => self.header("Authorization", format!("Bearer {t}")),
            _ => self,
        }
    }

    pub fn cached(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Identifies a request for caching. The bearer token is left out, so a
    /// re-login does not invalidate earlier responses.
    fn cache_key(&self) -> String {
        let mut query = self.query.clone();
        query.sort();
        let mut headers: Vec<(String, &str)> = self
            .headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("authorization"))
            .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
            .collect();
        headers.sort();
        let body = self
            .body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_default();
        format!("{:?} {} {:?} {:?} {}", self.method, self.url, query, headers, body)
    }
}

/// Status code plus the parsed JSON body. The body is `None` for non-2xx
/// responses and for bodies that are not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, Some(body))
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request. Only failures to reach the backend at all are
    /// errors; every HTTP status comes back as a response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MetadataError>;
}

/// `reqwest`-backed transport with an in-memory response cache.
///
/// Cached responses live as long as the transport and are never evicted;
/// long-lived processes should build a fresh transport when that matters.
pub struct ReqwestTransport {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, HttpResponse>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<HttpResponse> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: String, response: &HttpResponse) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, response.clone());
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MetadataError> {
        let key = request.cache.then(|| request.cache_key());
        if let Some(hit) = key.as_deref().and_then(|k| self.cached(k)) {
            debug!(url = %request.url, "cache hit");
            return Ok(hit);
        }

        debug!(url = %request.url, method = ?request.method, "HTTP request");
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder.query(&request.query);
        for (k, v) in &request.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;
        let status = resp.status();
        let body = if status.is_success() {
            resp.json::<serde_json::Value>().await.ok()
        } else {
            None
        };
        let response = HttpResponse::new(status.as_u16(), body);

        if let Some(key) = key {
            if status.is_success() {
                self.remember(key, &response);
            }
        }
        Ok(response)
    }
}
