//! Menu backend API client.
//!
//! Provides authenticated HTTP communication with the REST backend. Every
//! request carries `Accept: application/json`; authenticated requests add
//! `Authorization: Bearer <token>`. Responses are classified into
//! [`ApiError`] so controllers can decide between session teardown, the
//! degraded-mode mirror, or a plain error notice.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend base URL:
/// - trim whitespace
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
pub fn normalize_api_base(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One backend call. `path` includes the leading slash, e.g. `/categories/4`.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub token: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            token: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("authenticated", &self.token.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// Seam between the controllers and the wire. Production uses
/// [`HttpTransport`]; tests script responses per request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach menu backend at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid menu backend URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Default message for a status code when the body carries none.
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        403 => "Not allowed for this account".to_string(),
        422 => "The backend rejected the submitted data".to_string(),
        s if s >= 500 => "Menu backend server error".to_string(),
        _ => "Unexpected response from menu backend".to_string(),
    }
}

/// Pull `message` / `error` out of a JSON error body, with `errors` details
/// appended when present.
pub fn extract_error_message(body_text: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body_text).ok()?;
    let message = json
        .get("message")
        .or_else(|| json.get("error"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();
    match json.get("errors").or_else(|| json.get("details")) {
        Some(details) if !details.is_null() => Some(format!("{message}: {details}")),
        _ => Some(message),
    }
}

/// Map a non-success status plus its body to the error taxonomy.
pub fn classify_status(status: StatusCode, body_text: &str) -> ApiError {
    match status.as_u16() {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        405 => ApiError::MethodNotAllowed,
        s => {
            let message = extract_error_message(body_text).unwrap_or_else(|| {
                let trimmed = body_text.trim();
                if trimmed.is_empty() || trimmed.len() > 200 {
                    status_message(status)
                } else {
                    format!("{}: {trimmed}", status_message(status))
                }
            });
            ApiError::Server { status: s, message }
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

/// `reqwest`-backed transport bound to one base URL.
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = normalize_api_base(api_base);
        if base.is_empty() {
            return Err(ApiError::Network("Menu backend URL is not configured".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let full_url = format!("{}{}", self.base, request.path);
        let started = Instant::now();

        let mut req = self
            .client
            .request(request.method.clone(), &full_url)
            .header("Accept", "application/json");
        if let Some(token) = request.token.as_deref() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            let message = friendly_error(&self.base, &e);
            warn!(method = %request.method, path = %request.path, error = %message, "request failed");
            ApiError::Network(message)
        })?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "backend response"
        );

        if !status.is_success() {
            return Err(classify_status(status, &body_text));
        }

        // Return the JSON body, or null for empty 204 responses.
        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_scheme_and_strips_slashes() {
        assert_eq!(
            normalize_api_base(" backend.example.com/api/ "),
            "https://backend.example.com/api"
        );
        assert_eq!(normalize_api_base("localhost:8000/api//"), "http://localhost:8000/api");
        assert_eq!(
            normalize_api_base("http://127.0.0.1:8000/api"),
            "http://127.0.0.1:8000/api"
        );
        assert_eq!(normalize_api_base("   "), "");
    }

    #[test]
    fn test_classify_status_taxonomy() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized);
        assert_eq!(classify_status(StatusCode::NOT_FOUND, "{}"), ApiError::NotFound);
        assert_eq!(
            classify_status(StatusCode::METHOD_NOT_ALLOWED, ""),
            ApiError::MethodNotAllowed
        );
        match classify_status(StatusCode::INTERNAL_SERVER_ERROR, "") {
            ApiError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Menu backend server error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_status_prefers_backend_message() {
        let err = classify_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"The name field is required.","errors":{"name":["required"]}}"#,
        );
        match err {
            ApiError::Server { status, message } => {
                assert_eq!(status, 422);
                assert!(message.starts_with("The name field is required."));
                assert!(message.contains("required"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_debug_hides_token() {
        let req = ApiRequest::get("/categories").with_token(Some("s3cret".into()));
        let rendered = format!("{req:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("authenticated: true"));
    }

    #[test]
    fn test_transport_rejects_empty_base() {
        assert!(HttpTransport::new("  ", Duration::from_secs(30)).is_err());
        let transport = HttpTransport::new("menu.example.com/api/", Duration::from_secs(30)).unwrap();
        assert_eq!(transport.base(), "https://menu.example.com/api");
    }
}
