//! REST client for the GTMOS backend.
//!
//! All requests go through `ApiClient::request`, which owns the wire
//! conventions: the `/api` vs `/demo` path prefix follows auth state,
//! outgoing JSON bodies are snake-cased, incoming bodies camel-cased, and
//! the bearer token is attached when a session is live. Non-2xx responses
//! surface as `ApiError::Api` carrying the parsed body message, an error
//! code (`UNKNOWN_ERROR` when the body isn't parseable), and any
//! rate-limit headers.
//!
//! There is no retry, timeout, or cancellation logic here: a failed call
//! rejects once and the caller decides.

pub mod accounts;
pub mod campaigns;
pub mod companies;
pub mod personas;

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::keycase::{keys_to_camel, keys_to_snake};

/// Error code used when a failure body carries none.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Rate-limit headers echoed on every backend response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
    pub retry_after: Option<u64>,
}

impl RateLimitInfo {
    fn from_headers(headers: &HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };
        Self {
            limit: parse("x-ratelimit-limit"),
            remaining: parse("x-ratelimit-remaining"),
            reset: parse("x-ratelimit-reset"),
            retry_after: parse("retry-after"),
        }
    }
}

/// Errors from backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message} ({error_code})")]
    Api {
        status: u16,
        message: String,
        error_code: String,
        rate_limit: RateLimitInfo,
    },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Machine-readable code for the failure.
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Api { error_code, .. } => error_code,
            _ => UNKNOWN_ERROR_CODE,
        }
    }

    /// Rate-limit headers from the failing response, when present.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            ApiError::Api { rate_limit, .. } => Some(rate_limit),
            _ => None,
        }
    }
}

/// Shared HTTP client bound to the injectable auth snapshot.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthState>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, auth: Arc<AuthState>) -> Self {
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        if url::Url::parse(&base_url).is_err() {
            log::warn!("api base url {base_url:?} is not a valid URL; requests will fail");
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            auth,
        }
    }

    /// Anonymous sessions are routed to the demo surface.
    fn path_prefix(&self) -> &'static str {
        if self.auth.is_authenticated() {
            "/api"
        } else {
            "/demo"
        }
    }

    pub(crate) async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        self.request(Method::GET, path, query, None).await
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.request(Method::POST, path, query, body).await
    }

    pub(crate) async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}{}", self.base_url, self.path_prefix(), path);
        let mut request = self.http.request(method.clone(), &url);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.auth.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&keys_to_snake(body));
        }

        let response = request.send().await?;
        let status = response.status();
        let rate_limit = RateLimitInfo::from_headers(response.headers());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, error_code) = parse_error_body(&text, status);
            log::debug!("{method} {url} failed: {status} {error_code}");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                error_code,
                rate_limit,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&text)?;
        Ok(keys_to_camel(&value))
    }
}

/// Pull a human message and an error code out of a failure body.
fn parse_error_body(text: &str, status: StatusCode) -> (String, String) {
    if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(text) {
        let message = body
            .get("detail")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| text.to_string());
        let error_code = body
            .get("error_code")
            .or_else(|| body.get("errorCode"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR_CODE)
            .to_string();
        return (message, error_code);
    }
    let message = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    };
    (message, UNKNOWN_ERROR_CODE.to_string())
}

/// Treat a response as a list, tolerating a null/absent body.
pub(crate) fn as_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body_with_code() {
        let (message, code) = parse_error_body(
            r#"{ "detail": "Rate limit exceeded", "error_code": "RATE_LIMITED" }"#,
            StatusCode::TOO_MANY_REQUESTS,
        );
        assert_eq!(message, "Rate limit exceeded");
        assert_eq!(code, "RATE_LIMITED");
    }

    #[test]
    fn test_parse_error_body_unparseable_falls_back() {
        let (message, code) =
            parse_error_body("<html>bad gateway</html>", StatusCode::BAD_GATEWAY);
        assert_eq!(message, "<html>bad gateway</html>");
        assert_eq!(code, UNKNOWN_ERROR_CODE);
    }

    #[test]
    fn test_parse_error_body_empty_uses_status_reason() {
        let (message, code) = parse_error_body("", StatusCode::NOT_FOUND);
        assert_eq!(message, "Not Found");
        assert_eq!(code, UNKNOWN_ERROR_CODE);
    }

    #[test]
    fn test_rate_limit_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", "100".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("retry-after", "30".parse().unwrap());

        let info = RateLimitInfo::from_headers(&headers);
        assert_eq!(info.limit, Some(100));
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.reset, None);
        assert_eq!(info.retry_after, Some(30));
    }

    #[test]
    fn test_error_accessors() {
        let err = ApiError::Api {
            status: 429,
            message: "slow down".into(),
            error_code: "RATE_LIMITED".into(),
            rate_limit: RateLimitInfo {
                retry_after: Some(30),
                ..Default::default()
            },
        };
        assert_eq!(err.error_code(), "RATE_LIMITED");
        assert_eq!(err.rate_limit().unwrap().retry_after, Some(30));
    }
}
