//! HTTP seam between the extractor and the network.
//!
//! Everything above this module talks to a [`Transport`]; production code uses
//! [`ReqwestTransport`], tests substitute canned responses.

pub mod reqwest_transport;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::errors::{ExtractionError, ExtractionResult};

pub use reqwest_transport::ReqwestTransport;

/// Paths the backend redirects to when content is gone.
const ERROR_PAGE_PATHS: &[&str] = &["/oops", "/error"];
/// Path of the anti-bot interstitial.
const CAPTCHA_PATH: &str = "/sorry/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localization {
    pub hl: String,
    pub gl: String,
}

impl Localization {
    pub fn new(hl: impl Into<String>, gl: impl Into<String>) -> Self {
        Self {
            hl: hl.into(),
            gl: gl.into(),
        }
    }

    pub fn accept_language(&self) -> String {
        format!("{}-{}, {};q=0.9", self.hl, self.gl, self.hl)
    }
}

impl Default for Localization {
    fn default() -> Self {
        Self::new("en", "US")
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub localization: Option<Localization>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            localization: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.to_string()),
            localization: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn localized(mut self, localization: &Localization) -> Self {
        self.localization = Some(localization.clone());
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub final_url: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Maps anti-bot and not-found signals to their error kinds; other
    /// non-success statuses become transport errors.
    pub fn check(self) -> ExtractionResult<Self> {
        if self.status == 429 || self.final_url.contains(CAPTCHA_PATH) {
            return Err(ExtractionError::RateLimited(format!(
                "HTTP {} from {}",
                self.status, self.final_url
            )));
        }
        if self.status == 404 {
            return Err(ExtractionError::ContentUnavailable(format!(
                "not found: {}",
                self.final_url
            )));
        }
        if let Ok(parsed) = url::Url::parse(&self.final_url) {
            if ERROR_PAGE_PATHS
                .iter()
                .any(|p| parsed.path().starts_with(p))
            {
                return Err(ExtractionError::ContentUnavailable(format!(
                    "redirected to error page {}",
                    parsed.path()
                )));
            }
        }
        if !(200..300).contains(&self.status) {
            return Err(ExtractionError::Transport(format!(
                "HTTP {} from {}",
                self.status, self.final_url
            )));
        }
        Ok(self)
    }

    pub fn json(&self) -> ExtractionResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> ExtractionResult<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ErrorKind;

    fn response(status: u16, final_url: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: "{}".into(),
            final_url: final_url.into(),
        }
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = response(429, "https://www.youtube.com/youtubei/v1/player")
            .check()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn captcha_redirect_is_rate_limited() {
        let err = response(200, "https://www.google.com/sorry/index?continue=x")
            .check()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn not_found_and_error_pages_are_unavailable() {
        assert_eq!(
            response(404, "https://www.youtube.com/watch?v=x")
                .check()
                .unwrap_err()
                .kind(),
            ErrorKind::ContentUnavailable
        );
        assert_eq!(
            response(200, "https://www.youtube.com/oops")
                .check()
                .unwrap_err()
                .kind(),
            ErrorKind::ContentUnavailable
        );
    }

    #[test]
    fn server_errors_are_transport_errors() {
        assert_eq!(
            response(503, "https://www.youtube.com/")
                .check()
                .unwrap_err()
                .kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = response(200, "https://www.youtube.com/");
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let req = HttpRequest::get("https://a").header("X-Goog-Visitor-Id", "abc");
        assert_eq!(req.header_value("x-goog-visitor-id"), Some("abc"));
    }
}
