use async_trait::async_trait;
use tracing::debug;

use super::{HttpRequest, HttpResponse, Method, Transport};
use crate::{
    common::{
        errors::{ExtractionError, ExtractionResult},
        http::HttpClient,
    },
    configs::HttpConfig,
};

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> ExtractionResult<Self> {
        let client = HttpClient::with_config(config)
            .map_err(|e| ExtractionError::Transport(format!("failed to build client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> ExtractionResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(localization) = &request.localization {
            builder = builder.header(reqwest::header::ACCEPT_LANGUAGE, localization.accept_language());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let final_url = res.url().to_string();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = res.text().await?;

        debug!("{:?} {} -> {} ({} bytes)", request.method, request.url, status, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}
