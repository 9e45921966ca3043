//! Outbound webhook components
//!
//! Thin HTTP actions over a shared `reqwest::Client`. Both expose the final
//! status code and raw response body; non-2xx statuses are reported through
//! the outputs rather than failing the run, so workflows can branch on them
//! downstream.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

use crate::registry::{Component, ComponentSpec, IntegrationError, InvocationKind, ParamKind, ParamSpec};

fn header_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("url", ParamKind::String),
        ParamSpec::optional("headers", ParamKind::String),
    ]
}

/// Parse the optional `headers` parameter: a JSON object of string pairs.
fn parse_headers(raw: Option<&String>) -> Result<HeaderMap, IntegrationError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(HeaderMap::new()),
    };

    let parsed: HashMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| IntegrationError::Api(format!("headers must be a JSON object: {}", e)))?;

    let mut headers = HeaderMap::with_capacity(parsed.len());
    for (name, value) in &parsed {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| IntegrationError::Api(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| IntegrationError::Api(format!("invalid header value: {}", e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn into_outputs(response: reqwest::Response) -> Result<HashMap<String, String>, IntegrationError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HashMap::from([
        ("status_code".to_string(), status.to_string()),
        ("response_body".to_string(), body),
    ]))
}

/// `webhook.get`: HTTP GET against a configured URL.
pub struct WebhookGet {
    client: reqwest::Client,
}

impl WebhookGet {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn spec() -> ComponentSpec {
        ComponentSpec::new(
            "webhook.get",
            header_params(),
            vec!["status_code", "response_body"],
            InvocationKind::Network,
        )
    }
}

impl Default for WebhookGet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for WebhookGet {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let url = config.get("url").map(String::as_str).unwrap_or("");
        let headers = parse_headers(config.get("headers"))?;

        let response = self.client.get(url).headers(headers).send().await?;
        into_outputs(response).await
    }
}

/// `webhook.post`: HTTP POST with an optional raw body.
///
/// The body is sent verbatim; callers wanting JSON set a `Content-Type`
/// header and supply a JSON string (typically built from placeholders).
pub struct WebhookPost {
    client: reqwest::Client,
}

impl WebhookPost {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn spec() -> ComponentSpec {
        let mut inputs = header_params();
        inputs.push(ParamSpec::optional("body", ParamKind::String));
        ComponentSpec::new(
            "webhook.post",
            inputs,
            vec!["status_code", "response_body"],
            InvocationKind::Network,
        )
    }
}

impl Default for WebhookPost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for WebhookPost {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let url = config.get("url").map(String::as_str).unwrap_or("");
        let headers = parse_headers(config.get("headers"))?;
        let body = config.get("body").cloned().unwrap_or_default();

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        into_outputs(response).await
    }
}
