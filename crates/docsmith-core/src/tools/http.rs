//! Raw HTTP requests, for probing the API being documented.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::capability::{optional_string_arg, string_arg, Capability, ToolArguments};
use crate::error::CapabilityError;

/// Makes an HTTP request to the specified URL
pub struct HttpRequester {
    client: reqwest::Client,
}

impl HttpRequester {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn parse_method(raw: &str) -> Result<Method, CapabilityError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| CapabilityError::invalid_argument("method", format!("unsupported HTTP method {}", raw)))
}

/// Body argument as text; structured JSON bodies are serialized
fn request_body(args: &ToolArguments) -> Option<String> {
    match args.get("body") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// String-valued headers; other values are skipped
fn request_headers(args: &ToolArguments) -> Result<Vec<(String, String)>, CapabilityError> {
    match args.get("headers") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()),
        Some(other) => Err(CapabilityError::invalid_argument(
            "headers",
            format!("expected an object, got {}", other),
        )),
    }
}

#[async_trait]
impl Capability for HttpRequester {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Makes an HTTP request to the specified URL"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to request"},
                "method": {"type": "string", "description": "The HTTP method (defaults to GET)"},
                "body": {"type": "string", "description": "The body of the request"},
                "headers": {"type": "object", "description": "The headers of the request"}
            },
            "required": ["url"]
        })
    }

    fn required_arguments(&self) -> &[&'static str] {
        &["url"]
    }

    fn defaults(&self) -> Vec<(&'static str, Value)> {
        vec![("method", json!("GET"))]
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
        let url = string_arg(&args, "url")?;
        let method = parse_method(optional_string_arg(&args, "method")?.unwrap_or("GET"))?;
        let headers = request_headers(&args)?;

        info!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request_body(&args) {
            debug!("Request body: {} bytes", body.len());
            request = request.body(body);
        }

        let response = request.send().await.map_err(CapabilityError::http)?;
        let status = response.status();
        let body = response.text().await.map_err(CapabilityError::http)?;
        debug!("Response {} ({} bytes)", status, body.len());

        if !status.is_success() {
            return Err(CapabilityError::Http(format!(
                "request failed with status code {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_method_is_case_insensitive() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert_eq!(parse_method(" Get ").unwrap(), Method::GET);
        assert!(parse_method("NOT A METHOD").is_err());
    }

    #[test]
    fn test_structured_body_is_serialized() {
        let body = request_body(&args(json!({"body": {"a": 1}}))).unwrap();
        assert_eq!(body, r#"{"a":1}"#);
        assert_eq!(request_body(&args(json!({"body": null}))), None);
    }

    #[test]
    fn test_non_string_headers_skipped() {
        let headers =
            request_headers(&args(json!({"headers": {"accept": "application/json", "x-n": 3}})))
                .unwrap();
        assert_eq!(headers, vec![("accept".to_string(), "application/json".to_string())]);
        assert!(request_headers(&args(json!({"headers": "nope"}))).is_err());
    }
}
