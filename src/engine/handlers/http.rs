//! HTTP request action
//!
//! Example:
//! ```yaml
//! - id: fetch
//!   kind: action
//!   name: httpRequest
//!   credentialId: github
//!   parameters:
//!     method: POST
//!     url: "https://api.example.com/items"
//!     headers: { "X-Trace": "{{ trigger.json.headers.x-trace }}" }
//!     query: { page: 1 }
//!     body: { name: "{{ form.json.name }}" }
//! ```
//!
//! Output: `{ status, headers, body }`. A non-2xx status fails the node.
//!
//! Credentials (optional) are one of:
//! - `{ token }` - bearer token
//! - `{ username, password }` - basic auth
//! - `{ headerName, headerValue }` - custom header

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{load_credential, required_str, str_param, string_pairs};
use crate::engine::contracts::{NodeArgs, NodeHandler};
use crate::engine::credentials::CredentialStore;
use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

pub struct HttpRequestNode {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpRequestNode {
    pub fn new(timeout: Duration, credentials: Arc<dyn CredentialStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            credentials,
        }
    }
}

/// Parse a method name, defaulting to GET
pub(crate) fn parse_method(method: Option<&str>) -> Result<reqwest::Method, HandlerError> {
    match method.map(|m| m.to_uppercase()).as_deref() {
        None | Some("GET") => Ok(reqwest::Method::GET),
        Some("POST") => Ok(reqwest::Method::POST),
        Some("PUT") => Ok(reqwest::Method::PUT),
        Some("PATCH") => Ok(reqwest::Method::PATCH),
        Some("DELETE") => Ok(reqwest::Method::DELETE),
        Some("HEAD") => Ok(reqwest::Method::HEAD),
        Some(other) => Err(HandlerError::InvalidParameter(format!(
            "Unknown HTTP method: {}",
            other
        ))),
    }
}

fn apply_auth(
    request: reqwest::RequestBuilder,
    credential: Option<&Value>,
) -> Result<reqwest::RequestBuilder, HandlerError> {
    let Some(credential) = credential else {
        return Ok(request);
    };
    let field = |key: &str| credential.get(key).and_then(Value::as_str);

    if let Some(token) = field("token") {
        Ok(request.bearer_auth(token))
    } else if let Some(username) = field("username") {
        Ok(request.basic_auth(username, field("password")))
    } else if let (Some(name), Some(value)) = (field("headerName"), field("headerValue")) {
        Ok(request.header(name, value))
    } else {
        Err(HandlerError::InvalidParameter(
            "Credential must contain token, username/password or headerName/headerValue"
                .to_string(),
        ))
    }
}

/// Send a request and collect `{status, headers, body}`
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
) -> Result<(reqwest::StatusCode, Value), HandlerError> {
    let response = request.send().await?;
    let status = response.status();

    let headers: Map<String, Value> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                Value::String(v.to_str().unwrap_or("").to_string()),
            )
        })
        .collect();

    let text = response.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    Ok((
        status,
        json!({
            "status": status.as_u16(),
            "headers": headers,
            "body": body,
        }),
    ))
}

#[async_trait]
impl NodeHandler for HttpRequestNode {
    fn description(&self) -> &str {
        "Sends an HTTP request and returns the response"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let params = &args.parameters;
        let url = required_str(params, "url")?;
        let method = parse_method(str_param(params, "method")?)?;
        let headers: HashMap<String, String> = string_pairs(params, "headers")?.into_iter().collect();
        let query = string_pairs(params, "query")?;

        let credential =
            load_credential(self.credentials.as_ref(), args.credential_id.as_deref()).await?;

        let mut request = self.client.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(&query);
        }
        for (key, value) in &headers {
            request = request.header(key, value);
        }
        request = apply_auth(request, credential.as_ref())?;
        if let Some(body) = params.get("body").filter(|b| !b.is_null()) {
            request = match body {
                Value::String(raw) => request.body(raw.clone()),
                other => request.json(other),
            };
        }

        debug!("Executing {} {}", method, url);
        let (status, data) = send(request).await?;
        info!("{} {} -> {}", method, url, status.as_u16());

        if status.is_success() {
            Ok(NodeOutcome::ok(data))
        } else {
            Ok(NodeOutcome {
                success: false,
                data: Some(data),
                error: Some(format!("HTTP {} error", status.as_u16())),
            })
        }
    }
}
