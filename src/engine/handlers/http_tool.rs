//! HTTP request tool
//!
//! Offers an HTTP call to an agent's model as a function tool. Parameters:
//! - `name` - function name (default `http_request`)
//! - `description` - what the tool is for
//! - `url` - fixed endpoint; when absent the model supplies one
//! - `method` - fixed method (default GET)

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use super::http::parse_method;
use super::str_param;
use crate::engine::contracts::{ToolDefinition, ToolProvider};
use crate::engine::error::HandlerError;

static TOOL_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap());

const DEFAULT_NAME: &str = "http_request";

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRequestToolProvider;

#[async_trait]
impl ToolProvider for HttpRequestToolProvider {
    fn description(&self) -> &str {
        "Lets an agent's model make HTTP requests"
    }

    async fn supply_tool(&self, parameters: Map<String, Value>) -> Result<ToolDefinition, HandlerError> {
        let name = str_param(&parameters, "name")?.unwrap_or(DEFAULT_NAME);
        if !TOOL_NAME_REGEX.is_match(name) {
            return Err(HandlerError::InvalidParameter(format!(
                "Tool name '{}' must match [a-zA-Z0-9_-]{{1,64}}",
                name
            )));
        }

        let method = parse_method(str_param(&parameters, "method")?)?;
        let url = str_param(&parameters, "url")?;

        let mut properties = Map::new();
        let mut required = Vec::new();
        if url.is_none() {
            properties.insert(
                "url".to_string(),
                json!({ "type": "string", "description": "Absolute URL to call" }),
            );
            required.push("url");
        }
        properties.insert(
            "query".to_string(),
            json!({ "type": "object", "description": "Query string parameters" }),
        );
        if method != reqwest::Method::GET && method != reqwest::Method::HEAD {
            properties.insert(
                "body".to_string(),
                json!({ "type": "object", "description": "JSON request body" }),
            );
        }

        let description = match (str_param(&parameters, "description")?, url) {
            (Some(description), _) => description.to_string(),
            (None, Some(url)) => format!("Send an HTTP {} request to {}", method, url),
            (None, None) => format!("Send an HTTP {} request", method),
        };

        Ok(ToolDefinition {
            name: name.to_string(),
            description,
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        })
    }
}
