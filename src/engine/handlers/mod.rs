//! Built-in node handlers
//!
//! | kind    | name              |
//! |---------|-------------------|
//! | trigger | `manualTrigger`   |
//! | trigger | `webhookTrigger`  |
//! | action  | `httpRequest`     |
//! | action  | `shellCommand`    |
//! | action  | `setData`         |
//! | agent   | `aiAgent`         |
//! | model   | `openAiChatModel` |
//! | tool    | `httpRequestTool` |

pub mod agent;
pub mod http;
pub mod http_tool;
pub mod openai;
pub mod set_data;
pub mod shell;
pub mod trigger;

pub use agent::AiAgentNode;
pub use http::HttpRequestNode;
pub use http_tool::HttpRequestToolProvider;
pub use openai::{OpenAiChatModel, OpenAiChatModelProvider};
pub use set_data::SetDataNode;
pub use shell::ShellCommandNode;
pub use trigger::{ManualTrigger, WebhookTrigger};

use serde_json::{Map, Value};

use crate::engine::credentials::CredentialStore;
use crate::engine::error::HandlerError;

/// Optional string parameter; non-strings are rejected
fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, HandlerError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(HandlerError::InvalidParameter(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

/// Required, non-empty string parameter
fn required_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, HandlerError> {
    match str_param(params, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(HandlerError::MissingParameter(key.to_string())),
    }
}

/// Map of string pairs (headers, query); scalar values are stringified
fn string_pairs(params: &Map<String, Value>, key: &str) -> Result<Vec<(String, String)>, HandlerError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()),
        Some(other) => Err(HandlerError::InvalidParameter(format!(
            "'{}' must be an object, got {}",
            key, other
        ))),
    }
}

/// Fetch credential data; `None` when the node has no credential
async fn load_credential(
    store: &dyn CredentialStore,
    credential_id: Option<&str>,
) -> Result<Option<Value>, HandlerError> {
    let Some(id) = credential_id else {
        return Ok(None);
    };
    match store.get_credential_by_id(id).await? {
        Some(data) => Ok(Some(data)),
        None => Err(HandlerError::CredentialNotFound(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_required_str() {
        let p = params(json!({ "url": "http://x", "blank": "  ", "n": 3 }));
        assert_eq!(required_str(&p, "url").unwrap(), "http://x");
        assert!(matches!(
            required_str(&p, "blank"),
            Err(HandlerError::MissingParameter(_))
        ));
        assert!(matches!(
            required_str(&p, "missing"),
            Err(HandlerError::MissingParameter(_))
        ));
        assert!(matches!(
            required_str(&p, "n"),
            Err(HandlerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_string_pairs() {
        let p = params(json!({ "headers": { "X-A": "1", "X-B": 2 } }));
        let mut pairs = string_pairs(&p, "headers").unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![("X-A".into(), "1".into()), ("X-B".into(), "2".into())]
        );
        assert!(string_pairs(&p, "query").unwrap().is_empty());
    }
}
