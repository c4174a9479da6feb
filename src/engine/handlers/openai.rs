//! OpenAI-compatible chat model
//!
//! The model node supplies a [`ChatModel`] to its agent. It needs a credential
//! of the form `{ apiKey, baseUrl? }`. Parameters:
//! - `model` - model name (default `gpt-4o-mini`)
//! - `temperature` - optional sampling temperature
//!
//! Any server speaking the `/chat/completions` protocol works; the base URL
//! comes from the credential, then from the engine config.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{load_credential, str_param};
use crate::engine::contracts::{
    ChatModel, ChatRequest, ChatResponse, ModelProvider, SuppliedModel, SupplyArgs, ToolCall,
    ToolDefinition,
};
use crate::engine::credentials::CredentialStore;
use crate::engine::error::HandlerError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiChatModelProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl OpenAiChatModelProvider {
    pub fn new(timeout: Duration, base_url: &str, credentials: Arc<dyn CredentialStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiChatModelProvider {
    fn description(&self) -> &str {
        "OpenAI-compatible chat completion model"
    }

    async fn supply_data(&self, args: SupplyArgs) -> Result<SuppliedModel, HandlerError> {
        let credential_id = args
            .credential_id
            .as_deref()
            .ok_or_else(|| HandlerError::MissingParameter("credentialId".to_string()))?;
        let credential = load_credential(self.credentials.as_ref(), Some(credential_id))
            .await?
            .unwrap_or(Value::Null);

        let api_key = credential
            .get("apiKey")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                HandlerError::InvalidParameter(format!(
                    "Credential '{}' has no apiKey",
                    credential_id
                ))
            })?;
        let base_url = credential
            .get("baseUrl")
            .and_then(Value::as_str)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.base_url.clone());

        let model = str_param(&args.parameters, "model")?
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let temperature = match args.parameters.get("temperature") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_f64().ok_or_else(|| {
                HandlerError::InvalidParameter("'temperature' must be a number".to_string())
            })?),
        };

        info!(model = %model, "Supplying chat model");

        Ok(SuppliedModel {
            response: json!({ "model": model, "temperature": temperature }),
            model: Arc::new(OpenAiChatModel {
                client: self.client.clone(),
                base_url,
                api_key: api_key.to_string(),
                model,
                temperature,
            }),
        })
    }
}

/// A configured chat completions client
pub struct OpenAiChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
}

impl std::fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl OpenAiChatModel {
    fn build_request<'a>(&'a self, request: &'a ChatRequest) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        CompletionRequest {
            model: &self.model,
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| FunctionTool {
                    kind: "function",
                    function: t,
                })
                .collect(),
            temperature: self.temperature,
        }
    }
}

fn into_chat_response(response: CompletionResponse) -> Result<ChatResponse, HandlerError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| HandlerError::Model("Response contained no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments)),
            name: call.function.name,
        })
        .collect();

    Ok(ChatResponse {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, HandlerError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model: {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::Model(format!(
                "Chat completion failed with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        into_chat_response(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::credentials::InMemoryCredentialStore;

    fn provider(store: InMemoryCredentialStore) -> OpenAiChatModelProvider {
        OpenAiChatModelProvider::new(
            Duration::from_secs(5),
            "https://api.openai.com/v1/",
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn test_supply_requires_credential() {
        let result = provider(InMemoryCredentialStore::new())
            .supply_data(SupplyArgs::default())
            .await;
        assert!(matches!(result, Err(HandlerError::MissingParameter(_))));
    }

    #[tokio::test]
    async fn test_supply_requires_api_key() {
        let mut store = InMemoryCredentialStore::new();
        store.insert("openai", json!({ "organization": "acme" }));
        let result = provider(store)
            .supply_data(SupplyArgs {
                credential_id: Some("openai".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(HandlerError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_supply_defaults() {
        let mut store = InMemoryCredentialStore::new();
        store.insert("openai", json!({ "apiKey": "sk-test" }));
        let supplied = provider(store)
            .supply_data(SupplyArgs {
                credential_id: Some("openai".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(supplied.model.model_name(), DEFAULT_MODEL);
        assert_eq!(
            supplied.response,
            json!({ "model": DEFAULT_MODEL, "temperature": null })
        );
        assert!(!supplied.response.to_string().contains("sk-test"));
    }

    #[test]
    fn test_request_wire_shape() {
        let model = OpenAiChatModel {
            client: reqwest::Client::new(),
            base_url: "http://localhost".into(),
            api_key: "sk".into(),
            model: "gpt-4o".into(),
            temperature: Some(0.2),
        };
        let request = ChatRequest {
            system: Some("be brief".into()),
            prompt: "hi".into(),
            tools: vec![ToolDefinition {
                name: "lookup".into(),
                description: "Look things up".into(),
                parameters: json!({ "type": "object" }),
            }],
        };

        let wire = serde_json::to_value(model.build_request(&request)).unwrap();
        assert_eq!(
            wire,
            json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hi" }
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "lookup",
                        "description": "Look things up",
                        "parameters": { "type": "object" }
                    }
                }],
                "temperature": 0.2
            })
        );
    }

    #[test]
    fn test_parse_tool_calls() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "lookup", "arguments": "{\"q\":\"rust\"}" }
                    }]
                }
            }]
        }))
        .unwrap();

        let chat = into_chat_response(response).unwrap();
        assert_eq!(chat.text, "");
        assert_eq!(chat.tool_calls[0].name, "lookup");
        assert_eq!(chat.tool_calls[0].arguments, json!({ "q": "rust" }));
    }

    #[test]
    fn test_empty_choices() {
        let response = CompletionResponse { choices: vec![] };
        assert!(matches!(
            into_chat_response(response),
            Err(HandlerError::Model(_))
        ));
    }
}
