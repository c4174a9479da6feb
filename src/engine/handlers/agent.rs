//! AI agent
//!
//! Sends `prompt` (and an optional `systemMessage`) to the connected chat
//! model, offering the connected tools. Tool calls requested by the model are
//! reported in the output; they are not executed here.
//!
//! Output: `{ output, model, toolCalls? }`

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{required_str, str_param};
use crate::engine::contracts::{AgentArgs, AgentHandler, ChatRequest};
use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

#[derive(Debug, Clone, Copy, Default)]
pub struct AiAgentNode;

#[async_trait]
impl AgentHandler for AiAgentNode {
    fn description(&self) -> &str {
        "Prompts the connected chat model, offering the connected tools"
    }

    async fn execute(&self, args: AgentArgs) -> Result<NodeOutcome, HandlerError> {
        let prompt = required_str(&args.parameters, "prompt")?;
        let system = str_param(&args.parameters, "systemMessage")?.map(str::to_string);

        info!(
            model = %args.model.model_name(),
            tools = args.tools.len(),
            "Prompting chat model"
        );

        let response = args
            .model
            .chat(ChatRequest {
                system,
                prompt: prompt.to_string(),
                tools: args.tools,
            })
            .await?;

        let mut data = json!({
            "output": response.text,
            "model": args.model.model_name(),
        });
        if !response.tool_calls.is_empty() {
            data["toolCalls"] = serde_json::to_value(&response.tool_calls)
                .map_err(|e| HandlerError::Model(e.to_string()))?;
        }

        Ok(NodeOutcome::ok(data))
    }
}
