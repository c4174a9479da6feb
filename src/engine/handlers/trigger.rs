//! Trigger handlers
//!
//! Triggers start a run. Their input is the job's trigger data; a trigger
//! that returns `null` leaves nothing in the output store.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::contracts::{NodeArgs, NodeHandler};
use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

/// Started by hand; passes the trigger data through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTrigger;

#[async_trait]
impl NodeHandler for ManualTrigger {
    fn description(&self) -> &str {
        "Starts a run manually, passing along any trigger data"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        Ok(NodeOutcome::ok(args.input.unwrap_or(Value::Null)))
    }
}

/// Started by an incoming HTTP call relayed as trigger data
///
/// Trigger data is expected as `{body, headers, query}`. Anything else is
/// treated as the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookTrigger;

#[async_trait]
impl NodeHandler for WebhookTrigger {
    fn description(&self) -> &str {
        "Starts a run from a webhook request"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let data = match args.input {
            None | Some(Value::Null) => Value::Null,
            Some(Value::Object(request))
                if ["body", "headers", "query"]
                    .iter()
                    .any(|k| request.contains_key(*k)) =>
            {
                json!({
                    "body": request.get("body").cloned().unwrap_or(Value::Null),
                    "headers": request.get("headers").cloned().unwrap_or_else(|| json!({})),
                    "query": request.get("query").cloned().unwrap_or_else(|| json!({})),
                })
            }
            Some(body) => json!({ "body": body, "headers": {}, "query": {} }),
        };
        Ok(NodeOutcome::ok(data))
    }
}
