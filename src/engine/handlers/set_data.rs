//! Set data action
//!
//! ```yaml
//! - id: greet
//!   kind: action
//!   name: setData
//!   parameters:
//!     values:
//!       greeting: "Hello {{ trigger.json.user }}"
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::contracts::{NodeArgs, NodeHandler};
use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

#[derive(Debug, Clone, Copy, Default)]
pub struct SetDataNode;

#[async_trait]
impl NodeHandler for SetDataNode {
    fn description(&self) -> &str {
        "Outputs the values given in its parameters"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let values = args
            .parameters
            .get("values")
            .cloned()
            .unwrap_or_else(|| json!({}));
        Ok(NodeOutcome::ok(values))
    }
}
