//! Per-execution store of node outputs
//!
//! Keyed by node id. Read by expression resolution while the run is in
//! progress and returned whole in the terminal event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The last result a node produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub node_name: String,
    pub json: Value,
}

#[derive(Debug, Clone, Default)]
pub struct OutputStore {
    entries: HashMap<String, NodeOutput>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's output; a later write for the same id replaces it
    pub fn put(&mut self, node_id: &str, node_name: &str, json: Value) {
        self.entries.insert(
            node_id.to_string(),
            NodeOutput {
                node_name: node_name.to_string(),
                json,
            },
        );
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeOutput> {
        self.entries.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All outputs as `{ nodeId: { nodeName, json } }`
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(id, output)| {
                (
                    id.clone(),
                    serde_json::json!({
                        "nodeName": output.node_name,
                        "json": output.json,
                    }),
                )
            })
            .collect();
        Value::Object(map)
    }
}
