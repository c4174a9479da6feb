//! Execution context for one workflow run
//!
//! The context owns the graph of a single execution. It is never shared across
//! runs. Sub-nodes that an agent has consumed are recorded in an exclusion set
//! instead of being removed from the node list, so the graph stays intact for
//! logging and inspection.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::graph::{Edge, Node, NodeKind};

/// Runtime context for a single execution
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub workflow_id: String,

    pub execution_id: String,

    /// Input for the trigger node
    pub trigger_data: Option<Value>,

    nodes: Vec<Node>,

    edges: Vec<Edge>,

    /// Node position by id; the first node wins on duplicate ids
    node_index: HashMap<String, usize>,

    /// Edge positions by source id, in edge-list order
    outgoing_index: HashMap<String, Vec<usize>>,

    /// Sub-nodes already resolved by their agent
    excluded: HashSet<String>,
}

/// Model and tool nodes attached to one agent
#[derive(Debug, Default)]
pub struct SubNodes<'a> {
    pub models: Vec<&'a Node>,
    pub tools: Vec<&'a Node>,
}

impl ExecutionContext {
    /// Create a context with a generated execution ID
    pub fn new(workflow_id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self::with_execution_id(
            workflow_id,
            uuid::Uuid::new_v4().to_string(),
            nodes,
            edges,
        )
    }

    pub fn with_execution_id(
        workflow_id: impl Into<String>,
        execution_id: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            node_index.entry(node.id.clone()).or_insert(i);
        }

        let mut outgoing_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            outgoing_index.entry(edge.source.clone()).or_default().push(i);
        }

        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            trigger_data: None,
            nodes,
            edges,
            node_index,
            outgoing_index,
            excluded: HashSet::new(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    /// First trigger node in node-list order
    ///
    /// Graphs with several triggers run from the first one; the rest are
    /// reported with a warning.
    pub fn find_trigger(&self) -> Option<&Node> {
        let mut triggers = self.nodes.iter().filter(|n| n.kind == NodeKind::Trigger);
        let first = triggers.next()?;
        let ignored: Vec<&str> = triggers.map(|n| n.id.as_str()).collect();
        if !ignored.is_empty() {
            warn!(
                trigger = %first.id,
                ignored = ?ignored,
                "Graph has more than one trigger node; starting from the first"
            );
        }
        Some(first)
    }

    /// Outgoing edges of a node, in edge-list order
    pub fn outgoing<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing_index
            .get(node_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// Enabled model and tool nodes connected to an agent
    pub fn sub_nodes(&self, agent_id: &str) -> SubNodes<'_> {
        let mut found = SubNodes::default();

        for edge in self.outgoing(agent_id) {
            let Some(target) = self.node(&edge.target) else {
                continue;
            };
            if target.disabled {
                continue;
            }

            if edge.is_model_handle() || target.kind == NodeKind::Model {
                if !found.models.iter().any(|n| n.id == target.id) {
                    found.models.push(target);
                }
            } else if (edge.is_tool_handle() || target.kind == NodeKind::Tool)
                && !found.tools.iter().any(|n| n.id == target.id)
            {
                found.tools.push(target);
            }
        }

        found
    }

    /// Keep a resolved sub-node out of the main traversal
    pub fn exclude(&mut self, node_id: &str) {
        self.excluded.insert(node_id.to_string());
    }

    pub fn is_excluded(&self, node_id: &str) -> bool {
        self.excluded.contains(node_id)
    }

    pub fn excluded(&self) -> &HashSet<String> {
        &self.excluded
    }
}
