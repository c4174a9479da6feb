//! Static checks of a workflow graph before it runs

use std::collections::HashSet;

use crate::engine::registry::NodeRegistry;
use crate::workflow::{ExecutionContext, NodeKind};

/// A problem found in a workflow graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIssue {
    #[error("There is no trigger node")]
    NoTrigger,

    #[error("Multiple trigger nodes ({}); only '{}' will run", .0.join(", "), first_id(.0))]
    MultipleTriggers(Vec<String>),

    #[error("Duplicate node id '{0}'")]
    DuplicateNodeId(String),

    #[error("Edge '{edge}' references missing node '{missing}'")]
    DanglingEdge { edge: String, missing: String },

    #[error("Node '{node}' uses unknown {kind} type '{name}'")]
    UnknownHandler { node: String, kind: NodeKind, name: String },

    #[error("Agent '{0}': A Chat Model sub-node must be connected and enabled")]
    AgentWithoutModel(String),

    #[error("Agent '{agent}' can only have one model connected. Found {count} models.")]
    AgentWithMultipleModels { agent: String, count: usize },
}

fn first_id(ids: &[String]) -> &str {
    ids.first().map(String::as_str).unwrap_or_default()
}

impl GraphIssue {
    /// Fatal issues make the run fail; the rest only produce warnings
    pub fn is_fatal(&self) -> bool {
        match self {
            GraphIssue::NoTrigger
            | GraphIssue::UnknownHandler { .. }
            | GraphIssue::AgentWithoutModel(_)
            | GraphIssue::AgentWithMultipleModels { .. } => true,
            GraphIssue::MultipleTriggers(_)
            | GraphIssue::DuplicateNodeId(_)
            | GraphIssue::DanglingEdge { .. } => false,
        }
    }
}

/// Check a graph against the registry
///
/// Issues are reported in a stable order: triggers, ids, edges, handlers,
/// then agents.
pub fn validate(ctx: &ExecutionContext, registry: &NodeRegistry) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    let triggers: Vec<String> = ctx
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::Trigger)
        .map(|n| n.id.clone())
        .collect();
    match triggers.len() {
        0 => issues.push(GraphIssue::NoTrigger),
        1 => {}
        _ => issues.push(GraphIssue::MultipleTriggers(triggers)),
    }

    let mut ids = HashSet::new();
    for node in ctx.nodes() {
        if !ids.insert(node.id.as_str()) {
            issues.push(GraphIssue::DuplicateNodeId(node.id.clone()));
        }
    }

    for edge in ctx.edges() {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                issues.push(GraphIssue::DanglingEdge {
                    edge: edge.id.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    for node in ctx.nodes() {
        if !registry.has(node.kind, &node.name) {
            issues.push(GraphIssue::UnknownHandler {
                node: node.id.clone(),
                kind: node.kind,
                name: node.name.clone(),
            });
        }
    }

    for agent in ctx.nodes().iter().filter(|n| n.kind == NodeKind::Agent) {
        match ctx.sub_nodes(&agent.id).models.len() {
            0 => issues.push(GraphIssue::AgentWithoutModel(agent.id.clone())),
            1 => {}
            count => issues.push(GraphIssue::AgentWithMultipleModels {
                agent: agent.id.clone(),
                count,
            }),
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::credentials::InMemoryCredentialStore;
    use crate::workflow::{Edge, EngineConfig, Node};
    use std::sync::Arc;

    fn registry() -> NodeRegistry {
        NodeRegistry::with_builtins(
            Arc::new(InMemoryCredentialStore::new()),
            &EngineConfig::default(),
        )
    }

    fn ctx(nodes: Vec<Node>, edges: Vec<Edge>) -> ExecutionContext {
        ExecutionContext::new("wf", nodes, edges)
    }

    #[test]
    fn test_valid_graph() {
        let graph = ctx(
            vec![
                Node::new("t", NodeKind::Trigger, "manualTrigger"),
                Node::new("a", NodeKind::Action, "setData"),
            ],
            vec![Edge::new("e1", "t", "a")],
        );
        assert!(validate(&graph, &registry()).is_empty());
    }

    #[test]
    fn test_missing_trigger_is_fatal() {
        let graph = ctx(vec![Node::new("a", NodeKind::Action, "setData")], vec![]);
        let issues = validate(&graph, &registry());
        assert_eq!(issues, vec![GraphIssue::NoTrigger]);
        assert!(issues[0].is_fatal());
    }

    #[test]
    fn test_multiple_triggers_warn() {
        let graph = ctx(
            vec![
                Node::new("t1", NodeKind::Trigger, "manualTrigger"),
                Node::new("t2", NodeKind::Trigger, "webhookTrigger"),
            ],
            vec![],
        );
        let issues = validate(&graph, &registry());
        assert_eq!(
            issues,
            vec![GraphIssue::MultipleTriggers(vec!["t1".into(), "t2".into()])]
        );
        assert!(!issues[0].is_fatal());
        assert!(issues[0].to_string().contains("only 't1' will run"));
    }

    #[test]
    fn test_dangling_edge_and_unknown_handler() {
        let graph = ctx(
            vec![
                Node::new("t", NodeKind::Trigger, "manualTrigger"),
                Node::new("a", NodeKind::Action, "sendCarrierPigeon"),
            ],
            vec![Edge::new("e1", "t", "a"), Edge::new("e2", "a", "ghost")],
        );
        let issues = validate(&graph, &registry());
        assert!(issues.contains(&GraphIssue::DanglingEdge {
            edge: "e2".into(),
            missing: "ghost".into()
        }));
        assert!(issues.contains(&GraphIssue::UnknownHandler {
            node: "a".into(),
            kind: NodeKind::Action,
            name: "sendCarrierPigeon".into()
        }));
    }

    #[test]
    fn test_agent_model_count() {
        let graph = ctx(
            vec![
                Node::new("t", NodeKind::Trigger, "manualTrigger"),
                Node::new("agent", NodeKind::Agent, "aiAgent"),
                Node::new("m1", NodeKind::Model, "openAiChatModel"),
                Node::new("m2", NodeKind::Model, "openAiChatModel"),
                Node::new("lonely", NodeKind::Agent, "aiAgent"),
            ],
            vec![
                Edge::new("e1", "t", "agent"),
                Edge::new("e2", "agent", "m1").with_handle("chat-model"),
                Edge::new("e3", "agent", "m2").with_handle("chat-model"),
            ],
        );
        let issues = validate(&graph, &registry());
        assert!(issues.contains(&GraphIssue::AgentWithMultipleModels {
            agent: "agent".into(),
            count: 2
        }));
        assert!(issues.contains(&GraphIssue::AgentWithoutModel("lonely".into())));
    }

    #[test]
    fn test_issue_messages() {
        assert_eq!(GraphIssue::NoTrigger.to_string(), "There is no trigger node");
        assert_eq!(
            GraphIssue::DanglingEdge {
                edge: "e2".into(),
                missing: "ghost".into()
            }
            .to_string(),
            "Edge 'e2' references missing node 'ghost'"
        );
        assert_eq!(
            GraphIssue::UnknownHandler {
                node: "a".into(),
                kind: NodeKind::Action,
                name: "fax".into()
            }
            .to_string(),
            "Node 'a' uses unknown action type 'fax'"
        );
        assert_eq!(
            GraphIssue::AgentWithMultipleModels {
                agent: "ag".into(),
                count: 3
            }
            .to_string(),
            "Agent 'ag' can only have one model connected. Found 3 models."
        );
        assert_eq!(
            GraphIssue::MultipleTriggers(vec!["t1".into(), "t2".into()]).to_string(),
            "Multiple trigger nodes (t1, t2); only 't1' will run"
        );
    }
}
