//! Node registry - handlers available to the dispatcher, grouped by kind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::contracts::{AgentHandler, ModelProvider, NodeHandler, ToolProvider};
use crate::engine::credentials::CredentialStore;
use crate::engine::handlers::{
    AiAgentNode, HttpRequestNode, HttpRequestToolProvider, ManualTrigger, OpenAiChatModelProvider,
    SetDataNode, ShellCommandNode, WebhookTrigger,
};
use crate::workflow::{EngineConfig, NodeKind};

/// Registry of handlers keyed by node kind and name
#[derive(Clone, Default)]
pub struct NodeRegistry {
    triggers: HashMap<String, Arc<dyn NodeHandler>>,
    actions: HashMap<String, Arc<dyn NodeHandler>>,
    agents: HashMap<String, Arc<dyn AgentHandler>>,
    models: HashMap<String, Arc<dyn ModelProvider>>,
    tools: HashMap<String, Arc<dyn ToolProvider>>,
}

impl NodeRegistry {
    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in nodes
    pub fn with_builtins(credentials: Arc<dyn CredentialStore>, config: &EngineConfig) -> Self {
        let mut registry = Self::empty();
        let timeout = config.http_timeout();

        registry.register_trigger("manualTrigger", Arc::new(ManualTrigger));
        registry.register_trigger("webhookTrigger", Arc::new(WebhookTrigger));

        registry.register_action(
            "httpRequest",
            Arc::new(HttpRequestNode::new(timeout, credentials.clone())),
        );
        registry.register_action("shellCommand", Arc::new(ShellCommandNode));
        registry.register_action("setData", Arc::new(SetDataNode));

        registry.register_agent("aiAgent", Arc::new(AiAgentNode));

        registry.register_model(
            "openAiChatModel",
            Arc::new(OpenAiChatModelProvider::new(
                timeout,
                &config.openai_base_url,
                credentials,
            )),
        );

        registry.register_tool("httpRequestTool", Arc::new(HttpRequestToolProvider));

        registry
    }

    pub fn register_trigger(&mut self, name: &str, handler: Arc<dyn NodeHandler>) {
        self.triggers.insert(name.to_string(), handler);
    }

    pub fn register_action(&mut self, name: &str, handler: Arc<dyn NodeHandler>) {
        self.actions.insert(name.to_string(), handler);
    }

    pub fn register_agent(&mut self, name: &str, handler: Arc<dyn AgentHandler>) {
        self.agents.insert(name.to_string(), handler);
    }

    pub fn register_model(&mut self, name: &str, provider: Arc<dyn ModelProvider>) {
        self.models.insert(name.to_string(), provider);
    }

    pub fn register_tool(&mut self, name: &str, provider: Arc<dyn ToolProvider>) {
        self.tools.insert(name.to_string(), provider);
    }

    pub fn trigger(&self, name: &str) -> Option<Arc<dyn NodeHandler>> {
        self.triggers.get(name).cloned()
    }

    pub fn action(&self, name: &str) -> Option<Arc<dyn NodeHandler>> {
        self.actions.get(name).cloned()
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn AgentHandler>> {
        self.agents.get(name).cloned()
    }

    pub fn model(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.models.get(name).cloned()
    }

    pub fn tool(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.tools.get(name).cloned()
    }

    /// Check if a handler is registered for this kind and name
    pub fn has(&self, kind: NodeKind, name: &str) -> bool {
        match kind {
            NodeKind::Trigger => self.triggers.contains_key(name),
            NodeKind::Action => self.actions.contains_key(name),
            NodeKind::Agent => self.agents.contains_key(name),
            NodeKind::Model => self.models.contains_key(name),
            NodeKind::Tool => self.tools.contains_key(name),
        }
    }

    /// All registered handlers as `(kind, name, description)`, sorted
    pub fn list(&self) -> Vec<(NodeKind, &str, &str)> {
        let mut entries: Vec<(NodeKind, &str, &str)> = Vec::new();
        entries.extend(self.triggers.iter().map(|(n, h)| (NodeKind::Trigger, n.as_str(), h.description())));
        entries.extend(self.actions.iter().map(|(n, h)| (NodeKind::Action, n.as_str(), h.description())));
        entries.extend(self.agents.iter().map(|(n, h)| (NodeKind::Agent, n.as_str(), h.description())));
        entries.extend(self.models.iter().map(|(n, h)| (NodeKind::Model, n.as_str(), h.description())));
        entries.extend(self.tools.iter().map(|(n, h)| (NodeKind::Tool, n.as_str(), h.description())));
        entries.sort_by(|a, b| (a.0 as u8, a.1).cmp(&(b.0 as u8, b.1)));
        entries
    }
}
