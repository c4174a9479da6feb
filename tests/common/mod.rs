#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use agentflow::engine::PublishedEvent;
use agentflow::prelude::*;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_job(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write job file");
}

pub fn simple_job(workflow_id: &str) -> String {
    format!(
        r#"
workflowId: {}
nodes:
  - {{ id: start, kind: trigger, name: manualTrigger }}
  - id: greet
    kind: action
    name: setData
    parameters:
      values: {{ message: hello }}
edges:
  - {{ id: e1, source: start, target: greet }}
"#,
        workflow_id
    )
}

pub fn triggerless_job(workflow_id: &str) -> String {
    format!(
        r#"
workflowId: {}
nodes:
  - {{ id: greet, kind: action, name: setData }}
"#,
        workflow_id
    )
}

pub fn failing_job(workflow_id: &str) -> String {
    format!(
        r#"
workflowId: {}
nodes:
  - {{ id: start, kind: trigger, name: manualTrigger }}
  - id: boom
    kind: action
    name: shellCommand
    parameters:
      command: "exit 7"
edges:
  - {{ id: e1, source: start, target: boom }}
"#,
        workflow_id
    )
}

// ============================================================================
// Graph builders
// ============================================================================

pub fn trigger(id: &str) -> Node {
    Node::new(id, NodeKind::Trigger, "manualTrigger")
}

pub fn set_data(id: &str, values: Value) -> Node {
    Node::new(id, NodeKind::Action, "setData").with_parameter("values", values)
}

/// Action that logs its `label` parameter and echoes its parameters
pub fn record(id: &str) -> Node {
    Node::new(id, NodeKind::Action, "record").with_parameter("label", json!(id))
}

pub fn failing(id: &str, message: &str) -> Node {
    Node::new(id, NodeKind::Action, "fail").with_parameter("message", json!(message))
}

pub fn agent(id: &str) -> Node {
    Node::new(id, NodeKind::Agent, "aiAgent").with_parameter("prompt", json!("hello"))
}

pub fn model(id: &str, reply: &str) -> Node {
    Node::new(id, NodeKind::Model, "fakeChatModel").with_parameter("reply", json!(reply))
}

pub fn tool(id: &str) -> Node {
    Node::new(id, NodeKind::Tool, "fakeTool").with_parameter("name", json!(id))
}

pub fn edge(source: &str, target: &str) -> Edge {
    Edge::new(format!("{}->{}", source, target), source, target)
}

pub fn model_edge(agent: &str, model: &str) -> Edge {
    edge(agent, model).with_handle("chat-model")
}

pub fn tool_edge(agent: &str, tool: &str) -> Edge {
    edge(agent, tool).with_handle("tool")
}

// ============================================================================
// Fake handlers
// ============================================================================

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct RecordingAction {
    calls: CallLog,
}

#[async_trait]
impl NodeHandler for RecordingAction {
    fn description(&self) -> &str {
        "Records its label"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let label = args
            .parameters
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.calls.lock().unwrap().push(label);
        Ok(NodeOutcome::ok(Value::Object(args.parameters)))
    }
}

/// Reports `success: false` with its `message` parameter, plus `data` when set
pub struct FailingAction;

#[async_trait]
impl NodeHandler for FailingAction {
    fn description(&self) -> &str {
        "Always fails"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let message = args
            .parameters
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("failed");
        Ok(NodeOutcome {
            data: args.parameters.get("data").cloned(),
            ..NodeOutcome::failure(message)
        })
    }
}

/// Returns an `Err` instead of a failed outcome
pub struct ExplodingAction;

#[async_trait]
impl NodeHandler for ExplodingAction {
    fn description(&self) -> &str {
        "Always errors"
    }

    async fn execute(&self, _args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        Err(HandlerError::Failed("exploded".to_string()))
    }
}

/// Replies with its configured text and the number of tools offered
pub struct FakeChatModel {
    reply: String,
}

#[async_trait]
impl ChatModel for FakeChatModel {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, HandlerError> {
        Ok(ChatResponse {
            text: format!("{} ({} tools)", self.reply, request.tools.len()),
            tool_calls: vec![],
        })
    }
}

pub struct FakeModelProvider;

#[async_trait]
impl ModelProvider for FakeModelProvider {
    fn description(&self) -> &str {
        "Fake chat model"
    }

    async fn supply_data(&self, args: SupplyArgs) -> Result<SuppliedModel, HandlerError> {
        let reply = args
            .parameters
            .get("reply")
            .and_then(Value::as_str)
            .unwrap_or("ok")
            .to_string();
        Ok(SuppliedModel {
            response: json!({ "model": "fake", "reply": reply }),
            model: Arc::new(FakeChatModel { reply }),
        })
    }
}

pub struct BrokenModelProvider;

#[async_trait]
impl ModelProvider for BrokenModelProvider {
    fn description(&self) -> &str {
        "Never supplies a model"
    }

    async fn supply_data(&self, _args: SupplyArgs) -> Result<SuppliedModel, HandlerError> {
        Err(HandlerError::Model("no capacity".to_string()))
    }
}

pub struct FakeToolProvider;

#[async_trait]
impl ToolProvider for FakeToolProvider {
    fn description(&self) -> &str {
        "Fake tool"
    }

    async fn supply_tool(&self, parameters: Map<String, Value>) -> Result<ToolDefinition, HandlerError> {
        Ok(ToolDefinition {
            name: parameters
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("tool")
                .to_string(),
            description: "Fake tool".to_string(),
            parameters: json!({ "type": "object" }),
        })
    }
}

/// Built-in handlers plus the fakes above
pub fn test_registry(calls: CallLog) -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins(
        Arc::new(InMemoryCredentialStore::new()),
        &EngineConfig::default(),
    );
    registry.register_action("record", Arc::new(RecordingAction { calls }));
    registry.register_action("fail", Arc::new(FailingAction));
    registry.register_action("explode", Arc::new(ExplodingAction));
    registry.register_model("fakeChatModel", Arc::new(FakeModelProvider));
    registry.register_model("brokenModel", Arc::new(BrokenModelProvider));
    registry.register_tool("fakeTool", Arc::new(FakeToolProvider));
    registry
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub executor: GraphExecutor,
    pub status: Arc<InMemoryStatusSink>,
    pub calls: CallLog,
    events: async_channel::Receiver<PublishedEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let (publisher, events) = ChannelPublisher::unbounded();
        let status = Arc::new(InMemoryStatusSink::new());
        let executor = GraphExecutor::new(
            Arc::new(test_registry(calls.clone())),
            Arc::new(publisher),
            status.clone(),
        );
        Self {
            executor,
            status,
            calls,
            events,
        }
    }

    pub async fn run(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<ExecutionReport, ExecutorError> {
        let ctx = ExecutionContext::with_execution_id("wf-test", "exec-test", nodes, edges);
        self.executor.run(ctx).await
    }

    /// Everything published so far
    pub fn events(&self) -> Vec<ExecutionEvent> {
        let mut events = Vec::new();
        while let Ok(published) = self.events.try_recv() {
            events.push(published.event);
        }
        events
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// `(nodeId, nodeStatus)` pairs of the node-level events, in order
pub fn node_timeline(events: &[ExecutionEvent]) -> Vec<(String, NodeStatus)> {
    events
        .iter()
        .filter_map(|e| Some((e.node_id.clone()?, e.node_status?)))
        .collect()
}

pub fn events_for<'a>(events: &'a [ExecutionEvent], node_id: &str) -> Vec<&'a ExecutionEvent> {
    events
        .iter()
        .filter(|e| e.node_id.as_deref() == Some(node_id))
        .collect()
}

/// Exactly one terminal event, and it is the last one
pub fn assert_single_terminal(events: &[ExecutionEvent]) -> &ExecutionEvent {
    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1, "expected one terminal event: {:?}", events);
    let last = events.last().expect("no events published");
    assert!(last.is_terminal(), "terminal event is not last: {:?}", events);
    last
}

// ============================================================================
// One-shot HTTP server
// ============================================================================

/// Serve a single HTTP response on a local port
///
/// Returns the base URL and a handle resolving to the raw request text.
pub async fn serve_once(
    status_line: &str,
    body: Value,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("No local address");
    let status_line = status_line.to_string();
    let payload = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Failed to accept");
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            payload.len(),
            payload
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("Failed to write response");
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.expect("Failed to read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}
