use std::sync::Arc;

use agent_adapters::{AdapterError, AdapterResult, GenerationBackend, GenerationRequest};
use agent_config::HostConfig;
use agent_kernel::{InMemorySource, ModelClientFactory, NO_RESPONSE, TOOLS_LIST_CHANGED};
use agent_primitives::{ContractId, ContractRecord};
use async_trait::async_trait;
use serde_json::{Value, json};
use swarm_host::{HostError, SwarmHost};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};

/// Backend whose behaviour is chosen by the model name.
struct FakeBackend {
    model: String,
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    fn provider(&self) -> &'static str {
        "fake"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> AdapterResult<Option<String>> {
        match self.model.as_str() {
            "broken-model" => Err(AdapterError::transport("quota exhausted")),
            "quiet-model" => Ok(Some("   ".into())),
            _ => Ok(Some(format!("{} handled {}", self.model, request.task_text()))),
        }
    }
}

struct FakeFactory;

impl ModelClientFactory for FakeFactory {
    fn create(&self, model: &str) -> AdapterResult<Arc<dyn GenerationBackend>> {
        Ok(Arc::new(FakeBackend { model: model.to_owned() }))
    }
}

fn record(id: &str, name: &str, status: &str, model: &str) -> ContractRecord {
    ContractRecord::from_value(json!({
        "AgentID": id,
        "Name": name,
        "Role": "Specialist",
        "Category": "Research",
        "AutonomyLevel": "Level 2 - Semi-Autonomous",
        "ExecutionPattern": "Sequential",
        "MCPEnabled": "__YES__",
        "ToolSchema": "{\"input\":{\"topic\":{\"type\":\"string\"}},\"output\":{\"format\":\"markdown\"}}",
        "QualityScore": 0.8,
        "Status": status,
        "Model": model,
        "Architectures": "MCP-Swarm"
    }))
    .unwrap()
}

fn host(source: Arc<InMemorySource>) -> SwarmHost {
    let mut config = HostConfig::default();
    config.source.page_size = 2;
    config.generation.default_model = "default-model".into();
    SwarmHost::with_parts(&config, source, Arc::new(FakeFactory)).unwrap()
}

struct Client {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Client {
    async fn send(&mut self, message: Value) {
        self.writer.write_all(format!("{message}\n").as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = self.lines.next_line().await.unwrap().expect("server closed the channel");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, id: u64, tool: &str, arguments: Value) -> Value {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments}
        }))
        .await;
        self.recv().await
    }
}

fn connect(host: &SwarmHost) -> (Client, tokio::task::JoinHandle<Result<(), HostError>>) {
    let (client_end, server_end) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_end);
    let serving = {
        let host = host.clone();
        tokio::spawn(async move { host.serve(server_read, server_write).await })
    };
    let (client_read, writer) = tokio::io::split(client_end);
    let client = Client {
        lines: BufReader::new(client_read).lines(),
        writer,
    };
    (client, serving)
}

#[tokio::test]
async fn active_enabled_contracts_become_callable_tools() {
    let source = Arc::new(InMemorySource::new(vec![
        record("a-1", "Market Analyst", "Active", "N/A"),
        record("a-2", "Retired Helper", "Inactive", ""),
        record("a-3", "Flaky Agent", "Active", "broken-model"),
    ]));
    let host = host(source);
    let summary = host.initialize().await.unwrap();
    assert_eq!(summary.registered, vec!["flaky_agent".to_owned(), "market_analyst".to_owned()]);
    assert!(host.registry().get(&ContractId::new("a-2").unwrap()).is_none());

    let (mut client, serving) = connect(&host);

    client
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await;
    let init = client.recv().await;
    assert_eq!(init["result"]["serverInfo"]["name"], "ASM-Swarm-Host");
    client
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;

    client.send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let listed = client.recv().await;
    let names: Vec<&str> = listed["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["flaky_agent", "market_analyst"]);

    let ok = client.call(3, "market_analyst", json!({"topic": "rust"})).await;
    assert_eq!(ok["result"]["isError"], false);
    assert_eq!(
        ok["result"]["content"][0]["text"],
        r#"default-model handled TASK_INPUT: {"topic":"rust"}"#
    );

    let failed = client.call(4, "flaky_agent", json!({})).await;
    assert_eq!(failed["result"]["isError"], true);
    let text = failed["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error:"));
    assert!(text.contains("quota exhausted"));

    let unknown = client.call(5, "retired_helper", json!({})).await;
    assert_eq!(unknown["error"]["code"], -32602);

    client.writer.shutdown().await.unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn refresh_rebinds_and_announces_changes() {
    let source = Arc::new(InMemorySource::new(vec![record("a-1", "Market Analyst", "Active", "")]));
    let host = host(Arc::clone(&source));
    host.initialize().await.unwrap();
    let (mut client, serving) = connect(&host);
    client.send(json!({"jsonrpc": "2.0", "id": 0, "method": "ping"})).await;
    assert_eq!(client.recv().await["result"], json!({}));

    source.replace(vec![
        record("a-1", "Market Analyst", "Maintenance", ""),
        record("b-1", "Quiet Scribe", "Active", "quiet-model"),
    ]);
    let summary = host.refresh().await.unwrap();
    assert_eq!(summary.registered, vec!["quiet_scribe".to_owned()]);
    assert_eq!(summary.removed, vec!["market_analyst".to_owned()]);

    let note = client.recv().await;
    assert_eq!(note["method"], TOOLS_LIST_CHANGED);

    let quiet = client.call(1, "quiet_scribe", json!({"topic": "nothing"})).await;
    assert_eq!(quiet["result"]["content"][0]["text"], NO_RESPONSE);

    client.writer.shutdown().await.unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_refreshes_keep_existing_bindings() {
    let source = Arc::new(InMemorySource::new(vec![record("a-1", "Market Analyst", "Active", "")]));
    let host = host(Arc::clone(&source));
    host.initialize().await.unwrap();

    source.fail_next(1);
    let err = host.refresh().await.unwrap_err();
    assert!(matches!(err, HostError::Registry(_)));
    assert!(host.tools().get("market_analyst").is_some());

    source.replace(vec![
        record("c-1", "Duplicate Name", "Active", ""),
        record("c-2", "duplicate name", "Active", ""),
    ]);
    let err = host.refresh().await.unwrap_err();
    assert!(matches!(err, HostError::Registration(_)));
    assert!(host.tools().get("market_analyst").is_some());
    assert!(host.tools().get("duplicate_name").is_none());
}

#[tokio::test]
async fn invalid_records_are_skipped_not_fatal() {
    let mut broken = record("x-1", "Broken", "Active", "");
    broken.insert("QualityScore", json!(3.0));
    let source = Arc::new(InMemorySource::new(vec![
        broken,
        record("a-1", "Market Analyst", "Active", ""),
    ]));
    let host = host(source);

    let summary = host.initialize().await.unwrap();
    assert_eq!(summary.registered, vec!["market_analyst".to_owned()]);
    assert_eq!(host.registry().snapshot().skipped(), 1);
}
