//! Tool-invocation protocol server speaking newline-delimited JSON-RPC.

use std::sync::Arc;

use agent_primitives::{ExecutionContext, Priority, TraceId};
use agent_tools::ToolHost;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::jsonrpc::{JSONRPC_VERSION, RpcError, RpcNotification, RpcRequest, RpcResponse};
use crate::scheduler::{InvocationScheduler, SchedulerError};

/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Notification sent after the tool table changed.
pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

/// Name and version reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Errors terminating [`McpServer::serve`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading from or writing to the channel failed.
    #[error("protocol channel I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default, rename = "_meta")]
    meta: Option<CallMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallMeta {
    trace_id: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    context_window: Vec<String>,
}

impl CallMeta {
    fn into_context(self) -> Result<ExecutionContext, RpcError> {
        let mut context = ExecutionContext::new().with_context_window(self.context_window);
        if let Some(raw) = self.trace_id {
            let trace_id: TraceId = raw
                .parse()
                .map_err(|err| RpcError::invalid_params(format!("invalid _meta.traceId: {err}")))?;
            context = context.with_trace_id(trace_id);
        }
        if let Some(raw) = self.priority {
            let priority: Priority = raw
                .parse()
                .map_err(|err| RpcError::invalid_params(format!("invalid _meta.priority: {err}")))?;
            context = context.with_priority(priority);
        }
        Ok(context)
    }
}

/// Serves the bound tools of a [`ToolHost`] to one client.
///
/// `tools/call` requests run on the scheduler so a slow invocation never
/// holds up other requests; responses are written as they complete. A call the
/// scheduler refuses is answered with an error instead of being dropped.
#[derive(Debug, Clone)]
pub struct McpServer {
    tools: Arc<ToolHost>,
    info: ServerInfo,
    scheduler: InvocationScheduler,
}

impl McpServer {
    /// Creates a server over `tools`.
    #[must_use]
    pub fn new(tools: Arc<ToolHost>, info: ServerInfo, scheduler: InvocationScheduler) -> Self {
        Self { tools, info, scheduler }
    }

    /// Returns the scheduler running `tools/call` requests.
    #[must_use]
    pub fn scheduler(&self) -> &InvocationScheduler {
        &self.scheduler
    }

    /// Returns the served tool host.
    #[must_use]
    pub fn tools(&self) -> &Arc<ToolHost> {
        &self.tools
    }

    /// Handles one raw line, returning the response to write, if any.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        match parse_line(line) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => Some(response),
        }
    }

    /// Handles a decoded request. Notifications yield `None`.
    pub async fn handle_request(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "notification received");
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list() })),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        })
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": true } },
            "serverInfo": self.info,
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|err| RpcError::invalid_params(format!("invalid tools/call params: {err}")))?;
        let context = params.meta.unwrap_or_default().into_context()?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        let output = self
            .tools
            .invoke(&params.name, arguments, &context)
            .await
            .map_err(|err| RpcError::invalid_params(err.to_string()))?;
        serde_json::to_value(output).map_err(|err| RpcError::internal(err.to_string()))
    }

    /// Reads requests from `reader` until EOF, writing responses and
    /// notifications to `writer`.
    ///
    /// In-flight calls are awaited before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] when the channel fails.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> ServerResult<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_lines(writer, rx));
        let notifier = self.spawn_list_changed_notifier(tx.clone());

        info!(server = %self.info.name, tools = self.tools.list().len(), "protocol server listening");

        let mut lines = BufReader::new(reader).lines();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        let read_result = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            };
            if line.trim().is_empty() {
                continue;
            }
            in_flight.retain(|handle| !handle.is_finished());

            let request = match parse_line(&line) {
                Ok(request) => request,
                Err(response) => {
                    send(&tx, &response);
                    continue;
                }
            };

            if request.method == "tools/call" {
                let id = request.id.clone();
                let server = self.clone();
                let task_tx = tx.clone();
                let task = async move {
                    if let Some(response) = server.handle_request(request).await {
                        send(&task_tx, &response);
                    }
                };
                match self.scheduler.try_spawn(task) {
                    Ok(handle) => in_flight.push(handle),
                    Err(err) => {
                        warn!(error = %err, "tools/call refused");
                        if let Some(id) = id {
                            send(&tx, &RpcResponse::failure(id, refusal(err)));
                        }
                    }
                }
            } else if let Some(response) = self.handle_request(request).await {
                send(&tx, &response);
            }
        };

        for handle in in_flight {
            if let Err(err) = handle.await {
                warn!(error = %err, "tool call task aborted");
            }
        }
        notifier.abort();
        drop(tx);

        let written = writer_task
            .await
            .map_err(|err| std::io::Error::other(format!("writer task failed: {err}")))?;
        read_result?;
        written?;
        info!("protocol channel closed");
        Ok(())
    }

    fn spawn_list_changed_notifier(&self, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
        let mut changes = self.tools.subscribe();
        changes.borrow_and_update();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let notification = RpcNotification::new(TOOLS_LIST_CHANGED);
                match serde_json::to_string(&notification) {
                    Ok(line) if tx.send(line.clone()).is_ok() => {}
                    _ => break,
                }
            }
        })
    }
}

fn refusal(err: SchedulerError) -> RpcError {
    match err {
        SchedulerError::Busy { .. } => RpcError::server_busy(err.to_string()),
        SchedulerError::Closed => RpcError::internal(err.to_string()),
    }
}

fn parse_line(line: &str) -> Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|err| {
        warn!(error = %err, "unparseable protocol line");
        RpcResponse::failure(Value::Null, RpcError::parse_error(format!("parse error: {err}")))
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);

    let request: RpcRequest = serde_json::from_value(value)
        .map_err(|err| RpcResponse::failure(id.clone(), RpcError::invalid_request(err.to_string())))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(RpcResponse::failure(
            id,
            RpcError::invalid_request(format!("unsupported jsonrpc version `{}`", request.jsonrpc)),
        ));
    }
    Ok(request)
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &RpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                warn!("protocol writer closed; response dropped");
            }
        }
        Err(err) => warn!(error = %err, "failed to encode response"),
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
