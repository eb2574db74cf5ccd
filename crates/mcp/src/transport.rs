//! JSON-RPC over the MCP SSE transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use crate::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpMessage, RequestId};

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops a request's waiter however the request future ends: answered,
/// failed, timed out, or cancelled by its caller.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.id);
    }
}

/// Transport-level failures talking to an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Invalid MCP URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("MCP server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timed out after {0:?} waiting for the MCP server")]
    Timeout(Duration),

    #[error("MCP connection closed")]
    Closed,

    #[error("MCP error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        McpError::Http(e.to_string())
    }
}

/// A live SSE session with one MCP server.
///
/// Requests are POSTed to the endpoint the server announced; their responses
/// come back over the event stream and are routed by id.
pub struct SseTransport {
    http: reqwest::Client,
    endpoint: Url,
    pending: PendingMap,
    next_id: AtomicI64,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    request_timeout: Duration,
}

impl SseTransport {
    /// Open the event stream and wait for the server's `endpoint` event.
    pub async fn connect(sse_url: &str, request_timeout: Duration) -> Result<Self, McpError> {
        let base = Url::parse(sse_url).map_err(|e| McpError::InvalidUrl {
            url: sse_url.to_string(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::new();
        let response = http
            .get(base.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (endpoint_tx, endpoint_rx) = oneshot::channel();

        let reader = tokio::spawn(read_events(
            response,
            endpoint_tx,
            pending.clone(),
            closed.clone(),
        ));

        let endpoint_path = match tokio::time::timeout(request_timeout, endpoint_rx).await {
            Ok(Ok(path)) => path,
            Ok(Err(_)) => {
                reader.abort();
                return Err(McpError::Closed);
            }
            Err(_) => {
                reader.abort();
                return Err(McpError::Timeout(request_timeout));
            }
        };

        let endpoint = resolve_endpoint(&base, &endpoint_path)?;
        debug!(sse = %base, endpoint = %endpoint, "MCP session established");

        Ok(Self {
            http,
            endpoint,
            pending,
            next_id: AtomicI64::new(1),
            closed,
            reader,
            request_timeout,
        })
    }

    /// URL requests are POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response's `result`.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }

        let id = RequestId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        let request = JsonRpcRequest::new(id.clone(), method, params);
        trace!(method, id = ?id, "MCP request");

        self.post(&serde_json::to_value(&request)?).await?;

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(McpError::Closed),
            Err(_) => return Err(McpError::Timeout(self.request_timeout)),
        };

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Fire a notification; no response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let notification = JsonRpcNotification::new(method, params);
        self.post(&serde_json::to_value(&notification)?).await
    }

    async fn post(&self, body: &Value) -> Result<(), McpError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// The `endpoint` event may carry a path or an absolute URL.
pub(crate) fn resolve_endpoint(base: &Url, endpoint: &str) -> Result<Url, McpError> {
    base.join(endpoint.trim()).map_err(|e| McpError::InvalidUrl {
        url: endpoint.to_string(),
        reason: e.to_string(),
    })
}

async fn read_events(
    response: reqwest::Response,
    endpoint_tx: oneshot::Sender<String>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "MCP event stream interrupted");
                break;
            }
        };

        match event.event.as_str() {
            "endpoint" => {
                if let Some(tx) = endpoint_tx.take() {
                    let _ = tx.send(event.data);
                }
            }
            // An event without a type is a message
            "message" | "" => route_message(&event.data, &pending),
            other => trace!(event = other, "Ignoring SSE event"),
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with `Closed`.
    lock(&pending).clear();
    debug!("MCP event stream ended");
}

fn route_message(data: &str, pending: &PendingMap) {
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Unparseable MCP message");
            return;
        }
    };

    match McpMessage::from_json(value) {
        Ok(McpMessage::Response(response)) => {
            let waiter = lock(pending).remove(&response.id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => debug!(id = ?response.id, "Response for unknown request"),
            }
        }
        Ok(McpMessage::Notification(n)) => debug!(method = %n.method, "MCP notification"),
        Ok(McpMessage::Request(r)) => debug!(method = %r.method, "Ignoring server request"),
        Err(e) => warn!(error = %e, "Malformed MCP message"),
    }
}
