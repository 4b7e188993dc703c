//! WebSocket JSON-RPC Transport
//!
//! Talks to an Ethereum node (or a wallet-backed provider) over a single
//! WebSocket. A reader task correlates responses to requests by id;
//! a writer task drains the outgoing queue.
//!
//! Transactions go through `eth_sendTransaction`, so the node's wallet
//! signs. A declined signature comes back as EIP-1193 code 4001.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::chain::protocol::{
    parse_data, parse_u64, to_data, to_quantity, RpcCallObject, RpcLog, RpcLogFilter,
    RpcReceipt, RpcRequest, RpcResponse,
};
use crate::chain::transport::{
    CallRequest, ContractTransport, Log, LogFilter, Receipt, TransportError, TxHash, TxRequest,
};

/// Requests waiting for their response.
#[derive(Default)]
struct Pending {
    waiters: BTreeMap<u64, oneshot::Sender<RpcResponse>>,
    /// Set once the reader task is gone; no response can arrive after that.
    closed: bool,
}

type PendingMap = Arc<Mutex<Pending>>;

/// Outgoing queue depth.
const OUTGOING_CAPACITY: usize = 100;

/// JSON-RPC over WebSocket.
pub struct WsTransport {
    /// Serialized requests for the writer task.
    outgoing: mpsc::Sender<String>,
    /// In-flight requests.
    pending: PendingMap,
    /// Next request id.
    next_id: AtomicU64,
    /// Per-request deadline.
    request_timeout: Duration,
    /// Background tasks.
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsTransport {
    /// Connect to a `ws://` or `wss://` endpoint.
    #[instrument(skip(request_timeout))]
    pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connection(format!("{}: {}", url, e)))?;
        info!("Connected to {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(OUTGOING_CAPACITY);
        let pending: PendingMap = Arc::new(Mutex::new(Pending::default()));

        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        #[cfg(feature = "debug-tracing")]
                        debug!("<- {}", text);
                        match serde_json::from_str::<RpcResponse>(&text) {
                            Ok(response) => {
                                let Some(id) = response.id else {
                                    debug!("Ignoring notification without id");
                                    continue;
                                };
                                let waiter = reader_pending.lock().await.waiters.remove(&id);
                                match waiter {
                                    Some(tx) => {
                                        let _ = tx.send(response);
                                    }
                                    None => warn!("Response for unknown request id {}", id),
                                }
                            }
                            Err(e) => warn!("Failed to parse node message: {} - {}", e, text),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Node closed connection");
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            // Dropping the senders fails every in-flight request
            let mut pending = reader_pending.lock().await;
            pending.closed = true;
            pending.waiters.clear();
            drop(pending);
            info!("Reader task ended");
        });

        let writer = tokio::spawn(async move {
            while let Some(json) = outgoing_rx.recv().await {
                #[cfg(feature = "debug-tracing")]
                debug!("-> {}", json);
                if let Err(e) = write.send(Message::Text(json)).await {
                    error!("Failed to send request: {}", e);
                    break;
                }
            }
            debug!("Writer task ended");
        });

        Ok(Self {
            outgoing: outgoing_tx,
            pending,
            next_id: AtomicU64::new(1),
            request_timeout,
            reader,
            writer,
        })
    }

    /// Send one request and wait for its response.
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&RpcRequest::new(id, method, params))
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(TransportError::Connection("connection closed".to_string()));
            }
            pending.waiters.insert(id, tx);
        }

        if self.outgoing.send(body).await.is_err() {
            self.pending.lock().await.waiters.remove(&id);
            return Err(TransportError::Connection("writer task stopped".to_string()));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(TransportError::Connection("connection closed".to_string())),
            Err(_) => {
                self.pending.lock().await.waiters.remove(&id);
                Err(TransportError::Timeout(method.to_string()))
            }
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, TransportError> {
        serde_json::from_value(value).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    fn expect_str(value: &Value) -> Result<&str, TransportError> {
        value
            .as_str()
            .ok_or_else(|| TransportError::Protocol(format!("expected hex string, got {}", value)))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl ContractTransport for WsTransport {
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, TransportError> {
        let obj = RpcCallObject {
            from: request.from.map(|a| a.to_string()),
            to: request.to.to_string(),
            data: to_data(&request.data),
            value: None,
        };
        let result = self.request("eth_call", json!([obj, "latest"])).await?;
        parse_data(Self::expect_str(&result)?)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, TransportError> {
        let obj = RpcCallObject {
            from: Some(tx.from.to_string()),
            to: tx.to.to_string(),
            data: to_data(&tx.data),
            value: (!tx.value.is_zero()).then(|| to_quantity(tx.value.0)),
        };
        let result = self.request("eth_sendTransaction", json!([obj])).await?;
        let bytes = parse_data(Self::expect_str(&result)?)?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TransportError::Protocol("transaction hash is not 32 bytes".to_string()))?;
        Ok(TxHash(hash))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, TransportError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt: RpcReceipt = Self::parse(result)?;
        Receipt::try_from(receipt).map(Some)
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        parse_u64(Self::expect_str(&result)?)
    }

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, TransportError> {
        let obj = RpcLogFilter {
            address: filter.address.to_string(),
            from_block: to_quantity(filter.from_block as u128),
            to_block: to_quantity(filter.to_block as u128),
        };
        let result = self.request("eth_getLogs", json!([obj])).await?;
        let logs: Vec<RpcLog> = Self::parse(result)?;
        logs.into_iter().map(Log::try_from).collect()
    }
}
