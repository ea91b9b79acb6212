//! Kraken private WebSocket trading client.
//!
//! Implements [`AccountClient`] over the authenticated trading socket:
//! each call sends one event (`addOrder`, `editOrder`, `cancelOrder`) with
//! a token and a request id, then reads frames until the matching status
//! event arrives or the call times out. The connection is reopened lazily
//! after any failure.

use crate::execution::auth::KrakenCredentials;
use crate::execution::transport::{AccountClient, OrderAck, TransportError};
use crate::types::{Order, OrderStatus, Side};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct KrakenTradingClient {
    url: String,
    credentials: KrakenCredentials,
    call_timeout: Duration,
    conn: Mutex<Option<WsStream>>,
    reqid: AtomicU64,
}

impl KrakenTradingClient {
    pub fn new(
        url: impl Into<String>,
        credentials: KrakenCredentials,
        call_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            credentials,
            call_timeout,
            conn: Mutex::new(None),
            reqid: AtomicU64::new(1),
        }
    }

    fn token(&self) -> Result<String, TransportError> {
        self.credentials
            .ws_token()
            .map_err(|e| TransportError::Auth(e.to_string()))
    }

    async fn connect(&self) -> Result<WsStream, TransportError> {
        let (stream, _) = tokio::time::timeout(self.call_timeout, connect_async(&self.url))
            .await
            .map_err(|_| TransportError::Transient("trading socket handshake timed out".into()))?
            .map_err(|e| TransportError::Transient(format!("trading socket connect: {}", e)))?;
        info!("[Trading] Connected to {}", self.url);
        Ok(stream)
    }

    /// Send one request event and wait for its status response.
    async fn call(&self, mut payload: Value, response_event: &str) -> Result<Value, TransportError> {
        let reqid = self.reqid.fetch_add(1, Ordering::Relaxed);
        payload["token"] = Value::String(self.token()?);
        payload["reqid"] = json!(reqid);

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Transient("trading socket unavailable".into()));
        };

        if let Err(e) = stream.send(Message::Text(payload.to_string())).await {
            *guard = None;
            return Err(TransportError::Transient(format!("send failed: {}", e)));
        }

        let result = tokio::time::timeout(
            self.call_timeout,
            wait_for_response(stream, response_event, reqid),
        )
        .await;

        match result {
            Ok(Ok(response)) => {
                if response.get("status").and_then(Value::as_str) == Some("error") {
                    let message = response
                        .get("errorMessage")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    return Err(classify_error(message));
                }
                Ok(response)
            }
            Ok(Err(e)) => {
                *guard = None;
                Err(e)
            }
            Err(_) => {
                // the stream may still deliver the stale response later,
                // so drop it rather than resynchronize
                *guard = None;
                Err(TransportError::Transient(format!(
                    "no {} within {:?}",
                    response_event, self.call_timeout
                )))
            }
        }
    }

    /// Fetch the openOrders snapshot over a dedicated short-lived session.
    ///
    /// The snapshot channel is a subscription; mixing it into the
    /// request/response socket would interleave its frames with call
    /// responses.
    async fn fetch_open_orders_snapshot(&self) -> Result<Value, TransportError> {
        let mut stream = self.connect().await?;
        let subscribe = json!({
            "event": "subscribe",
            "subscription": {"name": "openOrders", "token": self.token()?}
        });
        stream
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|e| TransportError::Transient(format!("subscribe failed: {}", e)))?;

        let snapshot = tokio::time::timeout(self.call_timeout, async {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let value: Value = match serde_json::from_str(&text) {
                            Ok(v) => v,
                            Err(_) => continue,
                        };
                        if let Some(obj) = value.as_object() {
                            if obj.get("status").and_then(Value::as_str) == Some("error") {
                                let message = obj
                                    .get("errorMessage")
                                    .and_then(Value::as_str)
                                    .unwrap_or("subscription error");
                                return Err(classify_error(message));
                            }
                            continue;
                        }
                        if value
                            .as_array()
                            .and_then(|a| a.get(a.len().wrapping_sub(2)))
                            .and_then(Value::as_str)
                            == Some("openOrders")
                        {
                            return Ok(value);
                        }
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return Err(TransportError::Transient(format!("read failed: {}", e)))
                    }
                    None => {
                        return Err(TransportError::Transient(
                            "stream ended before openOrders snapshot".into(),
                        ))
                    }
                }
            }
        })
        .await
        .map_err(|_| TransportError::Transient("openOrders snapshot timed out".into()))??;

        let _ = stream.close(None).await;
        Ok(snapshot)
    }
}

async fn wait_for_response(
    stream: &mut WsStream,
    response_event: &str,
    reqid: u64,
) -> Result<Value, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let value: Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("[Trading] Skipping malformed frame: {}", e);
                        continue;
                    }
                };
                let Some(obj) = value.as_object() else { continue };
                if obj.get("event").and_then(Value::as_str) != Some(response_event) {
                    continue;
                }
                // responses echo the reqid; older gateways omit it
                match obj.get("reqid").and_then(Value::as_u64) {
                    Some(id) if id != reqid => continue,
                    _ => return Ok(value),
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Transient(
                    "trading socket closed mid-call".into(),
                ))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::Transient(format!("read failed: {}", e))),
        }
    }
}

/// Map a Kraken error string onto the retry taxonomy.
///
/// Service-side and rate-limit errors are worth retrying; order-level
/// verdicts are final for the cycle.
fn classify_error(message: &str) -> TransportError {
    let transient = message.starts_with("EService:")
        || message.starts_with("EAPI:Rate limit")
        || message.contains("Unavailable")
        || message.contains("Internal error");
    if transient {
        TransportError::Transient(message.to_string())
    } else {
        TransportError::Rejected(message.to_string())
    }
}

/// Decode an openOrders snapshot into live orders for one pair.
///
/// Envelope: `[[{txid: {...}}, ...], "openOrders", {...}]` with order
/// details under `descr` and decimals as strings.
fn parse_open_orders(snapshot: &Value, pair: &str) -> Vec<Order> {
    let mut orders = Vec::new();
    let Some(batches) = snapshot.as_array().and_then(|a| a.first()).and_then(Value::as_array)
    else {
        return orders;
    };

    for batch in batches {
        let Some(map) = batch.as_object() else { continue };
        for (txid, detail) in map {
            let Some(descr) = detail.get("descr") else { continue };
            if descr.get("pair").and_then(Value::as_str) != Some(pair) {
                continue;
            }
            let Some(side) = descr
                .get("type")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Side>().ok())
            else {
                continue;
            };
            let Some(price) = parse_decimal(descr.get("price")) else {
                continue;
            };
            let vol = parse_decimal(detail.get("vol")).unwrap_or(0.0);
            let vol_exec = parse_decimal(detail.get("vol_exec")).unwrap_or(0.0);
            let status = match detail.get("status").and_then(Value::as_str) {
                Some("pending") => OrderStatus::Pending,
                Some("canceled") | Some("closed") | Some("expired") => OrderStatus::Closed,
                _ => OrderStatus::Open,
            };

            orders.push(Order {
                id: Some(txid.clone()),
                side,
                price,
                size: (vol - vol_exec).max(0.0),
                status,
            });
        }
    }
    orders
}

fn parse_decimal(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[async_trait]
impl AccountClient for KrakenTradingClient {
    async fn add_order(
        &self,
        pair: &str,
        side: Side,
        price: f64,
        volume: f64,
    ) -> Result<OrderAck, TransportError> {
        let payload = json!({
            "event": "addOrder",
            "pair": pair,
            "type": side.as_str(),
            "ordertype": "limit",
            "price": price.to_string(),
            "volume": volume.to_string(),
        });
        let response = self.call(payload, "addOrderStatus").await?;
        let txid = response
            .get("txid")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Transient("addOrderStatus without txid".into()))?;
        debug!("[Trading] addOrder ok: {}", txid);
        Ok(OrderAck {
            txid: txid.to_string(),
        })
    }

    async fn edit_order(
        &self,
        txid: &str,
        pair: &str,
        side: Side,
        price: f64,
        volume: f64,
    ) -> Result<OrderAck, TransportError> {
        let payload = json!({
            "event": "editOrder",
            "txid": txid,
            "pair": pair,
            "type": side.as_str(),
            "price": price.to_string(),
            "volume": volume.to_string(),
        });
        let response = self.call(payload, "editOrderStatus").await?;
        let new_txid = response
            .get("txid")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Transient("editOrderStatus without txid".into()))?;
        debug!("[Trading] editOrder ok: {} -> {}", txid, new_txid);
        Ok(OrderAck {
            txid: new_txid.to_string(),
        })
    }

    async fn cancel_order(&self, txid: &str) -> Result<(), TransportError> {
        let payload = json!({
            "event": "cancelOrder",
            "txid": [txid],
        });
        self.call(payload, "cancelOrderStatus").await?;
        debug!("[Trading] cancelOrder ok: {}", txid);
        Ok(())
    }

    async fn open_orders(&self, pair: &str) -> Result<Vec<Order>, TransportError> {
        let snapshot = self.fetch_open_orders_snapshot().await?;
        Ok(parse_open_orders(&snapshot, pair))
    }
}
