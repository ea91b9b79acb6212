//! Kraken WebSocket frame decoder.
//!
//! Kraken's public stream mixes two envelope shapes: event objects
//! (`{"event": "heartbeat"}`) and channel data arrays
//! (`[channelID, payload.., channelName, pair]`). The channel metadata in
//! data arrays is usually a plain tag string ("book-10") but some gateways
//! emit a structured descriptor object (`{"name": "book", "depth": 10}`);
//! both shapes are accepted. A malformed frame fails only itself, never the
//! session.

use crate::feed::events::MarketEvent;
use crate::types::Side;
use feedline::{FeedError, FrameDecoder, WsMessage};
use serde_json::Value;

/// Decoder for Kraken public-feed frames.
pub struct KrakenFrameDecoder {
    pair: String,
}

impl KrakenFrameDecoder {
    pub fn new(pair: impl Into<String>) -> Self {
        Self { pair: pair.into() }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    fn decode_event_object(&self, obj: &serde_json::Map<String, Value>) -> Option<MarketEvent> {
        if let Some(message) = obj.get("errorMessage").and_then(Value::as_str) {
            return Some(MarketEvent::ProtocolError {
                message: message.to_string(),
            });
        }

        match obj.get("event").and_then(Value::as_str) {
            Some("heartbeat") => Some(MarketEvent::Heartbeat),
            Some("systemStatus") => Some(MarketEvent::SystemStatus {
                status: obj
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            }),
            Some("subscriptionStatus") => {
                let channel = obj
                    .get("channelName")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| {
                        obj.get("subscription")
                            .and_then(|s| s.get("name"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "unknown".to_string());

                match obj.get("status").and_then(Value::as_str) {
                    Some("error") => Some(MarketEvent::ProtocolError {
                        message: format!("subscription to {} failed", channel),
                    }),
                    _ => Some(MarketEvent::SubscriptionAck { channel }),
                }
            }
            _ => None,
        }
    }

    fn decode_data_array(&self, arr: &[Value]) -> Result<Option<MarketEvent>, FeedError> {
        if arr.len() < 3 {
            return Err(FeedError::Decode(format!(
                "data array too short: {} elements",
                arr.len()
            )));
        }

        // Envelope: [channelID, payload.., channelName, pair]
        let channel = channel_name(&arr[arr.len() - 2]).ok_or_else(|| {
            FeedError::Decode("channel metadata is neither tag nor descriptor".into())
        })?;
        let payloads = &arr[1..arr.len() - 2];

        if channel.starts_with("book") {
            Ok(decode_book(payloads))
        } else if channel.starts_with("ticker") {
            Ok(decode_ticker(payloads))
        } else if channel.starts_with("trade") {
            decode_trade(payloads).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl FrameDecoder for KrakenFrameDecoder {
    type Event = MarketEvent;

    fn decode(&self, frame: WsMessage) -> feedline::Result<Option<MarketEvent>> {
        let text = frame
            .as_text()
            .ok_or_else(|| FeedError::Decode("binary frame on a JSON feed".into()))?;

        let value: Value = serde_json::from_str(text)
            .map_err(|e| FeedError::Decode(format!("invalid JSON: {}", e)))?;

        match value {
            Value::Object(obj) => Ok(self.decode_event_object(&obj)),
            Value::Array(arr) => self.decode_data_array(&arr),
            other => Err(FeedError::Decode(format!(
                "unexpected top-level JSON: {}",
                other
            ))),
        }
    }

    fn is_subscription_ack(&self, event: &MarketEvent) -> bool {
        matches!(event, MarketEvent::SubscriptionAck { .. })
    }
}

/// Channel metadata: a plain tag string or a descriptor object with "name".
fn channel_name(value: &Value) -> Option<String> {
    match value {
        Value::String(tag) => Some(tag.clone()),
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Book payloads: snapshots use "bs"/"as", incremental updates "b"/"a".
/// Levels arrive best-first, so the top of each touched side is level 0.
fn decode_book(payloads: &[Value]) -> Option<MarketEvent> {
    let mut best_bid = None;
    let mut best_ask = None;

    for payload in payloads {
        let obj = payload.as_object()?;
        for key in ["bs", "b"] {
            if let Some(level) = first_level_price(obj.get(key)) {
                best_bid.get_or_insert(level);
            }
        }
        for key in ["as", "a"] {
            if let Some(level) = first_level_price(obj.get(key)) {
                best_ask.get_or_insert(level);
            }
        }
    }

    if best_bid.is_none() && best_ask.is_none() {
        return None;
    }
    Some(MarketEvent::BookUpdate { best_bid, best_ask })
}

/// Ticker payload: {"b": ["price", ...], "a": ["price", ...], ...}
fn decode_ticker(payloads: &[Value]) -> Option<MarketEvent> {
    let obj = payloads.first()?.as_object()?;
    let best_bid = obj.get("b").and_then(|v| price_at(v, 0));
    let best_ask = obj.get("a").and_then(|v| price_at(v, 0));

    if best_bid.is_none() && best_ask.is_none() {
        return None;
    }
    Some(MarketEvent::BookUpdate { best_bid, best_ask })
}

/// Trade payload: [["price", "volume", "time", "side", ...], ...].
/// Frames can batch several prints; the most recent one becomes the event.
fn decode_trade(payloads: &[Value]) -> Result<MarketEvent, FeedError> {
    let trades = payloads
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Decode("trade payload is not an array".into()))?;
    let last = trades
        .last()
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Decode("empty trade batch".into()))?;

    let price = last
        .first()
        .and_then(parse_f64)
        .ok_or_else(|| FeedError::Decode("trade without price".into()))?;
    let size = last
        .get(1)
        .and_then(parse_f64)
        .ok_or_else(|| FeedError::Decode("trade without volume".into()))?;
    let side = match last.get(3).and_then(Value::as_str) {
        Some("b") => Side::Buy,
        Some("s") => Side::Sell,
        other => {
            return Err(FeedError::Decode(format!(
                "unknown trade side: {:?}",
                other
            )))
        }
    };

    Ok(MarketEvent::Trade { price, size, side })
}

/// First price of a level array: [["price", "volume", "timestamp"], ...]
fn first_level_price(levels: Option<&Value>) -> Option<f64> {
    levels?
        .as_array()?
        .first()?
        .as_array()?
        .first()
        .and_then(parse_f64)
}

fn price_at(value: &Value, index: usize) -> Option<f64> {
    value.as_array()?.get(index).and_then(parse_f64)
}

/// Kraken sends decimals as strings; accept raw numbers too.
fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(decoder: &KrakenFrameDecoder, text: &str) -> feedline::Result<Option<MarketEvent>> {
        decoder.decode(WsMessage::Text(text.to_string()))
    }

    #[test]
    fn test_heartbeat() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(&d, r#"{"event":"heartbeat"}"#).unwrap();
        assert_eq!(event, Some(MarketEvent::Heartbeat));
    }

    #[test]
    fn test_system_status() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"{"connectionID":123,"event":"systemStatus","status":"online","version":"1.9.0"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::SystemStatus {
                status: "online".to_string()
            })
        );
    }

    #[test]
    fn test_subscription_ack() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"{"channelID":42,"channelName":"book-10","event":"subscriptionStatus","pair":"XBT/USD","status":"subscribed","subscription":{"depth":10,"name":"book"}}"#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(event, MarketEvent::SubscriptionAck { ref channel } if channel == "book-10"));
        assert!(d.is_subscription_ack(&event));
    }

    #[test]
    fn test_subscription_error_is_protocol_error() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"{"event":"subscriptionStatus","status":"error","errorMessage":"Subscription depth not supported","subscription":{"name":"book"}}"#,
        )
        .unwrap();
        assert!(matches!(event, Some(MarketEvent::ProtocolError { .. })));
    }

    #[test]
    fn test_book_snapshot_with_string_tag() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"[42,{"bs":[["49950.1","1.2","1700000000.0"],["49940.0","2.0","1700000000.0"]],"as":[["50050.5","0.5","1700000000.0"]]},"book-10","XBT/USD"]"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::BookUpdate {
                best_bid: Some(49950.1),
                best_ask: Some(50050.5),
            })
        );
    }

    #[test]
    fn test_book_update_with_descriptor_object() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        // Structured channel metadata instead of the usual tag string
        let event = decode(
            &d,
            r#"[42,{"b":[["49960.0","1.0","1700000001.0"]]},{"name":"book","depth":10},"XBT/USD"]"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::BookUpdate {
                best_bid: Some(49960.0),
                best_ask: None,
            })
        );
    }

    #[test]
    fn test_book_update_split_payloads() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"[42,{"b":[["49960.0","1.0","1700000001.0"]]},{"a":[["50040.0","1.0","1700000001.0"]]},"book-10","XBT/USD"]"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::BookUpdate {
                best_bid: Some(49960.0),
                best_ask: Some(50040.0),
            })
        );
    }

    #[test]
    fn test_ticker() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"[340,{"a":["50050.0","1","1.000"],"b":["49950.0","2","2.000"],"c":["50000.0","0.1"]},"ticker","XBT/USD"]"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::BookUpdate {
                best_bid: Some(49950.0),
                best_ask: Some(50050.0),
            })
        );
    }

    #[test]
    fn test_trade_batch_takes_latest() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(
            &d,
            r#"[337,[["50010.0","0.1","1700000000.1","b","l",""],["50020.0","0.2","1700000000.2","s","l",""]],"trade","XBT/USD"]"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::Trade {
                price: 50020.0,
                size: 0.2,
                side: Side::Sell,
            })
        );
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        assert!(matches!(
            decode(&d, "not json at all"),
            Err(FeedError::Decode(_))
        ));
    }

    #[test]
    fn test_unknown_channel_is_skipped() {
        let d = KrakenFrameDecoder::new("XBT/USD");
        let event = decode(&d, r#"[99,{"x":[]},"ohlc-1","XBT/USD"]"#).unwrap();
        assert_eq!(event, None);
    }
}
