//! Subscription payload builders for the Kraken WebSocket API.

use feedline::WsMessage;
use serde_json::json;

/// Order book subscription for one pair at the given depth.
pub fn book_subscription(pair: &str, depth: u32) -> WsMessage {
    WsMessage::Text(
        json!({
            "event": "subscribe",
            "pair": [pair],
            "subscription": {"name": "book", "depth": depth}
        })
        .to_string(),
    )
}

/// Public trade subscription for one pair.
pub fn trade_subscription(pair: &str) -> WsMessage {
    WsMessage::Text(
        json!({
            "event": "subscribe",
            "pair": [pair],
            "subscription": {"name": "trade"}
        })
        .to_string(),
    )
}

/// Ticker subscription for one pair.
pub fn ticker_subscription(pair: &str) -> WsMessage {
    WsMessage::Text(
        json!({
            "event": "subscribe",
            "pair": [pair],
            "subscription": {"name": "ticker"}
        })
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(msg: WsMessage) -> Value {
        serde_json::from_str(msg.as_text().unwrap()).unwrap()
    }

    #[test]
    fn test_book_subscription_shape() {
        let v = parse(book_subscription("XBT/USD", 10));
        assert_eq!(v["event"], "subscribe");
        assert_eq!(v["pair"][0], "XBT/USD");
        assert_eq!(v["subscription"]["name"], "book");
        assert_eq!(v["subscription"]["depth"], 10);
    }

    #[test]
    fn test_trade_subscription_shape() {
        let v = parse(trade_subscription("EUR/USD"));
        assert_eq!(v["subscription"]["name"], "trade");
        assert_eq!(v["pair"][0], "EUR/USD");
    }
}
