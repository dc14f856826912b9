use crate::l3_book::types::{
    BookEvent, DepthSnapshot, EventKind, OrderId, RestingOrder, Side, Trade,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One frame off the full channel, tagged by `type`.
///
/// Alternate key names are normalized here at the serde boundary
/// (`id`/`order_id`, `size`/`remaining_size`); everything downstream sees one
/// shape per message kind. Kinds the book does not know about decode into
/// [`FeedMessage::Unknown`] rather than failing the frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Open(OpenMessage),
    Done(DoneMessage),
    Match(MatchMessage),
    Change(ChangeMessage),
    Received(ReceivedMessage),
    Activate(ActivateMessage),
    Heartbeat(HeartbeatMessage),
    Subscriptions(SubscriptionsMessage),
    Error(ErrorMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenMessage {
    #[serde(alias = "id")]
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    #[serde(alias = "size")]
    pub remaining_size: Decimal,
    pub sequence: u64,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoneMessage {
    #[serde(alias = "id")]
    pub order_id: OrderId,
    pub side: Side,
    /// Absent for an order that never rested on the book.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<DoneReason>,
    #[serde(default)]
    pub remaining_size: Option<Decimal>,
    pub sequence: u64,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoneReason {
    Filled,
    Canceled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchMessage {
    #[serde(default)]
    pub trade_id: Option<u64>,
    pub maker_order_id: OrderId,
    #[serde(default)]
    pub taker_order_id: Option<OrderId>,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub sequence: u64,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeMessage {
    pub order_id: OrderId,
    pub side: Side,
    /// Absent for funds-backed orders that are not resting.
    #[serde(default)]
    pub price: Option<Decimal>,
    pub new_size: Decimal,
    #[serde(default)]
    pub old_size: Option<Decimal>,
    pub sequence: u64,
    #[serde(default)]
    pub product_id: Option<String>,
}

/// Order accepted by the matching engine; nothing rests yet, but the
/// sequence number is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedMessage {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub sequence: Option<u64>,
}

/// Stop order activation; sequence-bearing, no resting-book effect.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateMessage {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub sequence: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatMessage {
    pub sequence: u64,
    #[serde(default)]
    pub last_trade_id: Option<u64>,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionsMessage {
    #[serde(default)]
    pub channels: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl FeedMessage {
    /// Sequence stamp, for the kinds that carry one.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            FeedMessage::Open(m) => Some(m.sequence),
            FeedMessage::Done(m) => Some(m.sequence),
            FeedMessage::Match(m) => Some(m.sequence),
            FeedMessage::Change(m) => Some(m.sequence),
            FeedMessage::Received(m) => m.sequence,
            FeedMessage::Activate(m) => m.sequence,
            FeedMessage::Heartbeat(m) => Some(m.sequence),
            _ => None,
        }
    }

    /// Normalizes into the engine's event type. `None` for administrative
    /// frames the book must not sequence (heartbeats arrive on their own
    /// cadence and would read as gaps).
    pub fn into_book_event(self) -> Option<BookEvent> {
        match self {
            FeedMessage::Open(m) => Some(BookEvent {
                sequence: m.sequence,
                kind: EventKind::Open {
                    side: m.side,
                    order: RestingOrder {
                        id: m.order_id,
                        price: m.price,
                        size: m.remaining_size,
                    },
                },
            }),
            FeedMessage::Done(m) => Some(BookEvent {
                sequence: m.sequence,
                kind: EventKind::Done {
                    side: m.side,
                    price: m.price,
                    order_id: m.order_id,
                },
            }),
            FeedMessage::Match(m) => Some(BookEvent {
                sequence: m.sequence,
                kind: EventKind::Match(Trade {
                    maker_order_id: m.maker_order_id,
                    side: m.side,
                    price: m.price,
                    size: m.size,
                    trade_id: m.trade_id,
                }),
            }),
            FeedMessage::Change(m) => Some(BookEvent {
                sequence: m.sequence,
                kind: EventKind::Change {
                    side: m.side,
                    price: m.price,
                    order_id: m.order_id,
                    new_size: m.new_size,
                },
            }),
            FeedMessage::Received(m) => m.sequence.map(BookEvent::noop),
            FeedMessage::Activate(m) => m.sequence.map(BookEvent::noop),
            FeedMessage::Heartbeat(_)
            | FeedMessage::Subscriptions(_)
            | FeedMessage::Error(_)
            | FeedMessage::Unknown => None,
        }
    }
}

/// Level-3 book document from `GET /products/{id}/book?level=3`:
/// `{sequence, bids: [[price, size, order_id], …], asks: […]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookDocument {
    pub sequence: u64,
    pub bids: Vec<BookDocumentEntry>,
    pub asks: Vec<BookDocumentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookDocumentEntry(pub Decimal, pub Decimal, pub OrderId);

impl From<BookDocument> for DepthSnapshot {
    fn from(doc: BookDocument) -> Self {
        let orders = |entries: Vec<BookDocumentEntry>| {
            entries
                .into_iter()
                .map(|BookDocumentEntry(price, size, id)| RestingOrder { id, price, size })
                .collect()
        };

        DepthSnapshot {
            sequence: doc.sequence,
            bids: orders(doc.bids),
            asks: orders(doc.asks),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn deserialize_open() {
        let raw = r#"{"type":"open","time":"2024-11-09T08:19:27.028459Z","product_id":"BTC-USD","sequence":10,"order_id":"d50ec984-77a8-460a-b958-66f114b0de9b","price":"200.2","remaining_size":"1.00","side":"sell"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let FeedMessage::Open(open) = msg else {
            panic!("expected open, got {:?}", msg);
        };
        assert_eq!(open.order_id.as_str(), "d50ec984-77a8-460a-b958-66f114b0de9b");
        assert_eq!(open.side, Side::Sell);
        assert_eq!(open.price, d("200.2"));
        assert_eq!(open.remaining_size, d("1.00"));
        assert_eq!(open.sequence, 10);
        assert_eq!(open.product_id.as_deref(), Some("BTC-USD"));
    }

    #[test]
    fn open_accepts_alternate_key_names() {
        let raw = r#"{"type":"open","sequence":11,"id":"oid-1","price":"10.5","size":"0.25","side":"buy"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let FeedMessage::Open(open) = msg else {
            panic!("expected open");
        };
        assert_eq!(open.order_id.as_str(), "oid-1");
        assert_eq!(open.remaining_size, d("0.25"));
    }

    #[test]
    fn deserialize_done_without_price() {
        let raw = r#"{"type":"done","sequence":12,"order_id":"oid-2","side":"buy","reason":"filled"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let FeedMessage::Done(done) = msg else {
            panic!("expected done");
        };
        assert_eq!(done.price, None);
        assert_eq!(done.reason, Some(DoneReason::Filled));

        // Never rested: no book event mutation target
        let event = FeedMessage::Done(done).into_book_event().unwrap();
        assert!(matches!(event.kind, EventKind::Done { price: None, .. }));
    }

    #[test]
    fn deserialize_match() {
        let raw = r#"{"type":"match","trade_id":10,"sequence":50,"maker_order_id":"maker-1","taker_order_id":"taker-1","time":"2024-11-09T08:19:27.028459Z","product_id":"BTC-USD","size":"5.23512","price":"400.23","side":"sell"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let event = msg.into_book_event().unwrap();
        assert_eq!(event.sequence, 50);
        let EventKind::Match(trade) = event.kind else {
            panic!("expected match");
        };
        assert_eq!(trade.maker_order_id.as_str(), "maker-1");
        assert_eq!(trade.size, d("5.23512"));
        assert_eq!(trade.trade_id, Some(10));
    }

    #[test]
    fn deserialize_change() {
        let raw = r#"{"type":"change","sequence":80,"order_id":"oid-3","product_id":"BTC-USD","new_size":"5.23512","old_size":"12.234412","price":"400.23","side":"sell"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let event = msg.into_book_event().unwrap();
        let EventKind::Change {
            new_size, price, ..
        } = event.kind
        else {
            panic!("expected change");
        };
        assert_eq!(new_size, d("5.23512"));
        assert_eq!(price, Some(d("400.23")));
    }

    #[test]
    fn received_is_sequence_only() {
        let raw = r#"{"type":"received","sequence":30,"order_id":"oid-4","order_type":"limit","size":"1.34","price":"502.1","side":"buy"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();

        let event = msg.into_book_event().unwrap();
        assert_eq!(event.sequence, 30);
        assert_eq!(event.kind, EventKind::Noop);
    }

    #[test]
    fn administrative_frames_produce_no_event() {
        let heartbeat = r#"{"type":"heartbeat","sequence":90,"last_trade_id":20,"product_id":"BTC-USD","time":"2024-11-09T08:19:28.464459Z"}"#;
        let msg: FeedMessage = serde_json::from_str(heartbeat).unwrap();
        assert_eq!(msg.sequence(), Some(90));
        assert!(msg.into_book_event().is_none());

        let subscriptions = r#"{"type":"subscriptions","channels":[{"name":"full","product_ids":["BTC-USD"]}]}"#;
        let msg: FeedMessage = serde_json::from_str(subscriptions).unwrap();
        assert!(matches!(msg, FeedMessage::Subscriptions(_)));

        let error = r#"{"type":"error","message":"Failed to subscribe","reason":"unknown product"}"#;
        let FeedMessage::Error(err) = serde_json::from_str::<FeedMessage>(error).unwrap() else {
            panic!("expected error");
        };
        assert_eq!(err.message, "Failed to subscribe");
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let raw = r#"{"type":"status","products":[]}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, FeedMessage::Unknown));
        assert!(msg.into_book_event().is_none());
    }

    #[test]
    fn deserialize_book_document() {
        let raw = r#"{"sequence":3,"bids":[["295.96","4.39088265","3b0f1225-7f84-490b-a29f-0faef9de823a"]],"asks":[["295.97","25.23542881","da863862-25f4-4868-ac41-005d11ab0a5f"]]}"#;
        let doc: BookDocument = serde_json::from_str(raw).unwrap();
        let snapshot: DepthSnapshot = doc.into();

        assert_eq!(snapshot.sequence, 3);
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.bids[0].price, d("295.96"));
        assert_eq!(snapshot.bids[0].size, d("4.39088265"));
        assert_eq!(
            snapshot.asks[0].id.as_str(),
            "da863862-25f4-4868-ac41-005d11ab0a5f"
        );
    }
}
