use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Exchange-assigned order identifier. Opaque, unique across the whole book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(val: &str) -> Self {
        OrderId(val.to_owned())
    }
}

impl From<String> for OrderId {
    fn from(val: String) -> Self {
        OrderId(val)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// One resting order. Side is implied by the map the enclosing level lives in;
/// price never changes for a given id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingOrder {
    pub id: OrderId,
    pub price: Decimal,
    pub size: Decimal,
}

/// Most recent match observed on the feed. Overwritten, never accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
    pub sequence: u64,
    pub trade_id: Option<u64>,
}

/// A match event: `maker_order_id` is the resting order consumed at `price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub maker_order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub trade_id: Option<u64>,
}

/// One normalized book-affecting event, already stripped of wire-format
/// quirks (alternate key names, string prices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEvent {
    pub sequence: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Open {
        side: Side,
        order: RestingOrder,
    },
    /// A done without a price never rested and is a no-op.
    Done {
        side: Side,
        price: Option<Decimal>,
        order_id: OrderId,
    },
    Match(Trade),
    /// Size overwrite. A change without a price targets a funds-backed order
    /// that never rested and is a no-op.
    Change {
        side: Side,
        price: Option<Decimal>,
        order_id: OrderId,
        new_size: Decimal,
    },
    /// Sequence-bearing event with no book effect (`received`, `activate`).
    /// Advances the cursor and nothing else.
    Noop,
}

impl BookEvent {
    pub fn noop(sequence: u64) -> Self {
        BookEvent {
            sequence,
            kind: EventKind::Noop,
        }
    }
}

/// Full-depth, sequence-stamped snapshot as returned by a snapshot provider,
/// already normalized into resting orders per side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthSnapshot {
    pub sequence: u64,
    pub bids: Vec<RestingOrder>,
    pub asks: Vec<RestingOrder>,
}

/// Materialized copy of the live book handed to readers. `bids` are emitted
/// best-first (descending price), `asks` ascending, FIFO order within a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSnapshot {
    pub sequence: u64,
    pub bids: Vec<BookEntry>,
    pub asks: Vec<BookEntry>,
}

/// `[price, size, order_id]`, flattened in price-then-time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry(pub Decimal, pub Decimal, pub OrderId);

/// Result of a successfully handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Event was next in sequence and its mutation took effect.
    Applied,
    /// Stale or duplicate delivery; dropped without touching book or cursor.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Apply was called before any snapshot was loaded.
    #[error("book is not synced yet")]
    NotSynced,
    /// The event leaves a hole after the cursor. Resolved by full resync,
    /// never by partial repair.
    #[error("sequence gap: cursor at {cursor}, event at {sequence}")]
    SequenceGap { cursor: u64, sequence: u64 },
    /// A match named a maker that is not at the head of its FIFO. The book
    /// has diverged from exchange truth.
    #[error("maker {maker_id} is not at the head of the {side:?} level at {price} (head is {head_id})")]
    HeadMismatch {
        side: Side,
        price: Decimal,
        maker_id: OrderId,
        head_id: OrderId,
    },
}
