use super::level::PriceLevel;
use super::types::{
    Applied, BookEntry, BookError, BookEvent, BookSnapshot, DepthSnapshot, EventKind, OrderId,
    RestingOrder, Side, Ticker, Trade,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The live order book for one product: two price-ordered maps of FIFO
/// levels, the sequence cursor, and the latest match.
///
/// The engine is a plain single-threaded structure; it neither locks nor
/// spawns. Exactly one writer applies events, and readers only ever receive
/// materialized copies (see [`super::sync::LiveBook`]).
pub struct BookEngine {
    bids: BTreeMap<Decimal, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    sequence: Option<u64>,
    ticker: Option<Ticker>,
}

impl BookEngine {
    pub fn new() -> BookEngine {
        BookEngine {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            sequence: None,
            ticker: None,
        }
    }

    /// Drops all state: maps cleared, cursor back to the uninitialized
    /// sentinel, ticker cleared. Every resync starts here.
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.sequence = None;
        self.ticker = None;
    }

    pub fn is_synced(&self) -> bool {
        self.sequence.is_some()
    }

    /// Last fully-applied sequence, if any snapshot has been loaded.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.ticker.as_ref()
    }

    /// Replaces the book with a full-depth snapshot and moves the cursor to
    /// its sequence stamp.
    pub fn load_snapshot(&mut self, snapshot: DepthSnapshot) {
        self.bids.clear();
        self.asks.clear();
        for order in snapshot.bids {
            self.add(Side::Buy, order);
        }
        for order in snapshot.asks {
            self.add(Side::Sell, order);
        }
        self.sequence = Some(snapshot.sequence);
    }

    /// Runs one event through the sequencing protocol and, if it is next in
    /// line, applies its mutation and advances the cursor.
    ///
    /// Stale events leave the cursor untouched. A gap applies nothing and
    /// must be resolved by the caller with a full resync. [`BookError::HeadMismatch`]
    /// means the book no longer reflects exchange truth.
    pub fn apply(&mut self, event: &BookEvent) -> Result<Applied, BookError> {
        let cursor = self.sequence.ok_or(BookError::NotSynced)?;

        if event.sequence <= cursor {
            return Ok(Applied::Stale);
        }
        if event.sequence > cursor + 1 {
            return Err(BookError::SequenceGap {
                cursor,
                sequence: event.sequence,
            });
        }

        match &event.kind {
            EventKind::Open { side, order } => self.add(*side, order.clone()),
            EventKind::Done {
                side,
                price,
                order_id,
            } => {
                // Price absent: the order never rested.
                if let Some(price) = price {
                    self.remove(*side, *price, order_id);
                }
            }
            EventKind::Match(trade) => {
                self.match_order(trade)?;
                self.ticker = Some(Ticker {
                    price: trade.price,
                    size: trade.size,
                    side: trade.side,
                    sequence: event.sequence,
                    trade_id: trade.trade_id,
                });
            }
            EventKind::Change {
                side,
                price,
                order_id,
                new_size,
            } => {
                if let Some(price) = price {
                    self.change(*side, *price, order_id, *new_size);
                }
            }
            EventKind::Noop => {}
        }

        self.sequence = Some(event.sequence);
        Ok(Applied::Applied)
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn add(&mut self, side: Side, order: RestingOrder) {
        self.side_mut(side)
            .entry(order.price)
            .or_default()
            .push_back(order);
    }

    /// Idempotent: a done for an absent level or id leaves the book as is.
    fn remove(&mut self, side: Side, price: Decimal, order_id: &OrderId) {
        let levels = self.side_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            level.remove(order_id);
            if level.is_empty() {
                levels.remove(&price);
            }
        }
    }

    /// Consumes `trade.size` from the FIFO head at (side, price). The maker
    /// must be the head order; anything else is corruption, reported, never
    /// panicked on.
    fn match_order(&mut self, trade: &Trade) -> Result<(), BookError> {
        let levels = self.side_mut(trade.side);
        let Some(level) = levels.get_mut(&trade.price) else {
            return Ok(());
        };
        let Some(head) = level.front() else {
            return Ok(());
        };

        if head.id != trade.maker_order_id {
            return Err(BookError::HeadMismatch {
                side: trade.side,
                price: trade.price,
                maker_id: trade.maker_order_id.clone(),
                head_id: head.id.clone(),
            });
        }

        if head.size <= trade.size {
            level.pop_front();
            if level.is_empty() {
                levels.remove(&trade.price);
            }
        } else {
            level.reduce_front(trade.size);
        }
        Ok(())
    }

    /// Overwrites the size of a resting order. No-op if the order is already
    /// gone. Price moves arrive as cancel + open, never as a change.
    fn change(&mut self, side: Side, price: Decimal, order_id: &OrderId, new_size: Decimal) {
        if let Some(level) = self.side_mut(side).get_mut(&price) {
            level.set_size(order_id, new_size);
        }
    }

    /// Highest bid price, or `None` for an empty side.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask price, or `None` for an empty side.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Immutable materialized view: bids best-first, asks ascending, FIFO
    /// order within each level. `None` until a snapshot has been loaded.
    pub fn snapshot(&self) -> Option<BookSnapshot> {
        let sequence = self.sequence?;

        let flatten = |level: &PriceLevel, out: &mut Vec<BookEntry>| {
            for order in level.iter() {
                out.push(BookEntry(order.price, order.size, order.id.clone()));
            }
        };

        let mut bids = Vec::new();
        for level in self.bids.values().rev() {
            flatten(level, &mut bids);
        }
        let mut asks = Vec::new();
        for level in self.asks.values() {
            flatten(level, &mut asks);
        }

        Some(BookSnapshot {
            sequence,
            bids,
            asks,
        })
    }
}

impl Default for BookEngine {
    fn default() -> Self {
        Self::new()
    }
}
