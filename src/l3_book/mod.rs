pub mod engine;
pub mod level;
pub mod sync;
pub mod types;

pub use engine::BookEngine;
pub use level::PriceLevel;
pub use sync::{LiveBook, SnapshotFetcher};
pub use types::{
    Applied, BookEntry, BookError, BookEvent, BookSnapshot, DepthSnapshot, EventKind, OrderId,
    RestingOrder, Side, Ticker, Trade,
};
