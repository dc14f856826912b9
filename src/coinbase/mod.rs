pub mod api;
pub mod book;
pub mod types;

pub use api::{Exchange, Rest};
pub use book::{Book, ExchangeFetcher};
pub use types::{
    ActivateMessage, BookDocument, BookDocumentEntry, ChangeMessage, DoneMessage, DoneReason,
    ErrorMessage, FeedMessage, HeartbeatMessage, MatchMessage, OpenMessage, ReceivedMessage,
    SubscriptionsMessage,
};
