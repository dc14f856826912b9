use super::api::{Exchange, Rest};
use crate::feed::{ChannelMode, FeedConfig};
use crate::l3_book::sync::{LiveBook, SnapshotFetcher};
use crate::l3_book::types::DepthSnapshot;

/// Adapts the REST book document into the engine's snapshot type.
pub struct ExchangeFetcher<A = Exchange> {
    api: A,
}

impl<A> ExchangeFetcher<A> {
    pub fn new(api: A) -> Self {
        ExchangeFetcher { api }
    }
}

impl<A: Rest + Send + Sync + 'static> SnapshotFetcher for ExchangeFetcher<A> {
    type Error = A::Error;

    async fn fetch_snapshot(&self, product_id: &str) -> Result<DepthSnapshot, Self::Error> {
        let doc = self.api.get_order_book(product_id).await?;
        Ok(doc.into())
    }
}

pub struct Book;

impl Book {
    /// A live book for one product against the public exchange endpoints.
    /// Call `start()` on the result to begin synchronizing.
    pub fn new(product_id: impl Into<String>) -> LiveBook<ExchangeFetcher<Exchange>> {
        let api = Exchange::new();
        let product_id = product_id.into();
        let config = FeedConfig {
            url: api.ws_url().to_owned(),
            products: vec![product_id.clone()],
            mode: ChannelMode::Subscribe,
        };
        LiveBook::with_config(config, product_id, ExchangeFetcher::new(api))
    }
}
