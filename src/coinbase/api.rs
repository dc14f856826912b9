use super::types::BookDocument;

/// Read-only REST surface the book needs: one full-depth book fetch.
pub trait Rest {
    type Error: std::fmt::Debug + Send;

    fn get_order_book(
        &self,
        product_id: &str,
    ) -> impl std::future::Future<Output = Result<BookDocument, Self::Error>> + Send;
}

/// Coinbase Exchange public endpoints.
pub struct Exchange {
    rest_url: String,
    ws_url: String,
}

impl Exchange {
    pub fn new() -> Exchange {
        Exchange::with_urls(
            "https://api.exchange.coinbase.com",
            "wss://ws-feed.exchange.coinbase.com",
        )
    }

    /// Point at another deployment (sandbox, proxy, test server).
    pub fn with_urls(rest_url: impl Into<String>, ws_url: impl Into<String>) -> Exchange {
        Exchange {
            rest_url: rest_url.into(),
            ws_url: ws_url.into(),
        }
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange::new()
    }
}

impl Rest for Exchange {
    type Error = reqwest::Error;

    async fn get_order_book(&self, product_id: &str) -> Result<BookDocument, Self::Error> {
        let client = reqwest::Client::new();
        let url = format!("{}/products/{}/book", self.rest_url, product_id);

        // The exchange rejects requests without a User-Agent.
        let resp = client
            .get(&url)
            .query(&[("level", "3")])
            .header(reqwest::header::USER_AGENT, "l3book/0.1")
            .send()
            .await?
            .error_for_status()?;

        resp.json::<BookDocument>().await
    }
}
