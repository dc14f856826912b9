use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let product_id = std::env::args().nth(1).unwrap_or_else(|| "BTC-USD".into());

    let book = l3book::coinbase::Book::new(product_id.as_str());
    book.start();

    for _ in 0..12 {
        tokio::time::sleep(Duration::from_secs(5)).await;

        if !book.is_synced() {
            info!(%product_id, "waiting for sync");
            continue;
        }

        info!(
            %product_id,
            sequence = book.sequence().unwrap_or_default(),
            best_bid = %book.best_bid().map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            best_ask = %book.best_ask().map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            last_trade = %book
                .ticker()
                .map(|t| format!("{} @ {}", t.size, t.price))
                .unwrap_or_else(|| "-".into()),
            "top of book"
        );
    }

    book.close();
    Ok(())
}
