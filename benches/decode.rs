use criterion::{Criterion, criterion_group, criterion_main};
use l3book::coinbase::FeedMessage;

fn match_json() -> String {
    r#"{"type":"match","trade_id":10,"sequence":50,"maker_order_id":"ac928c66-ca53-498f-9c13-a110027a60e8","taker_order_id":"132fb6ae-456b-4654-b4e0-d681ac05cea1","time":"2024-11-09T08:19:27.028459Z","product_id":"BTC-USD","size":"5.23512","price":"400.23","side":"sell"}"#
        .to_owned()
}

fn open_json() -> String {
    r#"{"type":"open","time":"2024-11-09T08:19:27.028459Z","product_id":"BTC-USD","sequence":10,"order_id":"d50ec984-77a8-460a-b958-66f114b0de9b","price":"200.2","remaining_size":"1.00","side":"sell"}"#
        .to_owned()
}

fn bench_feed_decode(c: &mut Criterion) {
    let open = open_json();
    let matched = match_json();

    let mut group = c.benchmark_group("serde_json");
    group.bench_function("open", |b| {
        b.iter(|| {
            let _: FeedMessage = serde_json::from_str(&open).unwrap();
        })
    });
    group.bench_function("match", |b| {
        b.iter(|| {
            let _: FeedMessage = serde_json::from_str(&matched).unwrap();
        })
    });
    group.finish();

    let open_bytes = open.as_bytes();
    let match_bytes = matched.as_bytes();

    let mut group = c.benchmark_group("simd_json");
    group.bench_function("open", |b| {
        b.iter_batched(
            || open_bytes.to_vec(),
            |mut data| {
                let _: FeedMessage = simd_json::from_slice(&mut data).unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.bench_function("match", |b| {
        b.iter_batched(
            || match_bytes.to_vec(),
            |mut data| {
                let _: FeedMessage = simd_json::from_slice(&mut data).unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_feed_decode);
criterion_main!(benches);
