use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use l3book::l3_book::{BookEngine, BookEvent, DepthSnapshot, EventKind, RestingOrder, Side, Trade};
use rust_decimal::Decimal;

const LEVELS: u32 = 500;
const ORDERS_PER_LEVEL: u32 = 4;

fn seeded_engine() -> BookEngine {
    let mut bids = Vec::new();
    let mut asks = Vec::new();

    for level in 0..LEVELS {
        for slot in 0..ORDERS_PER_LEVEL {
            bids.push(RestingOrder {
                id: format!("bid-{}-{}", level, slot).into(),
                price: Decimal::new((1_000_000 - level as i64) * 100, 4),
                size: Decimal::ONE,
            });
            asks.push(RestingOrder {
                id: format!("ask-{}-{}", level, slot).into(),
                price: Decimal::new((1_000_001 + level as i64) * 100, 4),
                size: Decimal::ONE,
            });
        }
    }

    let mut engine = BookEngine::new();
    engine.load_snapshot(DepthSnapshot {
        sequence: 0,
        bids,
        asks,
    });
    engine
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");
    group.throughput(Throughput::Elements(1));

    group.bench_function("open_new_level", |b| {
        b.iter_batched(
            seeded_engine,
            |mut engine| {
                let event = BookEvent {
                    sequence: 1,
                    kind: EventKind::Open {
                        side: Side::Buy,
                        order: RestingOrder {
                            id: "fresh".into(),
                            price: Decimal::new(99, 2),
                            size: Decimal::ONE,
                        },
                    },
                };
                black_box(engine.apply(&event).unwrap());
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("match_head", |b| {
        b.iter_batched(
            seeded_engine,
            |mut engine| {
                let price = engine.best_bid().unwrap();
                let event = BookEvent {
                    sequence: 1,
                    kind: EventKind::Match(Trade {
                        maker_order_id: "bid-0-0".into(),
                        side: Side::Buy,
                        price,
                        size: Decimal::ONE,
                        trade_id: None,
                    }),
                };
                black_box(engine.apply(&event).unwrap());
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("done_mid_level", |b| {
        b.iter_batched(
            seeded_engine,
            |mut engine| {
                let price = engine.best_ask().unwrap();
                let event = BookEvent {
                    sequence: 1,
                    kind: EventKind::Done {
                        side: Side::Sell,
                        price: Some(price),
                        order_id: "ask-0-2".into(),
                    },
                };
                black_box(engine.apply(&event).unwrap());
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let engine = seeded_engine();
    let total = (LEVELS * ORDERS_PER_LEVEL * 2) as u64;

    let mut group = c.benchmark_group("materialize");
    group.throughput(Throughput::Elements(total));
    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(engine.snapshot().unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_apply, bench_snapshot);
criterion_main!(benches);
