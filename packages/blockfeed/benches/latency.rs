//! Latency benchmarks for the block feed pipeline
//!
//! Covers the per-tick hot path: classifying transactions, prepending a
//! block's batch to a full feed, and serializing a snapshot.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockfeed::classifier::{classify, classify_hex};
use blockfeed::feed::FeedBuffer;
use blockfeed::ClassifiedTransaction;

fn entry(block_number: u64, index: u8) -> ClassifiedTransaction {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&block_number.to_be_bytes());
    hash[31] = index;
    ClassifiedTransaction {
        hash: TxHash::from(hash),
        from: Address::repeat_byte(0x11),
        to: Some(Address::repeat_byte(0x22)),
        value: U256::from(1_000_000_000_000_000_000u64),
        input: Bytes::from(vec![0x38, 0xed, 0x17, 0x39, 0x00, 0x00]),
        block_number,
        timestamp_millis: 1_703_000_000_000,
    }
}

/// Benchmark selector classification
fn bench_classify(c: &mut Criterion) {
    let to = Address::repeat_byte(0x22);
    let input = [0x38, 0xed, 0x17, 0x39, 0x00, 0x00, 0x00, 0x00];

    c.bench_function("classify", |b| {
        b.iter(|| black_box(classify(black_box(Some(&to)), black_box(&input))))
    });

    let input_hex = "0xa9059cbb000000000000000000000000f39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    c.bench_function("classify_hex", |b| {
        b.iter(|| black_box(classify_hex(black_box(Some(&to)), black_box(input_hex))))
    });
}

/// Benchmark prepending a 150-tx block onto a full feed
fn bench_insert_batch(c: &mut Criterion) {
    let mut feed = FeedBuffer::default();
    feed.insert_batch((0..50).map(|i| entry(1, i)).collect());
    let batch: Vec<ClassifiedTransaction> = (0..150).map(|i| entry(2, i as u8)).collect();

    c.bench_function("insert_batch_full_feed", |b| {
        b.iter_batched(
            || (feed.clone(), batch.clone()),
            |(mut feed, batch)| {
                feed.insert_batch(batch);
                black_box(feed.len())
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

/// Benchmark JSON serialization of a full feed
fn bench_snapshot_json(c: &mut Criterion) {
    let entries: Vec<ClassifiedTransaction> = (0..50).map(|i| entry(100 + i / 10, i as u8)).collect();
    let messages: Vec<blockfeed::FeedEntryMessage> = entries.iter().map(Into::into).collect();

    c.bench_function("feed_json", |b| {
        b.iter(|| black_box(serde_json::to_string(black_box(&messages)).unwrap()))
    });
}

criterion_group!(benches, bench_classify, bench_insert_batch, bench_snapshot_json);
criterion_main!(benches);
