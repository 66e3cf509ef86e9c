//! Criterion benchmarks for the spimi indexer.
//!
//! Covers the postings merge primitives, block building, both block merge
//! strategies and boolean query evaluation.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use spimi::block::{BlockBuilder, BlockBuilderConfig, MemoryBudget};
use spimi::document::DocumentRecord;
use spimi::merge::{BlockMerger, MergeConfig, MergeStrategy};
use spimi::postings::{intersect_set, merge_sorted, union_set};
use spimi::query::QueryEngine;
use spimi::storage::MemoryStorage;
use std::hint::black_box;
use std::sync::Arc;

const WORDS: &[&str] = &[
    "search", "engine", "full", "text", "index", "query", "document", "field", "term", "phrase",
    "boolean", "block", "merge", "posting", "dictionary", "analysis", "tokenization", "stemming",
    "normalization", "memory", "storage", "retrieval", "ranking", "filtering", "reuters", "honda",
    "car", "irs", "stc", "oil", "trade", "grain",
];

/// Generate tokenized records for benchmarking.
fn generate_records(count: usize) -> Vec<DocumentRecord> {
    (0..count)
        .map(|i| {
            let doc_length = 50 + (i % 100); // Variable length documents
            let terms = (0..doc_length).map(|j| {
                let word = WORDS[(i * 7 + j * 13) % WORDS.len()]; // Pseudo-random distribution
                format!("{word}{}", (i + j) % 50)
            });
            DocumentRecord::new(i as u64, terms)
        })
        .collect()
}

/// Ascending ids with duplicates, every `step`-th value.
fn generate_postings(len: usize, step: u64) -> Vec<u64> {
    (0..len as u64).map(|i| (i / 2) * step).collect()
}

/// Build blocks of `records_per_block` records into a fresh memory storage.
fn build_blocks(records: &[DocumentRecord], records_per_block: usize) -> (Arc<MemoryStorage>, u32) {
    let storage = Arc::new(MemoryStorage::new_default());
    let config = BlockBuilderConfig {
        budget: MemoryBudget::Records(records_per_block),
        ..Default::default()
    };
    let mut builder = BlockBuilder::new(storage.clone(), config).unwrap();
    builder.invert_all(records.iter().cloned()).unwrap();
    let blocks = builder.blocks_written();
    (storage, blocks)
}

/// Benchmark the postings merge primitives.
fn bench_postings(c: &mut Criterion) {
    let mut group = c.benchmark_group("postings");

    for len in [1_000usize, 100_000] {
        let a = generate_postings(len, 3);
        let b = generate_postings(len, 5);
        group.throughput(Throughput::Elements(2 * len as u64));

        group.bench_with_input(BenchmarkId::new("merge_sorted", len), &len, |bench, _| {
            bench.iter(|| black_box(merge_sorted(black_box(&a), black_box(&b))))
        });
        group.bench_with_input(BenchmarkId::new("intersect_set", len), &len, |bench, _| {
            bench.iter(|| black_box(intersect_set(black_box(&a), black_box(&b))))
        });
        group.bench_with_input(BenchmarkId::new("union_set", len), &len, |bench, _| {
            bench.iter(|| black_box(union_set(black_box(&a), black_box(&b))))
        });
    }

    group.finish();
}

/// Benchmark block building under different budgets.
fn bench_block_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_building");
    group.sample_size(20);

    let records = generate_records(2_000);
    group.throughput(Throughput::Elements(records.len() as u64));

    for records_per_block in [100usize, 1_000] {
        group.bench_with_input(
            BenchmarkId::new("records_budget", records_per_block),
            &records_per_block,
            |b, &n| b.iter(|| black_box(build_blocks(&records, n))),
        );
    }

    group.finish();
}

/// Benchmark both merge strategies over the same blocks.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.sample_size(20);

    let records = generate_records(2_000);
    let (storage, blocks) = build_blocks(&records, 100);

    for (label, strategy) in [("fold", MergeStrategy::PairwiseFold), ("kway", MergeStrategy::KWay)] {
        let config = MergeConfig {
            strategy,
            ..Default::default()
        };
        let merger = BlockMerger::new(storage.clone(), config).unwrap();
        group.bench_function(label, |b| {
            b.iter(|| black_box(merger.merge_numbered("block", blocks).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark boolean queries on a merged dictionary.
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let records = generate_records(2_000);
    let (storage, blocks) = build_blocks(&records, 500);
    BlockMerger::new(storage.clone(), MergeConfig::default())
        .unwrap()
        .merge_numbered("block", blocks)
        .unwrap();
    let engine = QueryEngine::open(&*storage, "dictionary.txt").unwrap();

    group.bench_function("keyword", |b| b.iter(|| black_box(engine.keyword(black_box("honda7")))));
    group.bench_function("and", |b| {
        b.iter(|| black_box(engine.and(black_box("honda7 AND car8 AND irs9"))))
    });
    group.bench_function("or", |b| {
        b.iter(|| black_box(engine.or(black_box("honda7 OR car8 OR irs9 OR missing"))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_postings,
    bench_block_building,
    bench_merge,
    bench_queries
);

criterion_main!(benches);
