//! Benchmarks for document chunking and owner-filtered search.
//!
//! Uses the in-memory vector database and mock embeddings, so the numbers
//! reflect pipeline overhead rather than network latency. Set
//! `BENCH_FULL_SCALE=1` to populate 20,000 chunks instead of 1,000:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p docmind-vector
//! ```

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use docmind_core::types::{DocumentId, OwnerId};
use docmind_vector::{
    DocumentChunker, EmbeddingProvider, InMemoryVectorDatabase, IngestionPipeline,
    MockEmbeddingClient, QueryPipeline, VectorIndex,
};

const DIMS: usize = 384;
const CI_CHUNK_COUNT: usize = 1_000;
const FULL_SCALE_CHUNK_COUNT: usize = 20_000;
const OWNERS: usize = 10;

fn chunk_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_CHUNK_COUNT
    } else {
        CI_CHUNK_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn document_text(index: usize) -> String {
    format!(
        "Quarterly planning notes. The team reviewed the roadmap, agreed on \
         hiring priorities and moved the storage migration to the next cycle. \
         Action items were assigned to each owner with deadlines. Document {}",
        index
    )
}

fn bench_chunking(c: &mut Criterion) {
    let chunker = DocumentChunker::default();
    let mut group = c.benchmark_group("chunking");

    for size in [1_000usize, 50_000, 500_000] {
        let text: String = document_text(0).chars().cycle().take(size).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| chunker.split(text));
        });
    }

    group.finish();
}

/// Ingest `count` single-chunk documents spread across `OWNERS` owners.
fn build_populated(rt: &tokio::runtime::Runtime, count: usize) -> QueryPipeline {
    let provider = EmbeddingProvider::new(Arc::new(MockEmbeddingClient::new(DIMS)), "mock", DIMS);
    let index = Arc::new(VectorIndex::new(
        Arc::new(InMemoryVectorDatabase::new()),
        provider,
        "bench",
    ));
    let ingest = IngestionPipeline::new(DocumentChunker::default(), index.clone());

    for i in 0..count {
        let owner = OwnerId::new(format!("owner-{}", i % OWNERS)).expect("owner id");
        let doc = DocumentId::new(format!("doc-{i}")).expect("document id");
        rt.block_on(ingest.add_document(&doc, &owner, &document_text(i)))
            .expect("ingest failed");
    }

    QueryPipeline::new(index, 10)
}

fn bench_owner_search(c: &mut Criterion) {
    let rt = runtime();
    let count = chunk_count();
    let query = build_populated(&rt, count);
    let owner = OwnerId::new("owner-3").expect("owner id");

    let mut group = c.benchmark_group("owner_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("top10_{}chunks", count), |b| {
        b.iter(|| {
            let hits = rt
                .block_on(query.search("storage migration roadmap", &owner))
                .expect("search failed");
            assert!(!hits.is_empty(), "Search should return results");
            hits
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chunking, bench_owner_search);
criterion_main!(benches);
