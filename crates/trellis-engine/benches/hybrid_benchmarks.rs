//! Benchmarks for hybrid search over a synthetic graph.
//!
//! Each node links to its next two neighbours, so a depth-2 traversal reaches
//! a handful of nodes while the vector side scores the whole index.
//! `BENCH_FULL_SCALE=1` raises the node count from 1,000 to 100,000.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use trellis_core::types::Metadata;
use trellis_engine::{HybridQuery, RetrievalEngine};
use trellis_vector::embedding::{EmbeddingService, MockEmbedding};

const CI_NODE_COUNT: usize = 1_000;
const FULL_SCALE_NODE_COUNT: usize = 100_000;

fn node_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_NODE_COUNT
    } else {
        CI_NODE_COUNT
    }
}

fn build_engine(count: usize, embedder: &MockEmbedding) -> RetrievalEngine {
    let engine = RetrievalEngine::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    rt.block_on(async {
        for i in 0..count {
            let text = format!("Entity {} in a synthetic knowledge graph", i);
            let vector = embedder.embed(&text).await.expect("embed");
            engine
                .create_node_with_embedding(format!("entity-{}", i), text, Metadata::new(), vector)
                .expect("insert");
        }
    });
    for id in 1..=count as u64 {
        for step in 1..=2 {
            let target = (id + step - 1) % count as u64 + 1;
            engine
                .create_edge(id, target, "next".into(), 1.0)
                .expect("edge");
        }
    }
    engine
}

fn bench_hybrid_search(c: &mut Criterion) {
    let count = node_count();
    let embedder = MockEmbedding::new();
    let engine = build_engine(count, &embedder);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");
    let query = rt
        .block_on(embedder.embed("an entity somewhere in the graph"))
        .expect("embed query");

    let mut group = c.benchmark_group("hybrid_search");
    group.measurement_time(Duration::from_secs(10));

    let anchored = HybridQuery::new(query.clone()).start(1).k(10);
    group.bench_function(format!("anchored_top10_{}_nodes", count), |b| {
        b.iter(|| engine.hybrid_search(&anchored).expect("search"))
    });

    let auto = HybridQuery::new(query).k(10);
    group.bench_function(format!("auto_anchor_top10_{}_nodes", count), |b| {
        b.iter(|| engine.hybrid_search(&auto).expect("search"))
    });

    group.finish();
}

criterion_group!(benches, bench_hybrid_search);
criterion_main!(benches);
