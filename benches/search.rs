use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use firstaid_rag::embeddings::{Embedder, HashEmbedder};
use firstaid_rag::index::FlatIndex;
use std::hint::black_box;

const CONDITIONS: [&str; 8] = [
    "burn", "cut", "nosebleed", "choking", "sprain", "fracture", "bee sting", "fainting",
];

fn synthetic_corpus(units: usize) -> Vec<String> {
    (0..units)
        .map(|i| {
            format!(
                "Guideline {} for {}: keep the casualty calm, check breathing and call for help if needed.",
                i,
                CONDITIONS[i % CONDITIONS.len()]
            )
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let embedder = HashEmbedder::new(384);
    let mut group = c.benchmark_group("flat_search");

    for units in [1_000, 10_000] {
        let corpus = synthetic_corpus(units);
        let embeddings = embedder.embed(&corpus).expect("corpus embeds");
        let index = FlatIndex::build(&embeddings).expect("index builds");
        let query = embedder
            .embed_one("What do I do for a bad burn?")
            .expect("query embeds");

        group.bench_with_input(BenchmarkId::from_parameter(units), &index, |b, index| {
            b.iter(|| index.search(black_box(query.as_slice()), black_box(3)));
        });
    }
    group.finish();

    let batch = synthetic_corpus(64);
    c.bench_function("hash_embed_batch_64", |b| {
        b.iter(|| embedder.embed(black_box(&batch)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
