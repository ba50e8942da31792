//! Recognition benchmarks
//!
//! Run with: cargo bench

use clinrec::index::DictionaryIndex;
use clinrec::recognizer::{MatchEngine, PoolStrategy, Recognizer, RecognizerPool};
use clinrec::server::protocol::{parse_request, Request};
use clinrec::utils::{
    normalize, tokenize, Analyzer, StemLanguage, StemPipeline, WordList,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

const NOTE: &str = "Patient de 67 ans admis pour douleur thoracique intense irradiant \
dans le bras gauche, sans fièvre. Antécédents d'insuffisance cardiaque et de diabète \
de type 2. Pas de douleur chronique rapportée. Examen cardio circulatoire normal, \
tension artérielle à 14/9. Ni toux ni dyspnée. Fièvre jaune vaccinée en 2015.";

const LABELS: &[&str] = &[
    "douleur thoracique",
    "douleur chronique",
    "cardio circulatoire",
    "insuffisance cardiaque",
    "insuffisance renale aigue",
    "fievre",
    "fievre jaune",
    "diabete de type 2",
    "diabete",
    "tension arterielle",
    "hypertension arterielle",
    "toux",
    "dyspnee",
    "bras gauche",
];

fn analyzer() -> Arc<Analyzer> {
    Arc::new(Analyzer::new(
        StemPipeline::for_language(StemLanguage::French, 2),
        WordList::french_stopwords(),
        WordList::french_termination_terms(),
    ))
}

/// The fixed labels plus `extra` synthetic concepts sharing their vocabulary
fn dictionary(extra: usize) -> Arc<DictionaryIndex> {
    let mut lines: Vec<String> = LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}\t{label}", i + 1))
        .collect();
    for i in 0..extra {
        let a = LABELS[i % LABELS.len()];
        let b = LABELS[(i / LABELS.len()) % LABELS.len()];
        lines.push(format!("{}\t{a} {b} variante{i}", LABELS.len() + i + 1));
    }
    let index = DictionaryIndex::build(lines.iter().map(String::as_str), analyzer())
        .expect("Failed to build dictionary");
    Arc::new(index)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Bytes(NOTE.len() as u64));
    group.bench_function("clinical_note", |b| {
        b.iter(|| tokenize(&normalize(black_box(NOTE))))
    });
    group.finish();
}

fn bench_recognize(c: &mut Criterion) {
    let mut group = c.benchmark_group("recognize");
    group.throughput(Throughput::Bytes(NOTE.len() as u64));
    for extra in [0, 1_000, 50_000] {
        let mut engine = MatchEngine::new(dictionary(extra));
        group.bench_with_input(BenchmarkId::new("concepts", extra), &NOTE, |b, &text| {
            b.iter(|| engine.recognize(black_box(text)))
        });
    }
    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let index = dictionary(1_000);
    let mut group = c.benchmark_group("pool");
    for strategy in [PoolStrategy::Pooled, PoolStrategy::Shared] {
        let pool = RecognizerPool::for_index(index.clone(), strategy, 4);
        group.bench_function(format!("{strategy:?}"), |b| {
            b.iter(|| pool.recognize(black_box(NOTE)))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("dictionary_build");
    group.sample_size(10);
    group.bench_function("10k_concepts", |b| b.iter(|| dictionary(10_000)));
    group.finish();
}

fn bench_parse_request(c: &mut Criterion) {
    let line = format!("ANN{NOTE}");
    c.bench_function("parse_request", |b| {
        b.iter(|| match parse_request(black_box(&line)) {
            Request::Annotate(text) => text.len(),
            _ => 0,
        })
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_recognize,
    bench_pool,
    bench_build,
    bench_parse_request,
);
criterion_main!(benches);
