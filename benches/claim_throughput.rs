use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use http::{HeaderMap, HeaderValue, Method};
use idempotency_gate::{
    IdempotencyGate, IdempotencyToken, KeyStore, MemoryKeyStore, NoopTracer, SpanTracer,
    GateConfig, IDEMPOTENCY_KEY_HEADER,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(180);

fn headers(key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_str(key).unwrap());
    headers
}

/// Benchmark token parsing and fingerprinting
fn bench_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("token");

    group.bench_function("parse", |b| {
        b.iter(|| IdempotencyToken::parse(black_box("  7c0e7d4a-5f1b-4f6e-9d6b-2b8a1e3c9f00 ")))
    });

    let token = IdempotencyToken::parse("7c0e7d4a-5f1b-4f6e-9d6b-2b8a1e3c9f00").unwrap();
    group.bench_function("fingerprint", |b| b.iter(|| black_box(&token).fingerprint()));

    group.finish();
}

/// Benchmark in-memory claims: fresh keys versus repeated duplicates
fn bench_memory_claims(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_store");
    group.throughput(Throughput::Elements(1));

    let store = MemoryKeyStore::new();
    let counter = AtomicU64::new(0);
    group.bench_function("fresh_claim", |b| {
        b.iter(|| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            let token = IdempotencyToken::parse(&format!("fresh-{}", n)).unwrap();
            store.claim(black_box(&token), TTL)
        })
    });

    let store = MemoryKeyStore::new();
    let token = IdempotencyToken::parse("repeated").unwrap();
    store.claim(&token, TTL);
    group.bench_function("duplicate_claim", |b| {
        b.iter(|| store.claim(black_box(&token), TTL))
    });

    group.finish();
}

/// Benchmark concurrent claims against one shared store
fn bench_concurrent_claims(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_claims");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let store = MemoryKeyStore::new();
                    let handles: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let store = store.clone();
                            std::thread::spawn(move || {
                                for i in 0..1000 {
                                    let token =
                                        IdempotencyToken::parse(&format!("key-{}", i % 100))
                                            .unwrap();
                                    black_box(store.claim(&token, TTL));
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark full gate decisions, with and without spans
fn bench_gate_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_decide");
    let rt = tokio::runtime::Runtime::new().unwrap();

    let gate = Arc::new(
        IdempotencyGate::new(MemoryKeyStore::new(), NoopTracer, GateConfig::default()).unwrap(),
    );
    let get_headers = headers("abc");
    group.bench_function("bypass_get", |b| {
        b.to_async(&rt)
            .iter(|| async { gate.decide(&Method::GET, black_box(&get_headers)).await })
    });

    let no_key = HeaderMap::new();
    group.bench_function("unprotected_post", |b| {
        b.to_async(&rt)
            .iter(|| async { gate.decide(&Method::POST, black_box(&no_key)).await })
    });

    let dup_headers = headers("duplicate");
    rt.block_on(gate.decide(&Method::POST, &dup_headers));
    group.bench_function("duplicate_post", |b| {
        b.to_async(&rt)
            .iter(|| async { gate.decide(&Method::POST, black_box(&dup_headers)).await })
    });

    let traced = Arc::new(
        IdempotencyGate::new(MemoryKeyStore::new(), SpanTracer::new(), GateConfig::default())
            .unwrap(),
    );
    rt.block_on(traced.decide(&Method::POST, &dup_headers));
    group.bench_function("duplicate_post_span_tracer", |b| {
        b.to_async(&rt)
            .iter(|| async { traced.decide(&Method::POST, black_box(&dup_headers)).await })
    });

    let token = IdempotencyToken::parse("duplicate").unwrap();
    group.bench_function("store_try_claim", |b| {
        b.to_async(&rt)
            .iter(|| async { gate.store().try_claim(black_box(&token), TTL).await })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_token,
    bench_memory_claims,
    bench_concurrent_claims,
    bench_gate_decide
);
criterion_main!(benches);
