//! End-to-end gate behavior through the tower layer, against the in-memory
//! store with a controllable clock.

use http::{Method, Request, Response, StatusCode};
use idempotency_gate::infrastructure::mocks::{MockClock, ScriptedKeyStore};
use idempotency_gate::{
    IdempotencyLayer, KeyStore, MemoryKeyStore, IDEMPOTENCY_KEY_HEADER,
};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::util::BoxCloneService;
use tower::{service_fn, Layer, ServiceExt};

type Handler = BoxCloneService<Request<String>, Response<String>, Infallible>;

fn handler(calls: Arc<AtomicUsize>) -> Handler {
    BoxCloneService::new(service_fn(move |req: Request<String>| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Response::new(format!("handled {}", req.method())))
        }
    }))
}

fn request(method: Method, key: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri("/payments");
    if let Some(key) = key {
        builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
    }
    builder.body(String::new()).unwrap()
}

async fn send<K: KeyStore>(
    layer: &IdempotencyLayer<K>,
    calls: &Arc<AtomicUsize>,
    req: Request<String>,
) -> Response<String> {
    layer
        .layer(handler(Arc::clone(calls)))
        .oneshot(req)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_retry_window_scenario() {
    let clock = MockClock::new(Instant::now());
    let store = MemoryKeyStore::with_clock(Arc::new(clock.clone()));
    let layer = IdempotencyLayer::builder(store)
        .with_claim_ttl(Duration::from_secs(180))
        .build()
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    // Request 1: fresh key reaches the handler
    let first = send(&layer, &calls, request(Method::POST, Some("abc"))).await;
    assert_eq!(first.body(), "handled POST");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Request 2, ten seconds later: short-circuited
    clock.advance(Duration::from_secs(10));
    let second = send(&layer, &calls, request(Method::POST, Some("abc"))).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.body().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Request 3, 3m1s after the claim: the record has expired
    clock.advance(Duration::from_secs(171));
    let third = send(&layer, &calls, request(Method::POST, Some("abc"))).await;
    assert_eq!(third.body(), "handled POST");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let snapshot = layer.metrics().snapshot();
    assert_eq!(snapshot.claimed, 2);
    assert_eq!(snapshot.duplicates, 1);
}

#[tokio::test]
async fn test_read_only_methods_always_forwarded() {
    let store = ScriptedKeyStore::new();
    let layer = IdempotencyLayer::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
        for key in [None, Some("abc"), Some("abc")] {
            let response = send(&layer, &calls, request(method.clone(), key)).await;
            assert_eq!(response.body(), &format!("handled {}", method));
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 9);
    assert_eq!(store.claim_calls(), 0);
    assert_eq!(layer.metrics().bypassed(), 9);
}

#[tokio::test]
async fn test_post_without_key_skips_store() {
    let store = ScriptedKeyStore::new();
    let layer = IdempotencyLayer::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    send(&layer, &calls, request(Method::POST, None)).await;
    send(&layer, &calls, request(Method::POST, None)).await;
    send(&layer, &calls, request(Method::POST, Some(""))).await;
    send(&layer, &calls, request(Method::DELETE, Some("   "))).await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(store.claim_calls(), 0);
    assert_eq!(layer.metrics().unprotected(), 4);
}

#[tokio::test]
async fn test_fresh_key_invokes_handler_exactly_once() {
    let store = ScriptedKeyStore::new();
    let layer = IdempotencyLayer::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let response = send(&layer, &calls, request(Method::PUT, Some("order-42"))).await;

    assert_eq!(response.body(), "handled PUT");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.claim_calls(), 1);
}

#[tokio::test]
async fn test_claimed_key_short_circuits_every_mutating_method() {
    let layer = IdempotencyLayer::new(MemoryKeyStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    send(&layer, &calls, request(Method::POST, Some("shared"))).await;

    for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let response = send(&layer, &calls, request(method, Some("shared"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.metrics().duplicates(), 4);
}

#[tokio::test]
async fn test_distinct_keys_do_not_interfere() {
    let layer = IdempotencyLayer::new(MemoryKeyStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    for key in ["a", "b", "c"] {
        send(&layer, &calls, request(Method::POST, Some(key))).await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(layer.metrics().duplicates(), 0);
}

#[tokio::test]
async fn test_header_name_is_case_insensitive() {
    let layer = IdempotencyLayer::new(MemoryKeyStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let lower = Request::builder()
        .method(Method::POST)
        .header("idempotency-key", "abc")
        .body(String::new())
        .unwrap();
    let upper = Request::builder()
        .method(Method::POST)
        .header("IDEMPOTENCY-KEY", "abc")
        .body(String::new())
        .unwrap();

    send(&layer, &calls, lower).await;
    let response = send(&layer, &calls, upper).await;

    assert!(response.body().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_utf8_key_is_protected() {
    let layer = IdempotencyLayer::new(MemoryKeyStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = send(&layer, &calls, request(Method::POST, Some("заказ-1"))).await;
    let retry = send(&layer, &calls, request(Method::POST, Some("заказ-1"))).await;

    assert_eq!(first.body(), "handled POST");
    assert_eq!(retry.status(), StatusCode::OK);
    assert!(retry.body().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.metrics().unprotected(), 0);
}
