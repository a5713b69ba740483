//! Tower middleware applying the idempotency gate to HTTP services.
//!
//! `IdempotencyLayer` wraps any `tower::Service<http::Request<B>>` whose
//! response body implements `Default`, which covers axum, hyper and tonic
//! style services. Duplicate submissions are answered with `200 OK` and an
//! empty body; the wrapped service is not called.

use crate::application::error::ConfigError;
use crate::application::gate::{GateConfig, IdempotencyGate};
use crate::application::metrics::GateMetrics;
use crate::application::ports::{KeyStore, Tracer};
use crate::domain::policy::FailurePolicy;
use crate::infrastructure::tracer::NoopTracer;
use http::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};

/// Builder for constructing an `IdempotencyLayer`.
#[derive(Debug)]
pub struct IdempotencyLayerBuilder<K, T = NoopTracer> {
    store: K,
    tracer: T,
    config: GateConfig,
}

impl<K> IdempotencyLayerBuilder<K, NoopTracer>
where
    K: KeyStore,
{
    /// Start a builder with default settings and tracing disabled.
    pub fn new(store: K) -> Self {
        Self {
            store,
            tracer: NoopTracer,
            config: GateConfig::default(),
        }
    }
}

impl<K, T> IdempotencyLayerBuilder<K, T>
where
    K: KeyStore,
    T: Tracer,
{
    /// Set how long a claimed token blocks retries (default: 3 minutes).
    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.config.claim_ttl = ttl;
        self
    }

    /// Set the upper bound on a single store call (default: 1 second).
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    /// Set the behavior on store failure (default: fail-open).
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Enable tracing through `tracer`.
    pub fn with_tracer<T2: Tracer>(self, tracer: T2) -> IdempotencyLayerBuilder<K, T2> {
        IdempotencyLayerBuilder {
            store: self.store,
            tracer,
            config: self.config,
        }
    }

    /// Build the layer.
    ///
    /// # Errors
    /// Returns `ConfigError` if the TTL or store timeout is zero.
    pub fn build(self) -> Result<IdempotencyLayer<K, T>, ConfigError> {
        let gate = IdempotencyGate::new(self.store, self.tracer, self.config)?;
        Ok(IdempotencyLayer {
            gate: Arc::new(gate),
        })
    }
}

/// Tower layer that deduplicates mutating requests by `Idempotency-Key`.
///
/// Cloning the layer, or the services it produces, shares one gate and
/// therefore one set of metrics.
#[derive(Debug)]
pub struct IdempotencyLayer<K, T = NoopTracer> {
    gate: Arc<IdempotencyGate<K, T>>,
}

impl<K, T> Clone for IdempotencyLayer<K, T> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<K> IdempotencyLayer<K, NoopTracer>
where
    K: KeyStore,
{
    /// Create a layer with default settings.
    pub fn new(store: K) -> Self {
        let gate = IdempotencyGate::new_unchecked(store, NoopTracer, GateConfig::default());
        Self {
            gate: Arc::new(gate),
        }
    }

    /// Create a builder for configuring the layer.
    pub fn builder(store: K) -> IdempotencyLayerBuilder<K, NoopTracer> {
        IdempotencyLayerBuilder::new(store)
    }
}

impl<K, T> IdempotencyLayer<K, T>
where
    K: KeyStore,
    T: Tracer,
{
    /// Get the gate shared by every service this layer produces.
    pub fn gate(&self) -> &IdempotencyGate<K, T> {
        &self.gate
    }

    /// Get the decision counters.
    pub fn metrics(&self) -> &GateMetrics {
        self.gate.metrics()
    }
}

impl<S, K, T> Layer<S> for IdempotencyLayer<K, T> {
    type Service = IdempotencyService<S, K, T>;

    fn layer(&self, inner: S) -> Self::Service {
        IdempotencyService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Service produced by [`IdempotencyLayer`].
#[derive(Debug)]
pub struct IdempotencyService<S, K, T = NoopTracer> {
    inner: S,
    gate: Arc<IdempotencyGate<K, T>>,
}

impl<S: Clone, K, T> Clone for IdempotencyService<S, K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S, K, T> IdempotencyService<S, K, T> {
    /// Get a reference to the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, K, T, ReqBody, ResBody> Service<Request<ReqBody>> for IdempotencyService<S, K, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    K: KeyStore,
    T: Tracer,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Keep the instance that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);

        Box::pin(async move {
            let decision = {
                let method = req.method();
                let headers = req.headers();
                gate.decide(method, headers).await
            };

            match decision.short_circuit_status() {
                Some(status) => {
                    let mut response = Response::new(ResBody::default());
                    *response.status_mut() = status;
                    Ok(response)
                }
                None => inner.call(req).await,
            }
        })
    }
}
