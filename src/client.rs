//! The intercepting client.
//!
//! [`MockClient`] wraps a [`Transport`] and owns the stub registry for
//! it. Every request goes through a task spawned on the tokio runtime, so
//! a stub never completes inline with the call that dispatched it.

use crate::config::{MockConfig, MockSettings};
use crate::registry::{Producer, StubRegistry};
use crate::response::{failure_response, not_found_response, HttpResponse};
use crate::stub::Stub;
use crate::transport::{HttpRequest, Transport};
use async_trait::async_trait;
use http::Method;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Intercept `transport`, answering requests from registered stubs.
///
/// With `fail_on_unknown`, requests no stub matches get a 599 response and
/// never reach `transport`. Without it they are passed through unchanged.
pub fn patch<T: Transport + 'static>(transport: T, fail_on_unknown: bool) -> MockClient<T> {
    MockClient::new(transport, MockSettings::new(fail_on_unknown))
}

#[derive(Debug, Default)]
struct Counters {
    requests_total: AtomicU64,
    requests_matched: AtomicU64,
    requests_unmatched: AtomicU64,
    requests_passthrough: AtomicU64,
}

/// A transport decorated with a stub registry.
pub struct MockClient<T> {
    /// The original dispatch, used for passthrough
    inner: Arc<T>,
    registry: Arc<RwLock<StubRegistry>>,
    settings: MockSettings,
    counters: Arc<Counters>,
}

impl<T: Transport + 'static> MockClient<T> {
    /// Create a mock client with an empty registry.
    pub fn new(transport: T, settings: MockSettings) -> Self {
        info!(
            fail_on_unknown = settings.fail_on_unknown,
            "Mock client initialized"
        );

        Self {
            inner: Arc::new(transport),
            registry: Arc::new(RwLock::new(StubRegistry::new())),
            settings,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a mock client and register every stub from `config`.
    pub fn from_config(transport: T, config: &MockConfig) -> crate::Result<Self> {
        let client = Self::new(transport, config.settings.clone());
        for stub in config.to_stubs()? {
            client.register_stub(stub)?;
        }
        Ok(client)
    }

    /// Start over with a fresh, empty registry.
    ///
    /// Every stub registered so far is dropped. Requests already in
    /// flight finish against the registry they started with.
    ///
    /// Takes `&mut self`, so it is only available while the client has a
    /// single owner. Call it during setup, before wrapping the client in an
    /// `Arc` to share it across tasks.
    pub fn repatch(&mut self, fail_on_unknown: bool) {
        info!(fail_on_unknown, "Mock client re-patched");
        self.registry = Arc::new(RwLock::new(StubRegistry::new()));
        self.settings.fail_on_unknown = fail_on_unknown;
    }

    /// Register a stub.
    ///
    /// Body files are read now; a missing file is reported here and the
    /// registry is left unchanged.
    pub fn register_stub(&self, stub: Stub) -> crate::Result<()> {
        let resolved = stub.resolve()?;
        self.register(&resolved.url, resolved.method, resolved.producer);
        Ok(())
    }

    /// Register a producer for `url` and `method` directly.
    pub fn register(&self, url: &str, method: Method, producer: Producer) {
        let method_name = method.to_string();
        let route = self.registry.write().register(url, method, producer);
        debug!(route = %route, method = %method_name, url = %url, "Stub registered");
    }

    pub fn settings(&self) -> &MockSettings {
        &self.settings
    }

    /// Read access to the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, StubRegistry> {
        self.registry.read()
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }

    /// Get total requests dispatched.
    pub fn total_requests(&self) -> u64 {
        self.counters.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests answered by a stub.
    pub fn total_matched(&self) -> u64 {
        self.counters.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests no stub matched.
    pub fn total_unmatched(&self) -> u64 {
        self.counters.requests_unmatched.load(Ordering::Relaxed)
    }

    /// Get total unmatched requests handed to the wrapped transport.
    pub fn total_passthrough(&self) -> u64 {
        self.counters.requests_passthrough.load(Ordering::Relaxed)
    }
}

/// Match a request and produce its response.
async fn dispatch<T: Transport>(
    inner: Arc<T>,
    registry: Arc<RwLock<StubRegistry>>,
    settings: MockSettings,
    counters: Arc<Counters>,
    request: HttpRequest,
) -> HttpResponse {
    counters.requests_total.fetch_add(1, Ordering::Relaxed);

    let producer = registry.read().lookup(&request.url, &request.method);

    if let Some(producer) = producer {
        counters.requests_matched.fetch_add(1, Ordering::Relaxed);
        if settings.log_matches {
            info!(method = %request.method, url = %request.url, "Request matched stub");
        }
        return producer(&request);
    }

    counters.requests_unmatched.fetch_add(1, Ordering::Relaxed);

    if settings.fail_on_unknown {
        if settings.log_unmatched {
            warn!(method = %request.method, url = %request.url, "No matching stub found");
        }
        return not_found_response(&request);
    }

    counters.requests_passthrough.fetch_add(1, Ordering::Relaxed);
    debug!(method = %request.method, url = %request.url, "Passing unmatched request to transport");
    inner.fetch(request).await
}

#[async_trait]
impl<T: Transport + 'static> Transport for MockClient<T> {
    async fn fetch(&self, request: HttpRequest) -> HttpResponse {
        let url = request.url.clone();
        let cancelled = HttpRequest::new(request.method.clone(), url.clone());

        let task = tokio::spawn(dispatch(
            Arc::clone(&self.inner),
            Arc::clone(&self.registry),
            self.settings.clone(),
            Arc::clone(&self.counters),
            request,
        ));

        match task.await {
            Ok(response) => response,
            // A failing producer fails the request that triggered it
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(url = %url, error = %e, "Stub dispatch task cancelled");
                failure_response(&cancelled, format!("Request to {} was cancelled", url))
            }
        }
    }
}
