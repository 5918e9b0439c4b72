//! In-memory providers for tests, replay and offline wiring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{FetchError, FetchResult};
use crate::provider::{RasterProvider, StepRequest};

/// Returns the same payload for every step.
pub struct StaticProvider {
    name: String,
    payload: Bytes,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tile(&self, _request: &StepRequest) -> FetchResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Always fails with the same error.
pub struct FailingProvider {
    name: String,
    error: FetchError,
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new(name: impl Into<String>, error: FetchError) -> Self {
        Self {
            name: name.into(),
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn http(name: impl Into<String>, status: u16) -> Self {
        let name = name.into();
        let url = format!("mem://{}", name);
        Self::new(name, FetchError::Http { status, url })
    }

    pub fn transport(name: impl Into<String>, msg: &str) -> Self {
        Self::new(name, FetchError::transport(msg))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tile(&self, _request: &StepRequest) -> FetchResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Delays another provider.
pub struct SlowProvider<P> {
    inner: P,
    delay: Duration,
}

impl<P: RasterProvider> SlowProvider<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<P: RasterProvider> RasterProvider for SlowProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_tile(&self, request: &StepRequest) -> FetchResult<Bytes> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_tile(request).await
    }
}

/// Decrements the in-flight counter even when the fetch is cancelled.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-offset scripted responses; unscripted offsets are not published.
pub struct ScriptedProvider {
    name: String,
    responses: HashMap<i64, FetchResult<Bytes>>,
    delays: HashMap<i64, Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn respond(mut self, offset_minutes: i64, payload: impl Into<Bytes>) -> Self {
        self.responses.insert(offset_minutes, Ok(payload.into()));
        self
    }

    pub fn fail(mut self, offset_minutes: i64, error: FetchError) -> Self {
        self.responses.insert(offset_minutes, Err(error));
        self
    }

    pub fn delay(mut self, offset_minutes: i64, delay: Duration) -> Self {
        self.delays.insert(offset_minutes, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `fetch_tile` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tile(&self, request: &StepRequest) -> FetchResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let delay = self
            .delays
            .get(&request.offset_minutes)
            .copied()
            .unwrap_or(Duration::from_millis(1));
        tokio::time::sleep(delay).await;

        match self.responses.get(&request.offset_minutes) {
            Some(response) => response.clone(),
            None => Err(FetchError::NotPublished {
                offset_minutes: request.offset_minutes,
            }),
        }
    }
}
