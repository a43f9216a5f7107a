//! In-memory adapters standing in for Overpass, Redis and metrics collectors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::categories::CategoryQuery;
use crate::domain::geo::Coordinate;
use crate::domain::places::RawElement;
use crate::domain::ports::{
    CounterSnapshot, LockNode, LockNodeError, MetricsSink, MetricsSinkError,
    OverpassCategorySource, OverpassSourceError, PhotoResolver, PhotoResolverError,
    RemoteBatchStore, RemoteStoreError,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Category source answering from a per-category script.
///
/// Unscripted categories return no elements.
#[derive(Debug, Default)]
pub struct ScriptedCategorySource {
    script: Mutex<HashMap<String, Result<Vec<RawElement>, OverpassSourceError>>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl ScriptedCategorySource {
    /// Source with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `category` with `elements`.
    #[must_use]
    pub fn with_elements(self, category: &str, elements: Vec<RawElement>) -> Self {
        lock(&self.script, "script").insert(category.to_owned(), Ok(elements));
        self
    }

    /// Fail `category` with `error`.
    #[must_use]
    pub fn with_failure(self, category: &str, error: OverpassSourceError) -> Self {
        lock(&self.script, "script").insert(category.to_owned(), Err(error));
        self
    }

    /// Sleep this long (on the Tokio clock) before answering.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Category ids requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls, "calls").clone()
    }

    /// Number of requests so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls, "calls").len()
    }
}

#[async_trait]
impl OverpassCategorySource for ScriptedCategorySource {
    async fn fetch_category(
        &self,
        category: &CategoryQuery,
        _center: Coordinate,
        _radius_meters: u32,
    ) -> Result<Vec<RawElement>, OverpassSourceError> {
        lock(&self.calls, "calls").push(category.id.to_owned());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        lock(&self.script, "script")
            .get(category.id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Remote cache backed by a map, with a switch to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    failing: AtomicBool,
    loads: AtomicUsize,
    stores: AtomicUsize,
}

impl MemoryRemoteStore {
    /// Empty, healthy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seed a raw payload.
    pub fn insert_raw(&self, key: &str, payload: &str) {
        lock(&self.entries, "entries").insert(
            key.to_owned(),
            (payload.to_owned(), Duration::from_secs(3600)),
        );
    }

    /// Stored payload for `key`.
    #[must_use]
    pub fn payload(&self, key: &str) -> Option<String> {
        lock(&self.entries, "entries")
            .get(key)
            .map(|(payload, _)| payload.clone())
    }

    /// TTL the payload under `key` was written with.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        lock(&self.entries, "entries").get(key).map(|(_, ttl)| *ttl)
    }

    /// Number of `load` calls.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `store` calls.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteBatchStore for MemoryRemoteStore {
    async fn load(&self, key: &str) -> Result<Option<String>, RemoteStoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::backend("connection refused"));
        }
        Ok(self.payload(key))
    }

    async fn store(
        &self,
        key: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), RemoteStoreError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::backend("connection refused"));
        }
        lock(&self.entries, "entries").insert(key.to_owned(), (payload.to_owned(), ttl));
        Ok(())
    }
}

/// Lock node backed by a map, with a switch to simulate an outage.
///
/// Keys never expire on their own; use [`MemoryLockNode::expire`].
#[derive(Debug, Default)]
pub struct MemoryLockNode {
    owners: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryLockNode {
    /// Empty, healthy node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current owner token for `resource`.
    #[must_use]
    pub fn owner(&self, resource: &str) -> Option<String> {
        lock(&self.owners, "owners").get(resource).cloned()
    }

    /// Set the owner directly, as another process would.
    pub fn force_owner(&self, resource: &str, token: &str) {
        lock(&self.owners, "owners").insert(resource.to_owned(), token.to_owned());
    }

    /// Drop `resource` as if its TTL had elapsed.
    pub fn expire(&self, resource: &str) {
        lock(&self.owners, "owners").remove(resource);
    }

    fn check(&self) -> Result<(), LockNodeError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(LockNodeError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LockNode for MemoryLockNode {
    async fn set_if_absent(
        &self,
        resource: &str,
        token: &str,
        _ttl: Duration,
    ) -> Result<bool, LockNodeError> {
        self.check()?;
        let mut owners = lock(&self.owners, "owners");
        if owners.contains_key(resource) {
            return Ok(false);
        }
        owners.insert(resource.to_owned(), token.to_owned());
        Ok(true)
    }

    async fn release_if_owner(&self, resource: &str, token: &str) -> Result<bool, LockNodeError> {
        self.check()?;
        let mut owners = lock(&self.owners, "owners");
        if owners.get(resource).is_some_and(|owner| owner == token) {
            owners.remove(resource);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Metrics sink recording every push.
#[derive(Debug, Default)]
pub struct RecordingMetricsSink {
    pushes: Mutex<Vec<CounterSnapshot>>,
    failing: AtomicBool,
}

impl RecordingMetricsSink {
    /// Healthy sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every push fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshots pushed so far, failed attempts excluded.
    #[must_use]
    pub fn pushes(&self) -> Vec<CounterSnapshot> {
        lock(&self.pushes, "pushes").clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingMetricsSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn push(&self, snapshot: &CounterSnapshot) -> Result<(), MetricsSinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MetricsSinkError::push("collector offline"));
        }
        lock(&self.pushes, "pushes").push(*snapshot);
        Ok(())
    }
}

/// Photo resolver answering from a fixed map.
#[derive(Debug, Default)]
pub struct StaticPhotoResolver {
    thumbnails: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl StaticPhotoResolver {
    /// Resolver knowing the given `(file reference, url)` pairs.
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            thumbnails: pairs
                .iter()
                .map(|(file, url)| ((*file).to_owned(), (*url).to_owned()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of lookups so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoResolver for StaticPhotoResolver {
    async fn thumbnail_url(
        &self,
        file_reference: &str,
    ) -> Result<Option<String>, PhotoResolverError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.thumbnails.get(file_reference).cloned())
    }
}
