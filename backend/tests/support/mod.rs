//! Shared wiring for integration tests: a places service over in-memory
//! doubles and an Actix app mirroring the server's routes.

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use places_backend::Trace;
use places_backend::domain::aggregator::{AggregatorConfig, PlaceAggregator};
use places_backend::domain::batch_cache::{BatchCache, BatchCacheConfig, BatchCacheDeps};
use places_backend::domain::categories::DEFAULT_CATEGORIES;
use places_backend::domain::category_fetcher::CategoryFetcher;
use places_backend::domain::classification::Classifier;
use places_backend::domain::lock::SingleNodeLock;
use places_backend::domain::places_service::{
    PlacesService, PlacesServiceConfig, PlacesServicePorts,
};
use places_backend::domain::ports::{CacheCounterStore, DisabledPhotoResolver, DistributedLock};
use places_backend::inbound::http::health::{HealthState, live, ready};
use places_backend::inbound::http::places::get_places;
use places_backend::inbound::http::state::HttpState;
use places_backend::outbound::metrics::LocalCacheCounters;
use places_backend::test_support::fixtures::{fuji_hotel, fuji_spa};
use places_backend::test_support::{
    ImmediateSleeper, MemoryLockNode, MemoryRemoteStore, MutableClock, NoJitter,
    RecordingSleeper, ScriptedCategorySource,
};

/// Key prefix used by every harness instance.
pub const PREFIX: &str = "it:";

/// Shared backends standing in for the Redis tier and lock node.
pub struct Cluster {
    /// Shared batch store.
    pub remote: Arc<MemoryRemoteStore>,
    /// Lock node.
    pub node: Arc<MemoryLockNode>,
    /// Clock shared by every instance.
    pub clock: Arc<MutableClock>,
}

impl Cluster {
    /// Fresh, healthy cluster.
    pub fn new() -> Self {
        Self {
            remote: Arc::new(MemoryRemoteStore::new()),
            node: Arc::new(MemoryLockNode::new()),
            clock: Arc::new(MutableClock::at_fixed_instant()),
        }
    }
}

/// One backend instance over a [`Cluster`].
pub struct Instance {
    /// Places use-case.
    pub service: Arc<PlacesService>,
    /// Upstream double.
    pub source: Arc<ScriptedCategorySource>,
    /// Hit and miss counters.
    pub counters: Arc<LocalCacheCounters>,
}

/// Upstream double answering the spa and hotel fixtures.
pub fn fuji_source() -> ScriptedCategorySource {
    ScriptedCategorySource::new()
        .with_elements("hot_springs", vec![fuji_spa()])
        .with_elements("lodging", vec![fuji_hotel()])
}

/// Build an instance over `cluster` answering from `source`.
pub fn instance(cluster: &Cluster, source: ScriptedCategorySource) -> Instance {
    let source = Arc::new(source);
    let cache = Arc::new(BatchCache::new(
        &BatchCacheConfig {
            key_prefix: PREFIX.to_owned(),
            ..BatchCacheConfig::default()
        },
        BatchCacheDeps {
            remote: Some(cluster.remote.clone()),
            clock: cluster.clock.clone(),
            jitter: Arc::new(NoJitter),
        },
    ));
    let fetcher = Arc::new(CategoryFetcher::new(
        source.clone(),
        DEFAULT_CATEGORIES.to_vec(),
        Duration::ZERO,
        Arc::new(ImmediateSleeper),
    ));
    let aggregator = Arc::new(PlaceAggregator::new(
        Arc::new(Classifier::standard().expect("standard rules compile")),
        Arc::new(DisabledPhotoResolver),
        AggregatorConfig::default(),
    ));
    let lock: Arc<dyn DistributedLock> = Arc::new(SingleNodeLock::new(cluster.node.clone()));
    let counters = Arc::new(LocalCacheCounters::default());
    let counter_store: Arc<dyn CacheCounterStore> = counters.clone();
    let service = PlacesService::new(
        PlacesServicePorts {
            cache,
            fetcher,
            aggregator,
            lock: Some(lock),
            counters: counter_store,
            sleeper: Arc::new(RecordingSleeper::default()),
            clock: cluster.clock.clone(),
        },
        PlacesServiceConfig {
            key_prefix: PREFIX.to_owned(),
            ..PlacesServiceConfig::default()
        },
    );
    Instance {
        service: Arc::new(service),
        source,
        counters,
    }
}

/// App with the server's routes and middleware.
pub fn app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let health = web::Data::new(HealthState::new());
    health.mark_ready();
    App::new()
        .app_data(health)
        .app_data(web::Data::new(state))
        .wrap(Trace)
        .service(get_places)
        .service(ready)
        .service(live)
}
