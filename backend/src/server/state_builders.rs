//! Builders turning [`PlacesSettings`] into the places use-case and its
//! adapters.

use std::io;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use places_backend::domain::aggregator::{AggregatorConfig, PlaceAggregator};
use places_backend::domain::batch_cache::{BatchCache, BatchCacheConfig, BatchCacheDeps};
use places_backend::domain::categories::DEFAULT_CATEGORIES;
use places_backend::domain::category_fetcher::CategoryFetcher;
use places_backend::domain::classification::Classifier;
use places_backend::domain::lock::{QuorumLock, SingleNodeLock};
use places_backend::domain::metrics_exporter::{MetricsExporter, MetricsExporterConfig};
use places_backend::domain::places_service::{
    PlacesService, PlacesServiceConfig, PlacesServicePorts,
};
use places_backend::domain::ports::{
    CacheCounterStore, DisabledPhotoResolver, DistributedLock, LockNode, MetricsSink,
    PhotoResolver, RemoteBatchStore,
};
use places_backend::domain::runtime::{RandomTtlJitter, TokioSleeper};
use places_backend::outbound::cache::{
    RedisBatchStore, RedisCacheCounters, RedisLockNode, RedisPool, RedisPoolConfig,
};
use places_backend::outbound::metrics::{
    LocalCacheCounters, PushgatewayConfig, PushgatewaySink, StatsdConfig, StatsdSink,
};
use places_backend::outbound::overpass::OverpassHttpSource;
use places_backend::outbound::photos::CommonsPhotoResolver;
use places_backend::settings::{LockStrategy, PlacesSettings};

/// The places use-case plus its optional counter exporter.
pub struct PlacesStack {
    pub(crate) service: Arc<PlacesService>,
    pub(crate) exporter: Option<Arc<MetricsExporter>>,
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{context}: {err}"))
}

fn redis_pool(url: &str) -> io::Result<RedisPool> {
    RedisPool::new(&RedisPoolConfig::new(url)).map_err(|e| startup_error("redis pool", e))
}

/// Build the fetch lock.
///
/// `single` uses the shared cache node and is only available when one is
/// configured. `quorum` uses the listed lock nodes, falling back to the
/// single-node lock when the list is empty.
fn build_lock(
    settings: &PlacesSettings,
    shared: Option<&RedisPool>,
) -> io::Result<Option<Arc<dyn DistributedLock>>> {
    let strategy = settings
        .lock_strategy()
        .map_err(|e| startup_error("lock settings", e))?;
    let urls = settings.lock_nodes();
    if strategy == LockStrategy::Quorum && !urls.is_empty() {
        let nodes = urls
            .iter()
            .map(|url| {
                redis_pool(url)
                    .map(|pool| Arc::new(RedisLockNode::new(pool)) as Arc<dyn LockNode>)
            })
            .collect::<io::Result<Vec<_>>>()?;
        let lock = QuorumLock::new(nodes);
        info!(nodes = urls.len(), quorum = lock.quorum(), "using quorum fetch lock");
        return Ok(Some(Arc::new(lock)));
    }
    if strategy == LockStrategy::Quorum {
        warn!("quorum lock requested without lock nodes; using the shared cache node");
    }
    Ok(shared.map(|pool| {
        let node: Arc<dyn LockNode> = Arc::new(RedisLockNode::new(pool.clone()));
        Arc::new(SingleNodeLock::new(node)) as Arc<dyn DistributedLock>
    }))
}

fn build_sinks(settings: &PlacesSettings) -> io::Result<Vec<Arc<dyn MetricsSink>>> {
    let mut sinks: Vec<Arc<dyn MetricsSink>> = Vec::new();
    if let Some(gateway) = settings
        .pushgateway_url()
        .map_err(|e| startup_error("metrics settings", e))?
    {
        let sink = PushgatewaySink::new(PushgatewayConfig {
            gateway,
            job: settings.metrics_job().to_owned(),
            instance: settings.metrics_instance(),
            timeout: settings.request_timeout(),
        })
        .map_err(|e| startup_error("pushgateway sink", e))?;
        sinks.push(Arc::new(sink));
    }
    if let Some(host) = settings.statsd_host() {
        sinks.push(Arc::new(StatsdSink::new(StatsdConfig {
            host: host.to_owned(),
            port: settings.statsd_port(),
            prefix: settings.statsd_prefix().to_owned(),
        })));
    }
    Ok(sinks)
}

fn build_photos(settings: &PlacesSettings) -> io::Result<Arc<dyn PhotoResolver>> {
    if !settings.photos_enabled() {
        return Ok(Arc::new(DisabledPhotoResolver));
    }
    let endpoint = settings
        .photos_endpoint()
        .map_err(|e| startup_error("photo settings", e))?;
    let resolver = CommonsPhotoResolver::new(
        endpoint,
        settings.photo_timeout(),
        settings.overpass_identity().user_agent,
    )
    .map_err(|e| startup_error("photo client", e))?;
    Ok(Arc::new(resolver))
}

/// Build the places use-case from settings.
///
/// Without a Redis URL the cache is local-only, no fetch lock is taken and
/// cache counters live in process memory.
///
/// # Errors
/// Returns [`io::Error`] when a setting is malformed or an HTTP client cannot
/// be constructed.
pub fn build_places_stack(settings: &PlacesSettings) -> io::Result<PlacesStack> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let shared = settings.redis_url().map(redis_pool).transpose()?;
    if shared.is_none() {
        info!("no shared cache configured; caching locally without a fetch lock");
    }

    let remote = shared
        .clone()
        .map(|pool| Arc::new(RedisBatchStore::new(pool)) as Arc<dyn RemoteBatchStore>);
    let counters: Arc<dyn CacheCounterStore> = match shared.clone() {
        Some(pool) => Arc::new(RedisCacheCounters::new(pool, settings.key_prefix())),
        None => Arc::new(LocalCacheCounters::default()),
    };
    let lock = build_lock(settings, shared.as_ref())?;

    let sinks = build_sinks(settings)?;
    let exporter = if sinks.is_empty() {
        None
    } else {
        Some(Arc::new(MetricsExporter::new(
            Arc::clone(&counters),
            sinks,
            Arc::clone(&clock),
            MetricsExporterConfig {
                interval: settings.metrics_flush_interval(),
                ..MetricsExporterConfig::default()
            },
        )))
    };

    let cache = Arc::new(BatchCache::new(
        &BatchCacheConfig {
            key_prefix: settings.key_prefix().to_owned(),
            local_ttl: settings.local_ttl(),
            remote_ttl: settings.batch_ttl(),
            ..BatchCacheConfig::default()
        },
        BatchCacheDeps {
            remote,
            clock: Arc::clone(&clock),
            jitter: Arc::new(RandomTtlJitter),
        },
    ));

    let endpoint = settings
        .overpass_endpoint()
        .map_err(|e| startup_error("overpass settings", e))?;
    let source = OverpassHttpSource::with_identity(
        endpoint,
        settings.request_timeout(),
        settings.overpass_identity(),
    )
    .map_err(|e| startup_error("overpass client", e))?;
    let fetcher = Arc::new(CategoryFetcher::new(
        Arc::new(source),
        DEFAULT_CATEGORIES.to_vec(),
        settings.pacing(),
        Arc::new(TokioSleeper),
    ));

    let classifier = Classifier::standard().map_err(|e| startup_error("classifier", e))?;
    let aggregator = Arc::new(PlaceAggregator::new(
        Arc::new(classifier),
        build_photos(settings)?,
        AggregatorConfig {
            photo_timeout: settings.photo_timeout(),
            ..AggregatorConfig::default()
        },
    ));

    let service = PlacesService::new(
        PlacesServicePorts {
            cache,
            fetcher,
            aggregator,
            lock,
            counters,
            sleeper: Arc::new(TokioSleeper),
            clock,
        },
        PlacesServiceConfig {
            key_prefix: settings.key_prefix().to_owned(),
            lock_ttl: settings.lock_ttl(),
            lock_wait_budget: settings.lock_wait_budget(),
            lock_poll_interval: settings.lock_poll_interval(),
        },
    );

    Ok(PlacesStack {
        service: Arc::new(service),
        exporter,
    })
}
