//! Domain ports.
//!
//! Driven ports describe what the places pipeline needs from the outside world
//! (Overpass, the shared cache, lock nodes, photo lookups, metrics
//! collectors). The driving port [`PlacesQuery`] is what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_counters;
mod distributed_lock;
mod lock_node;
mod metrics_sink;
mod overpass_category_source;
mod photo_resolver;
mod places_query;
mod remote_batch_store;

#[cfg(test)]
pub use cache_counters::MockCacheCounterStore;
pub use cache_counters::{CacheCounter, CacheCounterStore, CounterSnapshot, CounterStoreError};
#[cfg(test)]
pub use distributed_lock::MockDistributedLock;
pub use distributed_lock::{DistributedLock, LockError, LockHandle};
#[cfg(test)]
pub use lock_node::MockLockNode;
pub use lock_node::{LockNode, LockNodeError};
#[cfg(test)]
pub use metrics_sink::MockMetricsSink;
pub use metrics_sink::{MetricsSink, MetricsSinkError};
#[cfg(test)]
pub use overpass_category_source::MockOverpassCategorySource;
pub use overpass_category_source::{
    FixtureOverpassCategorySource, OverpassCategorySource, OverpassSourceError,
};
#[cfg(test)]
pub use photo_resolver::MockPhotoResolver;
pub use photo_resolver::{DisabledPhotoResolver, PhotoResolver, PhotoResolverError};
#[cfg(test)]
pub use places_query::MockPlacesQuery;
pub use places_query::{FixturePlacesQuery, PlacesQuery, PlacesRequest};
#[cfg(test)]
pub use remote_batch_store::MockRemoteBatchStore;
pub use remote_batch_store::{RemoteBatchStore, RemoteStoreError};
