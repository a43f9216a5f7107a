//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits for various infrastructure concerns:
//!
//! - **overpass**: reqwest-backed category source
//! - **cache**: Redis-backed shared cache tier, lock nodes and counters
//! - **photos**: Wikimedia Commons thumbnail lookups
//! - **metrics**: process-local counters plus Pushgateway and `StatsD` sinks
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub mod metrics;
pub mod overpass;
pub mod photos;
