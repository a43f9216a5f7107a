//! Shared cache-control policies for HTTP handlers.

/// Places responses may be reused by any cache for five minutes.
pub const PUBLIC_FIVE_MINUTES: &str = "public, max-age=300";

/// Probes must never be served from a cache.
pub const NO_STORE: &str = "no-store";

/// Header tuple for cacheable places responses.
#[must_use]
pub const fn public_five_minutes_header() -> (&'static str, &'static str) {
    ("Cache-Control", PUBLIC_FIVE_MINUTES)
}

/// Header tuple for probe responses.
#[must_use]
pub const fn no_store_header() -> (&'static str, &'static str) {
    ("Cache-Control", NO_STORE)
}
