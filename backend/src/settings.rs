//! Runtime settings loaded via OrthoConfig.
//!
//! Most fields are optional and accessors apply defaults. Environment variables
//! use the `PLACES_` prefix, for example `PLACES_REDIS_URL`. List values such as
//! `PLACES_LOCK_NODES` are comma-separated.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::batch_cache::{DEFAULT_LOCAL_TTL, DEFAULT_REMOTE_TTL};
use crate::domain::categories::DEFAULT_CATEGORIES;
use crate::domain::category_fetcher::DEFAULT_PACING;
use crate::domain::lock::{
    DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_WAIT_BUDGET, lock_ttl_for_fetch,
};
use crate::domain::metrics_exporter::DEFAULT_FLUSH_INTERVAL;
use crate::outbound::overpass::{DEFAULT_OVERPASS_ENDPOINT, OverpassHttpIdentity};
use crate::outbound::photos::DEFAULT_COMMONS_ENDPOINT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PHOTO_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_METRICS_JOB: &str = "places-backend";
const DEFAULT_STATSD_PORT: u16 = 8125;
const DEFAULT_STATSD_PREFIX: &str = "places";

/// Settings that failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A URL-valued setting did not parse.
    #[error("invalid URL in {field}: {message}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Parser message.
        message: String,
    },
    /// The bind address did not parse.
    #[error("invalid bind address {value:?}")]
    InvalidBindAddr {
        /// Offending value.
        value: String,
    },
    /// The lock strategy was neither `single` nor `quorum`.
    #[error("unknown lock strategy {value:?}; expected `single` or `quorum`")]
    UnknownLockStrategy {
        /// Offending value.
        value: String,
    },
}

/// How the fetch lock is taken across instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockStrategy {
    /// One lock key on the shared cache node.
    #[default]
    Single,
    /// Majority agreement across independent lock nodes.
    Quorum,
}

/// Settings for the places backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PLACES")]
pub struct PlacesSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Overpass interpreter endpoint.
    pub overpass_endpoint: Option<String>,
    /// Overpass request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Delay between consecutive category queries in milliseconds.
    pub pacing_ms: Option<u64>,
    /// User-Agent sent to Overpass and Commons.
    pub user_agent: Option<String>,
    /// Contact header sent to Overpass.
    pub contact: Option<String>,
    /// Shared cache URL; unset means local-only caching without locking.
    pub redis_url: Option<String>,
    /// Prefix for every shared key.
    pub key_prefix: Option<String>,
    /// Shared cache entry TTL in seconds.
    pub batch_ttl_secs: Option<u64>,
    /// Process-local entry TTL in seconds.
    pub local_ttl_secs: Option<u64>,
    /// `single` or `quorum`.
    pub lock_strategy: Option<String>,
    /// Lock node URLs for the quorum strategy.
    #[serde(default)]
    pub lock_nodes: Vec<String>,
    /// Lock expiry in milliseconds; defaults to the worst-case fetch time.
    pub lock_ttl_ms: Option<u64>,
    /// How long a contended request waits for the holder, in milliseconds.
    pub lock_wait_ms: Option<u64>,
    /// Poll interval while waiting, in milliseconds.
    pub lock_poll_ms: Option<u64>,
    /// Minimum gap between metrics flushes in seconds.
    pub metrics_flush_secs: Option<u64>,
    /// Pushgateway base URL; unset disables the push sink.
    pub pushgateway_url: Option<String>,
    /// Pushgateway job label.
    pub metrics_job: Option<String>,
    /// Pushgateway instance label.
    pub metrics_instance: Option<String>,
    /// StatsD host; unset disables the StatsD sink.
    pub statsd_host: Option<String>,
    /// StatsD UDP port.
    pub statsd_port: Option<u16>,
    /// StatsD metric prefix.
    pub statsd_prefix: Option<String>,
    /// Enable photo lookups.
    #[ortho_config(default = true)]
    pub photos_enabled: bool,
    /// Commons API endpoint.
    pub photos_endpoint: Option<String>,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            overpass_endpoint: None,
            request_timeout_ms: None,
            pacing_ms: None,
            user_agent: None,
            contact: None,
            redis_url: None,
            key_prefix: None,
            batch_ttl_secs: None,
            local_ttl_secs: None,
            lock_strategy: None,
            lock_nodes: Vec::new(),
            lock_ttl_ms: None,
            lock_wait_ms: None,
            lock_poll_ms: None,
            metrics_flush_secs: None,
            pushgateway_url: None,
            metrics_job: None,
            metrics_instance: None,
            statsd_host: None,
            statsd_port: None,
            statsd_prefix: None,
            photos_enabled: true,
            photos_endpoint: None,
        }
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|err| SettingsError::InvalidUrl {
        field,
        message: err.to_string(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl PlacesSettings {
    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value is not a
    /// socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    /// Overpass endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn overpass_endpoint(&self) -> Result<Url, SettingsError> {
        parse_url(
            "overpass_endpoint",
            self.overpass_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_OVERPASS_ENDPOINT),
        )
    }

    /// Overpass request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis)
    }

    /// Delay between category queries.
    pub fn pacing(&self) -> Duration {
        self.pacing_ms.map_or(DEFAULT_PACING, Duration::from_millis)
    }

    /// Outbound identity for Overpass.
    pub fn overpass_identity(&self) -> OverpassHttpIdentity {
        let defaults = OverpassHttpIdentity::default();
        OverpassHttpIdentity {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            contact: self.contact.clone().unwrap_or(defaults.contact),
            ..defaults
        }
    }

    /// Shared cache URL, if configured.
    pub fn redis_url(&self) -> Option<&str> {
        non_empty(self.redis_url.as_deref())
    }

    /// Prefix for shared keys.
    pub fn key_prefix(&self) -> &str {
        self.key_prefix.as_deref().unwrap_or_default()
    }

    /// Shared cache entry TTL.
    pub fn batch_ttl(&self) -> Duration {
        self.batch_ttl_secs
            .map_or(DEFAULT_REMOTE_TTL, Duration::from_secs)
    }

    /// Process-local entry TTL.
    pub fn local_ttl(&self) -> Duration {
        self.local_ttl_secs
            .map_or(DEFAULT_LOCAL_TTL, Duration::from_secs)
    }

    /// Lock strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownLockStrategy`] for values other than
    /// `single` and `quorum`.
    pub fn lock_strategy(&self) -> Result<LockStrategy, SettingsError> {
        match non_empty(self.lock_strategy.as_deref()) {
            None => Ok(LockStrategy::default()),
            Some(value) if value.eq_ignore_ascii_case("single") => Ok(LockStrategy::Single),
            Some(value) if value.eq_ignore_ascii_case("quorum") => Ok(LockStrategy::Quorum),
            Some(value) => Err(SettingsError::UnknownLockStrategy {
                value: value.to_owned(),
            }),
        }
    }

    /// Lock node URLs for the quorum strategy.
    pub fn lock_nodes(&self) -> Vec<String> {
        self.lock_nodes
            .iter()
            .map(|node| node.as_str().trim())
            .filter(|node| !node.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Lock expiry. Unless set explicitly it outlasts a fetch in which every
    /// category hits the request timeout.
    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl_ms.map_or_else(
            || {
                lock_ttl_for_fetch(
                    DEFAULT_CATEGORIES.len(),
                    self.request_timeout(),
                    self.pacing(),
                )
            },
            Duration::from_millis,
        )
    }

    /// Contended-lock wait budget.
    pub fn lock_wait_budget(&self) -> Duration {
        self.lock_wait_ms
            .map_or(DEFAULT_LOCK_WAIT_BUDGET, Duration::from_millis)
    }

    /// Poll interval while waiting for a lock holder.
    pub fn lock_poll_interval(&self) -> Duration {
        self.lock_poll_ms
            .map_or(DEFAULT_LOCK_POLL_INTERVAL, Duration::from_millis)
    }

    /// Minimum gap between metrics flushes.
    pub fn metrics_flush_interval(&self) -> Duration {
        self.metrics_flush_secs
            .map_or(DEFAULT_FLUSH_INTERVAL, Duration::from_secs)
    }

    /// Pushgateway base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn pushgateway_url(&self) -> Result<Option<Url>, SettingsError> {
        non_empty(self.pushgateway_url.as_deref())
            .map(|raw| parse_url("pushgateway_url", raw))
            .transpose()
    }

    /// Pushgateway job label.
    pub fn metrics_job(&self) -> &str {
        self.metrics_job.as_deref().unwrap_or(DEFAULT_METRICS_JOB)
    }

    /// Pushgateway instance label; falls back to the bind address.
    pub fn metrics_instance(&self) -> String {
        self.metrics_instance
            .clone()
            .or_else(|| self.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
    }

    /// StatsD host, if configured.
    pub fn statsd_host(&self) -> Option<&str> {
        non_empty(self.statsd_host.as_deref())
    }

    /// StatsD UDP port.
    pub fn statsd_port(&self) -> u16 {
        self.statsd_port.unwrap_or(DEFAULT_STATSD_PORT)
    }

    /// StatsD metric prefix.
    pub fn statsd_prefix(&self) -> &str {
        self.statsd_prefix.as_deref().unwrap_or(DEFAULT_STATSD_PREFIX)
    }

    /// Whether photo lookups run.
    pub const fn photos_enabled(&self) -> bool {
        self.photos_enabled
    }

    /// Commons API endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn photos_endpoint(&self) -> Result<Url, SettingsError> {
        parse_url(
            "photos_endpoint",
            self.photos_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_COMMONS_ENDPOINT),
        )
    }

    /// Bound on one photo lookup.
    pub const fn photo_timeout(&self) -> Duration {
        DEFAULT_PHOTO_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing and defaults.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "PLACES_BIND_ADDR",
        "PLACES_REDIS_URL",
        "PLACES_KEY_PREFIX",
        "PLACES_LOCK_STRATEGY",
        "PLACES_LOCK_NODES",
        "PLACES_PACING_MS",
        "PLACES_PUSHGATEWAY_URL",
        "PLACES_PHOTOS_ENABLED",
    ];

    fn load_from_empty_args() -> PlacesSettings {
        PlacesSettings::load_from_iter([OsString::from("places-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|var| (var, None::<String>)));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr(),
            Ok(DEFAULT_BIND_ADDR.parse().expect("valid default"))
        );
        assert_eq!(settings.redis_url(), None);
        assert_eq!(settings.key_prefix(), "");
        assert_eq!(settings.lock_strategy(), Ok(LockStrategy::Single));
        assert!(settings.lock_nodes().is_empty());
        assert_eq!(settings.pacing(), DEFAULT_PACING);
        assert_eq!(settings.pushgateway_url(), Ok(None));
        assert!(settings.photos_enabled());
        assert_eq!(settings.lock_wait_budget(), DEFAULT_LOCK_WAIT_BUDGET);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("PLACES_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("PLACES_REDIS_URL", Some("redis://cache:6379".to_owned())),
            ("PLACES_KEY_PREFIX", Some("prod:".to_owned())),
            ("PLACES_LOCK_STRATEGY", Some("quorum".to_owned())),
            (
                "PLACES_LOCK_NODES",
                Some("redis://a:6379,redis://b:6379,redis://c:6379".to_owned()),
            ),
            ("PLACES_PACING_MS", Some("0".to_owned())),
            (
                "PLACES_PUSHGATEWAY_URL",
                Some("http://gateway:9091".to_owned()),
            ),
            ("PLACES_PHOTOS_ENABLED", Some("false".to_owned())),
        ]);

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr(),
            Ok("127.0.0.1:9000".parse().expect("valid address"))
        );
        assert_eq!(settings.redis_url(), Some("redis://cache:6379"));
        assert_eq!(settings.key_prefix(), "prod:");
        assert_eq!(settings.lock_strategy(), Ok(LockStrategy::Quorum));
        assert_eq!(
            settings.lock_nodes(),
            vec!["redis://a:6379", "redis://b:6379", "redis://c:6379"]
        );
        assert_eq!(settings.pacing(), Duration::ZERO);
        assert_eq!(
            settings
                .pushgateway_url()
                .expect("valid url")
                .map(|url| url.host_str().map(str::to_owned)),
            Some(Some("gateway".to_owned()))
        );
        assert!(!settings.photos_enabled());
    }

    #[rstest]
    #[case("SINGLE", Ok(LockStrategy::Single))]
    #[case(" quorum ", Ok(LockStrategy::Quorum))]
    #[case("", Ok(LockStrategy::Single))]
    #[case("raft", Err(SettingsError::UnknownLockStrategy { value: "raft".to_owned() }))]
    fn lock_strategy_parsing(
        #[case] raw: &str,
        #[case] expected: Result<LockStrategy, SettingsError>,
    ) {
        let settings = PlacesSettings {
            lock_strategy: Some(raw.to_owned()),
            ..PlacesSettings::default()
        };
        assert_eq!(settings.lock_strategy(), expected);
    }

    #[rstest]
    fn malformed_values_are_reported() {
        let settings = PlacesSettings {
            bind_addr: Some("not-an-address".to_owned()),
            overpass_endpoint: Some("::nope".to_owned()),
            ..PlacesSettings::default()
        };

        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            settings.overpass_endpoint(),
            Err(SettingsError::InvalidUrl {
                field: "overpass_endpoint",
                ..
            })
        ));
    }

    #[rstest]
    fn photos_stay_enabled_when_only_other_settings_are_given() {
        let _guard = lock_env([
            ("PLACES_PHOTOS_ENABLED", None::<String>),
            ("PLACES_LOCK_NODES", None::<String>),
            ("PLACES_REDIS_URL", Some("redis://cache:6379".to_owned())),
        ]);

        let settings = load_from_empty_args();

        assert!(settings.photos_enabled());
        assert_eq!(settings.redis_url(), Some("redis://cache:6379"));
        assert!(PlacesSettings::default().photos_enabled());
    }

    #[rstest]
    fn default_lock_ttl_outlasts_a_timed_out_fetch() {
        let settings = PlacesSettings::default();
        let categories = u32::try_from(DEFAULT_CATEGORIES.len()).expect("few categories");

        let worst_case = settings.request_timeout() * categories
            + settings.pacing() * categories.saturating_sub(1);

        assert!(settings.lock_ttl() >= worst_case);
        assert!(settings.lock_ttl() > Duration::from_secs(60));
    }

    #[rstest]
    fn explicit_lock_ttl_wins() {
        let settings = PlacesSettings {
            lock_ttl_ms: Some(5_000),
            request_timeout_ms: Some(120_000),
            ..PlacesSettings::default()
        };
        assert_eq!(settings.lock_ttl(), Duration::from_secs(5));
    }

    #[rstest]
    fn blank_lock_nodes_are_ignored() {
        let settings = PlacesSettings {
            lock_nodes: vec![" redis://a:6379 ".to_owned(), "  ".to_owned()],
            ..PlacesSettings::default()
        };
        assert_eq!(settings.lock_nodes(), vec!["redis://a:6379"]);
    }

    #[rstest]
    fn blank_redis_url_means_local_only() {
        let settings = PlacesSettings {
            redis_url: Some("   ".to_owned()),
            ..PlacesSettings::default()
        };
        assert_eq!(settings.redis_url(), None);
    }

    #[rstest]
    fn metrics_instance_falls_back_to_bind_addr() {
        let settings = PlacesSettings {
            bind_addr: Some("10.0.0.5:8080".to_owned()),
            ..PlacesSettings::default()
        };
        assert_eq!(settings.metrics_instance(), "10.0.0.5:8080");
    }
}
