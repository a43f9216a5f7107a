//! StatsD adapter sending cache counter deltas over UDP.

use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::domain::ports::{CacheCounter, CounterSnapshot, MetricsSink, MetricsSinkError};

/// StatsD daemon address and metric prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsdConfig {
    /// Daemon host name or address.
    pub host: String,
    /// Daemon UDP port.
    pub port: u16,
    /// Prefix of every metric name.
    pub prefix: String,
}

/// Counter lines `{prefix}.cache_hit:{n}|c` and `{prefix}.cache_miss:{n}|c`.
#[must_use]
pub fn render_statsd_lines(prefix: &str, snapshot: &CounterSnapshot) -> String {
    [
        (CacheCounter::Hit, snapshot.hits),
        (CacheCounter::Miss, snapshot.misses),
    ]
    .iter()
    .map(|(counter, value)| format!("{prefix}.{}:{value}|c", counter.as_str()))
    .collect::<Vec<_>>()
    .join("\n")
}

/// [`MetricsSink`] writing one datagram per flush.
pub struct StatsdSink {
    config: StatsdConfig,
}

impl StatsdSink {
    /// Build the sink; no socket is opened until the first push.
    #[must_use]
    pub const fn new(config: StatsdConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MetricsSink for StatsdSink {
    fn name(&self) -> &'static str {
        "statsd"
    }

    async fn push(&self, snapshot: &CounterSnapshot) -> Result<(), MetricsSinkError> {
        let payload = render_statsd_lines(&self.config.prefix, snapshot);
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .await
            .map_err(|error| MetricsSinkError::push(error.to_string()))?;
        socket
            .send_to(
                payload.as_bytes(),
                (self.config.host.as_str(), self.config.port),
            )
            .await
            .map_err(|error| MetricsSinkError::push(error.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_counter_line_per_metric() {
        let lines = render_statsd_lines("places", &CounterSnapshot { hits: 4, misses: 1 });
        assert_eq!(lines, "places.cache_hit:4|c\nplaces.cache_miss:1|c");
    }

    #[tokio::test]
    async fn push_delivers_a_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind receiver");
        let port = receiver.local_addr().expect("local addr").port();
        let sink = StatsdSink::new(StatsdConfig {
            host: "127.0.0.1".to_owned(),
            port,
            prefix: "places".to_owned(),
        });

        sink.push(&CounterSnapshot { hits: 2, misses: 0 })
            .await
            .expect("push succeeds");

        let mut buffer = [0_u8; 256];
        let (len, _) = receiver.recv_from(&mut buffer).await.expect("datagram");
        let received = buffer.get(..len).expect("within buffer");
        assert_eq!(received, b"places.cache_hit:2|c\nplaces.cache_miss:0|c");
    }
}
