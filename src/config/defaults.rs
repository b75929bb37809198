//! Default values and configuration presets

use super::{
    BenchmarkConfig, Config, HttpMethod, MonitorConfig, OutputConfig, TargetConfig,
    TransportConfig,
};
use crate::constants::*;
use std::time::Duration;

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const CLIENT_COUNT: u32 = DEFAULT_CLIENTS;
    pub const REQUESTS_PER_CLIENT: u32 = DEFAULT_REQUESTS_PER_CLIENT;
    pub const MAX_RETRANSMIT: u32 = DEFAULT_MAX_RETRANSMIT;
    pub const INTERVAL: &'static str = "10s";
    pub const ACK_TIMEOUT: &'static str = "2s";
    pub const PAYLOAD: &'static str = "";
}

impl Config {
    /// Default configuration against `target_url`
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target: TargetConfig {
                url: target_url.into(),
                insecure: false,
                headers: vec![],
            },
            benchmark: BenchmarkConfig {
                clients: Defaults::CLIENT_COUNT,
                requests_per_client: Defaults::REQUESTS_PER_CLIENT,
                stop_on_failure: true,
            },
            transport: TransportConfig {
                ack_timeout: DEFAULT_ACK_TIMEOUT,
                max_retransmit: Defaults::MAX_RETRANSMIT,
                http_method: HttpMethod::Post,
                payload: Defaults::PAYLOAD.to_string(),
            },
            monitor: MonitorConfig {
                interval: MONITOR_INTERVAL,
            },
            output: OutputConfig { verbose: false },
        }
    }

    /// Small, fast-sampling configuration (few clients, short intervals)
    pub fn quick(target_url: impl Into<String>) -> Self {
        let mut config = Self::new(target_url);
        config.benchmark.clients = 2;
        config.benchmark.requests_per_client = 10;
        config.transport.ack_timeout = Duration::from_millis(200);
        config.transport.max_retransmit = 1;
        config.monitor.interval = Duration::from_millis(250);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new("http://localhost:5783/benchmark");
        assert_eq!(config.benchmark.clients, 5);
        assert_eq!(config.benchmark.requests_per_client, 100);
        assert!(config.benchmark.stop_on_failure);
        assert_eq!(config.monitor.interval, Duration::from_secs(10));
        assert_eq!(config.transport.http_method, HttpMethod::Post);
    }

    #[test]
    fn test_quick_config() {
        let config = Config::quick("ws://localhost:8080");
        assert_eq!(config.benchmark.clients, 2);
        assert_eq!(config.benchmark.total_requests(), 20);
        assert_eq!(config.monitor.interval, Duration::from_millis(250));
    }
}
