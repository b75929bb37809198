//! Configuration validation logic

use super::{BenchmarkConfig, Config};
use crate::errors::{Result, VolleyError};
use url::Url;

/// Validate the configuration
pub fn validate(config: &Config) -> Result<()> {
    validate_target(config)?;
    validate_benchmark(config)?;
    validate_timing(config)?;
    validate_headers(config)?;
    Ok(())
}

/// Validate the target URI and its scheme
fn validate_target(config: &Config) -> Result<()> {
    let url = Url::parse(&config.target.url).map_err(|e| {
        VolleyError::config(format!("Invalid target URI '{}': {}", config.target.url, e))
    })?;

    match url.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        scheme => {
            return Err(VolleyError::config(format!(
                "Unsupported URI scheme '{}'. Use http, https, ws or wss",
                scheme
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(VolleyError::config(format!(
            "Target URI '{}' has no host",
            config.target.url
        )));
    }

    Ok(())
}

fn validate_benchmark(config: &Config) -> Result<()> {
    BenchmarkConfig::configure(
        config.benchmark.clients,
        config.benchmark.requests_per_client,
        config.benchmark.stop_on_failure,
    )
    .map(|_| ())
}

fn validate_timing(config: &Config) -> Result<()> {
    if config.transport.ack_timeout.is_zero() {
        return Err(VolleyError::config("Ack timeout must be greater than 0"));
    }
    if config.monitor.interval.is_zero() {
        return Err(VolleyError::config("Monitor interval must be greater than 0"));
    }
    Ok(())
}

/// Validate custom headers format
fn validate_headers(config: &Config) -> Result<()> {
    for header in &config.target.headers {
        if !header.contains(':') {
            return Err(VolleyError::config(format!(
                "Invalid header format '{}'. Use 'Key: Value' format",
                header
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_config() -> Config {
        Config::new("http://localhost:5783/benchmark")
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
        assert!(validate(&Config::new("wss://localhost:8443/echo")).is_ok());
    }

    #[test]
    fn test_validate_invalid_url() {
        let mut config = create_test_config();
        config.target.url = "invalid-url".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_unsupported_scheme() {
        let mut config = create_test_config();
        config.target.url = "ftp://localhost/benchmark".to_string();
        assert!(matches!(validate(&config), Err(VolleyError::Config(_))));
    }

    #[test]
    fn test_validate_zero_clients() {
        let mut config = create_test_config();
        config.benchmark.clients = 0;
        assert!(matches!(
            validate(&config),
            Err(VolleyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_zero_requests() {
        let mut config = create_test_config();
        config.benchmark.requests_per_client = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = create_test_config();
        config.monitor.interval = Duration::ZERO;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_header_format() {
        let mut config = create_test_config();
        config.target.headers = vec!["InvalidHeader".to_string()];
        assert!(validate(&config).is_err());
    }
}
