//! Configuration management for the Volley load harness
//!
//! - Core structures and enums
//! - CLI argument parsing
//! - Configuration validation
//! - Default value management

pub mod defaults;
pub mod parser;
pub mod validation;

use crate::errors::{Result, VolleyError};
use std::time::Duration;

/// HTTP method used by the HTTP transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Whether the request carries the payload as body
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Target configuration
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub insecure: bool,
    pub headers: Vec<String>,
}

/// Benchmark sizing and failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub clients: u32,
    pub requests_per_client: u32,
    /// Stop a chain on its first failed request; `false` is tolerant mode
    pub stop_on_failure: bool,
}

impl BenchmarkConfig {
    /// Validated benchmark sizing
    pub fn configure(clients: u32, requests_per_client: u32, stop_on_failure: bool) -> Result<Self> {
        if clients < 1 {
            return Err(VolleyError::invalid_argument(
                "Number of clients must be at least 1",
            ));
        }
        if requests_per_client < 1 {
            return Err(VolleyError::invalid_argument(
                "Number of requests per client must be at least 1",
            ));
        }
        Ok(Self {
            clients,
            requests_per_client,
            stop_on_failure,
        })
    }

    /// Overall request budget
    pub fn total_requests(&self) -> u64 {
        self.clients as u64 * self.requests_per_client as u64
    }
}

/// Transport behavior shared by every connection
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ack_timeout: Duration,
    pub max_retransmit: u32,
    pub http_method: HttpMethod,
    pub payload: String,
}

/// Monitor loop configuration
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub interval: Duration,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub verbose: bool,
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub target: TargetConfig,
    pub benchmark: BenchmarkConfig,
    pub transport: TransportConfig,
    pub monitor: MonitorConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Parse and validate configuration from command line arguments
    pub fn from_args() -> Result<Self> {
        let raw_config = parser::RawConfig::parse_from_args()?;
        let config = raw_config.try_into()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get custom headers as key-value pairs
    pub fn custom_headers(&self) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        for header in &self.target.headers {
            if let Some((key, value)) = header.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            } else {
                return Err(VolleyError::config(format!(
                    "Invalid header format '{}'. Use 'Key: Value' format",
                    header
                )));
            }
        }
        Ok(headers)
    }

    /// Target URI scheme, lowercased
    pub fn scheme(&self) -> Result<String> {
        let url = url::Url::parse(&self.target.url)?;
        Ok(url.scheme().to_ascii_lowercase())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("Volley benchmark configuration:");
        println!("   Target:           {}", self.target.url);
        println!("   Clients:          {}", self.benchmark.clients);
        println!(
            "   Requests/client:  {}",
            self.benchmark.requests_per_client
        );
        println!(
            "   On failure:       {}",
            if self.benchmark.stop_on_failure {
                "stop client"
            } else {
                "count and continue"
            }
        );
        println!(
            "   Ack timeout:      {}ms (max {} retransmissions)",
            self.transport.ack_timeout.as_millis(),
            self.transport.max_retransmit
        );
        println!(
            "   Interval:         {}ms",
            self.monitor.interval.as_millis()
        );

        if !self.target.headers.is_empty() {
            println!("   Custom Headers:   {}", self.target.headers.len());
            for header in &self.target.headers {
                println!("                     {}", header);
            }
        }

        if self.target.insecure {
            println!("   Security:         certificate verification disabled");
        }

        println!();
    }
}
