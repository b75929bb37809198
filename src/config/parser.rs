//! Command-line argument parsing for Volley configuration

use clap::{CommandFactory, Parser, ValueEnum};
use std::time::Duration;

use super::defaults::Defaults;
use super::{
    BenchmarkConfig, Config, HttpMethod, MonitorConfig, OutputConfig, TargetConfig,
    TransportConfig,
};
use crate::errors::{Result, VolleyError};

/// Failure-handling keyword accepted as the fourth positional argument
pub const NONESTOP: &str = "nonestop";

/// HTTP method for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HttpMethodArg {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl From<HttpMethodArg> for HttpMethod {
    fn from(arg: HttpMethodArg) -> Self {
        match arg {
            HttpMethodArg::Get => HttpMethod::Get,
            HttpMethodArg::Post => HttpMethod::Post,
            HttpMethodArg::Put => HttpMethod::Put,
            HttpMethodArg::Delete => HttpMethod::Delete,
            HttpMethodArg::Patch => HttpMethod::Patch,
        }
    }
}

/// Raw configuration from command line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "volley",
    version,
    about = "Drives concurrent request chains against an endpoint until a shared request budget is spent",
    long_about = None,
    after_help = "Example: volley http://localhost:5783/benchmark 20 1000 nonestop"
)]
pub struct RawConfig {
    /// Target URI (http, https, ws or wss)
    #[arg(value_name = "URI")]
    pub target: String,

    /// Number of concurrent clients
    #[arg(value_name = "CLIENTS", default_value_t = Defaults::CLIENT_COUNT)]
    pub clients: u32,

    /// Number of requests per client
    #[arg(value_name = "REQUESTS", default_value_t = Defaults::REQUESTS_PER_CLIENT)]
    pub requests: u32,

    /// `nonestop` keeps a client running when a request fails
    #[arg(value_name = "MODE")]
    pub mode: Option<String>,

    /// Progress sampling interval
    #[arg(
        long = "interval",
        value_name = "DURATION",
        default_value = Defaults::INTERVAL,
        help = "Progress interval; a run without progress for one interval is stale (e.g. '500ms', '10s', '1m')"
    )]
    pub interval: String,

    /// Initial response timeout per request
    #[arg(
        long = "ack-timeout",
        value_name = "DURATION",
        default_value = Defaults::ACK_TIMEOUT,
        help = "Timeout of the first attempt; doubled on every retransmission"
    )]
    pub ack_timeout: String,

    /// Maximum number of retransmissions per request
    #[arg(
        long = "max-retransmit",
        value_name = "COUNT",
        default_value_t = Defaults::MAX_RETRANSMIT
    )]
    pub max_retransmit: u32,

    /// HTTP method
    #[arg(
        long = "http-method",
        value_enum,
        default_value = "post",
        help = "HTTP method (only used for http/https targets)"
    )]
    pub http_method: HttpMethodArg,

    /// Request payload
    #[arg(short = 'p', long = "payload", value_name = "TEXT")]
    pub payload: Option<String>,

    /// Custom headers
    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        action = clap::ArgAction::Append,
        help = "Custom headers in 'Key: Value' format (can be used multiple times)"
    )]
    pub headers: Vec<String>,

    /// Allow insecure connections
    #[arg(
        long = "insecure",
        help = "Skip certificate verification for https/wss targets"
    )]
    pub insecure: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl RawConfig {
    /// Parse from command line arguments
    pub fn parse_from_args() -> Result<Self> {
        Ok(Self::try_parse()?)
    }

    /// Rendered usage text
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }

    /// Map the optional MODE argument to the stop-on-failure policy
    fn stop_on_failure(mode: Option<&str>) -> Result<bool> {
        match mode {
            None => Ok(true),
            Some(mode) if mode.eq_ignore_ascii_case(NONESTOP) => Ok(false),
            Some(other) => Err(VolleyError::config(format!(
                "Unknown mode '{}', expected '{}'",
                other, NONESTOP
            ))),
        }
    }

    /// Parse a duration with an optional `ms`, `s`, `m` or `h` suffix (seconds if bare)
    pub fn parse_duration(duration_str: &str) -> Result<Duration> {
        let duration_str = duration_str.trim();
        if duration_str.is_empty() {
            return Err(VolleyError::config("Duration cannot be empty"));
        }

        let split = duration_str
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(duration_str.len());
        let (number, unit) = duration_str.split_at(split);
        let value = number.parse::<u64>().map_err(|_| {
            VolleyError::config(format!(
                "Invalid duration format: '{}' - expected a number",
                duration_str
            ))
        })?;

        let seconds_per_unit = match unit.to_ascii_lowercase().as_str() {
            "ms" => return Ok(Duration::from_millis(value)),
            "" | "s" => 1,
            "m" => 60,
            "h" => 3600,
            other => {
                return Err(VolleyError::config(format!(
                    "Invalid duration unit '{}' in '{}' - use ms, s, m or h",
                    other, duration_str
                )));
            }
        };

        value
            .checked_mul(seconds_per_unit)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                VolleyError::config(format!("Duration '{}' is too large", duration_str))
            })
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = VolleyError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let stop_on_failure = RawConfig::stop_on_failure(raw.mode.as_deref())?;

        Ok(Config {
            target: TargetConfig {
                url: raw.target,
                insecure: raw.insecure,
                headers: raw.headers,
            },
            benchmark: BenchmarkConfig {
                clients: raw.clients,
                requests_per_client: raw.requests,
                stop_on_failure,
            },
            transport: TransportConfig {
                ack_timeout: RawConfig::parse_duration(&raw.ack_timeout)?,
                max_retransmit: raw.max_retransmit,
                http_method: raw.http_method.into(),
                payload: raw.payload.unwrap_or_else(|| Defaults::PAYLOAD.to_string()),
            },
            monitor: MonitorConfig {
                interval: RawConfig::parse_duration(&raw.interval)?,
            },
            output: OutputConfig {
                verbose: raw.verbose,
            },
        })
    }
}
