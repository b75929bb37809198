//! Domain-specific error types for the Volley load harness
//!
//! Only configuration and connectivity problems are fatal. Failures of individual
//! requests never surface here; chains absorb them and the orchestrator only sees
//! counters.

use thiserror::Error;

/// Main error type for the Volley application
#[derive(Error, Debug)]
pub enum VolleyError {
    /// Configuration-related errors (validation, malformed target URI, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Benchmark sizing rejected by `BenchmarkConfig::configure`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command line could not be parsed
    #[error("{0}")]
    Cli(#[from] clap::Error),

    /// Transport setup errors (client construction, connection, protocol)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connectivity probe on client 0 did not succeed
    #[error("Probe request to {0} failed")]
    Probe(String),

    /// Message processing errors (serialization, ID extraction, etc.)
    #[error("Message error: {0}")]
    Message(String),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP client errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

/// Result type using VolleyError
pub type Result<T> = std::result::Result<T, VolleyError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_config_context(self, msg: &str) -> Result<T>;
    fn with_transport_context(self, msg: &str) -> Result<T>;
    fn with_message_context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| VolleyError::Config(format!("{}: {}", msg, e)))
    }

    fn with_transport_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| VolleyError::Transport(format!("{}: {}", msg, e)))
    }

    fn with_message_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| VolleyError::Message(format!("{}: {}", msg, e)))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| VolleyError::Config(msg.to_string()))
    }

    fn with_transport_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| VolleyError::Transport(msg.to_string()))
    }

    fn with_message_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| VolleyError::Message(msg.to_string()))
    }
}

// Convenience constructors
impl VolleyError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        VolleyError::Config(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        VolleyError::InvalidArgument(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        VolleyError::Transport(msg.into())
    }

    /// Errors that mean the invocation itself was wrong; the binary answers these
    /// with usage text.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            VolleyError::Config(_)
                | VolleyError::InvalidArgument(_)
                | VolleyError::Cli(_)
                | VolleyError::UrlParse(_)
        )
    }
}

// Custom From implementation for boxed WebSocket errors
impl From<tokio_tungstenite::tungstenite::Error> for VolleyError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        VolleyError::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_display() {
        let err: Result<()> = Err("boom").with_transport_context("connect");
        assert_eq!(err.unwrap_err().to_string(), "Transport error: connect: boom");
    }

    #[test]
    fn test_option_context() {
        let err = None::<u32>.with_message_context("missing id").unwrap_err();
        assert!(matches!(err, VolleyError::Message(ref m) if m == "missing id"));
    }

    #[test]
    fn test_usage_errors() {
        assert!(VolleyError::invalid_argument("clients").is_usage_error());
        assert!(VolleyError::config("scheme").is_usage_error());
        assert!(!VolleyError::Probe("http://localhost".into()).is_usage_error());
        assert!(!VolleyError::transport("refused").is_usage_error());
    }
}
