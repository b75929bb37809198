//! Client side of the load harness
//!
//! - Transport contracts the chains are written against
//! - Per-client request chain state machine
//! - Orchestrator that launches, monitors and stops the chains
//! - HTTP and WebSocket transport implementations

pub mod chain;
pub mod http;
pub mod manager;
pub mod websocket;

// Re-export public types for easier access
pub use chain::{ChainState, ClientChain};
pub use http::{HttpTransport, HttpTransportBuilder};
pub use manager::ClientManager;
pub use websocket::{WebSocketTransport, WebSocketTransportBuilder};

use crate::common::ClientId;
use crate::config::Config;
use crate::errors::{Result, VolleyError};
use crate::message::{Outcome, Request};

use async_trait::async_trait;
use std::sync::Arc;

/// Notified by a transport every time it retransmits an outstanding request
pub trait RetransmissionObserver: Send + Sync {
    fn on_retransmission(&self);
}

/// Observer for exchanges that must not touch the run counters
pub struct IgnoreRetransmissions;

impl RetransmissionObserver for IgnoreRetransmissions {
    fn on_retransmission(&self) {}
}

/// One client's connection to the target
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind local resources. No request traffic is sent.
    async fn start(&self) -> Result<()>;

    /// Send `request` and resolve once a response arrived or the transport gave up.
    ///
    /// `observer` is called zero or more times before the outcome resolves.
    async fn exchange(&self, request: Request, observer: &dyn RetransmissionObserver) -> Outcome;

    /// Stop exchanging; idempotent
    async fn stop(&self);

    /// Release every resource; idempotent
    async fn destroy(&self);
}

/// Channel security selected by the URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    Plain,
    Secure,
}

/// Creates one transport per client
pub trait TransportBuilder: Send + Sync {
    fn build(&self, client_id: ClientId) -> Result<Arc<dyn Transport>>;

    fn security(&self) -> Security;
}

/// Pick the transport builder matching the target URI scheme
pub fn select_builder(config: &Config) -> Result<Arc<dyn TransportBuilder>> {
    let builder: Arc<dyn TransportBuilder> = match config.scheme()?.as_str() {
        "http" => Arc::new(HttpTransportBuilder::new(config, Security::Plain)?),
        "https" => Arc::new(HttpTransportBuilder::new(config, Security::Secure)?),
        "ws" => Arc::new(WebSocketTransportBuilder::new(config, Security::Plain)?),
        "wss" => Arc::new(WebSocketTransportBuilder::new(config, Security::Secure)?),
        scheme => {
            return Err(VolleyError::config(format!(
                "Unsupported URI scheme '{}'",
                scheme
            )));
        }
    };
    Ok(builder)
}
