//! Volley: a load harness driving a configurable number of concurrent client
//! chains against one HTTP or WebSocket target
//!
//! Every chain sends a request, waits for its response and immediately sends
//! the next one, drawing from a single shared budget of requests. The
//! orchestrator in [`client::ClientManager`] probes the target, starts the
//! chains, prints progress once per interval and ends with a summary.

pub mod client;
pub mod common;
pub mod config;
pub mod constants;
pub mod errors;
pub mod message;
pub mod metrics;
