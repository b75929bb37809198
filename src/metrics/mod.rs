//! Run counters and reporting for the Volley load harness
//!
//! - Shared atomic counters (budget, retransmissions, errors, active clients)
//! - Progress and summary formatting
//! - Per-client distribution bucketing

pub mod counters;
pub mod distribution;
pub mod reporting;

// Re-export public types for easier access
pub use counters::{CounterDelta, CounterSnapshot, Counters};
pub use reporting::{RunReport, Termination};
