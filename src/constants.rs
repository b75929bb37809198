//! Application-wide constants and configuration values

use std::time::Duration;

// Benchmark sizing defaults
pub const DEFAULT_CLIENTS: u32 = 5;
pub const DEFAULT_REQUESTS_PER_CLIENT: u32 = 100;

// Monitor loop: wait this long for the budget to drain before sampling
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(10);

// Confirmable-style retransmission defaults
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_RETRANSMIT: u32 = 4;

// Per-client distribution bucketing
pub const DEFAULT_GROUP_SIZE: u64 = 10;
pub const LARGE_RUN_THRESHOLD: u64 = 500_000;
pub const LARGE_RUN_BUCKET_DIVISOR: u64 = 50_000;

// Logging
pub const DEBUG_LOG_INTERVAL: u64 = 100;
