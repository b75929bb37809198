//! Bucketing of per-client request counts for the final summary

use crate::constants::{DEFAULT_GROUP_SIZE, LARGE_RUN_BUCKET_DIVISOR, LARGE_RUN_THRESHOLD};

/// Bracket width used to group clients.
///
/// Large runs widen the bracket so the number of printed lines stays bounded.
pub fn group_size(total_expected: u64) -> u64 {
    if total_expected > LARGE_RUN_THRESHOLD {
        (total_expected / LARGE_RUN_BUCKET_DIVISOR).max(1)
    } else {
        DEFAULT_GROUP_SIZE
    }
}

/// Render one range of clients
pub fn format_client_range(clients: usize, low: u64, high: u64) -> String {
    if low == high {
        format!("{} clients with {} requests.", clients, low)
    } else {
        format!("{} clients with {} to {} requests.", clients, low, high)
    }
}

/// Group ascending per-client counts into ranges.
///
/// A new range starts at the first client whose `count / group` bracket is above
/// the bracket of the range's first client.
pub fn bucket_with_group(sorted: &[u64], group: u64) -> Vec<String> {
    let group = group.max(1);
    let mut lines = Vec::new();
    if sorted.is_empty() {
        return lines;
    }

    let mut last = 0;
    for index in 1..sorted.len() {
        if sorted[index] / group > sorted[last] / group {
            lines.push(format_client_range(
                index - last,
                sorted[last],
                sorted[index - 1],
            ));
            last = index;
        }
    }
    lines.push(format_client_range(
        sorted.len() - last,
        sorted[last],
        sorted[sorted.len() - 1],
    ));
    lines
}

/// Group ascending per-client counts using the bracket width for this run size
pub fn bucket_distribution(sorted: &[u64], total_expected: u64) -> Vec<String> {
    bucket_with_group(sorted, group_size(total_expected))
}
