//! Progress lines and the final run summary

use crate::metrics::counters::{CounterDelta, CounterSnapshot};
use crate::metrics::distribution::bucket_distribution;

use std::time::Duration;

fn format_ratio(count: u64, requests: u64, label: &str) -> String {
    if requests > 0 {
        format!(
            "{} {} ({:.2}%)",
            count,
            label,
            (count as f64 * 100.0) / requests as f64
        )
    } else {
        format!("{} {} (no responses received!)", count, label)
    }
}

pub fn format_retransmissions(retransmissions: u64, requests: u64) -> String {
    format_ratio(retransmissions, requests, "retransmissions")
}

pub fn format_transmission_errors(transmission_errors: u64, requests: u64) -> String {
    format_ratio(transmission_errors, requests, "transmission errors")
}

/// `", <n> reqs/s"`, or nothing when less than a millisecond elapsed
pub fn format_throughput(requests: u64, elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis > 0 {
        format!(", {} reqs/s", (requests as u128 * 1000) / millis)
    } else {
        String::new()
    }
}

/// One monitor-interval progress line
pub fn format_progress(delta: &CounterDelta, current: &CounterSnapshot, interval: Duration) -> String {
    let seconds = interval.as_secs_f64();
    let rate = if seconds > 0.0 {
        (delta.sent as f64 / seconds) as u64
    } else {
        0
    };
    format!(
        "{} requests ({} reqs/s, {}, {}, {} clients)",
        delta.sent,
        rate,
        format_retransmissions(delta.retransmissions, delta.sent),
        format_transmission_errors(delta.transmission_errors, delta.sent),
        current.active_clients
    )
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Budget reached zero
    Finished,
    /// No progress within an interval, or no client left running
    Stale,
    /// Interrupted from the keyboard
    Interrupted,
}

/// Final figures of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub clients: u32,
    pub expected: u64,
    pub sent: u64,
    pub elapsed: Duration,
    pub termination: Termination,
    pub retransmissions: u64,
    pub transmission_errors: u64,
    /// Requests accounted by each client, ascending
    pub per_client: Vec<u64>,
}

impl RunReport {
    pub fn is_stale(&self) -> bool {
        self.termination == Termination::Stale
    }

    /// Shortfall in percent of the expected requests, if any
    pub fn completion_percent(&self) -> Option<u64> {
        if self.sent < self.expected && self.expected > 0 {
            Some((self.sent * 100) / self.expected)
        } else {
            None
        }
    }

    /// Headline announcing how the clients ended
    pub fn headline(&self) -> String {
        match self.termination {
            Termination::Finished => "Benchmark clients finished.".to_string(),
            Termination::Stale | Termination::Interrupted => {
                "Benchmark clients stopped.".to_string()
            }
        }
    }

    /// Summary lines in print order
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} requests sent, {} expected", self.sent, self.expected),
            format!(
                "{} requests in {}ms{}",
                self.sent,
                self.elapsed.as_millis(),
                format_throughput(self.sent, self.elapsed)
            ),
        ];

        if self.retransmissions > 0 {
            lines.push(format_retransmissions(self.retransmissions, self.sent));
        }
        if self.transmission_errors > 0 {
            lines.push(format_transmission_errors(
                self.transmission_errors,
                self.sent,
            ));
        }
        if let Some(percent) = self.completion_percent() {
            lines.push(format!("Stale at {} messages ({}%)", self.sent, percent));
        }
        if self.clients > 1 {
            lines.extend(bucket_distribution(&self.per_client, self.expected));
        }

        lines
    }

    pub fn print(&self) {
        println!("{}", self.headline());
        for line in self.summary_lines() {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            clients: 2,
            expected: 6,
            sent: 6,
            elapsed: Duration::from_millis(1500),
            termination: Termination::Finished,
            retransmissions: 0,
            transmission_errors: 0,
            per_client: vec![3, 3],
        }
    }

    #[test]
    fn test_format_retransmissions() {
        assert_eq!(format_retransmissions(0, 100), "0 retransmissions (0.00%)");
        assert_eq!(format_retransmissions(3, 40), "3 retransmissions (7.50%)");
        assert_eq!(
            format_retransmissions(5, 0),
            "5 retransmissions (no responses received!)"
        );
    }

    #[test]
    fn test_format_transmission_errors() {
        assert_eq!(
            format_transmission_errors(1, 3),
            "1 transmission errors (33.33%)"
        );
        assert_eq!(
            format_transmission_errors(2, 0),
            "2 transmission errors (no responses received!)"
        );
    }

    #[test]
    fn test_format_throughput() {
        assert_eq!(format_throughput(500, Duration::from_millis(250)), ", 2000 reqs/s");
        assert_eq!(format_throughput(10, Duration::from_micros(999)), "");
        assert_eq!(format_throughput(0, Duration::from_secs(1)), ", 0 reqs/s");
    }

    #[test]
    fn test_format_progress() {
        let delta = CounterDelta {
            sent: 200,
            retransmissions: 2,
            transmission_errors: 0,
        };
        let current = CounterSnapshot {
            active_clients: 4,
            ..Default::default()
        };
        assert_eq!(
            format_progress(&delta, &current, Duration::from_secs(10)),
            "200 requests (20 reqs/s, 2 retransmissions (1.00%), 0 transmission errors (0.00%), 4 clients)"
        );
    }

    #[test]
    fn test_clean_summary() {
        let lines = report().summary_lines();
        assert_eq!(lines[0], "6 requests sent, 6 expected");
        assert_eq!(lines[1], "6 requests in 1500ms, 4 reqs/s");
        assert_eq!(lines[2], "2 clients with 3 requests.");
        assert_eq!(lines.len(), 3);
        assert!(!lines.iter().any(|l| l.contains("retransmissions")));
        assert!(!lines.iter().any(|l| l.starts_with("Stale")));
    }

    #[test]
    fn test_summary_with_shortfall() {
        let mut report = report();
        report.sent = 3;
        report.per_client = vec![0, 3];
        report.termination = Termination::Stale;
        report.retransmissions = 1;
        report.transmission_errors = 2;

        let lines = report.summary_lines();
        assert!(lines.contains(&"1 retransmissions (33.33%)".to_string()));
        assert!(lines.contains(&"2 transmission errors (66.67%)".to_string()));
        assert!(lines.contains(&"Stale at 3 messages (50%)".to_string()));
        assert_eq!(report.headline(), "Benchmark clients stopped.");
    }

    #[test]
    fn test_single_client_has_no_distribution() {
        let mut report = report();
        report.clients = 1;
        report.per_client = vec![6];
        assert_eq!(report.summary_lines().len(), 2);
    }
}
