//! Shared run counters: request budget, retransmissions, transmission errors and
//! active clients
//!
//! Every value is a single atomic word. Chains mutate them from their own tasks,
//! the orchestrator only samples them.

use crate::client::RetransmissionObserver;

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Thread-safe counters shared by all chains and the orchestrator
#[derive(Debug, Default)]
pub struct Counters {
    budget: AtomicU64,
    retransmissions: AtomicU64,
    transmission_errors: AtomicU64,
    active_clients: AtomicU64,
    drained: Notify,
}

impl Counters {
    /// Counters for a run that may account at most `total_requests` requests
    pub fn new(total_requests: u64) -> Self {
        Self {
            budget: AtomicU64::new(total_requests),
            ..Default::default()
        }
    }

    /// Take one unit from the budget.
    ///
    /// Returns the budget left after this decrement, or `None` when it was already
    /// exhausted. The budget never goes below zero and never grows back.
    pub fn consume(&self) -> Option<u64> {
        let previous = self
            .budget
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| b.checked_sub(1))
            .ok()?;
        let remaining = previous - 1;
        if remaining == 0 {
            self.drained.notify_waiters();
        }
        Some(remaining)
    }

    pub fn remaining(&self) -> u64 {
        self.budget.load(Ordering::Acquire)
    }

    /// Resolves once the budget reached zero
    pub async fn drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn record_retransmission(&self) {
        self.retransmissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transmission_error(&self) {
        self.transmission_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_started(&self) {
        self.active_clients.fetch_add(1, Ordering::AcqRel);
    }

    /// Called exactly once per chain that entered the benchmark
    pub fn client_stopped(&self) {
        let previous = self.active_clients.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "client_stopped without a running client");
    }

    pub fn active_clients(&self) -> u64 {
        self.active_clients.load(Ordering::Acquire)
    }

    pub fn retransmissions(&self) -> u64 {
        self.retransmissions.load(Ordering::Relaxed)
    }

    pub fn transmission_errors(&self) -> u64 {
        self.transmission_errors.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            remaining: self.remaining(),
            retransmissions: self.retransmissions(),
            transmission_errors: self.transmission_errors(),
            active_clients: self.active_clients(),
        }
    }
}

impl RetransmissionObserver for Counters {
    fn on_retransmission(&self) {
        self.record_retransmission();
    }
}

/// Sampled counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub remaining: u64,
    pub retransmissions: u64,
    pub transmission_errors: u64,
    pub active_clients: u64,
}

impl CounterSnapshot {
    /// Changes between an earlier sample and this one
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterDelta {
        CounterDelta {
            sent: earlier.remaining.saturating_sub(self.remaining),
            retransmissions: self
                .retransmissions
                .saturating_sub(earlier.retransmissions),
            transmission_errors: self
                .transmission_errors
                .saturating_sub(earlier.transmission_errors),
        }
    }
}

/// Per-window activity between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub sent: u64,
    pub retransmissions: u64,
    pub transmission_errors: u64,
}
