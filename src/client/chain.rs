//! Per-client request chain
//!
//! A chain owns one transport and keeps exactly one request in flight: the next
//! request is issued only after the previous one resolved. The chain runs as a
//! single tokio task, so resolving a request and issuing the next one happen in
//! the same loop iteration.
//!
//! Lifecycle: `Created -> Started -> Running -> Stopped`. `stop()` may race between
//! the chain's own task and the orchestrator; an atomic swap on the state makes
//! exactly one caller perform the teardown.

use crate::client::{IgnoreRetransmissions, Transport};
use crate::common::ClientId;
use crate::constants::DEBUG_LOG_INTERVAL;
use crate::errors::Result;
use crate::message::{Outcome, RequestTemplate};
use crate::metrics::Counters;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Chain lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChainState {
    Created = 0,
    Started = 1,
    Running = 2,
    Stopped = 3,
}

impl From<u8> for ChainState {
    fn from(value: u8) -> Self {
        match value {
            0 => ChainState::Created,
            1 => ChainState::Started,
            2 => ChainState::Running,
            _ => ChainState::Stopped,
        }
    }
}

/// What the chain does after a request resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Next,
    Stop,
}

/// One virtual client
pub struct ClientChain {
    client_id: ClientId,
    transport: Arc<dyn Transport>,
    counters: Arc<Counters>,
    template: Arc<RequestTemplate>,
    stop_on_failure: bool,
    state: AtomicU8,
    /// Requests accounted against the budget by this chain; written by its own task only
    sent: AtomicU64,
    shutdown_tx: broadcast::Sender<()>,
}

impl ClientChain {
    pub fn new(
        client_id: ClientId,
        transport: Arc<dyn Transport>,
        counters: Arc<Counters>,
        template: Arc<RequestTemplate>,
        stop_on_failure: bool,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            client_id,
            transport,
            counters,
            template,
            stop_on_failure,
            state: AtomicU8::new(ChainState::Created as u8),
            sent: AtomicU64::new(0),
            shutdown_tx,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn state(&self) -> ChainState {
        ChainState::from(self.state.load(Ordering::Acquire))
    }

    /// Requests accounted by this chain so far; exact once the chain stopped and its
    /// task was joined
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    fn transition(&self, from: ChainState, to: ChainState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Bind the transport. `Created -> Started`.
    pub async fn start(&self) -> Result<()> {
        if self.state() != ChainState::Created {
            return Ok(());
        }
        self.transport.start().await?;
        if !self.transition(ChainState::Created, ChainState::Started) {
            debug!("Client {} stopped while starting", self.client_id);
        }
        Ok(())
    }

    /// One synchronous round trip used as a connectivity gate. Touches no counter.
    pub async fn probe(&self) -> bool {
        if self.state() != ChainState::Started {
            warn!("Client {} cannot probe in state {:?}", self.client_id, self.state());
            return false;
        }

        match self
            .transport
            .exchange(self.template.next(), &IgnoreRetransmissions)
            .await
        {
            Outcome::Response(response) if response.is_success() => {
                info!("Received response: {}", response);
                true
            }
            Outcome::Response(response) => {
                warn!("Received error response: {}", response);
                false
            }
            Outcome::NoResponse => {
                warn!("Received no response!");
                false
            }
        }
    }

    /// Launch the self-continuing request chain. `Started -> Running`.
    ///
    /// Returns `None` when the chain was not in the Started state.
    pub fn start_benchmark(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        if !self.transition(ChainState::Started, ChainState::Running) {
            return None;
        }
        self.counters.client_started();

        let chain = Arc::clone(self);
        Some(tokio::spawn(async move { chain.drive(shutdown_rx).await }))
    }

    async fn drive(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            let request = self.template.next();
            let outcome = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                outcome = self.transport.exchange(request, self.counters.as_ref()) => outcome,
            };

            if self.resolve(outcome) == Step::Stop {
                self.stop().await;
                break;
            }
        }
        debug!("Client {} chain ended after {} requests", self.client_id, self.sent());
    }

    /// Apply one resolution to the counters and decide whether to continue
    fn resolve(&self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Response(response) if response.is_success() => self.account(false),
            failure => {
                let sent = self.sent();
                if self.stop_on_failure {
                    match failure {
                        Outcome::Response(response) => {
                            warn!("Received error response: {}", response)
                        }
                        Outcome::NoResponse => {}
                    }
                    error!("Client {} failed after {} requests!", self.client_id, sent);
                    Step::Stop
                } else {
                    info!("Client {} error after {} requests.", self.client_id, sent);
                    self.account(true)
                }
            }
        }
    }

    /// Take one unit of the shared budget; continue while some is left.
    ///
    /// A failure only counts as a transmission error when it consumed budget.
    fn account(&self, failed: bool) -> Step {
        match self.counters.consume() {
            Some(remaining) => {
                if failed {
                    self.counters.record_transmission_error();
                }
                let sent = self.sent.fetch_add(1, Ordering::AcqRel) + 1;
                if sent % DEBUG_LOG_INTERVAL == 0 {
                    debug!(
                        "Client {} sent {} requests, {} left overall",
                        self.client_id, sent, remaining
                    );
                }
                if remaining > 0 { Step::Next } else { Step::Stop }
            }
            None => Step::Stop,
        }
    }

    /// Stop the chain and release its transport, once.
    ///
    /// Returns the number of requests this chain accounted.
    pub async fn stop(&self) -> u64 {
        let previous = ChainState::from(
            self.state
                .swap(ChainState::Stopped as u8, Ordering::AcqRel),
        );
        if previous != ChainState::Stopped {
            let _ = self.shutdown_tx.send(());
            self.transport.stop().await;
            self.transport.destroy().await;
            if previous == ChainState::Running {
                self.counters.client_stopped();
            }
            debug!("Client {} stopped (was {:?})", self.client_id, previous);
        }
        self.sent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetransmissionObserver;
    use crate::message::{Request, Response};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Transport answering from a script; when the script runs dry it repeats `fallback`
    struct ScriptedTransport {
        script: Mutex<VecDeque<Outcome>>,
        fallback: Option<Outcome>,
        retransmissions_per_request: u32,
        exchanges: AtomicU64,
        stops: AtomicU64,
        destroys: AtomicU64,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Outcome>, fallback: Option<Outcome>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                retransmissions_per_request: 0,
                exchanges: AtomicU64::new(0),
                stops: AtomicU64::new(0),
                destroys: AtomicU64::new(0),
            })
        }

        fn always(outcome: Outcome) -> Arc<Self> {
            Self::new(vec![], Some(outcome))
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn start(&self) -> Result<()> {
            Ok(())
        }

        async fn exchange(&self, _request: Request, observer: &dyn RetransmissionObserver) -> Outcome {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            for _ in 0..self.retransmissions_per_request {
                observer.on_retransmission();
            }
            let next = self.script.lock().await.pop_front();
            match next.or_else(|| self.fallback.clone()) {
                Some(outcome) => {
                    tokio::task::yield_now().await;
                    outcome
                }
                // Hang until stopped from outside
                None => std::future::pending().await,
            }
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        async fn destroy(&self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ok() -> Outcome {
        Outcome::Response(Response::new(200, ""))
    }

    fn chain(
        transport: Arc<ScriptedTransport>,
        counters: &Arc<Counters>,
        stop_on_failure: bool,
    ) -> Arc<ClientChain> {
        Arc::new(ClientChain::new(
            ClientId::new(1),
            transport,
            Arc::clone(counters),
            Arc::new(RequestTemplate::default()),
            stop_on_failure,
        ))
    }

    async fn finish(handle: JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("chain should terminate")
            .unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let counters = Arc::new(Counters::new(1));
        let chain = chain(ScriptedTransport::always(ok()), &counters, true);
        assert_eq!(chain.state(), ChainState::Created);
        assert!(chain.start_benchmark().is_none());

        chain.start().await.unwrap();
        assert_eq!(chain.state(), ChainState::Started);

        let handle = chain.start_benchmark().unwrap();
        finish(handle).await;
        assert_eq!(chain.state(), ChainState::Stopped);
        assert_eq!(chain.sent(), 1);
    }

    #[tokio::test]
    async fn test_chain_consumes_whole_budget() {
        let counters = Arc::new(Counters::new(25));
        let transport = ScriptedTransport::always(ok());
        let chain = chain(Arc::clone(&transport), &counters, true);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;

        assert_eq!(chain.sent(), 25);
        assert_eq!(counters.remaining(), 0);
        assert_eq!(counters.active_clients(), 0);
        assert_eq!(transport.exchanges.load(Ordering::SeqCst), 25);
        assert_eq!(transport.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_touches_no_counter() {
        let counters = Arc::new(Counters::new(5));
        let chain = chain(ScriptedTransport::always(ok()), &counters, true);
        assert!(!chain.probe().await);
        chain.start().await.unwrap();
        assert!(chain.probe().await);
        assert_eq!(counters.snapshot().remaining, 5);
        assert_eq!(chain.sent(), 0);
    }

    #[tokio::test]
    async fn test_probe_fails_on_error_status() {
        let counters = Arc::new(Counters::new(5));
        let transport = ScriptedTransport::always(Outcome::Response(Response::new(501, "")));
        let chain = chain(transport, &counters, true);
        chain.start().await.unwrap();
        assert!(!chain.probe().await);
    }

    #[tokio::test]
    async fn test_failure_stops_chain() {
        let counters = Arc::new(Counters::new(10));
        let transport = ScriptedTransport::new(vec![ok(), ok(), Outcome::NoResponse], Some(ok()));
        let chain = chain(Arc::clone(&transport), &counters, true);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;

        assert_eq!(chain.sent(), 2);
        assert_eq!(counters.remaining(), 8);
        assert_eq!(counters.transmission_errors(), 0);
        assert_eq!(counters.active_clients(), 0);
    }

    #[tokio::test]
    async fn test_error_status_counts_as_failure() {
        let counters = Arc::new(Counters::new(10));
        let transport = ScriptedTransport::always(Outcome::Response(Response::new(500, "")));
        let chain = chain(transport, &counters, true);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;
        assert_eq!(chain.sent(), 0);
        assert_eq!(counters.remaining(), 10);
    }

    #[tokio::test]
    async fn test_tolerant_chain_terminates_on_budget() {
        let counters = Arc::new(Counters::new(7));
        let transport = ScriptedTransport::always(Outcome::NoResponse);
        let chain = chain(Arc::clone(&transport), &counters, false);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;

        assert_eq!(counters.remaining(), 0);
        assert_eq!(counters.transmission_errors(), 7);
        assert_eq!(chain.sent(), 7);
        assert_eq!(transport.exchanges.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_failure_after_budget_drained_is_not_counted() {
        let counters = Arc::new(Counters::new(1));
        assert_eq!(counters.consume(), Some(0));
        let chain = chain(ScriptedTransport::always(Outcome::NoResponse), &counters, false);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;

        assert_eq!(counters.transmission_errors(), 0);
        assert_eq!(chain.sent(), 0);
    }

    #[tokio::test]
    async fn test_retransmissions_do_not_affect_progress() {
        let counters = Arc::new(Counters::new(4));
        let transport = Arc::new(ScriptedTransport {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(ok()),
            retransmissions_per_request: 2,
            exchanges: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            destroys: AtomicU64::new(0),
        });
        let chain = chain(transport, &counters, true);
        chain.start().await.unwrap();
        finish(chain.start_benchmark().unwrap()).await;

        assert_eq!(chain.sent(), 4);
        assert_eq!(counters.retransmissions(), 8);
    }

    #[tokio::test]
    async fn test_external_stop_of_hanging_chain() {
        let counters = Arc::new(Counters::new(10));
        let transport = ScriptedTransport::new(vec![ok()], None);
        let chain = chain(Arc::clone(&transport), &counters, true);
        chain.start().await.unwrap();
        let handle = chain.start_benchmark().unwrap();
        assert_eq!(counters.active_clients(), 1);

        while transport.exchanges.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(chain.stop().await, 1);
        finish(handle).await;

        assert_eq!(counters.active_clients(), 0);
        assert_eq!(transport.stops.load(Ordering::SeqCst), 1);
        assert_eq!(transport.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stop_tears_down_once() {
        for _ in 0..50 {
            let counters = Arc::new(Counters::new(1_000));
            let transport = ScriptedTransport::always(ok());
            let chain = chain(Arc::clone(&transport), &counters, true);
            chain.start().await.unwrap();
            let handle = chain.start_benchmark().unwrap();

            let racers: Vec<_> = (0..4)
                .map(|_| {
                    let chain = Arc::clone(&chain);
                    tokio::spawn(async move { chain.stop().await })
                })
                .collect();
            for racer in racers {
                racer.await.unwrap();
            }
            finish(handle).await;

            assert_eq!(chain.state(), ChainState::Stopped);
            assert_eq!(counters.active_clients(), 0);
            assert_eq!(transport.stops.load(Ordering::SeqCst), 1);
            assert_eq!(transport.destroys.load(Ordering::SeqCst), 1);
            assert_eq!(chain.sent(), 1_000 - counters.remaining());
        }
    }

    #[tokio::test]
    async fn test_stop_before_benchmark_keeps_active_count() {
        let counters = Arc::new(Counters::new(3));
        counters.client_started();
        let chain = chain(ScriptedTransport::always(ok()), &counters, true);
        chain.start().await.unwrap();
        assert_eq!(chain.stop().await, 0);
        assert_eq!(counters.active_clients(), 1);
        assert!(chain.start_benchmark().is_none());
    }
}
