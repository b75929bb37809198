//! Orchestrator: launches the client chains, monitors progress and collects the
//! final statistics

use crate::client::{ClientChain, Security, TransportBuilder, select_builder};
use crate::common::ClientId;
use crate::config::{BenchmarkConfig, Config};
use crate::errors::{Result, VolleyError};
use crate::message::RequestTemplate;
use crate::metrics::reporting::format_progress;
use crate::metrics::{CounterDelta, CounterSnapshot, Counters, RunReport, Termination};

use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// A run is stale when an interval passed without any request being accounted
/// (once the run made some progress), or when no chain is running anymore.
pub fn is_stale(current: &CounterSnapshot, window: &CounterDelta, expected: u64) -> bool {
    let progressed_before = current.remaining < expected;
    (window.sent == 0 && progressed_before) || current.active_clients == 0
}

/// Size of the pool starting the remaining clients
fn start_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Coordinates a pool of client chains against one target
pub struct ClientManager {
    config: Config,
    benchmark: BenchmarkConfig,
    builder: Arc<dyn TransportBuilder>,
    template: Arc<RequestTemplate>,
}

impl ClientManager {
    /// Validate the benchmark sizing and select the transport for the target scheme
    pub fn new(config: Config) -> Result<Self> {
        let benchmark = BenchmarkConfig::configure(
            config.benchmark.clients,
            config.benchmark.requests_per_client,
            config.benchmark.stop_on_failure,
        )?;
        let builder = select_builder(&config)?;
        let template = Arc::new(RequestTemplate::new(config.transport.payload.clone()));

        Ok(Self {
            config,
            benchmark,
            builder,
            template,
        })
    }

    /// Replace the transport builder selected from the URI scheme
    pub fn with_transport_builder(mut self, builder: Arc<dyn TransportBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn benchmark(&self) -> &BenchmarkConfig {
        &self.benchmark
    }

    /// Run the benchmark to completion or staleness and print the summary
    pub async fn run(&self) -> Result<RunReport> {
        let expected = self.benchmark.total_requests();
        let counters = Arc::new(Counters::new(expected));

        println!(
            "Create {} {}{}benchmark clients, expect to send {} request overall to {}",
            self.benchmark.clients,
            if self.benchmark.stop_on_failure {
                ""
            } else {
                "none-stop "
            },
            match self.builder.security() {
                Security::Plain => "",
                Security::Secure => "secure ",
            },
            expected,
            self.config.target.url
        );

        let probe_client = self.create_chain(ClientId::PROBE, &counters)?;
        self.probe(&probe_client).await?;

        let remaining = match self.start_remaining(&counters).await {
            Ok(remaining) => remaining,
            Err(e) => {
                probe_client.stop().await;
                return Err(e);
            }
        };
        let mut chains = vec![probe_client];
        chains.extend(remaining);
        println!("Benchmark clients created.");

        let started = Instant::now();
        let handles: Vec<JoinHandle<()>> =
            chains.iter().filter_map(|chain| chain.start_benchmark()).collect();
        println!("Benchmark started.");
        info!("{} of {} chains running", handles.len(), chains.len());

        let termination = self.monitor(&counters, expected).await;
        let mut elapsed = started.elapsed();
        if termination == Termination::Stale {
            elapsed = elapsed.saturating_sub(self.config.monitor.interval);
        }

        let per_client = Self::shutdown(&chains, handles).await;
        let sent = expected - counters.remaining();

        let report = RunReport {
            clients: self.benchmark.clients,
            expected,
            sent,
            elapsed,
            termination,
            retransmissions: counters.retransmissions(),
            transmission_errors: counters.transmission_errors(),
            per_client,
        };
        report.print();
        Ok(report)
    }

    fn create_chain(&self, client_id: ClientId, counters: &Arc<Counters>) -> Result<Arc<ClientChain>> {
        let transport = self.builder.build(client_id)?;
        Ok(Arc::new(ClientChain::new(
            client_id,
            transport,
            Arc::clone(counters),
            Arc::clone(&self.template),
            self.benchmark.stop_on_failure,
        )))
    }

    /// Start client 0 and gate the run on one successful round trip
    async fn probe(&self, chain: &Arc<ClientChain>) -> Result<()> {
        let passed = match chain.start().await {
            Ok(()) => chain.probe().await,
            Err(e) => {
                error!("Client {} failed to start: {}", chain.client_id(), e);
                false
            }
        };

        if passed {
            Ok(())
        } else {
            chain.stop().await;
            Err(VolleyError::Probe(self.config.target.url.clone()))
        }
    }

    /// Create and start clients 1..N on a bounded pool, returning once every one
    /// of them reported back
    async fn start_remaining(&self, counters: &Arc<Counters>) -> Result<Vec<Arc<ClientChain>>> {
        let mut chains = Vec::with_capacity(self.benchmark.clients as usize);
        for index in 1..self.benchmark.clients {
            chains.push(self.create_chain(ClientId::new(index), counters)?);
        }

        let outcomes: Vec<_> = stream::iter(chains.iter().cloned())
            .map(|chain| async move {
                let outcome = chain.start().await;
                (chain, outcome)
            })
            .buffer_unordered(start_parallelism())
            .collect()
            .await;

        for (chain, outcome) in outcomes {
            if let Err(e) = outcome {
                warn!("Client {} failed to start: {}", chain.client_id(), e);
                chain.stop().await;
            }
        }

        Ok(chains)
    }

    /// Forward Ctrl+C to the monitor loop
    fn setup_signal_handler(interrupt_tx: broadcast::Sender<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                return;
            }
            warn!("Received Ctrl+C, stopping clients...");
            let _ = interrupt_tx.send(());
        })
    }

    /// Wait for the budget to drain, sampling the counters every interval
    async fn monitor(&self, counters: &Counters, expected: u64) -> Termination {
        let interval = self.config.monitor.interval;
        let (interrupt_tx, mut interrupt_rx) = broadcast::channel::<()>(1);
        let signal_handler = Self::setup_signal_handler(interrupt_tx);
        let mut last = counters.snapshot();

        let termination = loop {
            tokio::select! {
                drained = timeout(interval, counters.drained()) => {
                    if drained.is_ok() {
                        break Termination::Finished;
                    }
                }
                Ok(()) = interrupt_rx.recv() => break Termination::Interrupted,
            }

            let current = counters.snapshot();
            let window = current.since(&last);
            if is_stale(&current, &window, expected) {
                debug!("Run stale: {:?} {:?}", current, window);
                break Termination::Stale;
            }

            println!("{}", format_progress(&window, &current, interval));
            last = current;
        };

        signal_handler.abort();
        termination
    }

    /// Stop every chain, wait for their tasks and collect per-client counts (ascending)
    async fn shutdown(chains: &[Arc<ClientChain>], handles: Vec<JoinHandle<()>>) -> Vec<u64> {
        for chain in chains {
            chain.stop().await;
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Client task failed: {}", e);
            }
        }

        let mut per_client: Vec<u64> = chains.iter().map(|chain| chain.sent()).collect();
        per_client.sort_unstable();
        per_client
    }
}
