use clap::error::ErrorKind;
use std::process;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use volley::client::ClientManager;
use volley::config::Config;
use volley::config::parser::RawConfig;
use volley::errors::{Result, VolleyError};

/// Exit code for usage, probe and fatal errors
const EXIT_FAILURE: i32 = -1;

#[tokio::main]
async fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(VolleyError::Cli(e))
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = e.print();
            process::exit(0);
        }
        Err(e) => {
            if e.is_usage_error() {
                println!("{}", RawConfig::usage());
            }
            eprintln!("{}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    init_logging(&config);

    match run(config).await {
        Ok(()) => process::exit(0),
        Err(VolleyError::Probe(uri)) => {
            println!("Request {} failed, exit benchmark.", uri);
            process::exit(EXIT_FAILURE);
        }
        Err(e) => {
            error!("Benchmark failed: {}", e);
            process::exit(EXIT_FAILURE);
        }
    }
}

/// Main application logic
async fn run(config: Config) -> Result<()> {
    debug!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.print_summary();

    let report = ClientManager::new(config)?.run().await?;
    if report.is_stale() {
        warn!("Benchmark went stale before the request budget was spent");
    }
    info!(
        "Benchmark ended ({:?}): {} of {} requests",
        report.termination, report.sent, report.expected
    );
    Ok(())
}

/// Initialize logging based on configuration. Logs go to stderr, stdout carries
/// the benchmark output only.
fn init_logging(config: &Config) {
    let volley_level = if config.output.verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    format!("volley={}", volley_level)
                        .parse()
                        .expect("Invalid filter directive"),
                )
                .add_directive("reqwest=warn".parse().expect("Invalid filter directive"))
                .add_directive("hyper=warn".parse().expect("Invalid filter directive"))
                .add_directive(
                    "tokio_tungstenite=warn"
                        .parse()
                        .expect("Invalid filter directive"),
                )
                .add_directive(
                    "tungstenite=warn"
                        .parse()
                        .expect("Invalid filter directive"),
                ),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    if config.output.verbose {
        debug!("Verbose logging enabled");
    }
}
