//! Logplex Gateway
//!
//! Authenticated HTTP ingress for logplex drains.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client (POST /logs)
//!        │
//!        ▼
//!   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//!   │  http    │──▶│ security │──▶│  syslog  │──▶│  delivery  │──▶ drain (TCP)
//!   │ server   │   │ gate     │   │  fixer   │   │ outlet +   │
//!   └──────────┘   └──────────┘   └──────────┘   │ forwarders │
//!        ▲                                        └─────┬──────┘
//!        └────────────── acknowledgment ◀───────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```
//!
//! Shutdown is two-phase: a signal stops admission (503), then the process
//! waits for every admitted request to finish before exiting.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use logplex_gateway::config::{load_config, validate_config, ConfigError, GatewayConfig};
use logplex_gateway::delivery::{outlet, ForwarderSet, TcpTransport};
use logplex_gateway::http::HttpServer;
use logplex_gateway::lifecycle::{signals, InFlight, Shutdown};
use logplex_gateway::observability::{init_logging, init_metrics};

#[derive(Debug, Parser)]
#[command(name = "logplex-gateway", version, about = "Authenticated logplex to syslog gateway")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = GatewayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        destination = %config.forwarder.destination,
        outlet_capacity = config.outlet.capacity,
        forwarders = config.outlet.forwarders,
        "start"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let shutdown = Shutdown::new();
    let inflight = InFlight::new();

    let (outlet_tx, outlet_rx) = outlet(config.outlet.capacity);
    let forwarder_config = config.forwarder.clone();
    let forwarders = ForwarderSet::start(config.outlet.forwarders, outlet_rx, |_| {
        TcpTransport::new(forwarder_config.clone())
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, outlet_tx, shutdown.clone(), inflight.clone());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server_task = tokio::spawn(server.run(listener, async move {
        let _ = stop_rx.await;
    }));

    signals::spawn_signal_listener(shutdown.clone());

    tokio::select! {
        _ = shutdown.wait() => {}
        res = &mut server_task => {
            // The server only returns on its own when serving failed.
            shutdown.trigger();
            res??;
            return Err("HTTP server exited unexpectedly".into());
        }
    }

    tracing::info!(in_flight = inflight.count(), "drain");
    inflight.wait_idle().await;

    let _ = stop_tx.send(());
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed during shutdown"),
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
    }

    // Payloads whose requests already timed out may still be queued.
    let grace = config.outlet.deliver_timeout();
    if tokio::time::timeout(grace, forwarders.join()).await.is_err() {
        tracing::warn!(grace_ms = grace.as_millis() as u64, "Forwarders still busy at exit");
    }

    tracing::info!("exit");
    Ok(())
}
