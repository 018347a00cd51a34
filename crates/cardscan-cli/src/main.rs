//! `cardscan`: scan a card table and report what lies on it.
//!
//! Runs against the simulated table; cards are placed through commands on
//! stdin (see [`simulator`]). Events go to stdout as JSON lines unless the
//! configuration selects the serial or HTTP transport. Logs go to stderr.
//!
//! Reader hardware is not driven from here: the I2C drivers in
//! `cardscan-hardware` take any `embedded-hal-async` bus, and wiring one to
//! a board is left to the integrator.

mod app;
mod config;
mod identity;
mod indicator;
mod simulator;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cardscan_core::constants::RESTART_DELAY_MS;
use cardscan_core::{Event, OperatingMode, PairId};
use cardscan_hardware::mock::MockTable;
use cardscan_scanner::{Scanner, ScannerConfig, TokioClock};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DeviceConfig, Transport};
use crate::indicator::LogIndicator;

/// Pair whose completion drives the indicator.
const INDICATOR_PAIR: PairId = PairId::new(1);

#[derive(Debug, Parser)]
#[command(author, version, about = "Multi-antenna RFID table scanner", long_about = None)]
struct Args {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "cardscan.json")]
    config: PathBuf,

    /// Operating mode (player, muck, board)
    #[arg(short, long)]
    mode: Option<OperatingMode>,

    /// Device id reported with every event
    #[arg(long)]
    device_id: Option<String>,

    /// Event transport
    #[arg(short, long, value_enum)]
    transport: Option<Transport>,

    /// Table server base URL for the HTTP transport
    #[arg(long)]
    host: Option<String>,

    /// Serial device for the serial transport
    #[arg(long)]
    serial_port: Option<String>,

    /// Do not read simulator commands from stdin
    #[arg(long)]
    no_simulator: bool,
}

impl Args {
    /// Overlay command line flags on the file configuration.
    fn apply(&self, mut config: DeviceConfig) -> DeviceConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(device_id) = &self.device_id {
            config.device_id = Some(device_id.clone());
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(host) = &self.host {
            config.http.host = host.clone();
        }
        if let Some(port) = &self.serial_port {
            config.serial_port = Some(port.clone());
        }
        config
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = app::provision(
        || Ok(args.apply(DeviceConfig::load(&args.config)?)),
        Duration::from_millis(RESTART_DELAY_MS),
    )
    .await?;

    let device_id = identity::resolve(config.device_id.as_deref());
    let reader_count = config.resolved_reader_count()?;
    info!(
        version = cardscan_core::VERSION,
        %device_id,
        mode = %config.mode,
        reader_count,
        transport = ?config.transport,
        "Starting scanner"
    );

    let (sink, dispatcher) = app::build_sink(&config, &device_id, reader_count)?;

    let table = MockTable::new(reader_count);
    if !args.no_simulator {
        tokio::spawn(simulator::run(
            tokio::io::stdin(),
            table.handle.clone(),
            reader_count,
        ));
    }

    let scanner_config = ScannerConfig::new(config.mode).with_reader_count(reader_count)?;
    let mut scanner = Scanner::new(
        scanner_config,
        table.multiplexer,
        table.reader,
        sink,
        TokioClock::new(),
    )
    .context("creating scanner")?;

    scanner.report(Event::power_on()).await;
    let ready = scanner.initialize().await;
    if ready == 0 {
        warn!("No reader answered; scanning anyway");
    }

    let mut indicator = LogIndicator::new(INDICATOR_PAIR);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    };

    app::scan_loop(
        &mut scanner,
        &mut indicator,
        INDICATOR_PAIR,
        Duration::from_millis(config.scan_interval_ms),
        shutdown,
    )
    .await;

    let stats = scanner.stats();
    info!(
        ticks = stats.ticks,
        emitted = stats.emitted,
        suppressed = stats.suppressed,
        select_failures = stats.select_failures,
        sink_failures = stats.sink_failures,
        "Scanner stopped"
    );

    let (_, _, sink) = scanner.into_parts();
    drop(sink);
    if let Some(dispatcher) = dispatcher {
        let delivery = dispatcher.shutdown().await;
        info!(
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Event queue drained"
        );
    }

    Ok(())
}
