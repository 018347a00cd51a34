//! Wiring of the scanner process: transport selection and the scan loop.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use cardscan_core::PairId;
use cardscan_hardware::{CardReader, Indicator, LedColor, Multiplexer};
use cardscan_network::{
    AnyEventSink, EventDispatcher, EventSink, HttpSink, JsonLinesSink, open_serial_port,
};
use cardscan_scanner::{MonotonicClock, Scanner};
use tracing::{debug, error, info, warn};

use crate::config::{DeviceConfig, Transport};

/// Load and check the device configuration.
///
/// A file that cannot be read or parsed and a configuration that fails
/// validation are the same provisioning failure: it is logged and the
/// error returned only after `restart_delay`, so a supervisor restarting
/// the process does not spin.
pub async fn provision<F>(load: F, restart_delay: Duration) -> anyhow::Result<DeviceConfig>
where
    F: FnOnce() -> anyhow::Result<DeviceConfig>,
{
    let result = load().and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    if let Err(e) = &result {
        error!(error = ?e, "Provisioning failed, restarting");
        tokio::time::sleep(restart_delay).await;
    }
    result
}

/// Build the sink for the configured transport.
///
/// The HTTP transport also returns the dispatcher that owns the delivery
/// worker; it must be shut down to flush queued events.
pub fn build_sink(
    config: &DeviceConfig,
    device_id: &str,
    reader_count: usize,
) -> anyhow::Result<(AnyEventSink, Option<EventDispatcher>)> {
    match config.transport {
        Transport::Stdout => {
            let sink = JsonLinesSink::new(std::io::stdout(), device_id, &config.fw_version);
            Ok((AnyEventSink::Stdout(sink), None))
        }
        Transport::Serial => {
            let path = config
                .serial_port
                .as_deref()
                .context("serial transport requires serial_port")?;
            let port = open_serial_port(path, config.baud_rate)
                .with_context(|| format!("opening serial port {path}"))?;
            info!(path, baud_rate = config.baud_rate, "Serial port open");
            let sink = JsonLinesSink::new(port, device_id, &config.fw_version);
            Ok((AnyEventSink::Serial(sink), None))
        }
        Transport::Http => {
            let http = HttpSink::new(config.http.clone(), device_id, config.mode, reader_count)
                .context("building HTTP client")?;
            info!(host = %config.http.host, "Reporting to table server");
            let dispatcher = EventDispatcher::spawn(http, config.queue_capacity);
            Ok((AnyEventSink::Queued(dispatcher.sink()), Some(dispatcher)))
        }
    }
}

/// Scan until `shutdown` resolves, lighting `indicator` while `pair` is complete.
///
/// Returns the number of scan cycles run.
pub async fn scan_loop<M, R, S, C, I>(
    scanner: &mut Scanner<M, R, S, C>,
    indicator: &mut I,
    pair: PairId,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> u64
where
    M: Multiplexer,
    R: CardReader,
    S: EventSink,
    C: MonotonicClock,
    I: Indicator,
{
    tokio::pin!(shutdown);
    let mut lit = None;
    let mut cycles = 0;

    loop {
        let report = scanner.tick().await;
        cycles += 1;
        if report.emitted > 0 || report.failed > 0 {
            debug!(?report, "Scan cycle");
        }

        let complete = scanner.is_pair_complete(pair);
        if lit != Some(complete) {
            let color = if complete { LedColor::Green } else { LedColor::Off };
            match indicator.set_color(color).await {
                Ok(()) => lit = Some(complete),
                Err(e) => warn!(error = %e, "Pair indicator failed"),
            }
        }

        tokio::select! {
            () = &mut shutdown => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    cycles
}
