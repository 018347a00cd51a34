//! Device configuration.
//!
//! A device reads one JSON document at startup. Every field is optional;
//! a missing file is the same as `{}`.
//!
//! ```json
//! {
//!   "mode": "board",
//!   "device_id": "table-3-board",
//!   "transport": "http",
//!   "http": { "host": "http://192.168.0.10:8080", "attempts": 3 }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use cardscan_core::constants::{
    DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_SCAN_INTERVAL_MS, UNKNOWN_FIRMWARE_VERSION,
};
use cardscan_core::OperatingMode;
use cardscan_network::HttpConfig;
use serde::{Deserialize, Serialize};

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Where events are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON lines on stdout.
    #[default]
    Stdout,

    /// JSON lines on a serial device.
    Serial,

    /// POST to the table server.
    Http,
}

/// Settings of one scanner device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub mode: OperatingMode,

    /// Identity override; the interface MAC is used when absent.
    pub device_id: Option<String>,

    pub fw_version: String,

    /// Reader count override, honoured in fallback mode only.
    pub reader_count: Option<usize>,

    pub scan_interval_ms: u64,

    pub transport: Transport,

    /// Serial device path, required by the serial transport.
    pub serial_port: Option<String>,

    pub baud_rate: u32,

    pub http: HttpConfig,

    /// Events buffered in front of the HTTP worker.
    pub queue_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Unknown,
            device_id: None,
            fw_version: UNKNOWN_FIRMWARE_VERSION.to_string(),
            reader_count: None,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            transport: Transport::default(),
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            http: HttpConfig::default(),
            queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl DeviceConfig {
    /// Load the configuration at `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a configuration document.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Reader count the device runs with.
    pub fn resolved_reader_count(&self) -> anyhow::Result<usize> {
        Ok(self.mode.reader_count(self.reader_count)?)
    }

    /// Check settings that only matter for the chosen transport.
    ///
    /// A missing HTTP host is the provisioning failure the caller treats
    /// as fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.resolved_reader_count()?;

        if self.scan_interval_ms == 0 {
            bail!("scan_interval_ms must be positive");
        }

        match self.transport {
            Transport::Stdout => {}
            Transport::Serial => {
                if self.serial_port.as_deref().is_none_or(str::is_empty) {
                    bail!("serial transport requires serial_port");
                }
            }
            Transport::Http => {
                if self.http.host.trim().is_empty() {
                    bail!("http transport requires http.host");
                }
            }
        }
        Ok(())
    }
}
