//! HTTP sink for WiFi deployments.
//!
//! Cards and boots are posted as JSON to the table server:
//!
//! | Event | Request | Body |
//! |-------|---------|------|
//! | card  | `POST {host}/card` | `{"device_id", "uid", "pair_id"}` |
//! | boot  | `POST {host}/device/boot` | `{"device_id", "pair_ids"}` |
//!
//! The server has no endpoint for device errors; those are written to the
//! log instead.
//!
//! # Retry policy
//!
//! Any HTTP response, whatever its status, ends a delivery: the server
//! received the request. Only transport failures (connect, timeout, reset)
//! are retried, up to `attempts` times with `backoff` between attempts.

use std::time::Duration;

use cardscan_core::constants::{DEFAULT_POST_ATTEMPTS, DEFAULT_POST_BACKOFF_MS, DEFAULT_POST_TIMEOUT_MS};
use cardscan_core::{Channel, Event, OperatingMode, Uid};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::error::{Result, SinkError};
use crate::sink::EventSink;

/// Connection and retry settings for [`HttpSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the table server, e.g. `http://192.168.0.10:8080`.
    pub host: String,

    /// Delivery attempts per event (at least one is always made).
    pub attempts: u32,

    /// Pause between attempts.
    #[serde(with = "millis")]
    pub backoff: Duration,

    /// Timeout of a single request.
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl HttpConfig {
    /// Default policy against `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            attempts: DEFAULT_POST_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_POST_BACKOFF_MS),
            timeout: Duration::from_millis(DEFAULT_POST_TIMEOUT_MS),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Serialize)]
struct CardBody<'a> {
    device_id: &'a str,
    uid: String,
    pair_id: u8,
}

#[derive(Debug, Serialize)]
struct BootBody<'a> {
    device_id: &'a str,
    pair_ids: Vec<u8>,
}

/// Posts events to the table server.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    config: HttpConfig,
    device_id: String,
    mode: OperatingMode,
    reader_count: usize,
}

impl HttpSink {
    /// Create a sink for a device running in `mode` with `reader_count` readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: HttpConfig,
        device_id: impl Into<String>,
        mode: OperatingMode,
        reader_count: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            device_id: device_id.into(),
            mode,
            reader_count,
        })
    }

    /// Report a card; the pair is derived from the channel and mode.
    pub async fn post_card(&self, channel: Channel, uid: &Uid) -> Result<StatusCode> {
        let pair_id = self.mode.pair_id_of(channel);
        let body = CardBody {
            device_id: &self.device_id,
            uid: uid.to_hex(),
            pair_id: pair_id.as_u8(),
        };
        self.post_json("/card", &body).await
    }

    /// Register the device and the pairs it serves.
    pub async fn post_boot(&self) -> Result<StatusCode> {
        let body = BootBody {
            device_id: &self.device_id,
            pair_ids: self
                .mode
                .pair_ids(self.reader_count)
                .iter()
                .map(|p| p.as_u8())
                .collect(),
        };
        self.post_json("/device/boot", &body).await
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<StatusCode> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);
        let attempts = self.config.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.client.post(&url).json(body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(%url, status = status.as_u16(), attempt, "POST delivered");
                    } else {
                        warn!(%url, status = status.as_u16(), attempt, "POST rejected by server");
                    }
                    if let Ok(payload) = response.text().await {
                        trace!(%url, %payload, "Server response");
                    }
                    return Ok(status);
                }
                Err(e) => {
                    warn!(%url, attempt, attempts, error = %e, "POST failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }
        }

        Err(SinkError::retries_exhausted(attempts, last_error))
    }
}

impl EventSink for HttpSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        match event {
            Event::CardDetected { channel, uid } => self.post_card(channel, &uid).await.map(|_| ()),
            Event::Boot { reason } => {
                debug!(%reason, "Registering device");
                self.post_boot().await.map(|_| ())
            }
            Event::Error { code, message } => {
                error!(%code, %message, "Device error");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = HttpConfig::new("http://table.local");
        assert_eq!(config.attempts, 3);
        assert_eq!(config.backoff, Duration::from_millis(100));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_durations_in_millis() {
        let config: HttpConfig =
            serde_json::from_str(r#"{"host":"http://h","backoff":250}"#).unwrap();
        assert_eq!(config.backoff, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_secs(10));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 10_000);
    }

    #[test]
    fn test_card_body_shape() {
        let body = CardBody {
            device_id: "AA:BB",
            uid: "04 AA".to_string(),
            pair_id: 2,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"device_id": "AA:BB", "uid": "04 AA", "pair_id": 2})
        );
    }
}
