//! JSON Lines sink for wired (serial) deployments.
//!
//! Each event becomes one JSON object terminated by `\n`. Every record
//! carries a common header followed by kind-specific fields:
//!
//! ```text
//! {"type":"card","ts":"T+1520","device_id":"AA:BB:CC:DD:EE:FF","seq":2,"card_uid":"04 AA BB CC","tech":"MIFARE","rssi":0}
//! {"type":"error","ts":"T+12","device_id":"table-1","seq":1,"code":"rfid_init_failed","message":"..."}
//! {"type":"boot","ts":"T+540","device_id":"table-1","seq":3,"fw_version":"1.2.0","reason":"power_on"}
//! ```
//!
//! `seq` starts at 1 and increases by one per record written. `ts` is the
//! number of milliseconds since the sink was created.

use std::io::Write;
use std::time::Duration;

use cardscan_core::Event;
use cardscan_core::constants::CARD_TECH_MIFARE;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::error::Result;
use crate::sink::EventSink;

#[derive(Serialize)]
struct Record<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    ts: String,
    device_id: &'a str,
    seq: u64,
    #[serde(flatten)]
    body: Body<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Body<'a> {
    Card {
        card_uid: String,
        tech: &'static str,
        rssi: i32,
    },
    Error {
        code: &'a str,
        message: &'a str,
    },
    Boot {
        fw_version: &'a str,
        reason: &'a str,
    },
}

/// Writes events as JSON Lines to any byte stream.
///
/// # Examples
///
/// ```
/// use cardscan_core::Event;
/// use cardscan_network::{EventSink, JsonLinesSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cardscan_network::Result<()> {
/// let mut sink = JsonLinesSink::new(Vec::new(), "table-1", "1.0.0");
/// sink.emit(Event::power_on()).await?;
///
/// let output = String::from_utf8(sink.into_inner()).unwrap();
/// assert!(output.starts_with(r#"{"type":"boot","ts":"T+"#));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    device_id: String,
    fw_version: String,
    started: Instant,
    seq: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink writing to `writer`; the boot clock starts now.
    pub fn new(writer: W, device_id: impl Into<String>, fw_version: impl Into<String>) -> Self {
        Self {
            writer,
            device_id: device_id.into(),
            fw_version: fw_version.into(),
            started: Instant::now(),
            seq: 0,
        }
    }

    /// Sequence number of the last record written (0 before the first).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, event: &Event) -> Result<()> {
        let body = match event {
            Event::CardDetected { uid, .. } => Body::Card {
                card_uid: uid.to_hex(),
                tech: CARD_TECH_MIFARE,
                rssi: 0,
            },
            Event::Error { code, message } => Body::Error { code, message },
            Event::Boot { reason } => Body::Boot {
                fw_version: &self.fw_version,
                reason,
            },
        };

        let seq = self.seq + 1;
        let record = Record {
            kind: event.kind(),
            ts: format_uptime(self.started.elapsed()),
            device_id: &self.device_id,
            seq,
            body,
        };

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;

        self.seq = seq;
        trace!(seq, kind = event.kind(), "Record written");
        Ok(())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    async fn emit(&mut self, event: Event) -> Result<()> {
        self.write_record(&event)
    }
}

/// Format an uptime the way the wired firmware stamps records.
pub fn format_uptime(uptime: Duration) -> String {
    format!("T+{}", uptime.as_millis())
}

/// Open a serial device for a [`JsonLinesSink`].
///
/// # Errors
///
/// Returns an error if the port cannot be opened.
pub fn open_serial_port(path: &str, baud_rate: u32) -> Result<Box<dyn serialport::SerialPort>> {
    let port = serialport::new(path, baud_rate)
        .timeout(Duration::from_secs(1))
        .open()?;
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscan_core::{Channel, Uid};
    use rstest::rstest;
    use serde_json::Value;

    fn lines(sink: JsonLinesSink<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(sink.into_inner())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_card_record_shape() {
        let mut sink = JsonLinesSink::new(Vec::new(), "AA:BB:CC:DD:EE:FF", "1.0.0");
        let uid = Uid::new(vec![0x04, 0xAA, 0xBB, 0xCC]).unwrap();
        sink.on_card_detected(Channel::from_index(1), uid).await.unwrap();

        let records = lines(sink);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["type"], "card");
        assert_eq!(record["device_id"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(record["seq"], 1);
        assert_eq!(record["card_uid"], "04 AA BB CC");
        assert_eq!(record["tech"], "MIFARE");
        assert_eq!(record["rssi"], 0);
        assert!(record["ts"].as_str().unwrap().starts_with("T+"));
        assert!(record.get("channel").is_none());
    }

    #[tokio::test]
    async fn test_error_and_boot_records() {
        let mut sink = JsonLinesSink::new(Vec::new(), "table-1", "2.3.1");
        sink.on_error("rfid_init_failed", "Failed to initialize RFID reader on channel 1")
            .await
            .unwrap();
        sink.on_boot("power_on").await.unwrap();

        let records = lines(sink);
        assert_eq!(records[0]["type"], "error");
        assert_eq!(records[0]["code"], "rfid_init_failed");
        assert_eq!(
            records[0]["message"],
            "Failed to initialize RFID reader on channel 1"
        );
        assert_eq!(records[1]["type"], "boot");
        assert_eq!(records[1]["fw_version"], "2.3.1");
        assert_eq!(records[1]["reason"], "power_on");
    }

    #[tokio::test]
    async fn test_seq_strictly_increasing() {
        let mut sink = JsonLinesSink::new(Vec::new(), "table-1", "1.0.0");
        for _ in 0..5 {
            sink.emit(Event::power_on()).await.unwrap();
        }
        assert_eq!(sink.seq(), 5);

        let seqs: Vec<u64> = lines(sink)
            .iter()
            .map(|r| r["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamp_tracks_uptime() {
        let mut sink = JsonLinesSink::new(Vec::new(), "table-1", "1.0.0");
        tokio::time::advance(Duration::from_millis(1520)).await;
        sink.emit(Event::power_on()).await.unwrap();

        assert_eq!(lines(sink)[0]["ts"], "T+1520");
    }

    #[tokio::test]
    async fn test_write_failure_keeps_seq() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("unplugged"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = JsonLinesSink::new(Broken, "table-1", "1.0.0");
        assert!(sink.emit(Event::power_on()).await.is_err());
        assert_eq!(sink.seq(), 0);
    }

    #[rstest]
    #[case(Duration::ZERO, "T+0")]
    #[case(Duration::from_millis(1520), "T+1520")]
    #[case(Duration::from_secs(90), "T+90000")]
    #[case(Duration::from_micros(2_999), "T+2")]
    fn test_format_uptime(#[case] uptime: Duration, #[case] expected: &str) {
        assert_eq!(format_uptime(uptime), expected);
    }
}
