//! Table simulator driven from stdin.
//!
//! Without reader hardware the binary scans a simulated table. Each line on
//! stdin is one command:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `place <channel> <uid>` | put a card on an antenna |
//! | `remove <channel>` | take the card off an antenna |
//! | `clear` | take every card off the table |
//! | `nack <channel> on\|off` | make the multiplexer refuse a channel |

use cardscan_core::{Channel, Uid};
use cardscan_hardware::mock::MockTableHandle;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

/// One simulator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Place(Channel, Uid),
    Remove(Channel),
    Clear,
    Nack(Channel, bool),
}

impl Command {
    /// Parse a command line. Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str, reader_count: usize) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let channel = |text: &str| -> anyhow::Result<Channel> {
            let index: usize = text
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid channel '{text}'"))?;
            Ok(Channel::new(index, reader_count)?)
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "place" => {
                let (ch, uid) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow::anyhow!("usage: place <channel> <uid>"))?;
                Self::Place(channel(ch)?, Uid::parse_hex(uid)?)
            }
            "remove" => Self::Remove(channel(rest)?),
            "clear" => Self::Clear,
            "nack" => {
                let (ch, state) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow::anyhow!("usage: nack <channel> on|off"))?;
                let faulty = match state.trim() {
                    "on" => true,
                    "off" => false,
                    other => anyhow::bail!("invalid nack state '{other}'"),
                };
                Self::Nack(channel(ch)?, faulty)
            }
            other => anyhow::bail!("unknown command '{other}'"),
        };
        Ok(Some(command))
    }

    /// Apply the command to the simulated table.
    pub fn apply(&self, table: &MockTableHandle) {
        match self {
            Self::Place(channel, uid) => {
                table.place_card(*channel, uid.clone());
            }
            Self::Remove(channel) => {
                table.remove_card(*channel);
            }
            Self::Clear => table.clear(),
            Self::Nack(channel, faulty) => table.set_select_fault(*channel, *faulty),
        }
    }
}

/// Feed commands from `input` to the table until end of input.
pub async fn run<R>(input: R, table: MockTableHandle, reader_count: usize)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Command::parse(&line, reader_count) {
                Ok(Some(command)) => {
                    info!(?command, "Simulator command");
                    command.apply(&table);
                }
                Ok(None) => {}
                Err(e) => warn!(%line, error = %e, "Ignoring simulator command"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Simulator input failed");
                break;
            }
        }
    }
    info!("Simulator input closed");
}
