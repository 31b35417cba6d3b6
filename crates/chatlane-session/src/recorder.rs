use std::io::Write;

use chatlane_frame::Tick;
use chatlane_transport::Lane;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which way a recorded line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// One recorded line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub tick: Tick,
    pub direction: Direction,
    pub lane: Lane,
    /// Sender identity for inbound lines; empty for outbound.
    pub sender: String,
    pub text: String,
}

/// Records traffic in memory and optionally as JSON lines to a writer.
///
/// Outbound logic messages are recorded one per message, as accepted for
/// batching. A failing writer is logged once and detached.
pub struct TrafficRecorder {
    entries: Vec<TrafficEntry>,
    writer: Option<Box<dyn Write>>,
    keep_entries: bool,
}

impl TrafficRecorder {
    /// Keep entries in memory only.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            writer: None,
            keep_entries: true,
        }
    }

    /// Stream entries to `writer` as JSON lines without keeping them.
    pub fn to_writer(writer: impl Write + 'static) -> Self {
        Self {
            entries: Vec::new(),
            writer: Some(Box::new(writer)),
            keep_entries: false,
        }
    }

    pub fn record(&mut self, entry: TrafficEntry) {
        if let Some(writer) = self.writer.as_mut() {
            let written = serde_json::to_writer(&mut *writer, &entry)
                .map_err(std::io::Error::from)
                .and_then(|()| writer.write_all(b"\n"));
            if let Err(err) = written {
                warn!(error = %err, "traffic recording failed, detaching writer");
                self.writer = None;
            }
        }
        if self.keep_entries {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[TrafficEntry] {
        &self.entries
    }

    pub fn take(&mut self) -> Vec<TrafficEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Flush the writer, if any.
    pub fn flush(&mut self) -> std::io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for TrafficRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficRecorder")
            .field("entries", &self.entries.len())
            .field("streaming", &self.writer.is_some())
            .finish()
    }
}
