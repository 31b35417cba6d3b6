use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::lane::Lane;
use crate::line::validate_line_text;
use crate::traits::LineSink;

/// One line handed to a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentLine {
    pub lane: Lane,
    pub text: String,
}

/// In-memory sink that records every line in send order.
///
/// Lines are validated exactly as a network transport would validate them.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    lines: Vec<SentLine>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, oldest first.
    pub fn lines(&self) -> &[SentLine] {
        &self.lines
    }

    /// Text of the lines recorded on one lane, oldest first.
    pub fn lines_on(&self, lane: Lane) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| line.lane == lane)
            .map(|line| line.text.as_str())
            .collect()
    }

    /// Number of recorded lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<SentLine> {
        std::mem::take(&mut self.lines)
    }
}

impl LineSink for RecordingSink {
    fn send_line(&mut self, lane: Lane, text: &str) -> Result<()> {
        validate_line_text(text)?;
        trace!(%lane, len = text.len(), "recorded line");
        self.lines.push(SentLine {
            lane,
            text: text.to_string(),
        });
        Ok(())
    }
}
