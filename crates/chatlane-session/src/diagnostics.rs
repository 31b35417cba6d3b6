use std::error::Error;

use chatlane_frame::SchedulerStats;
use chatlane_transport::Lane;
use serde::Serialize;
use tracing::{debug, warn};

/// Sink for per-token failures and transport conditions.
///
/// Nothing reported here stops a tick. Every method logs through `tracing`
/// by default, so an implementation only overrides what it wants to keep.
pub trait Diagnostics {
    /// An inbound line or token could not be decoded.
    fn malformed(&mut self, sender: &str, token: &str, reason: &(dyn Error + 'static)) {
        warn!(sender, token, error = %reason, "dropping malformed token");
    }

    /// A handler returned an error.
    fn handler_failed(&mut self, sender: &str, tag: &str, reason: &(dyn Error + 'static)) {
        warn!(sender, tag, error = %reason, "handler failed");
    }

    /// An outbound message was refused by the encoder.
    fn encoding_rejected(&mut self, tag: &str, reason: &(dyn Error + 'static)) {
        warn!(tag, error = %reason, "outbound message rejected");
    }

    /// The line sink refused a line.
    fn send_failed(&mut self, lane: Lane, reason: &(dyn Error + 'static)) {
        warn!(lane = lane.name(), error = %reason, "send failed");
    }

    /// The frame queue rose above its soft limit.
    fn queue_growth(&mut self, stats: &SchedulerStats) {
        debug!(
            depth = stats.queue_depth,
            high_water = stats.queue_high_water,
            "frame queue growing"
        );
    }
}

/// Logs every report through `tracing` and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {}

/// One recorded report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    Malformed {
        sender: String,
        token: String,
        reason: String,
    },
    HandlerFailed {
        sender: String,
        tag: String,
        reason: String,
    },
    EncodingRejected {
        tag: String,
        reason: String,
    },
    SendFailed {
        lane: Lane,
        reason: String,
    },
    QueueGrowth {
        depth: usize,
    },
}

/// Keeps every report in memory, in order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsLog {
    events: Vec<DiagnosticEvent>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn malformed_count(&self) -> usize {
        self.count(|event| matches!(event, DiagnosticEvent::Malformed { .. }))
    }

    pub fn handler_failure_count(&self) -> usize {
        self.count(|event| matches!(event, DiagnosticEvent::HandlerFailed { .. }))
    }

    fn count(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

impl Diagnostics for DiagnosticsLog {
    fn malformed(&mut self, sender: &str, token: &str, reason: &(dyn Error + 'static)) {
        debug!(sender, token, error = %reason, "malformed token recorded");
        self.events.push(DiagnosticEvent::Malformed {
            sender: sender.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        });
    }

    fn handler_failed(&mut self, sender: &str, tag: &str, reason: &(dyn Error + 'static)) {
        debug!(sender, tag, error = %reason, "handler failure recorded");
        self.events.push(DiagnosticEvent::HandlerFailed {
            sender: sender.to_string(),
            tag: tag.to_string(),
            reason: reason.to_string(),
        });
    }

    fn encoding_rejected(&mut self, tag: &str, reason: &(dyn Error + 'static)) {
        self.events.push(DiagnosticEvent::EncodingRejected {
            tag: tag.to_string(),
            reason: reason.to_string(),
        });
    }

    fn send_failed(&mut self, lane: Lane, reason: &(dyn Error + 'static)) {
        self.events.push(DiagnosticEvent::SendFailed {
            lane,
            reason: reason.to_string(),
        });
    }

    fn queue_growth(&mut self, stats: &SchedulerStats) {
        self.events.push(DiagnosticEvent::QueueGrowth {
            depth: stats.queue_depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use chatlane_frame::FrameError;

    use super::*;

    #[test]
    fn log_keeps_reports_in_order() {
        let mut log = DiagnosticsLog::new();
        log.malformed("alice", "junk", &FrameError::EmptyFrame);
        log.handler_failed("bob", "move", &std::io::Error::other("boom"));
        log.queue_growth(&SchedulerStats {
            queue_depth: 65,
            ..SchedulerStats::default()
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.malformed_count(), 1);
        assert_eq!(log.handler_failure_count(), 1);
        assert_eq!(
            log.events()[1],
            DiagnosticEvent::HandlerFailed {
                sender: "bob".to_string(),
                tag: "move".to_string(),
                reason: "boom".to_string(),
            }
        );
        assert_eq!(log.events()[2], DiagnosticEvent::QueueGrowth { depth: 65 });

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn events_serialize_with_kind() {
        let event = DiagnosticEvent::SendFailed {
            lane: Lane::Chat,
            reason: "closed".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "send_failed");
        assert_eq!(json["lane"], "chat");
    }

    #[test]
    fn tracing_defaults_do_not_panic() {
        let mut diagnostics = TracingDiagnostics;
        diagnostics.malformed("a", "b", &FrameError::EmptyFrame);
        diagnostics.send_failed(Lane::Logic, &FrameError::EmptyFrame);
    }
}
