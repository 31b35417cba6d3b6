use std::collections::VecDeque;

use chatlane_transport::{Lane, LineSink, TransportError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::batcher::{Frame, FrameBatcher};
use crate::codec::EncodedMessage;
use crate::error::Result;
use crate::policy::{OverflowPolicy, TransmitPolicy};
use crate::Tick;

/// Counters describing logic-lane traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Messages accepted by the batcher.
    pub messages_appended: u64,
    /// Frames sealed, whether sent directly or queued.
    pub frames_sealed: u64,
    /// Frames handed to the line sink.
    pub frames_sent: u64,
    /// Frames discarded by a bounded overflow policy.
    pub frames_dropped: u64,
    /// Sends the line sink rejected.
    pub send_failures: u64,
    /// Frames currently queued.
    pub queue_depth: usize,
    /// Deepest the queue has been.
    pub queue_high_water: usize,
    /// Times the queue rose above the soft limit.
    pub queue_growth_events: u64,
}

/// What became of a message accepted by [`TransmissionScheduler::push`].
///
/// Every variant means the message itself is held by the scheduler. Only the
/// frame it sealed can have been lost.
#[derive(Debug)]
pub enum Pushed {
    /// The message joined the unsealed frame.
    Batched,
    /// The message sealed the previous frame, which was sent.
    Sent,
    /// The message sealed the previous frame, which waits for the cooldown.
    Queued,
    /// The message sealed the previous frame, which a full queue discarded.
    Dropped,
    /// The message sealed the previous frame and the sink refused it. The
    /// failure is counted in `send_failures`.
    SendFailed(TransportError),
}

impl Pushed {
    /// Returns true if the sealed frame was handed to the sink.
    pub fn sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Enforces the logic-lane cooldown over a batcher and a FIFO frame queue.
///
/// The scheduler counts ticks itself: call [`tick`](Self::tick) exactly once
/// per fixed-rate tick, after that tick's messages were pushed. Two sends are
/// never fewer than `cooldown_ticks` ticks apart, and frames leave in the
/// order they were sealed.
#[derive(Debug)]
pub struct TransmissionScheduler {
    policy: TransmitPolicy,
    batcher: FrameBatcher,
    queue: VecDeque<Frame>,
    ticks_since_send: Tick,
    above_soft_limit: bool,
    stats: SchedulerStats,
}

impl TransmissionScheduler {
    /// Create a scheduler; the first frame may be sent right away.
    pub fn new(policy: TransmitPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            batcher: FrameBatcher::new(policy.max_frame_len),
            queue: VecDeque::new(),
            ticks_since_send: policy.cooldown_ticks,
            above_soft_limit: false,
            stats: SchedulerStats::default(),
            policy,
        })
    }

    /// Batch one encoded message.
    ///
    /// A message over the frame budget is rejected with
    /// `FrameError::MessageTooLarge` and nothing is produced; that is the only
    /// error. If the message seals the previous frame, that frame is sent now
    /// when the lane is ready and nothing is queued ahead of it, otherwise it
    /// is queued. A failed send of the sealed frame comes back as
    /// [`Pushed::SendFailed`], never as an error, since the message itself
    /// was accepted.
    pub fn push<S: LineSink + ?Sized>(
        &mut self,
        message: EncodedMessage,
        sink: &mut S,
    ) -> Result<Pushed> {
        let sealed = self.batcher.append(message)?;
        self.stats.messages_appended += 1;
        Ok(match sealed {
            Some(frame) => self.on_sealed(frame, sink),
            None => Pushed::Batched,
        })
    }

    /// Advance one tick.
    ///
    /// Once the cooldown has elapsed, the oldest queued frame is sent; with an
    /// empty queue, the unsealed frame is sealed and sent however full it is.
    /// Returns true if a frame was sent.
    pub fn tick<S: LineSink + ?Sized>(&mut self, sink: &mut S) -> Result<bool> {
        let mut sent = false;
        let mut outcome: Result<()> = Ok(());

        if self.is_ready() {
            let next = match self.queue.pop_front() {
                Some(frame) => {
                    self.stats.queue_depth = self.queue.len();
                    self.update_soft_limit();
                    Some(frame)
                }
                None => self.seal_pending(),
            };
            if let Some(frame) = next {
                outcome = self.transmit(frame, sink).map_err(Into::into);
                sent = outcome.is_ok();
            }
        }

        self.ticks_since_send = self.ticks_since_send.saturating_add(1);
        outcome.map(|()| sent)
    }

    /// Returns true if the cooldown has elapsed since the last send.
    pub fn is_ready(&self) -> bool {
        self.ticks_since_send >= self.policy.cooldown_ticks
    }

    /// Ticks since the last send.
    pub fn ticks_since_send(&self) -> Tick {
        self.ticks_since_send
    }

    /// Sealed frames waiting for the lane, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &Frame> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Messages batched but not yet sealed.
    pub fn pending_messages(&self) -> usize {
        self.batcher.pending_messages()
    }

    /// Returns true if nothing is queued or waiting to be sealed.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.batcher.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn policy(&self) -> &TransmitPolicy {
        &self.policy
    }

    fn seal_pending(&mut self) -> Option<Frame> {
        let frame = self.batcher.seal()?;
        self.stats.frames_sealed += 1;
        Some(frame)
    }

    fn on_sealed<S: LineSink + ?Sized>(&mut self, frame: Frame, sink: &mut S) -> Pushed {
        self.stats.frames_sealed += 1;
        if self.is_ready() && self.queue.is_empty() {
            return match self.transmit(frame, sink) {
                Ok(()) => Pushed::Sent,
                Err(err) => Pushed::SendFailed(err),
            };
        }
        if self.enqueue(frame) {
            Pushed::Queued
        } else {
            Pushed::Dropped
        }
    }

    /// Returns false if `frame` itself was discarded.
    fn enqueue(&mut self, frame: Frame) -> bool {
        let kept = match self.policy.overflow {
            OverflowPolicy::DropOldest { capacity } if self.queue.len() >= capacity => {
                if let Some(dropped) = self.queue.pop_front() {
                    self.stats.frames_dropped += 1;
                    warn!(
                        chars = dropped.char_len(),
                        messages = dropped.message_count(),
                        capacity,
                        "frame queue full, dropped oldest frame"
                    );
                }
                self.queue.push_back(frame);
                true
            }
            OverflowPolicy::DropNewest { capacity } if self.queue.len() >= capacity => {
                self.stats.frames_dropped += 1;
                warn!(
                    chars = frame.char_len(),
                    messages = frame.message_count(),
                    capacity,
                    "frame queue full, dropped newest frame"
                );
                false
            }
            _ => {
                self.queue.push_back(frame);
                true
            }
        };

        self.stats.queue_depth = self.queue.len();
        self.stats.queue_high_water = self.stats.queue_high_water.max(self.queue.len());
        debug!(depth = self.queue.len(), "frame queued");
        self.update_soft_limit();
        kept
    }

    fn update_soft_limit(&mut self) {
        let above = self.queue.len() > self.policy.queue_soft_limit;
        if above && !self.above_soft_limit {
            self.stats.queue_growth_events += 1;
            warn!(
                depth = self.queue.len(),
                soft_limit = self.policy.queue_soft_limit,
                "frame queue above soft limit"
            );
        }
        self.above_soft_limit = above;
    }

    fn transmit<S: LineSink + ?Sized>(
        &mut self,
        frame: Frame,
        sink: &mut S,
    ) -> std::result::Result<(), TransportError> {
        self.ticks_since_send = 0;
        match sink.send_line(Lane::Logic, frame.as_str()) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                debug!(
                    chars = frame.char_len(),
                    messages = frame.message_count(),
                    "frame sent"
                );
                Ok(())
            }
            Err(err) => {
                self.stats.send_failures += 1;
                warn!(error = %err, chars = frame.char_len(), "frame send failed");
                Err(err)
            }
        }
    }
}
