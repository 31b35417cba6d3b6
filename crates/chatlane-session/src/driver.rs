use std::collections::VecDeque;

use chatlane_frame::{
    encode, parse_provider_line, EncodedMessage, Pushed, SchedulerStats, Tick,
    TransmissionScheduler,
};
use chatlane_transport::{Lane, LineSink};
use serde::Serialize;
use tracing::{debug, info};

use crate::chatter::{ChatterHooks, ChatterRegistry};
use crate::config::SessionConfig;
use crate::control::{Alive, ALIVE_TAG};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{Result, SessionError};
use crate::handlers::{DispatchReport, HandlerRegistry};
use crate::outbox::Outbox;
use crate::recorder::{Direction, TrafficEntry, TrafficRecorder};

/// What happened during one call to [`Driver::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// The tick that was processed.
    pub tick: Tick,
    /// Inbound lines taken off the queue.
    pub lines_drained: usize,
    /// Inbound chat-lane lines recorded against a chatter.
    pub chat_lines: usize,
    /// Logic-lane dispatch outcome, including lines the provider parser rejected.
    pub dispatch: DispatchReport,
    /// Outbound messages the encoder refused.
    pub outbound_rejected: usize,
    /// Chat-lane lines sent on behalf of handlers.
    pub chat_sent: usize,
    /// Logic-lane frames handed to the sink since the previous report,
    /// including those sent from [`Driver::send`] between ticks.
    pub frames_sent: u64,
    /// Sends the sink refused since the previous report.
    pub send_failures: usize,
    /// Chatters evicted by the idle sweep.
    pub evicted: usize,
    pub keepalive_sent: bool,
}

/// Drives one two-lane session at a fixed tick rate.
///
/// The caller owns the clock: it feeds inbound lines with
/// [`on_line_received`](Self::on_line_received) as they arrive and calls
/// [`tick`](Self::tick) once per simulation step. Each tick, in order:
///
/// 1. drains inbound lines, dispatching logic-lane frames and recording
///    chat-lane messages against their sender
/// 2. flushes whatever handlers wrote to the [`Outbox`]
/// 3. sends a keepalive if one is due
/// 4. sweeps idle chatters if eviction is enabled
/// 5. lets the scheduler send at most one logic-lane frame
///
/// Nothing is ever sent on the logic lane less than `cooldown_ticks` after
/// the previous frame. Chat-lane lines leave immediately.
pub struct Driver<C, S, D = TracingDiagnostics> {
    config: SessionConfig,
    handlers: HandlerRegistry<C>,
    scheduler: TransmissionScheduler,
    chatters: ChatterRegistry,
    outbox: Outbox,
    inbound: VecDeque<(Lane, String)>,
    sink: S,
    diagnostics: D,
    recorder: Option<TrafficRecorder>,
    now: Tick,
    growth_events_seen: u64,
    frames_sent_reported: u64,
    unreported_send_failures: usize,
}

impl<C, S: LineSink> Driver<C, S> {
    /// Create a driver that reports through `tracing`.
    pub fn new(config: SessionConfig, handlers: HandlerRegistry<C>, sink: S) -> Result<Self> {
        Self::with_diagnostics(config, handlers, sink, TracingDiagnostics)
    }
}

impl<C, S: LineSink, D: Diagnostics> Driver<C, S, D> {
    pub fn with_diagnostics(
        config: SessionConfig,
        handlers: HandlerRegistry<C>,
        sink: S,
        diagnostics: D,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = TransmissionScheduler::new(config.policy)?;
        debug!(
            tags = handlers.len(),
            cooldown = config.policy.cooldown_ticks,
            max_frame_len = config.policy.max_frame_len,
            "driver created"
        );
        Ok(Self {
            outbox: Outbox::new(config.policy.max_frame_len),
            config,
            handlers,
            scheduler,
            chatters: ChatterRegistry::new(),
            inbound: VecDeque::new(),
            sink,
            diagnostics,
            recorder: None,
            now: 0,
            growth_events_seen: 0,
            frames_sent_reported: 0,
            unreported_send_failures: 0,
        })
    }

    pub fn with_recorder(mut self, recorder: TrafficRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_chatter_hooks(mut self, hooks: impl ChatterHooks + 'static) -> Self {
        self.chatters.set_hooks(hooks);
        self
    }

    /// Send the configured banner on the chat lane.
    pub fn announce(&mut self) -> Result<()> {
        if let Some(banner) = self.config.banner.clone() {
            info!(banner = %banner, "announcing logic channel");
            self.send_chat(&banner)?;
        }
        Ok(())
    }

    /// Batch a logic-lane message.
    ///
    /// An encoding failure is returned immediately and nothing is queued.
    pub fn send<T: Serialize + ?Sized>(&mut self, tag: &str, payload: &T) -> Result<()> {
        let message = encode(tag, payload)?;
        self.send_encoded(message)
    }

    /// Batch an already encoded logic-lane message.
    ///
    /// `Ok` means the message is held for sending. If it sealed an earlier
    /// frame the sink then refused, that failure goes to
    /// [`Diagnostics::send_failed`] and the next [`TickReport`].
    pub fn send_encoded(&mut self, message: EncodedMessage) -> Result<()> {
        let text = self
            .recorder
            .is_some()
            .then(|| message.as_str().to_string());
        let pushed = self.scheduler.push(message, &mut self.sink)?;
        if let Some(text) = text {
            self.record(Direction::Outbound, Lane::Logic, "", text);
        }
        if let Pushed::SendFailed(err) = pushed {
            self.diagnostics.send_failed(Lane::Logic, &err);
            self.unreported_send_failures += 1;
        }
        Ok(())
    }

    /// Send a line on the chat lane right away.
    pub fn send_chat(&mut self, text: &str) -> Result<()> {
        self.sink.send_line(Lane::Chat, text)?;
        self.record(Direction::Outbound, Lane::Chat, "", text.to_string());
        Ok(())
    }

    /// Queue a raw provider line for the next tick.
    pub fn on_line_received(&mut self, lane: Lane, raw: impl Into<String>) {
        self.inbound.push_back((lane, raw.into()));
    }

    /// Run one tick against `state`.
    pub fn tick(&mut self, state: &mut C) -> TickReport {
        let mut report = TickReport {
            tick: self.now,
            ..TickReport::default()
        };

        while let Some((lane, raw)) = self.inbound.pop_front() {
            report.lines_drained += 1;
            self.receive(state, lane, &raw, &mut report);
        }

        self.flush_outbox(&mut report);

        if let Some(period) = self.config.keepalive_period {
            if self.now > 0 && self.now % period == 0 {
                match self.send(ALIVE_TAG, &Alive { t: self.now }) {
                    Ok(()) => report.keepalive_sent = true,
                    Err(err) => self.report_outbound(ALIVE_TAG, Lane::Logic, err, &mut report),
                }
            }
        }

        if let Some(max_age) = self.config.chatter_max_age {
            if self.now % self.config.chatter_sweep_period == 0 {
                report.evicted = self.chatters.evict_older_than(max_age, self.now);
            }
        }

        if let Err(err) = self.scheduler.tick(&mut self.sink) {
            self.diagnostics.send_failed(Lane::Logic, &err);
            report.send_failures += 1;
        }

        let stats = self.scheduler.stats();
        for _ in self.growth_events_seen..stats.queue_growth_events {
            self.diagnostics.queue_growth(&stats);
        }
        self.growth_events_seen = stats.queue_growth_events;
        report.frames_sent = stats.frames_sent - self.frames_sent_reported;
        self.frames_sent_reported = stats.frames_sent;
        report.send_failures += std::mem::take(&mut self.unreported_send_failures);

        self.now += 1;
        report
    }

    /// The tick the next call to [`tick`](Self::tick) will process.
    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn chatters(&self) -> &ChatterRegistry {
        &self.chatters
    }

    pub fn chatters_mut(&mut self) -> &mut ChatterRegistry {
        &mut self.chatters
    }

    pub fn handlers(&self) -> &HandlerRegistry<C> {
        &self.handlers
    }

    pub fn scheduler(&self) -> &TransmissionScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Inbound lines waiting for the next tick.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut D {
        &mut self.diagnostics
    }

    pub fn recorder(&self) -> Option<&TrafficRecorder> {
        self.recorder.as_ref()
    }

    pub fn recorder_mut(&mut self) -> Option<&mut TrafficRecorder> {
        self.recorder.as_mut()
    }

    fn receive(&mut self, state: &mut C, lane: Lane, raw: &str, report: &mut TickReport) {
        let line = match parse_provider_line(raw) {
            Ok(line) => line,
            Err(err) => {
                self.diagnostics.malformed("", raw, &err);
                report.dispatch.malformed += 1;
                return;
            }
        };
        self.record(Direction::Inbound, lane, &line.sender, line.text.clone());

        match lane {
            Lane::Chat => {
                self.chatters.update(&line.sender, &line.text, self.now);
                report.chat_lines += 1;
            }
            Lane::Logic => {
                let dispatched = self.handlers.dispatch(
                    state,
                    &mut self.outbox,
                    &line.sender,
                    &line.text,
                    &mut self.diagnostics,
                );
                report.dispatch.merge(dispatched);
            }
        }
    }

    fn flush_outbox(&mut self, report: &mut TickReport) {
        for message in self.outbox.take_logic() {
            let tag = message.tag().to_string();
            if let Err(err) = self.send_encoded(message) {
                self.report_outbound(&tag, Lane::Logic, err, report);
            }
        }
        for text in self.outbox.take_chat() {
            match self.send_chat(&text) {
                Ok(()) => report.chat_sent += 1,
                Err(err) => self.report_outbound("", Lane::Chat, err, report),
            }
        }
    }

    fn report_outbound(&mut self, tag: &str, lane: Lane, err: SessionError, report: &mut TickReport) {
        match err {
            SessionError::Frame(err) if err.is_encoding() => {
                self.diagnostics.encoding_rejected(tag, &err);
                report.outbound_rejected += 1;
            }
            err => {
                self.diagnostics.send_failed(lane, &err);
                report.send_failures += 1;
            }
        }
    }

    fn record(&mut self, direction: Direction, lane: Lane, sender: &str, text: String) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(TrafficEntry {
                tick: self.now,
                direction,
                lane,
                sender: sender.to_string(),
                text,
            });
        }
    }
}

impl<C, S: std::fmt::Debug, D: std::fmt::Debug> std::fmt::Debug for Driver<C, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("now", &self.now)
            .field("handlers", &self.handlers)
            .field("scheduler", &self.scheduler)
            .field("chatters", &self.chatters.count())
            .field("inbound", &self.inbound.len())
            .field("sink", &self.sink)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}
