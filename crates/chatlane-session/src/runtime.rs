//! Fixed-rate tick loop on tokio.

use std::future::Future;
use std::time::Duration;

use chatlane_frame::Tick;
use chatlane_transport::{Lane, LineSink};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::driver::{Driver, TickReport};

/// Default simulation rate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 50;

/// Tick period and optional tick budget for [`run_fixed_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRate {
    pub period: Duration,
    /// Stop after this many ticks. `None` runs until shutdown.
    pub max_ticks: Option<Tick>,
}

impl FixedRate {
    /// Tick `hz` times per second. Zero is treated as one.
    pub fn hz(hz: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / hz.max(1),
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: Tick) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

impl Default for FixedRate {
    fn default() -> Self {
        Self::hz(DEFAULT_TICK_RATE_HZ)
    }
}

/// Why [`run_fixed_rate`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Shutdown,
    TickBudget,
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: Tick,
    pub lines_received: usize,
    pub frames_sent: u64,
    pub malformed: usize,
    pub handler_failures: usize,
    pub stopped: StopReason,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.lines_received += report.lines_drained;
        self.frames_sent += report.frames_sent;
        self.malformed += report.dispatch.malformed;
        self.handler_failures += report.dispatch.handler_failures;
    }
}

/// Tick `driver` at a fixed rate until `shutdown` resolves or the tick
/// budget is spent.
///
/// Lines arriving on `inbound` are handed to the driver before each tick.
/// A closed `inbound` channel does not stop the loop.
pub async fn run_fixed_rate<C, S, D, F>(
    driver: &mut Driver<C, S, D>,
    state: &mut C,
    inbound: &mut UnboundedReceiver<(Lane, String)>,
    rate: FixedRate,
    shutdown: F,
) -> RunSummary
where
    S: LineSink,
    D: Diagnostics,
    F: Future<Output = ()>,
{
    let mut summary = RunSummary {
        ticks: 0,
        lines_received: 0,
        frames_sent: 0,
        malformed: 0,
        handler_failures: 0,
        stopped: StopReason::Shutdown,
    };
    if rate.max_ticks == Some(0) {
        summary.stopped = StopReason::TickBudget;
        return summary;
    }

    let mut ticker = interval(rate.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    tokio::pin!(shutdown);
    info!(period_ms = rate.period.as_millis() as u64, "fixed-rate loop started");

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                summary.stopped = StopReason::Shutdown;
                break;
            }
            _ = ticker.tick() => {}
        }

        while let Ok((lane, line)) = inbound.try_recv() {
            driver.on_line_received(lane, line);
        }
        let report = driver.tick(state);
        summary.absorb(&report);

        if rate.max_ticks.is_some_and(|max| summary.ticks >= max) {
            summary.stopped = StopReason::TickBudget;
            break;
        }
    }

    debug!(ticks = summary.ticks, stopped = ?summary.stopped, "fixed-rate loop stopped");
    summary
}

#[cfg(test)]
mod tests {
    use chatlane_transport::RecordingSink;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::SessionConfig;
    use crate::handlers::HandlerRegistry;
    use crate::outbox::Outbox;

    #[test]
    fn hz_to_period() {
        assert_eq!(FixedRate::hz(50).period, Duration::from_millis(20));
        assert_eq!(FixedRate::hz(0).period, Duration::from_secs(1));
        assert_eq!(FixedRate::default().with_max_ticks(3).max_ticks, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_tick_budget() {
        let handlers = HandlerRegistry::new()
            .register("n", |total: &mut u32, _: &mut Outbox, _: &str, n: u32| {
                *total += n;
                Ok(())
            })
            .unwrap();
        let mut driver =
            Driver::new(SessionConfig::default(), handlers, RecordingSink::new()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send((Lane::Logic, ":a!a@h PRIVMSG #logic :n###2%%n###3".to_string()))
            .unwrap();
        driver.send("hello", &"world").unwrap();

        let mut total = 0;
        let summary = run_fixed_rate(
            &mut driver,
            &mut total,
            &mut rx,
            FixedRate::hz(50).with_max_ticks(5),
            std::future::pending(),
        )
        .await;

        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.stopped, StopReason::TickBudget);
        assert_eq!(summary.lines_received, 1);
        assert_eq!(summary.frames_sent, 1);
        assert_eq!(total, 5);
        assert_eq!(driver.now(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_loop() {
        let mut driver = Driver::new(
            SessionConfig::default(),
            HandlerRegistry::<()>::new(),
            RecordingSink::new(),
        )
        .unwrap();
        let (_tx, mut rx) = mpsc::unbounded_channel();

        let summary = run_fixed_rate(
            &mut driver,
            &mut (),
            &mut rx,
            FixedRate::hz(50),
            tokio::time::sleep(Duration::from_millis(95)),
        )
        .await;

        assert_eq!(summary.stopped, StopReason::Shutdown);
        assert!(summary.ticks >= 4 && summary.ticks <= 6);
    }
}
