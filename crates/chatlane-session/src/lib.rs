//! Session layer for chatlane.
//!
//! Ties the frame layer to application code: a [`HandlerRegistry`] maps tags
//! to typed handlers, a [`ChatterRegistry`] tracks who is talking on the
//! chat lane, and the [`Driver`] runs both against a line sink one fixed-rate
//! tick at a time.
//!
//! # Example
//!
//! ```
//! use chatlane_session::{Driver, HandlerRegistry, Outbox, SessionConfig};
//! use chatlane_transport::{Lane, RecordingSink};
//!
//! let handlers = HandlerRegistry::new()
//!     .register("score", |total: &mut u64, _: &mut Outbox, _: &str, points: u64| {
//!         *total += points;
//!         Ok(())
//!     })
//!     .unwrap();
//! let mut driver = Driver::new(SessionConfig::default(), handlers, RecordingSink::new()).unwrap();
//!
//! driver.on_line_received(Lane::Logic, ":alice!a@host PRIVMSG #logic :score###10");
//! driver.send("ready", &true).unwrap();
//!
//! let mut total = 0;
//! let report = driver.tick(&mut total);
//! assert_eq!(total, 10);
//! assert_eq!(report.frames_sent, 1);
//! assert_eq!(driver.sink().lines_on(Lane::Logic), ["ready###true"]);
//! ```

pub mod chatter;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod outbox;
pub mod recorder;

#[cfg(feature = "async")]
pub mod runtime;

pub use chatter::{Chatter, ChatterHooks, ChatterRegistry, NoHooks};
pub use config::{SessionConfig, DEFAULT_CHATTER_SWEEP_PERIOD};
pub use control::{Alive, ALIVE_TAG, DEFAULT_BANNER, DEFAULT_KEEPALIVE_PERIOD};
pub use diagnostics::{DiagnosticEvent, Diagnostics, DiagnosticsLog, TracingDiagnostics};
pub use driver::{Driver, TickReport};
pub use error::{Result, SessionError};
pub use handlers::{DispatchReport, HandlerError, HandlerRegistry, HandlerResult};
pub use outbox::Outbox;
pub use recorder::{Direction, TrafficEntry, TrafficRecorder};

#[cfg(feature = "async")]
pub use runtime::{run_fixed_rate, FixedRate, RunSummary, StopReason, DEFAULT_TICK_RATE_HZ};
