use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding target directives, e.g.
/// `chatlane_frame=trace,chatlane_session=debug`. Overrides `--log-level`.
pub const LOG_ENV: &str = "CHATLANE_LOG";

/// Crates whose events follow `--log-level`. Everything else is held at warn.
const CHATLANE_TARGETS: [&str; 5] = [
    "chatlane",
    "chatlane_transport",
    "chatlane_frame",
    "chatlane_schema",
    "chatlane_session",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-crate filter: chatlane crates at `level`, dependencies at warn or quieter.
pub fn default_targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    CHATLANE_TARGETS
        .iter()
        .fold(Targets::new(), |targets, name| targets.with_target(*name, level))
        .with_default(level.min(LevelFilter::WARN))
}

fn targets_from_env(level: LogLevel) -> Targets {
    match std::env::var(LOG_ENV) {
        Ok(directives) => directives.parse().unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={directives:?}: {err}");
            default_targets(level)
        }),
        Err(_) => default_targets(level),
    }
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// Event targets are shown from debug down, where several crates interleave.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let targets = targets_from_env(level);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_target(level >= LogLevel::Debug);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(targets).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(targets).try_init();
        }
    }
}
