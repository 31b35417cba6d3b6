use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one tagged message into its wire token.
    Encode(EncodeArgs),
    /// Decode a raw provider line into its tokens.
    Decode(DecodeArgs),
    /// Drive synthetic traffic through a session and report what was sent.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message tag.
    pub tag: String,
    /// JSON payload.
    pub json: String,
    /// Frame budget in characters.
    #[arg(long, default_value_t = chatlane_frame::DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_len: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Raw provider line. Reads lines from stdin when omitted.
    pub line: Option<String>,
    /// Schema directory (`<tag>.schema.json`) for payload validation.
    #[arg(long, value_name = "DIR")]
    pub schemas: Option<PathBuf>,
    /// Mark tokens whose tag has no schema in the directory as invalid.
    #[arg(long, requires = "schemas")]
    pub require_schema: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of ticks to run.
    #[arg(long, default_value_t = 300)]
    pub ticks: u64,
    /// Logic-lane messages produced every tick.
    #[arg(long, default_value_t = 1)]
    pub messages_per_tick: usize,
    /// Padding characters in each produced payload.
    #[arg(long, default_value_t = 16)]
    pub payload_size: usize,
    /// Synthetic viewers posting chat lines and votes.
    #[arg(long, default_value_t = 0)]
    pub viewers: usize,
    /// Ticks between each viewer's posts.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    pub viewer_period: u64,
    /// Session config file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Override the logic-lane cooldown in ticks.
    #[arg(long)]
    pub cooldown: Option<u64>,
    /// Override the frame budget in characters.
    #[arg(long)]
    pub max_frame_len: Option<usize>,
    /// Print every line sent, not just the summary.
    #[arg(long)]
    pub show_sends: bool,
    /// Write traffic to FILE as JSON lines.
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
