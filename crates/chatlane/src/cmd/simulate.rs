use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;

use chatlane_frame::{Tick, FRAME_SEPARATOR};
use chatlane_session::{
    DiagnosticsLog, Driver, HandlerRegistry, Outbox, SessionConfig, TrafficRecorder,
};
use chatlane_transport::{Lane, RecordingSink, SentLine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{key_value_line, key_value_table, new_table, print_json, OutputFormat};

type Tally = BTreeMap<u64, u64>;
type SimDriver = Driver<Tally, RecordingSink, DiagnosticsLog>;

#[derive(Deserialize)]
struct Vote {
    option: u64,
}

#[derive(Debug, Serialize)]
struct SendRecord {
    tick: Tick,
    lane: Lane,
    chars: usize,
    messages: usize,
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    ticks: Tick,
    messages_produced: u64,
    frames_sent: u64,
    chat_lines_sent: usize,
    max_frame_chars: usize,
    min_send_gap: Option<Tick>,
    queue_depth: usize,
    queue_high_water: usize,
    queue_growth_events: u64,
    frames_dropped: u64,
    chatters: usize,
    votes: u64,
    malformed: usize,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(&args)?;
    let mut driver = build_driver(config)?;
    if let Some(path) = &args.record {
        let file = File::create(path)
            .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
        driver = driver.with_recorder(TrafficRecorder::to_writer(BufWriter::new(file)));
    }

    info!(
        ticks = args.ticks,
        messages_per_tick = args.messages_per_tick,
        viewers = args.viewers,
        "simulation started"
    );
    driver
        .announce()
        .map_err(|err| session_error("announce failed", err))?;

    let mut sends = Vec::new();
    let mut tally = Tally::new();
    let mut seq: u64 = 0;
    let mut malformed = 0;
    let pad = "x".repeat(args.payload_size);

    collect_sends(&mut driver, 0, &mut sends, &args, format);
    for tick in 0..args.ticks {
        feed_viewers(&mut driver, tick, &args);
        for _ in 0..args.messages_per_tick {
            driver
                .send("load", &json!({ "seq": seq, "pad": pad }))
                .map_err(|err| session_error("send failed", err))?;
            seq += 1;
        }
        let report = driver.tick(&mut tally);
        malformed += report.dispatch.malformed;
        collect_sends(&mut driver, tick, &mut sends, &args, format);
    }

    if let Some(recorder) = driver.recorder_mut() {
        recorder
            .flush()
            .map_err(|err| io_error("failed writing traffic record", err))?;
    }

    let stats = driver.stats();
    let logic_ticks: Vec<Tick> = sends
        .iter()
        .filter(|send| send.lane == Lane::Logic)
        .map(|send| send.tick)
        .collect();
    let summary = SimulationSummary {
        ticks: args.ticks,
        messages_produced: seq,
        frames_sent: stats.frames_sent,
        chat_lines_sent: sends.iter().filter(|send| send.lane == Lane::Chat).count(),
        max_frame_chars: sends
            .iter()
            .filter(|send| send.lane == Lane::Logic)
            .map(|send| send.chars)
            .max()
            .unwrap_or(0),
        min_send_gap: logic_ticks.windows(2).map(|pair| pair[1] - pair[0]).min(),
        queue_depth: stats.queue_depth,
        queue_high_water: stats.queue_high_water,
        queue_growth_events: stats.queue_growth_events,
        frames_dropped: stats.frames_dropped,
        chatters: driver.chatters().count(),
        votes: tally.values().sum(),
        malformed,
    };

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            if args.show_sends {
                let mut table = new_table(["TICK", "LANE", "CHARS", "MESSAGES"]);
                for send in &sends {
                    table.add_row(vec![
                        send.tick.to_string(),
                        send.lane.to_string(),
                        send.chars.to_string(),
                        send.messages.to_string(),
                    ]);
                }
                println!("{table}");
            }
            println!("{}", key_value_table(&summary));
        }
        OutputFormat::Pretty => println!("{}", key_value_line(&summary)),
    }
    Ok(SUCCESS)
}

fn load_config(args: &SimulateArgs) -> CliResult<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            SessionConfig::from_json(&text)
                .map_err(|err| session_error(&format!("invalid config {}", path.display()), err))?
        }
        None => SessionConfig::default(),
    };
    if let Some(cooldown) = args.cooldown {
        config.policy.cooldown_ticks = cooldown;
    }
    if let Some(max_frame_len) = args.max_frame_len {
        config.policy.max_frame_len = max_frame_len;
    }
    Ok(config)
}

fn build_driver(config: SessionConfig) -> CliResult<SimDriver> {
    let handlers = HandlerRegistry::new()
        .register("vote", |tally: &mut Tally, _: &mut Outbox, _: &str, vote: Vote| {
            *tally.entry(vote.option).or_default() += 1;
            Ok(())
        })
        .map_err(|err| session_error("handler setup failed", err))?;
    Driver::with_diagnostics(config, handlers, RecordingSink::new(), DiagnosticsLog::new())
        .map_err(|err| session_error("invalid session config", err))
}

/// Each viewer posts one chat line and one vote every `viewer_period` ticks,
/// staggered by viewer index.
fn feed_viewers(driver: &mut SimDriver, tick: Tick, args: &SimulateArgs) {
    for viewer in 0..args.viewers as u64 {
        if (tick + viewer) % args.viewer_period != 0 {
            continue;
        }
        let nick = format!("viewer{viewer}");
        driver.on_line_received(
            Lane::Chat,
            format!(":{nick}!{nick}@sim.local PRIVMSG #chat :hello from {nick}"),
        );
        driver.on_line_received(
            Lane::Logic,
            format!(
                ":{nick}!{nick}@sim.local PRIVMSG #logic :vote###{{\"option\":{}}}",
                viewer % 3
            ),
        );
    }
}

fn collect_sends(
    driver: &mut SimDriver,
    tick: Tick,
    sends: &mut Vec<SendRecord>,
    args: &SimulateArgs,
    format: OutputFormat,
) {
    for SentLine { lane, text } in driver.sink_mut().take() {
        let record = SendRecord {
            tick,
            lane,
            chars: text.chars().count(),
            messages: match lane {
                Lane::Logic => text.split(FRAME_SEPARATOR).count(),
                Lane::Chat => 0,
            },
        };
        if args.show_sends {
            match format {
                OutputFormat::Json => print_json(&record),
                OutputFormat::Pretty => println!("{}", key_value_line(&record)),
                OutputFormat::Table => {}
            }
        }
        sends.push(record);
    }
}
