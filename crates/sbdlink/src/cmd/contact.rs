use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use sbdlink_frame::Packet;
use sbdlink_modem::Modem;
use sbdlink_session::{
    Clock, ContactOutcome, ContactReport, SessionConfig, SessionEngine, SystemClock, TimeSync,
};

use crate::cmd::{load_registry, open_modem, parse_interval, ContactArgs};
use crate::exit::{modem_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_packets, OutputFormat, PacketOutput};

const SLEEP_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize)]
struct ContactOutput {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_signal_code: Option<u8>,
    sessions: u32,
    sent: usize,
    received: usize,
    dropped: usize,
    pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clock_corrected: Option<bool>,
    commands: Vec<PacketOutput>,
}

pub fn run(args: ContactArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = Arc::new(load_registry(&args.registry)?);
    let telemetry = args
        .telemetry
        .iter()
        .map(String::as_str)
        .map(parse_telemetry)
        .collect::<CliResult<Vec<_>>>()?;
    let interval = args.repeat.as_deref().map(parse_interval).transpose()?;

    let config = SessionConfig {
        max_sessions: args.max_sessions,
        ..SessionConfig::default()
    };
    let modem = open_modem(&args.device, args.baud)?;
    let mut engine = SessionEngine::new(modem, registry, config);

    let now = Utc::now();
    for packet in telemetry {
        engine
            .enqueue(packet, now)
            .map_err(|err| session_error("enqueue failed", err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    if interval.is_some() {
        install_ctrlc_handler(running.clone())?;
    }

    let result = run_cycles(&mut engine, &args, interval, &running, format);

    if let Err(err) = engine.into_modem().shutdown() {
        warn!(error = %err, "modem shutdown failed");
        if result.is_ok() {
            return Err(modem_error("shutdown failed", err));
        }
    }
    result
}

fn run_cycles<M: Modem>(
    engine: &mut SessionEngine<M>,
    args: &ContactArgs,
    interval: Option<Duration>,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut clock = SystemClock;
    loop {
        let started = Instant::now();

        let (report, time_sync) = contact_cycle(engine, args.sync_time, &mut clock)?;
        debug!(received = engine.received_len(), "collecting received commands");

        let mut commands = Vec::new();
        while let Some(packet) = engine.pop_received() {
            commands.push(PacketOutput::from(&packet));
        }
        print_contact(
            contact_output(&report, engine.pending(), time_sync, commands),
            format,
        );

        let Some(interval) = interval else {
            return Ok(SUCCESS);
        };
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            thread::sleep(SLEEP_STEP.min(interval.saturating_sub(started.elapsed())));
        }
        if !running.load(Ordering::SeqCst) {
            return Ok(SUCCESS);
        }
    }
}

/// One contact, then the optional clock check against the network time the
/// contact just refreshed.
fn contact_cycle<M: Modem>(
    engine: &mut SessionEngine<M>,
    sync_time: bool,
    clock: &mut impl Clock,
) -> CliResult<(ContactReport, Option<TimeSync>)> {
    let report = engine
        .contact()
        .map_err(|err| session_error("contact failed", err))?;

    let time_sync = if sync_time {
        Some(
            engine
                .sync_time(clock)
                .map_err(|err| session_error("time sync failed", err))?,
        )
    } else {
        None
    };
    Ok((report, time_sync))
}

fn contact_output(
    report: &ContactReport,
    pending: usize,
    time_sync: Option<TimeSync>,
    commands: Vec<PacketOutput>,
) -> ContactOutput {
    let (outcome, no_signal_code) = match report.outcome {
        ContactOutcome::Drained => ("drained", None),
        ContactOutcome::NoSignal { code } => ("no-signal", Some(code)),
        ContactOutcome::NetworkUnavailable => ("network-unavailable", None),
        ContactOutcome::SessionBudgetExhausted => ("session-budget-exhausted", None),
    };
    ContactOutput {
        outcome,
        no_signal_code,
        sessions: report.sessions,
        sent: report.sent,
        received: report.received,
        dropped: report.dropped,
        pending,
        drift_seconds: time_sync
            .and_then(|sync| sync.drift())
            .map(|drift| drift.num_seconds()),
        clock_corrected: time_sync
            .filter(|sync| !matches!(sync, TimeSync::Unavailable))
            .map(|sync| matches!(sync, TimeSync::Corrected { .. })),
        commands,
    }
}

fn print_contact(out: ContactOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{} sessions={} sent={} received={} dropped={} pending={}",
                out.outcome, out.sessions, out.sent, out.received, out.dropped, out.pending
            );
            if let Some(drift) = out.drift_seconds {
                let action = if out.clock_corrected == Some(true) {
                    "corrected"
                } else {
                    "in sync"
                };
                println!("clock drift {drift}s ({action})");
            }
            if !out.commands.is_empty() {
                print_packets(&out.commands, format);
            }
        }
    }
}

/// Parse `DESCRIPTOR=v1,v2,...` into a numeric packet.
fn parse_telemetry(raw: &str) -> CliResult<Packet> {
    let (descriptor, values) = raw
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("telemetry must be DESCRIPTOR=VALUES: {raw}")))?;
    if descriptor.is_empty() {
        return Err(CliError::usage(format!("telemetry has no descriptor: {raw}")));
    }

    let values = values
        .split(',')
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value.trim().parse::<f64>().map_err(|_| {
                CliError::new(USAGE, format!("invalid telemetry value '{value}' in {raw}"))
            })
        })
        .collect::<CliResult<Vec<_>>>()?;
    Ok(Packet::numeric(descriptor, values))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
