use chrono::SecondsFormat;
use serde::Serialize;

use sbdlink_modem::{Modem, SbdStatus};

use crate::cmd::{open_modem, StatusArgs};
use crate::exit::{modem_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct StatusOutput {
    mo_pending: bool,
    mo_sequence: u32,
    mt_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mt_sequence: Option<u32>,
    signal_quality: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
}

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = open_modem(&args.device, args.baud)?;

    let status: SbdStatus = modem
        .status()
        .map_err(|err| modem_error("status failed", err))?;
    let signal_quality = if args.active {
        modem.signal_quality_active()
    } else {
        modem.signal_quality()
    }
    .map_err(|err| modem_error("signal quality failed", err))?;
    let network_time = modem
        .network_time()
        .map_err(|err| modem_error("network time failed", err))?;
    let location = modem
        .geolocation()
        .map_err(|err| modem_error("geolocation failed", err))?;

    modem
        .shutdown()
        .map_err(|err| modem_error("shutdown failed", err))?;

    let out = StatusOutput {
        mo_pending: status.mo_flag,
        mo_sequence: status.mo_sequence,
        mt_pending: status.mt_flag,
        mt_sequence: status.mt_sequence,
        signal_quality,
        network_time: network_time.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        latitude: location.as_ref().map(|fix| fix.latitude),
        longitude: location.as_ref().map(|fix| fix.longitude),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["mo_pending".to_string(), out.mo_pending.to_string()]);
            table.add_row(vec!["mo_sequence".to_string(), out.mo_sequence.to_string()]);
            table.add_row(vec!["mt_pending".to_string(), out.mt_pending.to_string()]);
            table.add_row(vec![
                "mt_sequence".to_string(),
                out.mt_sequence.map_or_else(|| "-".to_string(), |seq| seq.to_string()),
            ]);
            table.add_row(vec![
                "signal_quality".to_string(),
                out.signal_quality.to_string(),
            ]);
            table.add_row(vec![
                "network_time".to_string(),
                out.network_time.clone().unwrap_or_else(|| "-".to_string()),
            ]);
            if let (Some(lat), Some(lon)) = (out.latitude, out.longitude) {
                table.add_row(vec!["position".to_string(), format!("{lat:.4}, {lon:.4}")]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "mo={} (seq {}) mt={} signal={}/5 time={}",
                out.mo_pending,
                out.mo_sequence,
                out.mt_pending,
                out.signal_quality,
                out.network_time.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(SUCCESS)
}
