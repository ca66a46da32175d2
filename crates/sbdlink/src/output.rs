use std::io::IsTerminal;

use chrono::SecondsFormat;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sbdlink_frame::{Packet, Payload};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A decoded packet as printed by `decode` and `contact`.
#[derive(Debug, Serialize)]
pub struct PacketOutput {
    pub descriptor: String,
    pub fragment_index: u8,
    pub numerical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub args: Vec<f64>,
}

impl From<&Packet> for PacketOutput {
    fn from(packet: &Packet) -> Self {
        let (values, text) = match packet.payload() {
            Payload::Numeric(values) if values.is_empty() && !packet.args().is_empty() => {
                (None, None)
            }
            Payload::Numeric(values) => (Some(values.clone()), None),
            Payload::Text(text) => (None, Some(text.clone())),
        };
        Self {
            descriptor: packet.descriptor().to_string(),
            fragment_index: packet.fragment_index(),
            numerical: packet.is_numerical(),
            timestamp: packet
                .timestamp()
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            values,
            text,
            args: packet.args().to_vec(),
        }
    }
}

impl PacketOutput {
    fn data(&self) -> String {
        if let Some(text) = &self.text {
            return format!("{text:?}");
        }
        let values = self.values.as_deref().unwrap_or(self.args.as_slice());
        join_values(values)
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_packets(packets: &[PacketOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for packet in packets {
                print_json(packet);
            }
        }
        OutputFormat::Table => {
            let mut table = table(vec!["DESCRIPTOR", "INDEX", "TIMESTAMP", "DATA"]);
            for packet in packets {
                table.add_row(vec![
                    packet.descriptor.clone(),
                    packet.fragment_index.to_string(),
                    packet.timestamp.clone().unwrap_or_else(|| "-".to_string()),
                    packet.data(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for packet in packets {
                println!(
                    "{} index={} at={} data={}",
                    packet.descriptor,
                    packet.fragment_index,
                    packet.timestamp.as_deref().unwrap_or("-"),
                    packet.data()
                );
            }
        }
    }
}

pub fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
