use serde::Serialize;

use sbdlink_frame::{decode_float, encode_float, ENCODED_VALUE_SIZE};

use crate::cmd::{parse_hex, FloatCommand};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct FloatOutput {
    value: f64,
    hex: String,
}

pub fn run(command: FloatCommand, format: OutputFormat) -> CliResult<i32> {
    let out = match command {
        FloatCommand::Encode { value } => {
            let bytes = encode_float(value).map_err(|err| frame_error("encode failed", err))?;
            FloatOutput {
                value: decode_float(bytes),
                hex: hex::encode(bytes),
            }
        }
        FloatCommand::Decode { hex: digits } => {
            let raw = parse_hex(&digits)?;
            let bytes: [u8; ENCODED_VALUE_SIZE] = raw.as_slice().try_into().map_err(|_| {
                CliError::usage(format!(
                    "expected {ENCODED_VALUE_SIZE} bytes, got {}",
                    raw.len()
                ))
            })?;
            FloatOutput {
                value: decode_float(bytes),
                hex: hex::encode(bytes),
            }
        }
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => println!("{} {}", out.hex, out.value),
    }
    Ok(SUCCESS)
}
