use chrono::Utc;

use sbdlink_frame::{decode, decode_telemetry};

use crate::cmd::{load_registry, parse_hex, parse_time, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_packets, OutputFormat, PacketOutput};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = load_registry(&args.registry)?;
    let message = parse_hex(&args.hex)?;

    let packet = if args.uplink {
        decode(&message, &registry)
    } else {
        let reference = match args.reference.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => Utc::now(),
        };
        decode_telemetry(&message, &registry, reference)
    }
    .map_err(|err| frame_error("decode failed", err))?;

    print_packets(&[PacketOutput::from(&packet)], format);
    Ok(SUCCESS)
}
