use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use sbdlink_frame::{encode, encode_command, split, wrap, FrameConfig, Packet};

use crate::cmd::{load_registry, parse_time, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct FrameOutput {
    index: usize,
    body: String,
    frame: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = load_registry(&args.registry)?;

    let frames = if args.uplink {
        let values = args.values.unwrap_or_default();
        let body = encode_command(&args.descriptor, &values, &registry)
            .map_err(|err| frame_error("encode failed", err))?;
        let frame = wrap(&body).map_err(|err| frame_error("encode failed", err))?;
        vec![FrameOutput {
            index: 0,
            body: hex::encode(&body),
            frame: hex::encode(&frame),
        }]
    } else {
        let at = match args.at.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => Utc::now(),
        };
        let packet = match (args.values, args.text) {
            (Some(values), None) => Packet::numeric(&args.descriptor, values),
            (None, Some(text)) => Packet::text(&args.descriptor, text),
            (None, None) => Packet::numeric(&args.descriptor, Vec::new()),
            (Some(_), Some(_)) => {
                return Err(CliError::usage("--values and --text are exclusive"));
            }
        }
        .with_timestamp(at);

        let config = FrameConfig {
            max_frame_size: args.max_frame_size,
            ..FrameConfig::default()
        };
        let fragments = split(&packet, &config).map_err(|err| frame_error("encode failed", err))?;
        debug!(
            descriptor = %args.descriptor,
            fragments = fragments.len(),
            "packet split"
        );

        let mut frames = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.iter().enumerate() {
            let body = encode(fragment, &registry, &config)
                .map_err(|err| frame_error("encode failed", err))?;
            let frame = wrap(&body).map_err(|err| frame_error("encode failed", err))?;
            frames.push(FrameOutput {
                index,
                body: hex::encode(&body),
                frame: hex::encode(&frame),
            });
        }
        frames
    };

    match format {
        OutputFormat::Json => {
            for frame in &frames {
                print_json(frame);
            }
        }
        OutputFormat::Table => {
            let mut table = table(vec!["INDEX", "BODY", "FRAME"]);
            for frame in &frames {
                table.add_row(vec![
                    frame.index.to_string(),
                    frame.body.clone(),
                    frame.frame.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in &frames {
                println!("{}", frame.frame);
            }
        }
    }
    Ok(SUCCESS)
}
