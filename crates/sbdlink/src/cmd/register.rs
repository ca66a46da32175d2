use serde::Serialize;

use crate::cmd::{open_modem, RegisterArgs};
use crate::exit::{modem_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct RegisterOutput {
    registered: bool,
    status: u8,
    error: u8,
}

pub fn run(args: RegisterArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = open_modem(&args.device, args.baud)?;

    if args.soft_reset {
        modem
            .soft_reset()
            .map_err(|err| modem_error("soft reset failed", err))?;
    }
    let registration = modem
        .register(args.location.as_deref())
        .map_err(|err| modem_error("registration failed", err))?;

    modem
        .shutdown()
        .map_err(|err| modem_error("shutdown failed", err))?;

    let out = RegisterOutput {
        registered: registration.is_registered(),
        status: registration.status,
        error: registration.error,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "registered={} status={} error={}",
            out.registered, out.status, out.error
        ),
    }

    if out.registered {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}
