use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sbdlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sbdlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SBDLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("SBDLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "frame: max_size={} max_fragments={}",
        sbdlink_frame::DEFAULT_MAX_FRAME_SIZE,
        sbdlink_frame::MAX_FRAGMENTS
    );
    println!(
        "features: session={}, cli=true, serial={}",
        cfg!(feature = "session"),
        cfg!(unix)
    );

    Ok(SUCCESS)
}
