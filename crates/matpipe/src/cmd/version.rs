use matpipe_session::{VersionTag, DEFAULT_TRAILING_PADDING};
use matpipe_stream::COMMAND_END_TOKEN;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("matpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: matpipe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MATPIPE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("MATPIPE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("default_engine_version: {}", VersionTag::default());
    println!("save_trailing_padding: {DEFAULT_TRAILING_PADDING}");
    println!("completion_token: {COMMAND_END_TOKEN}");

    Ok(SUCCESS)
}
