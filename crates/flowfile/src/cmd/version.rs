use flowfile_codec::MAGIC;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("flowfile {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: flowfile");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("format: {}", String::from_utf8_lossy(&MAGIC));
    println!(
        "build_target: {}",
        option_env!("FLOWFILE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));

    Ok(SUCCESS)
}
