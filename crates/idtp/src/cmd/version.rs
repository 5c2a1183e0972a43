use idtp_frame::{FRAME_MAX_SIZE, PAYLOAD_MAX_SIZE, VERSION};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("idtp {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: idtp");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol: {}.{}", VERSION >> 4, VERSION & 0x0F);
    println!("frame_max: {FRAME_MAX_SIZE}");
    println!("payload_max: {PAYLOAD_MAX_SIZE}");
    println!(
        "target: {}",
        option_env!("IDTP_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
