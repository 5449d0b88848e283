use signalmesh_wire::{HEADER_SIZE, PROTOCOL_VERSION};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("signalmesh {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: signalmesh");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_version: {PROTOCOL_VERSION}");
    println!("header_size: {HEADER_SIZE}");
    println!(
        "target: {}",
        option_env!("SIGNALMESH_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: node={}, schema={}, cli=true",
        cfg!(feature = "node"),
        cfg!(feature = "schema")
    );

    Ok(SUCCESS)
}
