use lwtp_frame::{DEFAULT_MARKER, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("lwtp {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: lwtp");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("LWTP_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("LWTP_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: cli=true");
    println!("default_marker: 0x{DEFAULT_MARKER:02X}");
    println!("default_rx_buffer: {DEFAULT_RX_BUFFER_SIZE}");
    println!("default_tx_buffer: {DEFAULT_TX_BUFFER_SIZE}");
    println!("checksum: CRC-16/MODBUS");

    Ok(SUCCESS)
}
