use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("evstream {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: evstream");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("EVSTREAM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: session={}, async={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "async")
    );
    println!(
        "max_chunk_size: {}",
        evstream_session::DEFAULT_MAX_CHUNK_SIZE
    );
    println!(
        "max_message_size: {}",
        evstream_frame::DEFAULT_MAX_MESSAGE_SIZE
    );

    Ok(SUCCESS)
}
