use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("chatlane {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: chatlane");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("CHATLANE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: session={}, schema={}, async={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "schema"),
        cfg!(feature = "async")
    );
    println!(
        "defaults: cooldown_ticks={}, max_frame_len={}",
        chatlane_frame::DEFAULT_COOLDOWN_TICKS,
        chatlane_frame::DEFAULT_MAX_FRAME_LEN
    );

    Ok(SUCCESS)
}
