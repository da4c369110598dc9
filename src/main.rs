use binshim::{RealRuntime, ShimError, launcher::FALLBACK_EXIT_CODE};
use log::debug;
use std::ffi::OsString;

/// binshim - run the bundled native binary for this host
///
/// Every argument is forwarded untouched; the shim has no flags of its own.
/// Configuration comes from the environment:
///   BINSHIM_ROOT          package root (default: two levels above this executable)
///   BINSHIM_BINARY_NAME   base name of the bundled binary
///   BINSHIM_PLATFORM      platform key override, e.g. linux-x64-musl
///   BINSHIM_LIBC          libc override on Linux (gnu or musl)
///   BINSHIM_LOG           log filter (default: warn)
fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("BINSHIM_LOG", "warn")).init();
    debug!("binshim {}", env!("BINSHIM_VERSION"));

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    let code = match binshim::run(&RealRuntime, &args) {
        Ok(result) => result.exit_code(),
        Err(e) => {
            eprintln!("{}: {}", env!("CARGO_PKG_NAME"), render_error(&e));
            FALLBACK_EXIT_CODE
        }
    };

    std::process::exit(code);
}

/// Shim errors already carry their cause in the message; anything else gets its context chain.
fn render_error(err: &anyhow::Error) -> String {
    if err.downcast_ref::<ShimError>().is_some() {
        err.to_string()
    } else {
        format!("{:#}", err)
    }
}
