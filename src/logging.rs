use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows `-v`:
/// none = error, `-v` = warn, `-vv` = info, `-vvv` = debug, more = trace.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "off";
    }

    match verbosity {
        0 => "prodtotal=error",
        1 => "prodtotal=warn",
        2 => "prodtotal=info",
        3 => "prodtotal=debug",
        _ => "prodtotal=trace",
    }
}
