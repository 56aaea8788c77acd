//! Log output.
//!
//! All diagnostics go through `tracing`. The subscriber installed here
//! writes them to the stderr of the [`Env`], so that output of commands
//! run in a fake environment can be inspected by tests.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;

use crate::env::Env;

/// Install a subscriber for the duration of a command.
///
/// Log records are written to the stderr of `env`. The subscriber stays
/// active until the returned guard is dropped.
pub fn init(env: &impl Env, level: LevelFilter) -> DefaultGuard {
    let stderr = env.stderr();
    let ansi = stderr.is_terminal();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(stderr)
        .with_max_level(level)
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Parse a log level as given on the command line.
pub fn parse_level(arg: &str) -> Result<LevelFilter, String> {
    match arg.to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        _ => Err(format!(
            "unknown log level '{arg}', expected one of off, error, warn, info, debug, trace"
        )),
    }
}
