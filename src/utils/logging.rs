//! Logging setup for the binary and for applications embedding the engine

use log::LevelFilter;

/// Initialize the logger at INFO.
/// The RUST_LOG environment variable overrides the level.
pub fn init_logger() {
    init_logger_with_level(LevelFilter::Info);
}

/// Initialize the logger with an explicit default level.
///
/// Lines are prefixed with `\r` so they stay readable when a control surface keeps
/// the terminal in raw mode. Calling this twice is harmless.
pub fn init_logger_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "\r[{} {:5} {}] {}",
                buf.timestamp(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .try_init();
}
