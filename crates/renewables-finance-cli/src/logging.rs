//! Logging setup for the `rfm` binary.
//!
//! Everything is written to stderr so that stdout carries only the command
//! output. The level comes from `--log-level`, then `RFM_LOG_LEVEL`, then
//! defaults to `warn`.
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};

/// Environment variable consulted when `--log-level` is not given.
pub const LOG_LEVEL_ENV: &str = "RFM_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(level: &str) -> Result<LevelFilter, Box<dyn std::error::Error>> {
    match level.to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        unknown => Err(format!("Unknown log level: {unknown}").into()),
    }
}

/// Install the global logger.
pub fn init(level_from_args: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let level = match level_from_args {
        Some(level) => level.to_string(),
        None => env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
    };
    let level = parse_level(&level)?;

    // Colour only when stderr is a terminal
    let use_colour = atty::is(atty::Stream::Stderr);
    dispatch(level, use_colour).chain(std::io::stderr()).apply()?;

    Ok(())
}

/// Formatter and level filter shared by every log output.
fn dispatch(level: LevelFilter, use_colour: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    Dispatch::new()
        .format(move |out, message, record| {
            write_log_colour(out, message, record, use_colour, &colours);
        })
        .level(level)
}

fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log(out, record.level(), record.target(), message);
    }
}
