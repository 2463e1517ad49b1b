//! A tiny `log` backend: colored lines on stderr, tagged with the level and the thread.
//!
//! The level comes from the caller (the CLI flag), then from the `RWGATE_LOG` environment variable
//! (`error`, `warn`, `info`, `debug`, `trace`, `off`), and is `warn` otherwise.

use std::{env, fmt, io::Write, str::FromStr, thread};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub const LOG_ENV: &str = "RWGATE_LOG";

/// Installs the logger. Should be called once, from `main`.
pub fn init(level: Option<LevelFilter>) -> Result<(), SetLoggerError> {
    static LOGGER: StderrLogger = StderrLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(resolve_level(level, env::var(LOG_ENV).ok().as_deref()));
    Ok(())
}

fn resolve_level(explicit: Option<LevelFilter>, from_env: Option<&str>) -> LevelFilter {
    explicit
        .or_else(|| from_env.and_then(|s| LevelFilter::from_str(s.trim()).ok()))
        .unwrap_or(LevelFilter::Warn)
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let current = thread::current();
        let name = current.name().unwrap_or("-");
        // one write per line, so lines from different threads don't interleave
        let line = with_color(
            format_args!("[RWGATE][{:>5}][{name}] {}", record.level(), record.args()),
            level_to_color_code(record.level()),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn with_color(args: fmt::Arguments, color_code: u8) -> String {
    format!("\u{1B}[{color_code}m{args}\u{1B}[0m")
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_resolution() {
        assert_eq!(resolve_level(None, None), LevelFilter::Warn);
        assert_eq!(resolve_level(None, Some("trace")), LevelFilter::Trace);
        assert_eq!(resolve_level(None, Some(" INFO ")), LevelFilter::Info);
        assert_eq!(resolve_level(None, Some("loud")), LevelFilter::Warn);
        assert_eq!(
            resolve_level(Some(LevelFilter::Off), Some("trace")),
            LevelFilter::Off
        );
    }

    #[test]
    fn test_colors() {
        assert_eq!(with_color(format_args!("x"), 31), "\u{1B}[31mx\u{1B}[0m");
        assert_eq!(level_to_color_code(Level::Trace), 90);
    }
}
