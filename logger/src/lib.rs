// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

const LOG_LEVEL_ENV_VAR: &str = "IOTEXT_LOG";

/// Initializes the process-wide logger at `info`, overridable through `IOTEXT_LOG`.
pub fn try_init() -> Result<(), log::SetLoggerError> {
    try_init_with_level(log::LevelFilter::Info)
}

/// Same as [`try_init`], but with a caller-chosen default level. `IOTEXT_LOG` still wins.
pub fn try_init_with_level(default_level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .format(|fmt, record| {
            use std::io::Write;

            let timestamp = fmt.timestamp();

            // Targets only at debug and trace.
            if record.level() >= log::Level::Debug {
                writeln!(
                    fmt,
                    "<{}>{} [{}] - [{}] {}",
                    to_syslog_level(record.level()),
                    timestamp,
                    level_tag(record.level()),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(
                    fmt,
                    "<{}>{} [{}] - {}",
                    to_syslog_level(record.level()),
                    timestamp,
                    level_tag(record.level()),
                    record.args()
                )
            }
        })
        .filter_level(default_level)
        .parse_env(LOG_LEVEL_ENV_VAR)
        .try_init()
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRCE",
        log::Level::Debug => "DBUG",
        log::Level::Info => "INFO",
        log::Level::Warn => "WARN",
        log::Level::Error => "ERR!",
    }
}

fn to_syslog_level(level: log::Level) -> i8 {
    match level {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn syslog_levels() {
        assert_eq!(3, super::to_syslog_level(log::Level::Error));
        assert_eq!(4, super::to_syslog_level(log::Level::Warn));
        assert_eq!(6, super::to_syslog_level(log::Level::Info));
        assert_eq!(7, super::to_syslog_level(log::Level::Trace));
    }

    #[test]
    fn level_tags_are_fixed_width() {
        for level in [
            log::Level::Trace,
            log::Level::Debug,
            log::Level::Info,
            log::Level::Warn,
            log::Level::Error,
        ] {
            assert_eq!(4, super::level_tag(level).len());
        }
    }
}
