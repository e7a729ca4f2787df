//! A ready-made `env_logger` backend for the `log` records emitted by this
//! crate. Library users with their own logger don't need it.
//!
//! Lines look like `2024-06-15 14:30:45 [WARN] sitefeed::util: Dates could
//! not be retrieved for page: docs/index.md.`. `RUST_LOG` overrides the
//! default level.

use chrono::Local;
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// Installs the logger with `level` as the default filter. Fails if a logger
/// is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()
}

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    builder
}
