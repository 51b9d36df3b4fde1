use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;

/// Install the global logger.
///
/// With a file, records are appended there; otherwise they go to stderr.
/// Nothing is installed when `level` is `Off`, so the transcript stays clean.
pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            WriteLogger::init(level, Config::default(), file)
        }
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    }
    .context("logger already initialised")
}
