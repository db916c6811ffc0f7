//! Logger setup for the `neurolearn` binary.
//!
//! Terminal output shares stdout with rendered views, so the default keeps
//! logs in `./neurolearn.log`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub const DEFAULT_LOG_FILE: &str = "./neurolearn.log";

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum LogDestination {
    #[default]
    File,
    /// Warnings and errors on stderr, the rest on stdout.
    Terminal,
    Both,
}

impl LogDestination {
    fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }

    fn to_terminal(self) -> bool {
        matches!(self, Self::Terminal | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub destination: LogDestination,
    pub file: PathBuf,
    /// Debug level instead of info.
    pub verbose: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            destination: LogDestination::File,
            file: PathBuf::from(DEFAULT_LOG_FILE),
            verbose: false,
        }
    }
}

impl LogOptions {
    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Installs the combined logger. A logger that is already installed wins.
///
/// Fails only when the log file cannot be created; the caller decides
/// whether to carry on without it.
pub fn initialize(options: &LogOptions) -> io::Result<()> {
    let level = options.level();
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if options.destination.to_terminal() {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    let file_result = if options.destination.to_file() {
        open_log_file(&options.file).map(|file| loggers.push(WriteLogger::new(level, config, file)))
    } else {
        Ok(())
    };

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    file_result
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        // reqwest/hyper internals are noisy at info.
        .add_filter_allow_str("neurolearn")
        .build()
}

fn open_log_file(path: &Path) -> io::Result<File> {
    File::create(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("could not create log file {}: {err}", path.display()),
        )
    })
}
