use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use neurolearn_engine::{
    ApiSettings, CachePolicy, EngineSettings, PollSettings, ProgressSettings, DEFAULT_BASE_URL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::{LogDestination, LogOptions, DEFAULT_LOG_FILE};

pub const DEFAULT_CONFIG_FILE: &str = "neurolearn.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },
}

/// A config together with the file it came from, `None` for built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

/// Settings read from `neurolearn.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub status_poll_secs: u64,
    pub status_retry_secs: u64,
    /// `None` keeps polling through errors indefinitely.
    pub max_status_errors: Option<u32>,
    pub progress_tick_ms: u64,
    pub log_to: LogDestination,
    pub log_file: PathBuf,
    pub verbose_log: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from("./.neurolearn_cache"),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            status_poll_secs: 3,
            status_retry_secs: 5,
            max_status_errors: None,
            progress_tick_ms: 200,
            log_to: LogDestination::File,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            verbose_log: false,
        }
    }
}

impl AppConfig {
    /// Loads `explicit`, or `./neurolearn.ron` when no path is given.
    ///
    /// Only the implicit default file may be absent. Nothing is logged here:
    /// the logger is configured from the result.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let path = explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
                return Ok(LoadedConfig {
                    config: Self::default(),
                    source: None,
                });
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config = Self::from_ron(&text, &path)?;
        Ok(LoadedConfig {
            config,
            source: Some(path),
        })
    }

    pub fn from_ron(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Command-line values win over the file. Clap already folded the
    /// environment into `base_url`.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        log_to: Option<LogDestination>,
    ) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(log_to) = log_to {
            self.log_to = log_to;
        }
        self
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            destination: self.log_to,
            file: self.log_file.clone(),
            verbose: self.verbose_log,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            api: ApiSettings {
                base_url: self.base_url.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            poll: PollSettings {
                processing_interval: Duration::from_secs(self.status_poll_secs),
                error_interval: Duration::from_secs(self.status_retry_secs),
                max_consecutive_errors: self.max_status_errors,
            },
            progress: ProgressSettings {
                tick: Duration::from_millis(self.progress_tick_ms),
                ..ProgressSettings::default()
            },
            cache_policy: CachePolicy::default(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("status_poll_secs", self.status_poll_secs),
            ("status_retry_secs", self.status_retry_secs),
            ("progress_tick_ms", self.progress_tick_ms),
        ];
        match checks.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(()),
        }
    }
}
