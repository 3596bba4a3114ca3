use std::{env, io, path::PathBuf, time::Duration};

use crossterm::tty::IsTty;

use crate::{error::LogError, models::level::Level};

pub const DEFAULT_ENV: &str = "default";
pub const DEFAULT_MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LOG_BACKUPS: usize = 5;

/// Which optional fields of a record end up in the rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub date: bool,
    pub env: bool,
    pub level: bool,
    pub file: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            date: true,
            env: true,
            level: true,
            file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub backups: usize,
}

impl FileSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_LOG_BYTES,
            backups: DEFAULT_LOG_BACKUPS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub env: String,
    pub console_level: Level,
    pub file_level: Level,
    pub colors: bool,
    /// Draw spinner frames for running tasks. Needs a terminal to look right.
    pub animate: bool,
    pub visibility: Visibility,
    pub file: Option<FileSinkConfig>,
    /// Longest time the consumer blocks on the queue before checking for
    /// shutdown.
    pub poll_interval: Duration,
    pub tick_interval: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let interactive = io::stdout().is_tty();
        Self {
            env: DEFAULT_ENV.to_string(),
            console_level: Level::Info,
            file_level: Level::Debug,
            colors: interactive,
            animate: interactive,
            visibility: Visibility::default(),
            file: None,
            poll_interval: Duration::from_millis(100),
            tick_interval: Duration::from_millis(200),
        }
    }
}

impl LoggerConfig {
    /// Defaults overlaid with `LOG_LEVEL`, `LOG_ENV`, `LOG_FILE` and `NO_COLOR`.
    pub fn from_env() -> Result<Self, LogError> {
        let mut config = Self::default();
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.console_level = level.parse()?;
        }
        if let Ok(name) = env::var("LOG_ENV") {
            if !name.trim().is_empty() {
                config.env = name;
            }
        }
        if let Ok(path) = env::var("LOG_FILE") {
            if !path.trim().is_empty() {
                config.file = Some(FileSinkConfig::new(path));
            }
        }
        if env::var_os("NO_COLOR").is_some() {
            config.colors = false;
        }
        Ok(config)
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    pub fn console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    pub fn colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    pub fn animate(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn file(mut self, file: FileSinkConfig) -> Self {
        self.file = Some(file);
        self
    }

    pub fn tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LoggerConfig::default();
        assert_eq!(config.env, "default");
        assert_eq!(config.console_level, Level::Info);
        assert_eq!(config.file_level, Level::Debug);
        assert_eq!(config.tick_interval, Duration::from_millis(200));
        assert!(config.poll_interval <= Duration::from_millis(250));
        assert!(config.file.is_none());
    }

    #[test]
    fn file_sink_defaults_to_ten_megabytes_and_five_backups() {
        let file = FileSinkConfig::new("/tmp/app.log");
        assert_eq!(file.max_bytes, 10 * 1024 * 1024);
        assert_eq!(file.backups, 5);
    }
}
