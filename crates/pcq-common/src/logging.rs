//! Logging bootstrap for the PCQ binaries
//!
//! Structured logging via `tracing`, configured from the environment and
//! initialized once per process. Supports console output, daily-rotated
//! file output, or both.
//!
//! Environment variables:
//! - `LOG_LEVEL`: trace, debug, info, warn, error (default info)
//! - `LOG_OUTPUT`: console, file, both (default console)
//! - `LOG_DIR`: directory for log files (default `./logs`)
//! - `LOG_FILE_PREFIX`: log file name prefix
//! - `LOG_FILTER`: extra filter directives, e.g. `tower_http=debug`

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output target for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(anyhow::anyhow!("Invalid log output: {s}")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level, as an `EnvFilter` directive ("info", "debug", ...).
    pub level: String,
    pub output: LogOutput,
    pub log_dir: PathBuf,
    /// File name prefix; the daily roller appends the date
    /// ("pcq-server" -> "pcq-server.2026-08-06").
    pub file_prefix: String,
    /// Extra per-module directives ("tower_http=debug,axum=trace").
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Console,
            log_dir: PathBuf::from("./logs"),
            file_prefix: "pcq".to_string(),
            filter_directives: None,
        }
    }
}

impl LogConfig {
    pub fn for_binary(prefix: &str) -> Self {
        Self {
            file_prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    /// Overlay environment variables onto this configuration.
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            self.file_prefix = prefix;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            self.filter_directives = Some(filter);
        }
        Ok(self)
    }

    pub fn with_directives(mut self, directives: &str) -> Self {
        self.filter_directives = Some(directives.to_string());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level).context("invalid LOG_LEVEL")?;
        if let Some(directives) = &self.filter_directives {
            for directive in directives.split(',') {
                filter = filter.add_directive(
                    directive
                        .trim()
                        .parse()
                        .context("invalid LOG_FILTER directive")?,
                );
            }
        }
        Ok(filter)
    }
}

/// Initialize the global subscriber.
///
/// Returns the appender guard when file output is enabled; hold it for the
/// lifetime of the process or buffered lines are dropped at exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.build_filter()?;

    match config.output {
        LogOutput::Console => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()
                .context("logging already initialized")?;
            Ok(None)
        }
        LogOutput::File => {
            let (writer, guard) = file_writer(config);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("logging already initialized")?;
            Ok(Some(guard))
        }
        LogOutput::Both => {
            let (writer, guard) = file_writer(config);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("logging already initialized")?;
            Ok(Some(guard))
        }
    }
}

fn file_writer(config: &LogConfig) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);
    tracing_appender::non_blocking(appender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_parses_known_values() {
        assert_eq!("console".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("BOTH".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn directives_are_appended_to_filter() {
        let config = LogConfig::default().with_directives("tower_http=debug");
        assert!(config.build_filter().is_ok());
    }
}
