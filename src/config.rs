use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Config file locations searched when no explicit path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config.yaml", "/app/config.yaml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum TransportMode {
    #[serde(rename = "stdio")]
    #[value(name = "stdio")]
    Stdio,
    #[serde(rename = "sse")]
    #[value(name = "sse")]
    Sse,
    #[serde(rename = "streamableHttp", alias = "http")]
    #[value(name = "streamableHttp", alias = "http")]
    StreamableHttp,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Sse => "sse",
            TransportMode::StreamableHttp => "streamableHttp",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "iso8601", alias = "ISO8601")]
    Iso8601,
    #[serde(rename = "human", alias = "human-readable")]
    Human,
    #[serde(rename = "with-ms", alias = "milliseconds")]
    WithMs,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "rfc3339")]
    Rfc3339,
    #[serde(rename = "rfc1123")]
    Rfc1123,
}

impl TimeFormat {
    /// `chrono` format string for log timestamps.
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S%:z",
            TimeFormat::Human => "%Y-%m-%d %H:%M:%S",
            TimeFormat::WithMs => "%Y-%m-%d %H:%M:%S%.3f",
            TimeFormat::Compact => "%Y%m%d-%H%M%S",
            TimeFormat::Rfc3339 => "%Y-%m-%dT%H:%M:%S%.f%:z",
            TimeFormat::Rfc1123 => "%a, %d %b %Y %H:%M:%S %Z",
        }
    }
}

/// How often the log file rolls over to a new dated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Minutely,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    #[serde(alias = "filepath")]
    pub file_path: Option<PathBuf>,
    #[serde(alias = "timeFormat")]
    pub time_format: TimeFormat,
    #[serde(alias = "enableCaller")]
    pub enable_caller: bool,
    #[serde(alias = "disableStdout")]
    pub disable_stdout: bool,
    pub rotation: LogRotation,
    /// Rolled files kept besides the active one. 0 keeps all of them.
    #[serde(alias = "maxBackups")]
    pub max_backups: usize,
    /// Rolled files older than this many days are removed at startup. 0
    /// disables the check.
    #[serde(alias = "maxAge", alias = "max_age")]
    pub max_age_days: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stdout,
            file_path: Some(PathBuf::from("logs/app.log")),
            time_format: TimeFormat::Human,
            enable_caller: true,
            disable_stdout: false,
            rotation: LogRotation::Daily,
            max_backups: 3,
            max_age_days: 7,
        }
    }
}

/// Process configuration, built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: TransportMode,
    pub host: String,
    pub port: u16,
    pub tool_timeout_secs: u64,
    pub log: LogConfig,
    /// File the values were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::StreamableHttp,
            host: "0.0.0.0".to_string(),
            port: 8081,
            tool_timeout_secs: 30,
            log: LogConfig::default(),
            source: None,
        }
    }
}

/// Values from the command line or environment that beat the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub mode: Option<TransportMode>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Resolve defaults, the config file and overrides into one value.
    pub fn load(overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let candidates: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect();
        Self::load_with_candidates(overrides, &candidates)
    }

    pub fn load_with_candidates(
        overrides: &ConfigOverrides,
        candidates: &[PathBuf],
    ) -> anyhow::Result<Self> {
        Self::load_with_env(overrides, candidates, |key| std::env::var(key).ok())
    }

    /// Like [`load_with_candidates`](Self::load_with_candidates) with an
    /// explicit environment lookup.
    pub fn load_with_env<F>(
        overrides: &ConfigOverrides,
        candidates: &[PathBuf],
        env: F,
    ) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match resolve_config_path(overrides.config_file.as_deref(), candidates)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `MCP_`-prefixed variables, one per key with `.` replaced by
    /// `_` (`MCP_LOG_FORMAT` sets `log.format`).
    fn apply_env<F>(&mut self, env: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some((key, value)) = lookup_env(&env, &["MCP_MODE"]) {
            self.mode = env_value(&key, &value)?;
        }
        if let Some((_, value)) = lookup_env(&env, &["MCP_HOST"]) {
            self.host = value;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_PORT"]) {
            self.port = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_TOOL_TIMEOUT_SECS"]) {
            self.tool_timeout_secs = env_value(&key, &value)?;
        }

        let log = &mut self.log;
        if let Some((_, value)) = lookup_env(&env, &["MCP_LOG_LEVEL"]) {
            log.level = value;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_FORMAT"]) {
            log.format = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_OUTPUT"]) {
            log.output = env_value(&key, &value)?;
        }
        if let Some((_, value)) = lookup_env(&env, &["MCP_LOG_FILE_PATH", "MCP_LOG_FILEPATH"]) {
            log.file_path = Some(PathBuf::from(value));
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_TIME_FORMAT", "MCP_LOG_TIMEFORMAT"]) {
            log.time_format = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_ENABLE_CALLER", "MCP_LOG_ENABLECALLER"]) {
            log.enable_caller = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_DISABLE_STDOUT", "MCP_LOG_DISABLESTDOUT"]) {
            log.disable_stdout = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_ROTATION"]) {
            log.rotation = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_MAX_BACKUPS", "MCP_LOG_MAXBACKUPS"]) {
            log.max_backups = env_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup_env(&env, &["MCP_LOG_MAX_AGE_DAYS", "MCP_LOG_MAXAGE"]) {
            log.max_age_days = env_value(&key, &value)?;
        }
        Ok(())
    }

    fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = &overrides.log_level {
            self.log.level = level.clone();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("host must not be empty");
        }
        if self.tool_timeout_secs == 0 {
            anyhow::bail!("tool_timeout_secs must be greater than zero");
        }
        if self.log.output != LogOutput::Stdout && self.log.file_path.is_none() {
            anyhow::bail!("log.file_path is required when log.output is file or both");
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Address HTTP transports listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// First variable among `keys` that is set, with its name.
fn lookup_env<F>(env: &F, keys: &[&str]) -> Option<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| env(key).map(|value| (key.to_string(), value)))
}

/// Parse one environment value with the same names the config file accepts.
fn env_value<T: DeserializeOwned>(key: &str, raw: &str) -> anyhow::Result<T> {
    serde_yaml::from_str(raw.trim()).with_context(|| format!("invalid value for {}: {:?}", key, raw))
}

/// An explicit path must exist; otherwise the first existing candidate wins.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "config file {} does not exist",
                path.display()
            ));
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(candidates.iter().find(|p| p.exists()).cloned())
}
