//! Structured logging setup.
//!
//! [`Logging`] turns a [`LogConfig`] into a `tracing` dispatcher. Nothing is
//! global until [`Logging::install`] is called, so tests can build a
//! dispatcher and scope it with `tracing::dispatcher::with_default`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::LevelFilter};

use crate::config::{LogConfig, LogFormat, LogOutput, LogRotation, TransportMode};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Where console output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    /// Used when stdout carries protocol frames.
    Stderr,
}

impl Console {
    pub fn for_mode(mode: TransportMode) -> Self {
        match mode {
            TransportMode::Stdio => Console::Stderr,
            TransportMode::Sse | TransportMode::StreamableHttp => Console::Stdout,
        }
    }

    fn writer(self) -> BoxMakeWriter {
        match self {
            Console::Stdout => BoxMakeWriter::new(io::stdout),
            Console::Stderr => BoxMakeWriter::new(io::stderr),
        }
    }
}

/// Map a configured level name to a filter. Unknown names fall back to info.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// A configured but not yet installed logging pipeline.
pub struct Logging {
    dispatch: Dispatch,
    level: LevelFilter,
    file_guard: Option<WorkerGuard>,
}

impl Logging {
    pub fn new(config: &LogConfig, console: Console) -> anyhow::Result<Self> {
        Self::with_console_writer(config, console.writer())
    }

    /// Build with an explicit console writer instead of stdout/stderr.
    pub fn with_console_writer(config: &LogConfig, console: BoxMakeWriter) -> anyhow::Result<Self> {
        let level = parse_level(&config.level).unwrap_or(LevelFilter::INFO);

        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
            .add_directive("rmcp=warn".parse()?);

        let (writer, file) = make_writer(config, console)?;
        let base = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(config.enable_caller)
            .with_line_number(config.enable_caller)
            .with_timer(ChronoLocal::new(config.time_format.pattern().to_string()));

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Text => base.boxed(),
        };

        let subscriber = Registry::default().with(layer).with(filter);
        let dispatch = Dispatch::new(subscriber);

        tracing::dispatcher::with_default(&dispatch, || {
            if parse_level(&config.level).is_none() {
                tracing::warn!(level = %config.level, "Unknown log level, using info");
            }
            if let Some(file) = &file {
                if file.pruned > 0 {
                    tracing::debug!(count = file.pruned, "Removed expired log files");
                }
            }
        });

        Ok(Self {
            dispatch,
            level,
            file_guard: file.map(|f| f.guard),
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Make this the process-wide subscriber. Can only succeed once.
    ///
    /// The returned guard must be held until exit; dropping it flushes and
    /// stops the background file writer.
    pub fn install(self) -> anyhow::Result<Option<WorkerGuard>> {
        tracing::dispatcher::set_global_default(self.dispatch)
            .context("a global tracing subscriber is already installed")?;
        Ok(self.file_guard)
    }
}

/// Background writer for the log file.
struct FileSink {
    guard: WorkerGuard,
    pruned: usize,
}

fn make_writer(
    config: &LogConfig,
    console: BoxMakeWriter,
) -> anyhow::Result<(BoxMakeWriter, Option<FileSink>)> {
    let console = if config.disable_stdout {
        BoxMakeWriter::new(io::sink)
    } else {
        console
    };

    if config.output == LogOutput::Stdout {
        return Ok((console, None));
    }

    let (appender, pruned) = open_log_file(config)?;
    let (file, guard) = tracing_appender::non_blocking(appender);
    let writer = match config.output {
        LogOutput::Both => BoxMakeWriter::new(console.and(file)),
        LogOutput::File | LogOutput::Stdout => BoxMakeWriter::new(file),
    };
    Ok((writer, Some(FileSink { guard, pruned })))
}

/// File naming derived from `log.file_path`: `logs/app.log` rolls into
/// `logs/app.<date>.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogFileLayout {
    dir: PathBuf,
    prefix: String,
    suffix: Option<String>,
}

impl LogFileLayout {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        let prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("invalid log file path {}", path.display()))?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            suffix: path.extension().and_then(|s| s.to_str()).map(str::to_string),
        })
    }

    /// Name of the file written when rotation is off.
    fn undated_name(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}.{}", self.prefix, suffix),
            None => self.prefix.clone(),
        }
    }

    fn is_rolled_file(&self, name: &str) -> bool {
        if name == self.undated_name() {
            return false;
        }
        let Some(rest) = name.strip_prefix(&format!("{}.", self.prefix)) else {
            return false;
        };
        match &self.suffix {
            Some(suffix) => rest.ends_with(&format!(".{}", suffix)),
            None => true,
        }
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    }
}

fn open_log_file(config: &LogConfig) -> anyhow::Result<(RollingFileAppender, usize)> {
    let path = config
        .file_path
        .as_deref()
        .context("log.file_path is required for file output")?;
    let layout = LogFileLayout::from_path(path)?;

    fs::create_dir_all(&layout.dir)
        .with_context(|| format!("failed to create log directory {}", layout.dir.display()))?;

    let pruned = if config.max_age_days > 0 {
        let max_age = Duration::from_secs(config.max_age_days * SECS_PER_DAY);
        prune_expired(&layout, max_age, SystemTime::now())
    } else {
        0
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(layout.prefix.clone());
    if let Some(suffix) = &layout.suffix {
        builder = builder.filename_suffix(suffix.clone());
    }
    if config.max_backups > 0 {
        builder = builder.max_log_files(config.max_backups + 1);
    }

    let appender = builder
        .build(&layout.dir)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((appender, pruned))
}

/// Remove rolled files last modified more than `max_age` before `now`.
/// The active undated file is never removed.
fn prune_expired(layout: &LogFileLayout, max_age: Duration, now: SystemTime) -> usize {
    let Some(cutoff) = now.checked_sub(max_age) else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(&layout.dir) else {
        return 0;
    };

    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| layout.is_rolled_file(name))
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .is_ok_and(|modified| modified < cutoff)
        })
        .filter(|entry| fs::remove_file(entry.path()).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeFormat;

    fn file_config(dir: &tempfile::TempDir, format: LogFormat) -> LogConfig {
        LogConfig {
            level: "debug".to_string(),
            format,
            output: LogOutput::File,
            file_path: Some(dir.path().join("nested").join("app.log")),
            time_format: TimeFormat::Iso8601,
            enable_caller: true,
            disable_stdout: false,
            rotation: LogRotation::Never,
            max_backups: 3,
            max_age_days: 0,
        }
    }

    fn read_log(dir: &tempfile::TempDir) -> String {
        fs::read_to_string(dir.path().join("nested").join("app.log")).unwrap()
    }

    fn touch(path: &Path, age: Duration) {
        let file = fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("warning"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("fatal"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_console_for_mode() {
        assert_eq!(Console::for_mode(TransportMode::Stdio), Console::Stderr);
        assert_eq!(Console::for_mode(TransportMode::Sse), Console::Stdout);
        assert_eq!(Console::for_mode(TransportMode::StreamableHttp), Console::Stdout);
    }

    #[test]
    fn test_text_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let logging = Logging::new(&file_config(&dir, LogFormat::Text), Console::Stdout).unwrap();

        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::info!(tool = "calculate", "tool registered");
        });
        drop(logging);

        let contents = read_log(&dir);
        assert!(contents.contains("tool registered"));
        assert!(contents.contains("tool=\"calculate\""));
        assert!(contents.contains("logging.rs"));
    }

    #[test]
    fn test_json_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let logging = Logging::new(&file_config(&dir, LogFormat::Json), Console::Stdout).unwrap();

        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::warn!(port = 8081, "listening");
        });
        drop(logging);

        let contents = read_log(&dir);
        let line = contents.lines().last().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["fields"]["message"], "listening");
        assert_eq!(value["fields"]["port"], 8081);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(&dir, LogFormat::Text);
        config.level = "chatty".to_string();

        let logging = Logging::new(&config, Console::Stdout).unwrap();
        assert_eq!(logging.level(), LevelFilter::INFO);
        drop(logging);

        assert!(read_log(&dir).contains("Unknown log level"));
    }

    #[test]
    fn test_missing_file_path_is_an_error() {
        let config = LogConfig {
            output: LogOutput::File,
            file_path: None,
            ..LogConfig::default()
        };
        assert!(Logging::new(&config, Console::Stdout).is_err());
    }

    #[test]
    fn test_daily_rotation_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(&dir, LogFormat::Text);
        config.rotation = LogRotation::Daily;

        let logging = Logging::new(&config, Console::Stdout).unwrap();
        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::info!("rolled");
        });
        drop(logging);

        let names: Vec<String> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1, "{:?}", names);
        assert!(names[0].starts_with("app.") && names[0].ends_with(".log"));
        assert_ne!(names[0], "app.log");

        let contents = fs::read_to_string(dir.path().join("nested").join(&names[0])).unwrap();
        assert!(contents.contains("rolled"));
    }

    #[test]
    fn test_layout_from_path() {
        let layout = LogFileLayout::from_path(Path::new("logs/app.log")).unwrap();
        assert_eq!(layout.dir, PathBuf::from("logs"));
        assert_eq!(layout.prefix, "app");
        assert_eq!(layout.suffix.as_deref(), Some("log"));
        assert_eq!(layout.undated_name(), "app.log");

        let layout = LogFileLayout::from_path(Path::new("server")).unwrap();
        assert_eq!(layout.dir, PathBuf::from("."));
        assert_eq!(layout.suffix, None);

        assert!(LogFileLayout::from_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_rolled_file_names() {
        let layout = LogFileLayout::from_path(Path::new("logs/app.log")).unwrap();
        assert!(layout.is_rolled_file("app.2026-01-31.log"));
        assert!(layout.is_rolled_file("app.2026-01-31-13.log"));
        assert!(!layout.is_rolled_file("app.log"));
        assert!(!layout.is_rolled_file("other.2026-01-31.log"));
        assert!(!layout.is_rolled_file("app.2026-01-31.txt"));
    }

    #[test]
    fn test_prune_removes_only_expired_rolled_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LogFileLayout::from_path(&dir.path().join("app.log")).unwrap();
        let day = Duration::from_secs(SECS_PER_DAY);

        touch(&dir.path().join("app.2020-01-01.log"), day * 40);
        touch(&dir.path().join("app.2020-02-01.log"), day * 2);
        touch(&dir.path().join("app.log"), day * 40);
        touch(&dir.path().join("notes.txt"), day * 40);

        let removed = prune_expired(&layout, day * 7, SystemTime::now());
        assert_eq!(removed, 1);
        assert!(!dir.path().join("app.2020-01-01.log").exists());
        assert!(dir.path().join("app.2020-02-01.log").exists());
        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_expired_files_are_pruned_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        touch(&nested.join("app.2020-01-01.log"), Duration::from_secs(SECS_PER_DAY * 30));

        let mut config = file_config(&dir, LogFormat::Text);
        config.max_age_days = 7;
        let logging = Logging::new(&config, Console::Stdout).unwrap();
        drop(logging);

        assert!(!nested.join("app.2020-01-01.log").exists());
        assert!(nested.join("app.log").exists());
    }
}
