use crate::errors::EaseError;
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, filter};
use typed_builder::TypedBuilder;

/// Target of registration and scheduling lines, tagged ``[CONFIG]``
pub const CONFIG_TARGET: &str = "ease::config";

/// Target of user log lines, tagged ``[TASK]``
pub const TASK_TARGET: &str = "ease::task";

/// Environment variable overriding the level filter
pub const LOG_ENV: &str = "EASE_LOG";

/// The tag a log line is printed with
///
/// # Returns
/// ``ERROR`` and ``WARNING`` by level, otherwise ``CONFIG`` or ``TASK`` by target and ``LOG``
/// for every other informational line
pub fn tag(metadata: &Metadata<'_>) -> &'static str {
    match *metadata.level() {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => match metadata.target() {
            CONFIG_TARGET => "CONFIG",
            TASK_TARGET => "TASK",
            _ => "LOG",
        },
        Level::DEBUG => "DEBUG",
        _ => "TRACE",
    }
}

fn colour(tag: &str) -> Option<&'static str> {
    match tag {
        "ERROR" => Some("\x1b[1;91m"),
        "WARNING" => Some("\x1b[1;93m"),
        "CONFIG" => Some("\x1b[1;92m"),
        "TASK" => Some("\x1b[96m"),
        _ => None,
    }
}

/// Formats events as ``[TAG] message``, optionally prefixed with an RFC 3339 timestamp and
/// coloured when the writer supports ANSI escapes
#[derive(Debug, Clone, Copy, Default)]
pub struct EaseFormat {
    timestamps: bool,
}

impl EaseFormat {
    pub fn console() -> Self {
        Self { timestamps: false }
    }

    pub fn file() -> Self {
        Self { timestamps: true }
    }
}

impl<S, N> FormatEvent<S, N> for EaseFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        if self.timestamps {
            write!(
                writer,
                "[{}] ",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            )?;
        }

        let tag = tag(event.metadata());
        let colour = colour(tag).filter(|_| writer.has_ansi_escapes());
        if let Some(colour) = colour {
            write!(writer, "{colour}")?;
        }

        write!(writer, "[{tag}] ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        if colour.is_some() {
            write!(writer, "\x1b[0m")?;
        }

        writeln!(writer)
    }
}

/// [`LoggingConfig`] configures [`init`]
///
/// # Fields
/// - ``verbose`` prints ``[CONFIG]`` lines on the console too (they always reach the file)
/// - ``log_file`` the append-only log file, ``~/.ease/ease.log`` by default, [`None`] disables it
/// - ``ansi`` whether the console output is coloured
#[derive(TypedBuilder, Debug, Clone)]
pub struct LoggingConfig {
    #[builder(default = false)]
    verbose: bool,

    #[builder(default = default_log_file())]
    log_file: Option<PathBuf>,

    #[builder(default = true)]
    ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// ``~/.ease/ease.log``, [`None`] when the home directory is unknown
pub fn default_log_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ease").join("ease.log"))
}

/// Keeps the background writer of the log file alive, dropping it flushes pending lines
#[must_use]
pub struct LoggingGuard(#[allow(dead_code)] Option<WorkerGuard>);

fn file_appender(path: &Path) -> Result<RollingFileAppender, EaseError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| EaseError::Logging(format!("\"{}\" is not a file", path.display())))?;

    std::fs::create_dir_all(dir).map_err(|err| {
        EaseError::Logging(format!("cannot create \"{}\": {err}", dir.display()))
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|err| EaseError::Logging(err.to_string()))
}

/// Installs the global ``tracing`` subscriber: a console layer writing to stdout and, when a log
/// file is configured, a file layer appending timestamped lines to it. The level filter comes from
/// ``EASE_LOG`` and defaults to ``info``
///
/// # Returns
/// A [`LoggingGuard`] that must be held for as long as lines should reach the file, or
/// [`EaseError::Logging`] when the file cannot be opened or a subscriber is already installed
pub fn init(config: LoggingConfig) -> Result<LoggingGuard, EaseError> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let verbose = config.verbose;
    let console = tracing_subscriber::fmt::layer()
        .event_format(EaseFormat::console())
        .with_writer(std::io::stdout)
        .with_ansi(config.ansi)
        .with_filter(filter::filter_fn(move |metadata| {
            verbose || metadata.target() != CONFIG_TARGET
        }));

    let (file, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .event_format(EaseFormat::file())
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|err| EaseError::Logging(err.to_string()))?;

    Ok(LoggingGuard(guard))
}
