//! Structured logging for the player crates.
//!
//! [`init_logging`] installs a global `tracing` subscriber with one of three
//! output formats and a per-crate level filter. When the host hands in a
//! [`LoggerSink`], every event that passes the filter is also copied into a
//! [`LogEntry`] and delivered to the sink, so the host sees the same lines
//! as the console.
//!
//! Track URLs are the main privacy concern here: signed stream URLs carry
//! their credentials in the query string. With redaction on (the default),
//! any field named like `url`/`uri` loses its query before it reaches the
//! sink, and credential-looking fields are masked outright.
//!
//! ```ignore
//! use bridge_traits::log::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//! init_logging(config)?;
//!
//! tracing::info!(lane = 0, "player ready");
//! ```

use crate::error::{Error, Result};

use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Crates whose output follows the configured level. Everything else is
/// capped at `warn`.
const PLAYER_CRATES: &[&str] = &[
    "trackplayer_workspace",
    "core_runtime",
    "core_playback",
    "core_service",
    "bridge_desktop",
];

const REDACTED: &str = "[REDACTED]";

/// Console output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored. Debug builds default to this.
    Pretty,
    /// One JSON object per line. Release builds default to this.
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the player crates when no custom filter is set.
    pub level: LogLevel,
    /// Mask credentials and URL query strings before they reach the sink.
    pub redact: bool,
    /// `EnvFilter` directives that replace the per-crate default.
    pub filter: Option<String>,
    pub sink: Option<Arc<dyn LoggerSink>>,
    /// Report span enter/exit and include the span list in JSON output.
    pub span_events: bool,
    pub show_target: bool,
    pub show_threads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact: true,
            filter: None,
            sink: None,
            span_events: true,
            show_target: true,
            show_threads: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("redact", &self.redact)
            .field("filter", &self.filter)
            .field("sink", &self.sink.as_ref().map(|_| "LoggerSink"))
            .finish_non_exhaustive()
    }
}

impl LoggingConfig {
    pub fn with_format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        Self { level, ..self }
    }

    pub fn with_redaction(self, redact: bool) -> Self {
        Self { redact, ..self }
    }

    pub fn with_filter(self, filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..self
        }
    }

    pub fn with_logger_sink(self, sink: Arc<dyn LoggerSink>) -> Self {
        Self {
            sink: Some(sink),
            ..self
        }
    }

    pub fn with_span_events(self, span_events: bool) -> Self {
        Self {
            span_events,
            ..self
        }
    }

    pub fn with_target(self, show_target: bool) -> Self {
        Self {
            show_target,
            ..self
        }
    }

    pub fn with_threads(self, show_threads: bool) -> Self {
        Self {
            show_threads,
            ..self
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process succeeds; later calls return
/// [`Error::Config`].
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink = config
        .sink
        .clone()
        .map(|sink| LoggerSinkLayer::new(sink, config.redact));
    let registry = tracing_subscriber::registry().with(filter).with(sink);

    let console = tracing_subscriber::fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(config.show_threads)
        .with_thread_names(config.show_threads)
        .with_writer(io::stdout);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(console.pretty().with_span_events(span_events(&config)))
            .try_init(),
        LogFormat::Compact => registry.with(console.compact()).try_init(),
        LogFormat::Json => registry
            .with(
                console
                    .json()
                    .flatten_event(true)
                    .with_current_span(config.span_events)
                    .with_span_list(config.span_events),
            )
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("logging already initialized: {}", e)))
}

fn span_events(config: &LoggingConfig) -> FmtSpan {
    if config.span_events {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = config
        .filter
        .clone()
        .unwrap_or_else(|| default_filter(config.level));
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("bad log filter {:?}: {}", directives, e)))
}

fn default_filter(level: LogLevel) -> String {
    let level = level.as_str().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(PLAYER_CRATES.iter().map(|krate| format!("{}={}", krate, level)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Copies events into [`LogEntry`] values for the host sink.
struct LoggerSinkLayer {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl LoggerSinkLayer {
    fn new(sink: Arc<dyn LoggerSink>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn deliver(&self, entry: LogEntry) {
        let sink = Arc::clone(&self.sink);
        let send = async move {
            if let Err(err) = sink.log(entry).await {
                eprintln!("log sink rejected entry: {}", err);
            }
        };
        // Inside a runtime the sink must not block the emitting task.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(send);
            }
            Err(_) => futures::executor::block_on(send),
        }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = sink_level(meta.level());
        if level < self.sink.min_level() {
            return;
        }

        let mut fields = FieldCollector {
            redact: self.redact,
            message: None,
            fields: BTreeMap::new(),
        };
        event.record(&mut fields);

        let message = fields.message.unwrap_or_else(|| meta.name().to_string());
        let mut entry = fields
            .fields
            .into_iter()
            .fold(LogEntry::new(level, meta.target(), message), |entry, (k, v)| {
                entry.with_field(k, v)
            });
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span(span.name());
        }
        self.deliver(entry);
    }
}

struct FieldCollector {
    redact: bool,
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name if self.redact => {
                let value = redact_if_sensitive(name, &value);
                self.fields.insert(name.to_string(), value);
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

fn sink_level(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else if *level == Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

/// Mask a field value whose name suggests a credential, and drop the query
/// string of URL-like fields.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("authorization", "Bearer abc"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("track_id", "42"), "42");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const CREDENTIAL_HINTS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
        "cookie",
    ];

    let name = field_name.to_ascii_lowercase();
    if CREDENTIAL_HINTS.iter().any(|hint| name.contains(hint)) {
        REDACTED.to_string()
    } else if name.contains("url") || name.contains("uri") {
        strip_query(value).to_string()
    } else {
        value.to_string()
    }
}

/// Drop the query string and fragment of a URL.
///
/// ```
/// use core_runtime::logging::strip_query;
///
/// assert_eq!(
///     strip_query("https://cdn.example.com/a.mp3?sig=abc#t=10"),
///     "https://cdn.example.com/a.mp3"
/// );
/// ```
pub fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Keep only the file name of a local path.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/Users/me/Music/intro.flac"), "intro.flac");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_redaction(false)
            .with_filter("core_playback=trace")
            .with_span_events(false)
            .with_threads(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.redact);
        assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
        assert!(!config.span_events);
        assert!(config.show_target);
        assert!(config.show_threads);
    }

    #[test]
    fn test_default_filter_covers_player_crates() {
        let filter = default_filter(LogLevel::Debug);
        assert!(filter.starts_with("warn,"));
        for krate in PLAYER_CRATES {
            assert!(filter.contains(&format!("{}=debug", krate)));
        }
    }

    #[test]
    fn test_build_filter() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_playback=debug"));
    }

    #[test]
    fn test_build_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_service=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_service=trace"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_playback=loud");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_redaction_rules() {
        assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Cookie", "sid=1"), "[REDACTED]");
        assert_eq!(
            redact_if_sensitive("url", "https://host/a.mp3?token=1"),
            "https://host/a.mp3"
        );
        assert_eq!(redact_if_sensitive("title", "Song Name"), "Song Name");
    }

    #[test]
    fn test_strip_helpers() {
        assert_eq!(strip_path("/home/user/music/song.mp3"), "song.mp3");
        assert_eq!(strip_path("C:\\Users\\John\\Music\\song.mp3"), "song.mp3");
        assert_eq!(strip_path("song.mp3"), "song.mp3");
        assert_eq!(strip_query("file:///a.flac"), "file:///a.flac");
    }

    #[test]
    fn test_logger_sink_layer_forwards_event() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(trait_sink, true));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(
            target: "test.target",
            lane = 1u64,
            url = "https://cdn/x.mp3?sig=secret",
            "track queued"
        );

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "test.target");
        assert_eq!(entry.message, "track queued");
        assert_eq!(entry.fields.get("lane"), Some(&"1".to_string()));
        assert_eq!(entry.fields.get("url"), Some(&"https://cdn/x.mp3".to_string()));
    }

    #[test]
    fn test_logger_sink_respects_min_level() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(trait_sink, false));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::trace!("below the sink threshold");
        tracing::debug!("forwarded");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Debug);
    }

    #[derive(Default)]
    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }
}
