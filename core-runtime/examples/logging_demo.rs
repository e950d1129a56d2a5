//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_runtime=trace"
//! ```

use bridge_traits::log::{ConsoleLogger, LogLevel};
use core_runtime::events::{EventBus, PlayerEvent};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some(_) => LogFormat::Pretty,
        None => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(err) = init_logging(config) {
        eprintln!("{}", err);
        return;
    }

    info!(format = ?format, "Logging initialized");

    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let span = info_span!("lane", lane = 0);
    let _entered = span.enter();

    debug!(
        file = %strip_path("/home/me/Music/intro.flac"),
        "Queued local track"
    );
    info!(
        url = "https://cdn.example.com/stream.mp3?signature=abc",
        "Queued remote track, query string is redacted for the host sink"
    );

    bus.emit(PlayerEvent::ButtonDuck {
        paused: false,
        ducking: true,
    })
    .ok();
    if let Ok(event) = events.recv().await {
        warn!(event = event.description(), "Focus event delivered");
    }
}
