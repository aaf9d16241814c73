//! Structured logging setup for the `sensorflow-ingest` binary.
//!
//! Settings come from the process environment, which `main.rs` populates
//! from `.env` before calling [`init_tracing`].

use std::env;

use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

// ---

/// Resolved logging options.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Filter directives, or `None` to defer to `RUST_LOG`.
    pub directives: Option<String>,

    /// Span lifecycle events to emit.
    pub span_events: FmtSpan,

    /// Forced color mode, or `None` to auto-detect a TTY.
    pub force_color: Option<bool>,
}

impl LogSettings {
    // ---
    /// Read settings from an arbitrary variable source.
    ///
    /// - `RUST_LOG` wins when set; otherwise `INGEST_LOG_LEVEL`
    ///   (default `debug`) with `sqlx::query=warn,rumqttc=info` appended
    /// - `INGEST_SPAN_EVENTS`: `full`, `enter_exit`, else close-only
    /// - `FORCE_COLOR`: `1|true|yes` on, `0|false|no` off, else auto
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // ---
        let span_events = match lookup("INGEST_SPAN_EVENTS").as_deref() {
            Some("full") => FmtSpan::FULL,
            Some("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
            _ => FmtSpan::CLOSE,
        };

        let force_color = match lookup("FORCE_COLOR").as_deref() {
            Some("1") | Some("true") | Some("yes") => Some(true),
            Some("0") | Some("false") | Some("no") => Some(false),
            _ => None,
        };

        let directives = if lookup("RUST_LOG").is_some() {
            None
        } else {
            let level = match lookup("INGEST_LOG_LEVEL").as_deref() {
                Some("trace") => "trace",
                Some("debug") => "debug",
                Some("info") => "info",
                Some("warn") => "warn",
                Some("error") => "error",
                _ => "debug",
            };
            Some(format!("{level},sqlx::query=warn,rumqttc=info"))
        };

        Self {
            directives,
            span_events,
            force_color,
        }
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// Target, file and line number are always included; output is compact.
/// Call once at startup, after `.env` has been loaded, before any logging
/// macro runs.
pub fn init_tracing() {
    // ---
    let settings = LogSettings::from_lookup(|key| env::var(key).ok());

    let env_filter = match &settings.directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::from_default_env(),
    };
    let use_color = settings
        .force_color
        .unwrap_or_else(|| std::io::stdout().is_terminal());

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(settings.span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
