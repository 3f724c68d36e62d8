//! Tracing subscriber initialization for hosts embedding cmdflow.
//!
//! The cmdflow libraries only emit spans and events; a host calls one of
//! these functions once at startup.
//!
//! ```no_run
//! use cmdflow_observe::tracing_setup::{LogFormat, TracingOptions, init_tracing_with};
//!
//! // Text logs, `cmdflow=info` unless RUST_LOG says otherwise
//! cmdflow_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // JSON lines plus OpenTelemetry spans on stdout
//! init_tracing_with(&TracingOptions {
//!     format: LogFormat::Json,
//!     enable_otel: true,
//!     ..TracingOptions::default()
//! })
//! .unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "cmdflow=info";

/// Instrumentation scope reported to OpenTelemetry.
pub const TRACER_NAME: &str = "cmdflow";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Rendering of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines with targets.
    #[default]
    Text,
    /// One JSON object per line, including the current span's fields.
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingOptions {
    pub format: LogFormat,
    /// Bridge spans to OpenTelemetry with the stdout exporter.
    pub enable_otel: bool,
    /// Filter directive applied when `RUST_LOG` is not set.
    pub default_directive: String,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            enable_otel: false,
            default_directive: DEFAULT_DIRECTIVE.to_string(),
        }
    }
}

/// Text logs with default filtering, optionally bridged to OpenTelemetry.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing_with(&TracingOptions {
        enable_otel,
        ..TracingOptions::default()
    })
}

/// Install the global subscriber described by `options`.
///
/// Span close events are always logged, so Build / Link / Init durations
/// show up without OpenTelemetry.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing_with(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let filter = env_filter(&options.default_directive);

    let (text, json) = match options.format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            ),
        ),
    };

    let otel = if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .with(otel)
        .try_init()?;
    Ok(())
}

/// Flush and shut down the OpenTelemetry provider, if one was installed.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_text_without_otel() {
        let options = TracingOptions::default();
        assert_eq!(options.format, LogFormat::Text);
        assert!(!options.enable_otel);
        assert_eq!(options.default_directive, DEFAULT_DIRECTIVE);
    }

    #[test]
    fn test_second_init_reports_error_instead_of_panicking() {
        let _ = init_tracing(false);
        let json = TracingOptions {
            format: LogFormat::Json,
            ..TracingOptions::default()
        };
        assert!(init_tracing_with(&json).is_err());
        shutdown_tracing();
    }
}
