//! JSON log lines on stderr; NDJSON replies on any writer.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber. `RUST_LOG` wins over `default_level`.
    /// Calling twice is harmless; the second install is ignored.
    pub fn init(json: bool, default_level: &str) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = if json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_events(FmtSpan::NONE)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!("subscriber already installed");
        }
    }

    /// Write one value as a single JSON line and flush it.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event).map_err(std::io::Error::from)?;
        writeln!(w, "{line}")?;
        w.flush()
    }
}
