//! Structured logging. Diagnostics go to stderr so stdout stays a clean
//! reply stream.

mod format;

pub use format::StructuredLogger;
