//! Telemetry and structured logging for statecast.
//!
//! Handles subscriber setup (console + rolling NDJSON), payload redaction, and
//! structured stream/action lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, StreamEvent};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
