//! Observability subsystem for aerorepo
//!
//! - Structured logging (JSON lines)
//! - Counter metrics per store handle
//! - Typed repository events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on repository behavior
//! 3. Logging never fails an operation
//!
//! # Usage
//!
//! ```ignore
//! use aerorepo::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::RecordsStored, &[("count", "3")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a repository event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a repository event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::RepositoryOpened);
        log_event(Event::RecordRemoved);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::RecordsStored, &[("namespace", "main"), ("count", "2")]);
    }
}
