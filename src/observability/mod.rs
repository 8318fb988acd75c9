//! Observability subsystem
//!
//! - Structured JSON logging
//! - Typed events
//! - Replication counters
//!
//! Observability is read-only: nothing here feeds back into replication
//! decisions, and a failed log write is ignored.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, ReplicationMetrics};

/// Log an event at its own severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::ReplicationStart, &[("replication_type", "roles")]);
        log_event(Event::ReplicationHalted, &[]);
    }
}
