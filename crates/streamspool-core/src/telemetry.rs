//! Telemetry capability injected into components at construction.
//!
//! Components report through named counters rather than a concrete metrics
//! backend. A sink implementation (Prometheus in production, a recording
//! fake in tests) is handed in when the component is built, so the component
//! itself never touches process-global state.
//!
//! Counter names are registered once, up front; increments afterwards refer
//! to counters by name. Durations are reported as cumulative milliseconds on
//! a counter rather than a histogram, which keeps the contract down to a
//! single primitive.

/// Named-counter telemetry sink.
///
/// Implementations must tolerate concurrent calls; the writer increments
/// from a single worker task, but nothing in this contract forbids sharing
/// a sink across components.
pub trait TelemetrySink: Send + Sync {
    /// Register a counter under `name`. Registering the same name twice is
    /// a no-op.
    fn register_counter(&self, name: &str, help: &str);

    /// Add `by` to the counter registered under `name`.
    fn increment(&self, name: &str, by: u64);

    /// Add an elapsed duration, in whole milliseconds, to the counter
    /// registered under `name`.
    fn observe_millis(&self, name: &str, millis: u64);
}

/// Sink that discards everything. The default when no backend is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn register_counter(&self, _name: &str, _help: &str) {}
    fn increment(&self, _name: &str, _by: u64) {}
    fn observe_millis(&self, _name: &str, _millis: u64) {}
}
