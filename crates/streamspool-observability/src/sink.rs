//! Prometheus-backed telemetry sink.
//!
//! Counters registered through the sink land in a `prometheus::Registry`
//! and can be rendered in text exposition format for a scrape endpoint.
//! A process-wide registry and sink are provided for the common case; tests
//! construct private sinks so they do not collide.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use streamspool_core::TelemetrySink;
use tracing::warn;

lazy_static! {
    /// Process-wide Prometheus metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    static ref SHARED_SINK: Arc<PrometheusSink> =
        Arc::new(PrometheusSink::with_registry(REGISTRY.clone()));
}

/// The sink backed by the process-wide [`struct@REGISTRY`].
pub fn shared() -> Arc<PrometheusSink> {
    Arc::clone(&SHARED_SINK)
}

/// Render the process-wide registry in Prometheus text exposition format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .expect("metrics can be encoded");
    String::from_utf8(buffer).expect("text format is utf-8")
}

/// Named-counter sink writing into a Prometheus registry.
pub struct PrometheusSink {
    registry: Registry,
    counters: RwLock<HashMap<String, IntCounter>>,
}

impl PrometheusSink {
    /// Sink with its own private registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Sink writing into an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// The registry this sink registers counters into.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current value of a registered counter, zero if unknown.
    pub fn value(&self, name: &str) -> u64 {
        self.counters
            .read()
            .expect("counter map lock")
            .get(name)
            .map(|c| c.get())
            .unwrap_or(0)
    }

    fn add(&self, name: &str, by: u64) {
        match self.counters.read().expect("counter map lock").get(name) {
            Some(counter) => counter.inc_by(by),
            None => warn!(counter = name, "Increment on unregistered counter"),
        }
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for PrometheusSink {
    fn register_counter(&self, name: &str, help: &str) {
        let mut counters = self.counters.write().expect("counter map lock");
        if counters.contains_key(name) {
            return;
        }
        let counter = IntCounter::new(name.to_string(), help.to_string())
            .expect("metric can be created");
        self.registry
            .register(Box::new(counter.clone()))
            .expect("metric can be registered");
        counters.insert(name.to_string(), counter);
    }

    fn increment(&self, name: &str, by: u64) {
        self.add(name, by);
    }

    fn observe_millis(&self, name: &str, millis: u64) {
        self.add(name, millis);
    }
}
