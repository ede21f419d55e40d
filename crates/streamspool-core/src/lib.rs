//! StreamSpool Core - shared vocabulary types
//!
//! This crate holds the types every StreamSpool component speaks in:
//!
//! - [`Message`]: the key/value pair handed to the broker. Keys are derived
//!   from the payload content, so identical payloads always land with the
//!   same partition affinity.
//! - [`TelemetrySink`]: the named-counter telemetry capability injected into
//!   components at construction, keeping them testable without a live
//!   metrics backend.
//!
//! Payloads are `bytes::Bytes` throughout for zero-copy handoff between the
//! producer-facing API, the accumulation buffer, and the broker client.

pub mod message;
pub mod telemetry;

pub use message::Message;
pub use telemetry::{NoopSink, TelemetrySink};
