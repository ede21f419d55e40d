//! StreamSpool Observability
//!
//! Prometheus-backed implementation of the telemetry sink the writer is
//! constructed with.
//!
//! # Usage
//!
//! ```ignore
//! use streamspool_observability::sink;
//!
//! let writer = BufferedWriter::builder()
//!     .publisher(publisher)
//!     .telemetry(sink::shared())
//!     .build()?;
//!
//! // Scrape endpoint handlers render the registry as text.
//! let body = sink::gather_text();
//! ```

pub mod sink;

pub use sink::{gather_text, shared, PrometheusSink, REGISTRY};
