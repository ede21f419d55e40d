//! StreamSpool Client - batching write path to a message broker
//!
//! This crate provides the `BufferedWriter`: a backpressure-aware buffer
//! between arbitrary producers of byte payloads and a partition-ordered
//! message broker. Payloads accumulate into bounded batches that are
//! published with bounded retry; shutdown drains everything buffered before
//! releasing the broker connection.
//!
//! # Examples
//!
//! ```ignore
//! use streamspool_client::{BrokerConfig, BufferedWriter};
//!
//! // A concrete broker client implements BatchPublisher; it is
//! // constructed from a BrokerConfig outside this crate.
//! let writer = BufferedWriter::builder()
//!     .publisher(publisher)
//!     .telemetry(sink)
//!     .build()?;
//!
//! writer.write("event bytes").await?;
//!
//! // Drains buffered payloads, then releases the connection.
//! writer.close().await?;
//! ```

pub mod batch;
pub mod broker;
pub mod error;
pub mod retry;
pub mod writer;

pub use batch::BatchBuffer;
pub use broker::{AckLevel, Balancer, BatchPublisher, BrokerConfig, BrokerError};
pub use error::{Result, WriterError};
pub use retry::{retry_fixed_delay, RetryPolicy};
pub use writer::{BufferedWriter, BufferedWriterBuilder, WriterConfig};
pub use writer::{METRIC_FLUSH_FAILURE, METRIC_FLUSH_PROCESS_MILLIS, METRIC_FLUSH_SUCCESS};
