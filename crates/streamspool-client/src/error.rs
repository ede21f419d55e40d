//! Error types for StreamSpool writer operations.
//!
//! Producers never see publish failures: transient broker errors are retried
//! by the worker, and exhausted retries are reported through telemetry and
//! logs only. The errors surfaced here are therefore a short list - broken
//! configuration, misuse after shutdown, and the broker connection's own
//! close error propagated out of `close()`.

use thiserror::Error;

use crate::broker::BrokerError;

/// Convenience type alias for `Result<T, WriterError>`.
pub type Result<T> = std::result::Result<T, WriterError>;

/// Errors surfaced by the producer-facing writer API.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The worker task is gone and the inbound queue no longer accepts
    /// payloads.
    ///
    /// Shutting down consumes the writer, so hitting this through the public
    /// API means the worker died abnormally. Treat it as a bug, not a
    /// runtime condition to recover from.
    #[error("writer is closed")]
    Closed,

    /// Invalid writer configuration.
    ///
    /// ## Causes
    /// - No broker publisher was supplied to the builder
    /// - A capacity, attempt count, or interval of zero
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Error from the underlying broker connection.
    ///
    /// Only the close path reports these synchronously; publish-time broker
    /// errors stay inside the retry loop.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}
