//! Broker collaborator contract.
//!
//! The writer does not speak any wire protocol itself. It drives a pre-built
//! broker client through [`BatchPublisher`]: publish a whole batch and
//! resolve once the broker acknowledges it (or fails), plus a close
//! operation releasing the connection. Concrete clients live outside this
//! repository; tests script the trait directly.
//!
//! [`BrokerConfig`] captures the parameters such a client is constructed
//! with, so call sites that wire up a real connection agree on the shape of
//! that handoff.

use std::time::Duration;

use async_trait::async_trait;
use streamspool_core::Message;
use thiserror::Error;

/// Per-batch byte ceiling a broker connection is configured with by default.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1024 * 1024;

/// Errors produced by a broker client, or by the deadline wrapped around a
/// publish attempt.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport-level failure (connection refused, reset, DNS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker received the batch and refused it.
    #[error("batch rejected by broker: {0}")]
    Rejected(String),

    /// A publish attempt exceeded its per-attempt deadline.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was already released.
    #[error("broker connection closed")]
    ConnectionClosed,
}

/// A broker client able to publish message batches.
///
/// The contract the writer relies on:
/// - `publish_batch` submits the entire slice in one call and resolves only
///   once the broker has acknowledged it at the configured ack level, or
///   with the failure that prevented that. Partial acceptance is the
///   broker's problem to mask; from this side a batch succeeds or fails as
///   a whole.
/// - `close` releases the connection. Called exactly once, after the final
///   flush has completed.
#[async_trait]
pub trait BatchPublisher: Send + Sync + 'static {
    /// Publish a batch, blocking until acknowledged or failed.
    async fn publish_batch(&self, messages: &[Message]) -> std::result::Result<(), BrokerError>;

    /// Release the underlying connection.
    async fn close(&self) -> std::result::Result<(), BrokerError>;
}

/// How the broker spreads keyless traffic across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balancer {
    /// Prefer the partition with the least outstanding load.
    LeastLoaded,
    /// Rotate through partitions.
    RoundRobin,
}

/// Acknowledgement level a publish waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckLevel {
    /// All in-sync replicas.
    All,
    /// Partition leader only.
    Leader,
    /// Fire and forget.
    None,
}

/// Construction parameters for a broker connection.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker endpoints, host:port.
    pub endpoints: Vec<String>,

    /// Destination topic.
    pub topic: String,

    /// Partitioning strategy for the connection.
    pub balancer: Balancer,

    /// Per-batch byte ceiling the connection enforces.
    pub max_batch_bytes: usize,

    /// Deadline the connection applies to a single write on the wire.
    pub write_timeout: Duration,

    /// Acknowledgement level a publish waits for.
    pub acks: AckLevel,
}

impl BrokerConfig {
    /// Config with the defaults a durable write path wants: least-loaded
    /// balancing and acknowledgement from all replicas.
    pub fn new(endpoints: Vec<String>, topic: impl Into<String>) -> Self {
        Self {
            endpoints,
            topic: topic.into(),
            balancer: Balancer::LeastLoaded,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            write_timeout: Duration::from_secs(60),
            acks: AckLevel::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_config_defaults() {
        let config = BrokerConfig::new(vec!["broker-1:9092".to_string()], "events");
        assert_eq!(config.topic, "events");
        assert_eq!(config.balancer, Balancer::LeastLoaded);
        assert_eq!(config.acks, AckLevel::All);
        assert_eq!(config.max_batch_bytes, DEFAULT_MAX_BATCH_BYTES);
        assert_eq!(config.write_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_broker_error_display() {
        let err = BrokerError::Timeout(Duration::from_secs(60));
        assert!(err.to_string().contains("timed out"));

        let err = BrokerError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
