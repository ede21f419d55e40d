//! Buffered, batching writer in front of a partition-ordered broker.
//!
//! This module provides the `BufferedWriter` - the producer-facing entry
//! point of StreamSpool. Producers hand it opaque byte payloads at whatever
//! rate they like; the writer accumulates them into bounded batches and
//! publishes each batch to the broker with bounded retry.
//!
//! ## Control Flow
//!
//! - `write()` enqueues the payload on a bounded inbound queue. When the
//!   queue is full the call waits - that wait is the only backpressure
//!   signal the component emits, and no payload is ever dropped at
//!   admission.
//! - A single worker task drains the queue into the accumulation buffer.
//!   A full buffer is flushed before the next payload is accepted; a
//!   periodic timer flushes whatever has accumulated, unless a flush
//!   happened within the last interval.
//! - `close()` closes the queue, waits for the worker to drain it and run a
//!   final flush, then releases the broker connection.
//!
//! ## Delivery Contract
//!
//! At-most-once, fire-and-forget: a batch that still fails after the
//! configured attempts is dropped, with a failure counter increment and an
//! error log as the only visibility. Producers never observe publish
//! failures directly. Callers that need stronger durability must layer it
//! on top (for example by spilling to durable storage before writing here).
//!
//! ## Lifecycle
//!
//! Running -> Draining (queue closed, final flush in progress) -> Closed
//! (broker connection released). `close()` consumes the writer, so no
//! transition can be skipped or repeated.
//!
//! ## Concurrency Model
//!
//! All accumulation, flush, and publish logic runs on one worker task. The
//! buffer and flush state are single-writer by construction and need no
//! locking; producers only ever touch the thread-safe inbound queue.
//!
//! ## Examples
//!
//! ```ignore
//! use streamspool_client::BufferedWriter;
//!
//! let writer = BufferedWriter::builder()
//!     .publisher(publisher)
//!     .telemetry(sink)
//!     .batch_capacity(256)
//!     .build()?;
//!
//! writer.write("payload bytes").await?;
//! writer.close().await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use streamspool_core::{NoopSink, TelemetrySink};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::batch::BatchBuffer;
use crate::broker::{BatchPublisher, BrokerError};
use crate::error::{Result, WriterError};
use crate::retry::{retry_fixed_delay, RetryPolicy};

/// Default maximum number of payloads per batch.
pub const DEFAULT_BATCH_CAPACITY: usize = 256;

/// Default inbound queue capacity, as a multiple of the batch capacity.
/// Sized to absorb short publish latencies without blocking producers.
pub const DEFAULT_QUEUE_FACTOR: usize = 5;

/// Default interval of the periodic flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default deadline for a single publish attempt.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Counter: batches acknowledged by the broker.
pub const METRIC_FLUSH_SUCCESS: &str = "streamspool_flush_success_total";

/// Counter: batches dropped after exhausting retries.
pub const METRIC_FLUSH_FAILURE: &str = "streamspool_flush_failure_total";

/// Counter: cumulative flush processing time in milliseconds.
pub const METRIC_FLUSH_PROCESS_MILLIS: &str = "streamspool_flush_process_millis_total";

/// Operational parameters of a `BufferedWriter`.
///
/// Created through `BufferedWriterBuilder`; the defaults suit a writer
/// feeding a nearby broker at moderate throughput.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum payloads accumulated before a flush is forced.
    pub batch_capacity: usize,

    /// Inbound queue capacity = `queue_factor * batch_capacity`.
    pub queue_factor: usize,

    /// Periodic flush interval. A timer flush is skipped if any flush
    /// happened within the last interval.
    pub flush_interval: Duration,

    /// Deadline applied to each individual publish attempt.
    pub write_timeout: Duration,

    /// Bounded fixed-delay retry applied to each flush.
    pub retry: RetryPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            queue_factor: DEFAULT_QUEUE_FACTOR,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl WriterConfig {
    fn queue_capacity(&self) -> usize {
        self.batch_capacity * self.queue_factor
    }

    fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(WriterError::Config(
                "batch capacity must be at least 1".to_string(),
            ));
        }
        if self.queue_factor == 0 {
            return Err(WriterError::Config(
                "queue factor must be at least 1".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(WriterError::Config(
                "flush interval must be non-zero".to_string(),
            ));
        }
        if self.write_timeout.is_zero() {
            return Err(WriterError::Config(
                "write timeout must be non-zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(WriterError::Config(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Batching writer handle held by producers.
///
/// Cheap to share behind an `Arc` for concurrent producers; `write` takes
/// `&self`. Shutdown takes the writer by value, so it can only happen once
/// and only when producers are done with it.
pub struct BufferedWriter {
    tx: mpsc::Sender<Bytes>,
    done_rx: oneshot::Receiver<()>,
    publisher: Arc<dyn BatchPublisher>,
}

impl BufferedWriter {
    /// Create a builder with default configuration.
    pub fn builder() -> BufferedWriterBuilder {
        BufferedWriterBuilder::new()
    }

    /// Enqueue a payload for batched publication.
    ///
    /// Waits while the inbound queue is full; that wait is the
    /// backpressure signal, and the payload is never dropped at this
    /// stage. Payloads are admitted in FIFO order.
    ///
    /// # Errors
    ///
    /// `WriterError::Closed` if the worker task has terminated. Since
    /// `close` consumes the writer, reaching this through the public API
    /// indicates a bug rather than a recoverable condition.
    pub async fn write(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.tx
            .send(payload.into())
            .await
            .map_err(|_| WriterError::Closed)
    }

    /// Shut down: drain, final-flush, then release the broker connection.
    ///
    /// Closes the inbound queue, waits for the worker to drain any queued
    /// payloads and publish the remainder (retries included), and only
    /// then closes the broker connection. The connection's close error, if
    /// any, is returned.
    pub async fn close(self) -> Result<()> {
        let Self {
            tx,
            done_rx,
            publisher,
        } = self;

        // Dropping the sender closes the queue; the worker drains what is
        // left, runs its final flush, then signals completion.
        drop(tx);
        if done_rx.await.is_err() {
            error!("Writer worker terminated abnormally before drain completed");
        }

        publisher.close().await?;
        Ok(())
    }
}

/// Builder for configuring and creating a `BufferedWriter`.
///
/// A broker publisher is required; everything else has defaults. The
/// telemetry sink defaults to a no-op.
///
/// # Examples
///
/// ```ignore
/// let writer = BufferedWriter::builder()
///     .publisher(publisher)
///     .batch_capacity(64)
///     .flush_interval(Duration::from_millis(500))
///     .max_attempts(5)
///     .build()?;
/// ```
pub struct BufferedWriterBuilder {
    publisher: Option<Arc<dyn BatchPublisher>>,
    telemetry: Arc<dyn TelemetrySink>,
    config: WriterConfig,
}

impl BufferedWriterBuilder {
    pub fn new() -> Self {
        Self {
            publisher: None,
            telemetry: Arc::new(NoopSink),
            config: WriterConfig::default(),
        }
    }

    /// Broker client the writer publishes through (required).
    pub fn publisher(mut self, publisher: Arc<dyn BatchPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Telemetry sink for flush counters. Defaults to a no-op sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Maximum payloads per batch.
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    /// Inbound queue capacity as a multiple of the batch capacity.
    pub fn queue_factor(mut self, factor: usize) -> Self {
        self.config.queue_factor = factor;
        self
    }

    /// Periodic flush interval.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Per-attempt publish deadline.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Total publish attempts per flush, including the first.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Delay between publish attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.retry_delay = delay;
        self
    }

    /// Validate the configuration, register the flush counters on the
    /// telemetry sink, and start the worker task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `WriterError::Config` when the publisher is missing or a parameter
    /// is out of range.
    pub fn build(self) -> Result<BufferedWriter> {
        let publisher = self
            .publisher
            .ok_or_else(|| WriterError::Config("broker publisher is required".to_string()))?;
        self.config.validate()?;

        self.telemetry
            .register_counter(METRIC_FLUSH_SUCCESS, "Batches acknowledged by the broker");
        self.telemetry.register_counter(
            METRIC_FLUSH_FAILURE,
            "Batches dropped after exhausting retries",
        );
        self.telemetry.register_counter(
            METRIC_FLUSH_PROCESS_MILLIS,
            "Cumulative flush processing time in milliseconds",
        );

        let (tx, rx) = mpsc::channel(self.config.queue_capacity());
        let (done_tx, done_rx) = oneshot::channel();

        let worker = Worker {
            publisher: Arc::clone(&publisher),
            telemetry: self.telemetry,
            batch: BatchBuffer::new(self.config.batch_capacity),
            last_flush: Instant::now(),
            config: self.config,
        };
        tokio::spawn(worker.run(rx, done_tx));

        Ok(BufferedWriter {
            tx,
            done_rx,
            publisher,
        })
    }
}

/// The single task that owns the accumulation buffer and the broker
/// publishing path.
struct Worker {
    publisher: Arc<dyn BatchPublisher>,
    telemetry: Arc<dyn TelemetrySink>,
    batch: BatchBuffer,
    last_flush: Instant,
    config: WriterConfig,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Bytes>, done: oneshot::Sender<()>) {
        let period = self.config.flush_interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_payload = rx.recv() => match maybe_payload {
                    Some(payload) => {
                        // A full buffer must be flushed before this payload
                        // can be accepted; the inbound queue holds further
                        // producers back in the meantime.
                        if self.batch.is_full() {
                            self.flush().await;
                        }
                        self.batch.push(payload);
                    }
                    // Queue closed: shutdown path.
                    None => break,
                },
                _ = ticker.tick() => {
                    // Skip the timer flush if anything flushed within the
                    // last interval (a capacity flush just happened).
                    if self.last_flush.elapsed() > self.config.flush_interval {
                        self.flush().await;
                    }
                }
            }
        }

        self.flush().await;
        let _ = done.send(());
    }

    /// Publish the accumulated batch with bounded retry, then reset.
    ///
    /// A flush of an empty buffer makes no broker call and emits no
    /// telemetry, but still advances the flush timestamp so the timer does
    /// not fire again immediately afterwards.
    async fn flush(&mut self) {
        if self.batch.is_empty() {
            self.last_flush = Instant::now();
            return;
        }

        let started = Instant::now();
        let batch_len = self.batch.len();
        let write_timeout = self.config.write_timeout;
        let publisher = Arc::clone(&self.publisher);
        let messages = self.batch.messages();

        let result = retry_fixed_delay(&self.config.retry, || {
            let publisher = Arc::clone(&publisher);
            async move {
                match tokio::time::timeout(write_timeout, publisher.publish_batch(messages)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(BrokerError::Timeout(write_timeout)),
                }
            }
        })
        .await;

        let elapsed = started.elapsed();
        self.telemetry
            .observe_millis(METRIC_FLUSH_PROCESS_MILLIS, elapsed.as_millis() as u64);
        match result {
            Ok(()) => {
                self.telemetry.increment(METRIC_FLUSH_SUCCESS, 1);
                debug!(
                    batch = batch_len,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Flushed batch"
                );
            }
            Err(err) => {
                self.telemetry.increment(METRIC_FLUSH_FAILURE, 1);
                error!(
                    batch = batch_len,
                    error = %err,
                    "Dropping batch after exhausted retries"
                );
            }
        }

        self.batch.reset();
        self.last_flush = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use streamspool_core::Message;

    struct FakePublisher {
        batches: Mutex<Vec<Vec<Message>>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakePublisher {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BatchPublisher for FakePublisher {
        async fn publish_batch(&self, messages: &[Message]) -> std::result::Result<(), BrokerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BrokerError::Transport("connection refused".to_string()));
            }
            self.batches.lock().unwrap().push(messages.to_vec());
            Ok(())
        }

        async fn close(&self) -> std::result::Result<(), BrokerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        counters: Mutex<HashMap<String, u64>>,
    }

    impl RecordingSink {
        fn get(&self, name: &str) -> u64 {
            self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    impl TelemetrySink for RecordingSink {
        fn register_counter(&self, name: &str, _help: &str) {
            self.counters
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_insert(0);
        }

        fn increment(&self, name: &str, by: u64) {
            *self
                .counters
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_insert(0) += by;
        }

        fn observe_millis(&self, name: &str, millis: u64) {
            *self
                .counters
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_insert(0) += millis;
        }
    }

    fn test_worker(publisher: Arc<FakePublisher>, sink: Arc<RecordingSink>) -> Worker {
        let config = WriterConfig {
            batch_capacity: 4,
            queue_factor: 1,
            flush_interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(5),
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
        };
        Worker {
            publisher,
            telemetry: sink,
            batch: BatchBuffer::new(config.batch_capacity),
            last_flush: Instant::now() - Duration::from_secs(10),
            config,
        }
    }

    // ========================================================================
    // Builder validation
    // ========================================================================

    #[tokio::test]
    async fn test_build_requires_publisher() {
        let result = BufferedWriter::builder().build();
        assert!(matches!(result, Err(WriterError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_batch_capacity() {
        let result = BufferedWriter::builder()
            .publisher(FakePublisher::succeeding())
            .batch_capacity(0)
            .build();
        assert!(matches!(result, Err(WriterError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_attempts() {
        let result = BufferedWriter::builder()
            .publisher(FakePublisher::succeeding())
            .max_attempts(0)
            .build();
        assert!(matches!(result, Err(WriterError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_registers_counters() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BufferedWriter::builder()
            .publisher(FakePublisher::succeeding())
            .telemetry(sink.clone())
            .build()
            .unwrap();

        {
            let counters = sink.counters.lock().unwrap();
            assert!(counters.contains_key(METRIC_FLUSH_SUCCESS));
            assert!(counters.contains_key(METRIC_FLUSH_FAILURE));
            assert!(counters.contains_key(METRIC_FLUSH_PROCESS_MILLIS));
        }

        writer.close().await.unwrap();
    }

    // ========================================================================
    // Flush behavior (worker-level)
    // ========================================================================

    #[tokio::test]
    async fn test_empty_flush_is_noop_but_advances_timestamp() {
        let publisher = FakePublisher::succeeding();
        let sink = Arc::new(RecordingSink::default());
        let mut worker = test_worker(publisher.clone(), sink.clone());

        worker.flush().await;

        // No broker call, no telemetry, but the timestamp moved so the
        // timer guard holds off for another interval.
        assert_eq!(publisher.calls(), 0);
        assert_eq!(sink.get(METRIC_FLUSH_SUCCESS), 0);
        assert_eq!(sink.get(METRIC_FLUSH_FAILURE), 0);
        assert!(worker.last_flush.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_flush_publishes_whole_batch_once() {
        let publisher = FakePublisher::succeeding();
        let sink = Arc::new(RecordingSink::default());
        let mut worker = test_worker(publisher.clone(), sink.clone());

        worker.batch.push(Bytes::from("a"));
        worker.batch.push(Bytes::from("b"));
        worker.flush().await;

        assert_eq!(publisher.calls(), 1);
        let batches = publisher.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0].value, Bytes::from("a"));
        assert_eq!(batches[0][1].value, Bytes::from("b"));
        drop(batches);

        assert_eq!(sink.get(METRIC_FLUSH_SUCCESS), 1);
        assert_eq!(sink.get(METRIC_FLUSH_FAILURE), 0);
        assert!(worker.batch.is_empty());
    }

    #[tokio::test]
    async fn test_flush_discards_batch_after_exhausted_retries() {
        let publisher = FakePublisher::failing();
        let sink = Arc::new(RecordingSink::default());
        let mut worker = test_worker(publisher.clone(), sink.clone());

        worker.batch.push(Bytes::from("doomed"));
        worker.flush().await;

        // Two configured attempts, then the batch is gone.
        assert_eq!(publisher.calls(), 2);
        assert_eq!(sink.get(METRIC_FLUSH_SUCCESS), 0);
        assert_eq!(sink.get(METRIC_FLUSH_FAILURE), 1);
        assert!(worker.batch.is_empty());
    }
}
