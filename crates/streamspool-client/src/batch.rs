//! Accumulation buffer for the writer's worker.
//!
//! Payloads drained from the inbound queue accumulate here until the buffer
//! reaches capacity or the flush timer fires, then the whole batch goes to
//! the broker in one call.
//!
//! ```text
//! ┌──────────────┐
//! │  write(...)  │ producer API (bounded queue, backpressure)
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────────────────────┐
//! │  BatchBuffer                 │ single worker, no locking
//! │  - payloads: Vec<Bytes>      │
//! │  - messages: Vec<Message>    │ keys computed at flush time
//! └──────┬───────────────────────┘
//!        │
//!        ├─→ Flush when full (capacity reached)
//!        ├─→ Flush on timer (unless flushed recently)
//!        ├─→ Final flush on shutdown
//!        │
//!        ▼
//! ┌──────────────────────────────┐
//! │  publish_batch(&[Message])   │ one call per batch
//! └──────────────────────────────┘
//! ```
//!
//! Both vectors are allocated once at capacity and reset (not reallocated)
//! on every flush, so a steady-state writer does no per-batch allocation
//! beyond the payloads themselves.
//!
//! ## Thread Safety
//!
//! Not thread-safe, and deliberately so: the buffer is owned by the single
//! worker task, which is the only reader and writer.

use bytes::Bytes;
use streamspool_core::Message;

/// Capacity-bounded buffer of payloads awaiting publication.
#[derive(Debug)]
pub struct BatchBuffer {
    /// Accumulated payloads, in admission order
    payloads: Vec<Bytes>,

    /// Scratch vector of keyed messages, rebuilt on each flush
    messages: Vec<Message>,

    /// Maximum number of payloads per batch
    capacity: usize,
}

impl BatchBuffer {
    /// Create an empty buffer holding at most `capacity` payloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            payloads: Vec::with_capacity(capacity),
            messages: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a payload. The caller flushes a full buffer before pushing,
    /// so the length never exceeds capacity.
    pub fn push(&mut self, payload: Bytes) {
        debug_assert!(self.payloads.len() < self.capacity);
        self.payloads.push(payload);
    }

    /// Whether another `push` would exceed capacity.
    pub fn is_full(&self) -> bool {
        self.payloads.len() >= self.capacity
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Number of buffered payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Build the keyed messages for the current batch.
    ///
    /// Keys are content digests computed here, immediately before
    /// publication. The returned slice stays valid until the next call to
    /// `messages` or [`reset`](Self::reset); the backing vector is reused
    /// across flushes.
    pub fn messages(&mut self) -> &[Message] {
        self.messages.clear();
        self.messages
            .extend(self.payloads.iter().map(|p| Message::keyed(p.clone())));
        &self.messages
    }

    /// Clear the buffer after a publish attempt, keeping the allocations.
    pub fn reset(&mut self) {
        self.payloads.clear();
        self.messages.clear();
    }
}
