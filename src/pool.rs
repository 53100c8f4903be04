//! Recycled payload buffers.
//!
//! The transmitter and receiver churn through one buffer per frame; pooling
//! keeps that from turning into one allocation per frame. Pools are
//! per-client so buffer lifetimes end with the connection and tests never
//! share state through a global.

use bytes::BytesMut;
use std::sync::Mutex;

/// Buffers smaller than this are allocated at this capacity so they can be
/// reused for most frames.
const MIN_BUFFER_CAPACITY: usize = 8 * 1024;

/// Buffers at or above this capacity are dropped instead of pooled, keeping
/// the working set bounded after an oversized frame.
const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// A pool of frame/payload buffers.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<BytesMut>>,
}

impl BufferPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take a cleared buffer with at least `capacity` bytes of room.
    pub(crate) fn acquire(&self, capacity: usize) -> BytesMut {
        let mut buf = self
            .buffers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(capacity.max(MIN_BUFFER_CAPACITY)));
        buf.clear();
        if buf.capacity() < capacity {
            buf.reserve(capacity - buf.len());
        }
        buf
    }

    /// Return a buffer to the pool. Oversized buffers are dropped.
    pub(crate) fn release(&self, mut buf: BytesMut) {
        if buf.capacity() >= MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();
        self.buffers.lock().unwrap().push(buf);
    }
}
