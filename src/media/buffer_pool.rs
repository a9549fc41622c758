// SPDX-License-Identifier: GPL-3.0-only

//! Reusable byte buffers
//!
//! The live quality monitor downsamples a frame twice a second. Buffers are
//! handed out from a small free list and return to it when dropped, so the
//! steady state allocates nothing.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

#[derive(Debug, Default)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    allocations: AtomicUsize,
}

/// A bounded pool of byte buffers
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
    capacity: usize,
}

impl BufferPool {
    /// Pool that keeps at most `capacity` idle buffers
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Take a zeroed buffer of `len` bytes
    pub fn acquire(&self, len: usize) -> PooledBuffer {
        let reused = self.inner.free.lock().ok().and_then(|mut free| free.pop());
        let mut buf = match reused {
            Some(buf) => buf,
            None => {
                self.inner.allocations.fetch_add(1, Ordering::Relaxed);
                trace!(len, "Allocating pooled buffer");
                Vec::with_capacity(len)
            }
        };
        buf.clear();
        buf.resize(len, 0);

        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
            capacity: self.capacity,
        }
    }

    /// Buffers allocated over the pool's lifetime
    pub fn allocations(&self) -> usize {
        self.inner.allocations.load(Ordering::Relaxed)
    }

    /// Idle buffers ready for reuse
    pub fn available(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

/// A buffer on loan from a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<PoolInner>,
    capacity: usize,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take()
            && let Ok(mut free) = self.pool.free.lock()
            && free.len() < self.capacity
        {
            free.push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_reused() {
        let pool = BufferPool::new(2);
        for _ in 0..10 {
            let mut buf = pool.acquire(160 * 120 * 4);
            buf[0] = 7;
        }
        assert_eq!(pool.allocations(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_reused_buffer_is_zeroed() {
        let pool = BufferPool::new(1);
        {
            let mut buf = pool.acquire(4);
            buf.copy_from_slice(&[1, 2, 3, 4]);
        }
        let buf = pool.acquire(4);
        assert_eq!(&*buf, &[0, 0, 0, 0]);
    }

    #[test]
    fn test_capacity_bounds_idle_buffers() {
        let pool = BufferPool::new(1);
        let a = pool.acquire(8);
        let b = pool.acquire(8);
        drop(a);
        drop(b);
        assert_eq!(pool.allocations(), 2);
        assert_eq!(pool.available(), 1);
    }
}
