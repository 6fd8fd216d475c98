//! FIFO.
//!
//! A circular buffer with a write pointer and a read pointer. Reading and writing may happen in the same cycle.

use crate::*;

/// FIFO with one read port and one write port.
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    slots: Vec<T>,
    wptr: WrapCounter,
    rptr: WrapCounter,
    len: usize,
}

impl<T: Clone + Default> Fifo<T> {
    /// Creates an empty FIFO holding up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![T::default(); capacity], wptr: WrapCounter::new(capacity), rptr: WrapCounter::new(capacity), len: 0 }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Number of entries.
    pub fn len(&self) -> usize { self.len }

    /// Returns whether the FIFO holds no entry.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Returns whether the FIFO cannot take another entry.
    pub fn is_full(&self) -> bool { self.len == self.capacity() }

    /// Oldest entry.
    pub fn head(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.rptr.value()])
        }
    }

    /// Commits one cycle: dequeues the head if `deq`, then enqueues `enq`.
    ///
    /// # Panics
    ///
    /// Panics when dequeuing from an empty FIFO or enqueuing into a full one.
    pub fn tick(&mut self, enq: Option<T>, deq: bool) {
        if deq {
            assert!(!self.is_empty(), "dequeue from an empty FIFO");
            let _ = self.rptr.step(true);
            self.len -= 1;
        }
        if let Some(entry) = enq {
            assert!(!self.is_full(), "enqueue into a full FIFO");
            self.slots[self.wptr.value()] = entry;
            let _ = self.wptr.step(true);
            self.len += 1;
        }
    }

    /// Drops up to `count` of the newest entries. Returns how many were dropped.
    pub fn drop_newest(&mut self, count: usize) -> usize {
        let dropped = count.min(self.len);
        for _ in 0..dropped {
            let _ = self.wptr.step_back(true);
        }
        self.len -= dropped;
        dropped
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.wptr.clear();
        self.rptr.clear();
        self.len = 0;
    }
}
