//! Slab node wrapping one pooled batch.
//!
//! The pool stores batches in a `Slab` and threads them into per-price FIFO
//! queues with intrusive links. Links are slab keys, never references, so a
//! node can be unlinked in O(1) from anywhere in its queue — export draws
//! exhaust batches in the middle of a level, not just at the head.
//!
//! Slab keys are reused after removal (https://docs.rs/slab/0.4.11), which
//! is why the pool indexes batches by their never-reused batch id and keeps
//! slab keys internal.

use crate::types::{Energy, EnergyBatch, Money};

/// One batch threaded into a supply-level queue.
#[derive(Debug, Clone)]
pub struct BatchNode {
    /// The batch itself
    pub batch: EnergyBatch,

    /// Slab key of the next (newer) batch at the same price, if any
    pub next: Option<usize>,

    /// Slab key of the previous (older) batch at the same price, if any
    pub prev: Option<usize>,
}

impl BatchNode {
    /// Wrap a batch; the node starts unlinked.
    #[inline]
    pub fn new(batch: EnergyBatch) -> Self {
        Self {
            batch,
            next: None,
            prev: None,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        self.batch.price_micros
    }

    #[inline]
    pub fn remaining(&self) -> Energy {
        self.batch.remaining_kwh
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.batch.seq
    }

    /// Draw up to `quantity` kWh; returns the quantity actually drawn.
    #[inline]
    pub fn draw(&mut self, quantity: Energy) -> Energy {
        self.batch.draw(quantity)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.batch.is_exhausted()
    }
}
