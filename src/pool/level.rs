//! One price point of the pool's supply curve.
//!
//! All batches distributed at the same price queue up behind a single
//! `SupplyLevel`. The queue is FIFO in arrival order: at equal prices the
//! batch distributed first is drawn first, which is what makes merit-order
//! dispatch reproducible run-to-run.
//!
//! The queue is an intrusive doubly-linked list over slab keys. Batch data
//! stays in the pool's slab; the level only tracks the two queue ends, a
//! running quantity, and a count.

use slab::Slab;

use crate::pool::BatchNode;
use crate::types::{Energy, Money};

/// FIFO queue of batches at one price.
#[derive(Debug, Clone)]
pub struct SupplyLevel {
    /// Price of every batch in this level, micro-units per kWh
    pub price: Money,

    /// Undrawn kWh summed over the whole queue
    pub total_quantity: Energy,

    /// Oldest batch, drawn first (slab key)
    pub head: Option<usize>,

    /// Newest batch, appended last (slab key)
    pub tail: Option<usize>,

    /// Queue length
    pub batch_count: usize,
}

impl SupplyLevel {
    pub fn new(price: Money) -> Self {
        Self {
            price,
            total_quantity: 0,
            head: None,
            tail: None,
            batch_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batch_count == 0
    }

    /// Append the node at `key` to the back of the queue.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not live in `slab`.
    pub fn enqueue(&mut self, key: usize, slab: &mut Slab<BatchNode>) {
        let quantity = {
            let node = &mut slab[key];
            node.prev = self.tail;
            node.next = None;
            node.remaining()
        };

        match self.tail {
            Some(old_tail) => slab[old_tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);

        self.batch_count += 1;
        self.total_quantity = self.total_quantity.saturating_add(quantity);
    }

    /// Unlink the node at `key` from anywhere in the queue.
    ///
    /// Returns the unlinked batch's remaining quantity. The node itself
    /// stays in the slab; the caller decides whether to drop it.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not live in `slab`.
    pub fn unlink(&mut self, key: usize, slab: &mut Slab<BatchNode>) -> Energy {
        let (quantity, prev, next) = {
            let node = &slab[key];
            (node.remaining(), node.prev, node.next)
        };

        match prev {
            Some(prev_key) => slab[prev_key].next = next,
            None => self.head = next,
        }
        match next {
            Some(next_key) => slab[next_key].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut slab[key];
        node.prev = None;
        node.next = None;

        self.batch_count -= 1;
        self.total_quantity = self.total_quantity.saturating_sub(quantity);
        quantity
    }

    /// Account for a partial draw against a batch in this level.
    pub fn note_drawn(&mut self, quantity: Energy) {
        self.total_quantity = self.total_quantity.saturating_sub(quantity);
    }
}
