//! Energy pool implementation.
//!
//! ## Architecture
//!
//! The pool uses a hybrid data structure for deterministic dispatch:
//!
//! - **Slab**: Pre-allocated storage for O(1) batch operations
//! - **BTreeMap**: Supply levels sorted low-to-high for merit order
//! - **HashMap**: Batch ID to slab key mapping for O(1) lookup
//!
//! ## Merit Order
//!
//! Dispatch always drains the cheapest supply level first. Within a level,
//! batches form a FIFO queue in arrival order, so two pools fed the same
//! distributions drain in exactly the same sequence.
//!
//! ## Memory Model
//!
//! Per slab docs (https://docs.rs/slab/0.4.11):
//! - `Slab::with_capacity(n)` pre-allocates n slots
//! - Keys are reused after removal
//! - O(1) insert, remove, and lookup
//!
//! ## Example
//!
//! ```
//! use gridshare::pool::EnergyPool;
//! use gridshare::types::BatchOwner;
//!
//! let mut pool = EnergyPool::with_capacity(1_000);
//!
//! pool.add_batch(BatchOwner::Member(0), 12_000_000, 100);
//! pool.add_batch(BatchOwner::Member(1), 8_000_000, 150);
//!
//! // Merit order: the cheaper batch is dispatched first
//! assert_eq!(pool.cheapest_price(), Some(8_000_000));
//! assert_eq!(pool.total_quantity_kwh(), 250);
//! ```

use std::collections::{BTreeMap, HashMap};

use slab::Slab;

use crate::pool::{BatchNode, SupplyLevel};
use crate::types::{BatchOwner, Energy, EnergyBatch, Money};

/// Pool of energy batches awaiting consumption.
///
/// Batches are grouped into supply levels by price; levels are kept in a
/// `BTreeMap` so merit-order traversal is just ascending iteration.
#[derive(Debug)]
pub struct EnergyPool {
    /// Pre-allocated batch storage
    /// Key: slab index, Value: BatchNode
    batches: Slab<BatchNode>,

    /// Supply levels (sorted low to high)
    /// Key: price for ascending merit order
    /// Value: SupplyLevel containing the batch queue
    levels: BTreeMap<Money, SupplyLevel>,

    /// Batch ID to slab key mapping (for O(1) lookup)
    batch_index: HashMap<u64, usize>,

    /// Next batch ID (auto-assigned, never reused)
    next_batch_id: u64,

    /// Next arrival sequence number (ties at equal prices break FIFO)
    next_seq: u64,

    /// Total undrawn energy across all batches in kWh
    total_quantity: Energy,
}

impl Default for EnergyPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyPool {
    /// Create a new empty pool
    pub fn new() -> Self {
        Self {
            batches: Slab::new(),
            levels: BTreeMap::new(),
            batch_index: HashMap::new(),
            next_batch_id: 1,
            next_seq: 1,
            total_quantity: 0,
        }
    }

    /// Create a pool with pre-allocated capacity
    ///
    /// # Arguments
    ///
    /// * `batch_capacity` - Number of batches to pre-allocate
    pub fn with_capacity(batch_capacity: usize) -> Self {
        Self {
            batches: Slab::with_capacity(batch_capacity),
            levels: BTreeMap::new(),
            batch_index: HashMap::with_capacity(batch_capacity),
            next_batch_id: 1,
            next_seq: 1,
            total_quantity: 0,
        }
    }

    // ========================================================================
    // Capacity and Size
    // ========================================================================

    /// Get the current capacity (pre-allocated slots)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.batches.capacity()
    }

    /// Get the number of batches currently in the pool
    #[inline]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Check if the pool holds no batches
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Get the number of distinct supply levels
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total undrawn energy across all batches in kWh
    #[inline]
    pub fn total_quantity_kwh(&self) -> Energy {
        self.total_quantity
    }

    // ========================================================================
    // Batch Management
    // ========================================================================

    /// Add a batch to the pool.
    ///
    /// The batch is assigned a fresh id and arrival sequence number and
    /// queued at the tail of its supply level.
    ///
    /// # Arguments
    ///
    /// * `owner` - Member or import ownership
    /// * `price_micros` - Price per kWh, immutable once set
    /// * `quantity_kwh` - Batch size in kWh
    ///
    /// # Returns
    ///
    /// The id of the new batch
    pub fn add_batch(&mut self, owner: BatchOwner, price_micros: Money, quantity_kwh: Energy) -> u64 {
        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        let batch = EnergyBatch::new(batch_id, owner, price_micros, quantity_kwh, seq);
        let node = BatchNode::new(batch);
        let key = self.batches.insert(node);

        self.batch_index.insert(batch_id, key);

        let level = self
            .levels
            .entry(price_micros)
            .or_insert_with(|| SupplyLevel::new(price_micros));
        level.enqueue(key, &mut self.batches);

        self.total_quantity = self.total_quantity.saturating_add(quantity_kwh);

        batch_id
    }

    /// Draw energy from a batch by slab key.
    ///
    /// Decrements the batch in place and keeps the level totals in sync.
    /// A fully drained batch is unlinked from its level, dropped from the
    /// slab, and its level is removed when it becomes empty.
    ///
    /// # Arguments
    ///
    /// * `key` - The slab key for the batch
    /// * `quantity` - kWh to draw
    ///
    /// # Returns
    ///
    /// The quantity actually drawn (clamped to the batch remainder)
    ///
    /// # Panics
    ///
    /// Panics if the key doesn't exist in the slab
    pub fn draw(&mut self, key: usize, quantity: Energy) -> Energy {
        let node = self.batches.get_mut(key).expect("Invalid slab key");
        let price = node.price();
        let batch_id = node.batch.id;
        let drawn = node.draw(quantity);
        let exhausted = node.is_exhausted();

        let level = self.levels.get_mut(&price).expect("Missing supply level");
        level.note_drawn(drawn);

        if exhausted {
            level.unlink(key, &mut self.batches);
            let level_empty = level.is_empty();
            if level_empty {
                self.levels.remove(&price);
            }
            self.batch_index.remove(&batch_id);
            self.batches.remove(key);
        }

        self.total_quantity = self.total_quantity.saturating_sub(drawn);
        drawn
    }

    /// Get a reference to a batch by slab key
    #[inline]
    pub fn get_batch(&self, key: usize) -> Option<&EnergyBatch> {
        self.batches.get(key).map(|node| &node.batch)
    }

    /// Get the slab key for a batch ID
    #[inline]
    pub fn get_key(&self, batch_id: u64) -> Option<usize> {
        self.batch_index.get(&batch_id).copied()
    }

    /// Check if a batch exists
    #[inline]
    pub fn contains_batch(&self, batch_id: u64) -> bool {
        self.batch_index.contains_key(&batch_id)
    }

    // ========================================================================
    // Merit-Order Traversal
    // ========================================================================

    /// Get the cheapest price currently in the pool
    #[inline]
    pub fn cheapest_price(&self) -> Option<Money> {
        self.levels.keys().next().copied()
    }

    /// Get the cheapest supply level
    pub fn cheapest_level(&self) -> Option<&SupplyLevel> {
        self.levels.values().next()
    }

    /// Slab keys of every batch in merit order.
    ///
    /// Levels ascend by price; within a level the FIFO queue is walked from
    /// head to tail. This is the exact order dispatch drains the pool, and
    /// planning code iterates it without mutating anything.
    pub fn merit_keys(&self) -> Vec<usize> {
        let mut keys = Vec::with_capacity(self.batches.len());
        for level in self.levels.values() {
            let mut cursor = level.head;
            while let Some(key) = cursor {
                keys.push(key);
                cursor = self.batches[key].next;
            }
        }
        keys
    }

    /// Slab keys of one owner's batches in arrival order (`seq` ascending).
    ///
    /// Export planning walks a member's own production oldest-first,
    /// regardless of price.
    pub fn owner_keys(&self, owner: BatchOwner) -> Vec<usize> {
        let mut entries: Vec<(u64, usize)> = self
            .batches
            .iter()
            .filter(|(_, node)| node.batch.owner() == owner)
            .map(|(key, node)| (node.seq(), key))
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, key)| key).collect()
    }

    /// All remaining batches in arrival order (`seq` ascending).
    ///
    /// This is the host-facing view of the unconsumed pool and the order in
    /// which batches enter the canonical state encoding.
    pub fn batches_by_seq(&self) -> Vec<EnergyBatch> {
        let mut all: Vec<EnergyBatch> = self
            .batches
            .iter()
            .map(|(_, node)| node.batch.clone())
            .collect();
        all.sort_unstable_by_key(|batch| batch.seq);
        all
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
