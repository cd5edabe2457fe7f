//! Energy pool module for the GridShare clearing engine.
//!
//! ## Architecture
//!
//! The pool holds distributed energy batches awaiting consumption:
//!
//! - **Slab-based storage**: O(1) batch insertion, removal, and lookup
//! - **Supply levels**: Batches grouped by price using BTreeMap
//! - **Merit order**: Cheapest level first, FIFO within each level
//!
//! ## Components
//!
//! - [`BatchNode`]: Wrapper around `EnergyBatch` with linked-list pointers
//! - [`SupplyLevel`]: Batches queued at a single price point
//! - [`EnergyPool`]: The pool itself, traversed in merit order
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Add batch | O(log n) |
//! | Draw from batch by key | O(1) |
//! | Cheapest price | O(1)* |
//! | Merit traversal | O(n) |
//!
//! *After initial lookup, cached at supply level head
//!
//! ## Example
//!
//! ```
//! use gridshare::pool::EnergyPool;
//! use gridshare::types::BatchOwner;
//!
//! let mut pool = EnergyPool::with_capacity(1_000);
//!
//! // Solar production at 8.0 per kWh
//! pool.add_batch(BatchOwner::Member(0), 8_000_000, 150);
//!
//! assert_eq!(pool.cheapest_price(), Some(8_000_000));
//! ```

pub mod level;
pub mod node;
pub mod pool;

pub use level::SupplyLevel;
pub use node::BatchNode;
pub use pool::EnergyPool;
