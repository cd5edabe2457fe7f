//! Clearing engine module for GridShare.
//!
//! ## Design Principles
//!
//! The clearing engine is designed for:
//!
//! 1. **Determinism**: Same operation sequence always produces the same
//!    balances, receipts, and state root
//! 2. **Fixed-Point Math**: No floating-point operations anywhere in the
//!    settlement path
//! 3. **Compute-Then-Commit**: Every mutation is planned and validated
//!    before the first write
//! 4. **Merit Order**: Cheapest energy first, then FIFO
//!
//! ## Clearing Rules
//!
//! - **Consumption** draws against the cheapest batches first
//! - **Exports** draw against the exporter's own batches, oldest first
//! - **Partial draws** are supported; drained batches leave the pool
//! - **Zero-sum**: every committed mutation re-proves that all balances
//!   sum to exactly zero
//!
//! ## Example
//!
//! ```
//! use gridshare::engine::{ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig};
//!
//! let config = EngineConfig::new("community").with_operator("0xop");
//! let mut engine = ClearingEngine::bootstrap(config);
//!
//! engine.add_member("0xop", "0xalice", &[1], 5_000).unwrap();
//! engine.add_member("0xop", "0xbob", &[2], 5_000).unwrap();
//!
//! // Alice produced 30 kWh at 8.00; bob consumes 12 kWh of it
//! let sources = vec![DistributionSource::producer("0xalice", 8_000_000, 30)];
//! engine.distribute("0xop", &sources, 0).unwrap();
//! engine.consume("0xop", &[ConsumptionRequest::new(2, 12)], &[]).unwrap();
//!
//! assert_eq!(engine.cash_credit_balance("0xalice").unwrap(), 96_000_000);
//! assert_eq!(engine.verify_zero_sum(), (true, 0));
//! ```

pub mod clearing;
pub mod shared;

pub use clearing::{
    ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig, EnginePhase,
    ExportRequest, SupplyOrigin, DEFAULT_POOL_CAPACITY,
};
pub use shared::SharedEngine;
