//! # GridShare
//!
//! Clearing and settlement engine for community energy sharing.
//!
//! ## Architecture
//!
//! The clearing core consists of:
//! - **Types**: Core data structures (EnergyBatch, Battery, OperationReceipt)
//! - **Registry**: Members, devices, whitelist
//! - **Pool**: Energy batches with slab-based memory allocation
//! - **Ledger**: Zero-sum balance accounts
//! - **Engine**: Deterministic merit-order clearing
//!
//! ## Design Principles
//!
//! 1. **Determinism**: All operations produce identical results for identical inputs
//! 2. **No Floating Point**: All settlement math uses fixed-point arithmetic (10^6 scaling)
//! 3. **Zero-Sum Ledger**: Every committed mutation re-proves Σ(balances) == 0 exactly
//! 4. **Compute-Then-Commit**: A failing operation leaves state byte-identical
//!
//! ## Performance Targets
//!
//! - Throughput: >100,000 batch insertions/second
//! - Latency: <10μs per draw operation
//! - Memory: <200 bytes per batch

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: EnergyBatch, Battery, OperationReceipt
pub mod types;

/// Error taxonomy shared by every operation
pub mod error;

/// Membership registry: members, devices, whitelist
pub mod registry;

/// Energy pool: merit-ordered batches with slab-based storage
pub mod pool;

/// Ledger: zero-sum balance accounts
pub mod ledger;

/// Clearing engine: distribution, consumption, administration
pub mod engine;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use error::{EngineError, EngineResult, ErrorClass};
pub use types::{Battery, BatteryState, BatchOwner, EnergyBatch, OperationKind, OperationReceipt};
pub use registry::{Member, MembershipRegistry};
pub use pool::{BatchNode, EnergyPool, SupplyLevel};
pub use ledger::{BalanceDeltas, LedgerAccounts, Participant};
pub use engine::{
    ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig, EnginePhase,
    ExportRequest, SharedEngine, SupplyOrigin,
};
