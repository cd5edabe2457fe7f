//! Core data types for GridShare
//!
//! All serialized types implement SSZ for deterministic encoding.
//! All monetary values use fixed-point representation (scaled by 10^6).
//!
//! ## Types
//!
//! - [`EnergyBatch`]: A priced block of pooled energy
//! - [`BatchOwner`]: Member or grid-import ownership of a batch
//! - [`Battery`]: The shared community battery
//! - [`BatteryState`]: Host-facing battery snapshot
//! - [`OperationReceipt`]: Audit record of one committed operation
//! - [`OperationKind`]: What kind of mutation a receipt describes
//!
//! ## Fixed-Point Arithmetic
//!
//! Prices and ledger balances are stored in micro-units scaled by 10^6.
//! Example: a price of 8.25 per kWh is stored as 8_250_000u64. Energy is
//! counted in whole kWh and never scaled.

mod batch;
mod battery;
mod receipt;
pub mod units;

// Re-export all types at module level
pub use batch::{BatchOwner, EnergyBatch};
pub use battery::{Battery, BatteryState};
pub use receipt::{OperationKind, OperationReceipt};
pub use units::{Amount, DeviceId, Energy, MemberId, Money};
