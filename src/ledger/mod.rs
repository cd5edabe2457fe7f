//! Ledger module for the GridShare clearing engine.
//!
//! ## Components
//!
//! - [`LedgerAccounts`]: Dense member balances plus the import/export
//!   aggregates, the zero-sum verifier, and the canonical participant
//!   enumeration
//! - [`Participant`]: One slot in the canonical enumeration
//! - [`BalanceDeltas`]: Planned balance movements, validated to sum to
//!   zero before they are applied
//!
//! The ledger path is all exact integer arithmetic; there is no floating
//! point and no epsilon anywhere in the verification.

pub mod accounts;
pub mod deltas;

pub use accounts::{LedgerAccounts, Participant};
pub use deltas::BalanceDeltas;
