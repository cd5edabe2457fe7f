//! Membership registry module for the GridShare clearing engine.
//!
//! ## Components
//!
//! - [`Member`]: One arena record (address, share, devices, active flag)
//! - [`MembershipRegistry`]: Arena plus address/device lookup tables,
//!   authorization whitelist, and the community device designation
//!
//! Arena ids are dense and never reused, which is what lets the ledger
//! store balances in a flat vector indexed by the same ids.

pub mod member;
pub mod registry;

pub use member::Member;
pub use registry::{MembershipRegistry, MAX_OWNERSHIP_BPS};
