//! Error taxonomy for the clearing engine.
//!
//! Every failure is classified into one of five [`ErrorClass`]es:
//!
//! - **Validation**: bad input, rejected before any state is touched
//! - **Capacity**: battery bounds violations
//! - **InsufficientEnergy**: the pool cannot satisfy a request
//! - **Configuration**: required setup missing or broken
//! - **Invariant**: the post-commit zero-sum check failed — fatal,
//!   unrecoverable without an explicit emergency reset
//!
//! The engine performs no internal retries; retry policy belongs to the host.

use thiserror::Error;

use crate::types::{Amount, DeviceId, Energy};

/// Broad failure class, mirroring the engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input; nothing was mutated.
    Validation,
    /// Battery bounds violation; nothing was mutated.
    Capacity,
    /// The pool cannot cover the requested quantity; nothing was mutated.
    InsufficientEnergy,
    /// Required configuration is missing or does not resolve.
    Configuration,
    /// Internal corruption: the zero-sum check failed after a commit.
    Invariant,
}

/// Errors surfaced by every mutating or resolving engine operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("caller {address} is not whitelisted")]
    NotAuthorized { address: String },

    #[error("device {device_id} is not registered")]
    DeviceNotFound { device_id: DeviceId },

    #[error("address {address} is not a registered member")]
    UnknownMember { address: String },

    #[error("member {address} is not active")]
    MemberNotActive { address: String },

    #[error("member {address} is already active")]
    AlreadyActive { address: String },

    #[error("active ownership would reach {total_bps} bps, limit is 10000")]
    OwnershipExceeded { total_bps: u64 },

    #[error("zero quantity is not a valid request")]
    ZeroQuantity,

    #[error("distribution carries no sources")]
    EmptyDistribution,

    #[error("consumption call carries no requests")]
    EmptyRequest,

    #[error("arithmetic overflow while computing {context}")]
    ArithmeticOverflow { context: &'static str },

    #[error("charge of {requested} kWh exceeds free capacity of {headroom} kWh")]
    CapacityExceeded { requested: Energy, headroom: Energy },

    #[error("discharge of {requested} kWh exceeds stored {stored} kWh")]
    InsufficientCharge { requested: Energy, stored: Energy },

    #[error("pool holds {available} kWh but {requested} kWh were requested")]
    InsufficientEnergy {
        requested: Energy,
        available: Energy,
    },

    #[error("previous distribution not consumed: {remaining_kwh} kWh left in {batches} batches")]
    PriorDistributionUnconsumed {
        remaining_kwh: Energy,
        batches: usize,
    },

    #[error("battery has not been configured")]
    BatteryNotConfigured,

    #[error("export price has not been configured")]
    ExportPriceNotConfigured,

    #[error("no community device has been designated")]
    CommunityDeviceUnset,

    #[error("community device {device_id} does not resolve to an active member")]
    CommunityOwnerUnresolved { device_id: DeviceId },

    #[error("zero-sum invariant violated: ledger sums to {observed}, expected 0")]
    InvariantViolation { observed: Amount },
}

impl EngineError {
    /// Classify this error into the engine taxonomy.
    pub fn class(&self) -> ErrorClass {
        use EngineError::*;
        match self {
            NotAuthorized { .. }
            | DeviceNotFound { .. }
            | UnknownMember { .. }
            | MemberNotActive { .. }
            | AlreadyActive { .. }
            | OwnershipExceeded { .. }
            | ZeroQuantity
            | EmptyDistribution
            | EmptyRequest
            | ArithmeticOverflow { .. } => ErrorClass::Validation,
            CapacityExceeded { .. } | InsufficientCharge { .. } => ErrorClass::Capacity,
            InsufficientEnergy { .. } | PriorDistributionUnconsumed { .. } => {
                ErrorClass::InsufficientEnergy
            }
            BatteryNotConfigured
            | ExportPriceNotConfigured
            | CommunityDeviceUnset
            | CommunityOwnerUnresolved { .. } => ErrorClass::Configuration,
            InvariantViolation { .. } => ErrorClass::Invariant,
        }
    }

    /// True only for the invariant-violation class: the engine refuses all
    /// further mutation until an explicit emergency reset.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Invariant
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
