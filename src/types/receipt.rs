//! Operation receipts for the audit trail.
//!
//! Every committed mutation appends an OperationReceipt, including the
//! state root of the engine after the commit.

use sha2::{Digest, Sha256};
use ssz_rs::prelude::*;

use crate::types::units::Energy;

/// Kind of committed operation, see [`OperationReceipt::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Distribute,
    Consume,
    BatteryCharge,
    BatteryDischarge,
    AdminConfig,
    EmergencyReset,
}

impl OperationKind {
    /// Raw discriminant stored in the serialized receipt.
    pub fn to_raw(self) -> u8 {
        match self {
            OperationKind::Distribute => 0,
            OperationKind::Consume => 1,
            OperationKind::BatteryCharge => 2,
            OperationKind::BatteryDischarge => 3,
            OperationKind::AdminConfig => 4,
            OperationKind::EmergencyReset => 5,
        }
    }
}

/// Receipt summarizing one committed engine operation.
///
/// ## Purpose
///
/// The receipt is the audit record of a mutation. A host can replay the
/// receipt stream and check each state root against its own copy of the
/// engine to detect divergence.
///
/// ## State Root
///
/// The 32-byte state root is a SHA-256 hash over the canonical encoding of
/// the full engine state (ledger, pool, battery). Two engines that applied
/// the same operations in the same order produce identical roots.
///
/// ## Example
///
/// ```
/// use gridshare::types::{OperationKind, OperationReceipt};
///
/// let receipt = OperationReceipt::new(
///     1,                        // seq
///     OperationKind::Distribute,
///     2,                        // batches touched
///     250,                      // kWh moved
///     0,                        // battery snapshot
///     [0u8; 32],                // state_root (would be computed)
/// );
/// assert_eq!(receipt.kind(), OperationKind::Distribute);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct OperationReceipt {
    /// Operation sequence number, strictly increasing
    pub seq: u64,

    /// Raw operation kind, see [`OperationKind::to_raw`]
    pub kind_raw: u8,

    /// Batches created (distribute) or drawn from (consume)
    pub batches_touched: u64,

    /// Total energy moved by the operation in kWh
    pub quantity_kwh: Energy,

    /// Battery level recorded with the operation in kWh: the host meter
    /// snapshot for distributions, the engine battery level otherwise
    pub battery_snapshot_kwh: Energy,

    /// State root after the commit (SHA-256, 32 bytes)
    pub state_root: [u8; 32],
}

impl OperationReceipt {
    /// Create a new receipt.
    ///
    /// # Arguments
    ///
    /// * `seq` - Operation sequence number
    /// * `kind` - What kind of mutation was committed
    /// * `batches_touched` - Batches created or drawn from
    /// * `quantity_kwh` - Energy moved
    /// * `battery_snapshot_kwh` - Battery level recorded with the operation
    /// * `state_root` - 32-byte hash of the post-commit state
    pub fn new(
        seq: u64,
        kind: OperationKind,
        batches_touched: u64,
        quantity_kwh: Energy,
        battery_snapshot_kwh: Energy,
        state_root: [u8; 32],
    ) -> Self {
        Self {
            seq,
            kind_raw: kind.to_raw(),
            batches_touched,
            quantity_kwh,
            battery_snapshot_kwh,
            state_root,
        }
    }

    /// Typed operation kind.
    pub fn kind(&self) -> OperationKind {
        match self.kind_raw {
            0 => OperationKind::Distribute,
            1 => OperationKind::Consume,
            2 => OperationKind::BatteryCharge,
            3 => OperationKind::BatteryDischarge,
            4 => OperationKind::AdminConfig,
            _ => OperationKind::EmergencyReset,
        }
    }

    /// Compute SHA-256 over the given canonical state encoding.
    ///
    /// Returns a 32-byte array suitable for use as a state root.
    pub fn compute_hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    /// State root as a hex string.
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
