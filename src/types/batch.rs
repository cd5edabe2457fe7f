//! Energy batch representation for the pool.
//!
//! A batch is a priced block of distributed energy waiting to be consumed.
//! Ownership uses a raw integer field (`owner_raw`) rather than an enum so
//! the struct can derive `SimpleSerialize` for deterministic encoding; use
//! [`EnergyBatch::owner`] to get the typed view.

use ssz_rs::prelude::*;

use crate::types::units::{Energy, MemberId, Money};

/// Typed view of who backs a batch of pooled energy.
///
/// Member-owned batches credit the producing member when drawn and are the
/// only batches eligible for grid export. Import batches credit the
/// community's import account instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOwner {
    /// Produced by a registered member's device.
    Member(MemberId),
    /// Bought from the external grid on behalf of the community.
    Import,
}

impl BatchOwner {
    /// Raw discriminant stored in the serialized batch.
    pub fn to_raw(self) -> u8 {
        match self {
            BatchOwner::Member(_) => 0,
            BatchOwner::Import => 1,
        }
    }
}

/// A priced block of energy sitting in the pool.
///
/// `seq` is assigned from a monotonic counter at distribution time and
/// breaks price ties: earlier batches at the same price are drawn first.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct EnergyBatch {
    /// Unique batch identifier.
    pub id: u64,
    /// 0 = member-owned, 1 = grid import.
    pub owner_raw: u8,
    /// Arena id of the owning member; ignored for imports.
    pub owner_member: MemberId,
    /// Price per kWh in micro-units.
    pub price_micros: Money,
    /// Original size of the batch in kWh.
    pub quantity_kwh: Energy,
    /// Undrawn energy left in the batch in kWh.
    pub remaining_kwh: Energy,
    /// Arrival sequence number, strictly increasing across all batches.
    pub seq: u64,
}

impl EnergyBatch {
    /// Create a new, fully undrawn batch.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique batch identifier
    /// * `owner` - Member or import ownership
    /// * `price_micros` - Price per kWh in micro-units
    /// * `quantity_kwh` - Batch size in kWh
    /// * `seq` - Arrival sequence number
    pub fn new(
        id: u64,
        owner: BatchOwner,
        price_micros: Money,
        quantity_kwh: Energy,
        seq: u64,
    ) -> Self {
        let owner_member = match owner {
            BatchOwner::Member(member) => member,
            BatchOwner::Import => 0,
        };
        EnergyBatch {
            id,
            owner_raw: owner.to_raw(),
            owner_member,
            price_micros,
            quantity_kwh,
            remaining_kwh: quantity_kwh,
            seq,
        }
    }

    /// Typed ownership of this batch.
    pub fn owner(&self) -> BatchOwner {
        match self.owner_raw {
            0 => BatchOwner::Member(self.owner_member),
            _ => BatchOwner::Import,
        }
    }

    /// True once every kWh in the batch has been drawn.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_kwh == 0
    }

    /// Draw up to `quantity` kWh from the batch.
    ///
    /// Returns the quantity actually drawn, which may be less than
    /// requested if the batch is nearly exhausted.
    pub fn draw(&mut self, quantity: Energy) -> Energy {
        let drawn = quantity.min(self.remaining_kwh);
        self.remaining_kwh -= drawn;
        drawn
    }
}
