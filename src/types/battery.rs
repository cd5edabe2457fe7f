//! Community battery state.
//!
//! The battery is a single shared store with a hard capacity and a posted
//! price per kWh. Charging and discharging move whole kWh and are
//! bounds-checked here; callers decide when the operations are allowed at
//! all. An unconfigured battery is represented by the absence of a
//! [`Battery`] value, so out-of-range state is unrepresentable.

use crate::error::{EngineError, EngineResult};
use crate::types::units::{Energy, Money};

/// A bounded energy store shared by the whole community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Battery {
    capacity_kwh: Energy,
    stored_kwh: Energy,
    price_micros: Money,
}

impl Battery {
    /// Create an empty battery with the given capacity and price per kWh.
    pub fn new(capacity_kwh: Energy, price_micros: Money) -> Self {
        Battery {
            capacity_kwh,
            stored_kwh: 0,
            price_micros,
        }
    }

    /// Total capacity in kWh.
    pub fn capacity_kwh(&self) -> Energy {
        self.capacity_kwh
    }

    /// Currently stored energy in kWh.
    pub fn stored_kwh(&self) -> Energy {
        self.stored_kwh
    }

    /// Free capacity in kWh.
    pub fn headroom_kwh(&self) -> Energy {
        self.capacity_kwh - self.stored_kwh
    }

    /// Posted price per kWh in micro-units.
    pub fn price_micros(&self) -> Money {
        self.price_micros
    }

    /// Store `quantity` kWh.
    ///
    /// Fails with [`EngineError::CapacityExceeded`] if the battery cannot
    /// take the full quantity; partial charges never happen.
    pub fn charge(&mut self, quantity: Energy) -> EngineResult<()> {
        let headroom = self.headroom_kwh();
        if quantity > headroom {
            return Err(EngineError::CapacityExceeded {
                requested: quantity,
                headroom,
            });
        }
        self.stored_kwh += quantity;
        Ok(())
    }

    /// Release `quantity` kWh.
    ///
    /// Fails with [`EngineError::InsufficientCharge`] if less than the full
    /// quantity is stored; partial discharges never happen.
    pub fn discharge(&mut self, quantity: Energy) -> EngineResult<()> {
        if quantity > self.stored_kwh {
            return Err(EngineError::InsufficientCharge {
                requested: quantity,
                stored: self.stored_kwh,
            });
        }
        self.stored_kwh -= quantity;
        Ok(())
    }

    /// Change capacity and price without touching the stored energy.
    ///
    /// Shrinking capacity below the current charge is rejected so stored
    /// energy is never silently lost.
    pub fn reconfigure(&mut self, capacity_kwh: Energy, price_micros: Money) -> EngineResult<()> {
        if capacity_kwh < self.stored_kwh {
            return Err(EngineError::CapacityExceeded {
                requested: self.stored_kwh,
                headroom: capacity_kwh,
            });
        }
        self.capacity_kwh = capacity_kwh;
        self.price_micros = price_micros;
        Ok(())
    }

    /// Read-only snapshot of this battery.
    pub fn snapshot(&self) -> BatteryState {
        BatteryState {
            configured: true,
            capacity_kwh: self.capacity_kwh,
            stored_kwh: self.stored_kwh,
            price_micros: self.price_micros,
        }
    }
}

/// Snapshot of the battery as reported to hosts.
///
/// `configured` is false until an administrator has configured the battery;
/// all other fields read zero in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryState {
    pub configured: bool,
    pub capacity_kwh: Energy,
    pub stored_kwh: Energy,
    pub price_micros: Money,
}

impl BatteryState {
    /// Snapshot reported while no battery has been configured.
    pub fn unconfigured() -> Self {
        BatteryState::default()
    }
}
