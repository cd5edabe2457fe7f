//! Shared engine handle.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::clearing::{
    ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig, EnginePhase,
    ExportRequest,
};
use crate::error::EngineResult;
use crate::types::{
    Amount, BatteryState, DeviceId, Energy, EnergyBatch, MemberId, Money, OperationReceipt,
};

/// Cloneable, thread-safe handle to a [`ClearingEngine`].
///
/// Every operation holds the engine's exclusive lock for its full
/// duration, so calls from any number of handles are serialized and no
/// partially cleared state is ever observable. Reads take the same lock
/// and report a committed state.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<ClearingEngine>>,
}

impl SharedEngine {
    /// Bring up an engine and wrap it in a shared handle.
    pub fn bootstrap(config: EngineConfig) -> Self {
        Self::from_engine(ClearingEngine::bootstrap(config))
    }

    /// Wrap an already constructed engine.
    pub fn from_engine(engine: ClearingEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    // ========================================================================
    // Clearing Operations
    // ========================================================================

    pub fn distribute(
        &self,
        caller: &str,
        sources: &[DistributionSource],
        battery_snapshot_kwh: Energy,
    ) -> EngineResult<()> {
        self.inner
            .lock()
            .distribute(caller, sources, battery_snapshot_kwh)
    }

    pub fn consume(
        &self,
        caller: &str,
        requests: &[ConsumptionRequest],
        export_requests: &[ExportRequest],
    ) -> EngineResult<()> {
        self.inner.lock().consume(caller, requests, export_requests)
    }

    pub fn charge_battery(&self, caller: &str, quantity_kwh: Energy) -> EngineResult<()> {
        self.inner.lock().charge_battery(caller, quantity_kwh)
    }

    pub fn discharge_battery(&self, caller: &str, quantity_kwh: Energy) -> EngineResult<()> {
        self.inner.lock().discharge_battery(caller, quantity_kwh)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn add_member(
        &self,
        caller: &str,
        address: &str,
        device_ids: &[DeviceId],
        share_bps: u32,
    ) -> EngineResult<MemberId> {
        self.inner
            .lock()
            .add_member(caller, address, device_ids, share_bps)
    }

    pub fn remove_member(&self, caller: &str, address: &str) -> EngineResult<()> {
        self.inner.lock().remove_member(caller, address)
    }

    pub fn set_whitelist(&self, caller: &str, address: &str, allowed: bool) -> EngineResult<()> {
        self.inner.lock().set_whitelist(caller, address, allowed)
    }

    pub fn set_export_price(&self, caller: &str, price_micros: Money) -> EngineResult<()> {
        self.inner.lock().set_export_price(caller, price_micros)
    }

    pub fn set_community_device(&self, caller: &str, device_id: DeviceId) -> EngineResult<()> {
        self.inner.lock().set_community_device(caller, device_id)
    }

    pub fn configure_battery(
        &self,
        caller: &str,
        capacity_kwh: Energy,
        price_micros: Money,
    ) -> EngineResult<()> {
        self.inner
            .lock()
            .configure_battery(caller, capacity_kwh, price_micros)
    }

    pub fn emergency_reset(&self, caller: &str) -> EngineResult<()> {
        self.inner.lock().emergency_reset(caller)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn cash_credit_balance(&self, address: &str) -> EngineResult<Amount> {
        self.inner.lock().cash_credit_balance(address)
    }

    pub fn import_balance(&self) -> Amount {
        self.inner.lock().import_balance()
    }

    pub fn export_balance(&self) -> Amount {
        self.inner.lock().export_balance()
    }

    pub fn collective_consumption(&self) -> Vec<EnergyBatch> {
        self.inner.lock().collective_consumption()
    }

    pub fn battery_info(&self) -> BatteryState {
        self.inner.lock().battery_info()
    }

    pub fn verify_zero_sum(&self) -> (bool, Amount) {
        self.inner.lock().verify_zero_sum()
    }

    pub fn receipts(&self) -> Vec<OperationReceipt> {
        self.inner.lock().receipts().to_vec()
    }

    pub fn last_receipt(&self) -> Option<OperationReceipt> {
        self.inner.lock().last_receipt().cloned()
    }

    pub fn state_root(&self) -> [u8; 32] {
        self.inner.lock().state_root()
    }

    pub fn is_corrupted(&self) -> bool {
        self.inner.lock().is_corrupted()
    }

    pub fn phase(&self) -> EnginePhase {
        self.inner.lock().phase()
    }

    pub fn is_authorized(&self, address: &str) -> bool {
        self.inner.lock().is_authorized(address)
    }

    pub fn pool_quantity_kwh(&self) -> Energy {
        self.inner.lock().pool_quantity_kwh()
    }

    pub fn batch_count(&self) -> usize {
        self.inner.lock().batch_count()
    }

    pub fn export_price(&self) -> Option<Money> {
        self.inner.lock().export_price()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const OPERATOR: &str = "0xoperator";

    fn shared_engine() -> SharedEngine {
        let config = EngineConfig::new("shared-test").with_operator(OPERATOR);
        SharedEngine::bootstrap(config)
    }

    #[test]
    fn test_handles_share_one_engine() {
        let engine = shared_engine();
        let other = engine.clone();

        engine
            .add_member(OPERATOR, "0xalice", &[10], 3_000)
            .unwrap();
        other.add_member(OPERATOR, "0xbob", &[20], 2_500).unwrap();

        let sources = vec![DistributionSource::producer("0xalice", 8_000_000, 50)];
        engine.distribute(OPERATOR, &sources, 0).unwrap();
        let requests = vec![ConsumptionRequest::new(20, 20)];
        other.consume(OPERATOR, &requests, &[]).unwrap();

        // Both handles observe the same committed state
        assert_eq!(engine.cash_credit_balance("0xbob").unwrap(), -160_000_000);
        assert_eq!(other.cash_credit_balance("0xbob").unwrap(), -160_000_000);
        assert_eq!(engine.state_root(), other.state_root());
        assert_eq!(engine.verify_zero_sum(), (true, 0));
    }

    #[test]
    fn test_operations_serialize_across_threads() {
        let engine = shared_engine();
        engine
            .configure_battery(OPERATOR, 1_000, 5_000_000)
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        engine.charge_battery(OPERATOR, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 4 threads x 25 charges of 1 kWh, none lost
        assert_eq!(engine.battery_info().stored_kwh, 100);
        assert_eq!(engine.receipts().len(), 101);
        assert_eq!(engine.verify_zero_sum(), (true, 0));
    }
}
