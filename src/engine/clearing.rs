//! Clearing engine implementation.
//!
//! ## Operation Shape
//!
//! Every mutating entry point follows the same shape:
//!
//! 1. **Authorization**: the caller must be whitelisted
//! 2. **Corruption gate**: a latched invariant failure blocks everything
//!    except the emergency reset
//! 3. **Plan**: all draws and balance deltas are computed against a
//!    read-only view and validated
//! 4. **Commit**: the plan is written in one step
//! 5. **Verify**: the zero-sum invariant is re-checked and a receipt is
//!    appended
//!
//! A failure anywhere before the commit leaves the engine byte-identical
//! to its prior state.
//!
//! ## Clearing Rules
//!
//! - **Exports** drain the exporter's own batches in arrival order and
//!   settle at the community export price
//! - **Consumption** drains the pool in merit order (cheapest level first,
//!   FIFO within a level) and settles each draw at the batch price
//! - **Battery** charge/discharge moves energy only; storage pricing is
//!   settled through distribution
//!
//! ## Example
//!
//! ```
//! use gridshare::engine::{ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig};
//!
//! let config = EngineConfig::new("demo").with_operator("0xop");
//! let mut engine = ClearingEngine::bootstrap(config);
//!
//! engine.add_member("0xop", "0xalice", &[7], 5_000).unwrap();
//! engine.add_member("0xop", "0xbob", &[9], 5_000).unwrap();
//!
//! // 50 kWh of rooftop production at 8.00 per kWh
//! let sources = vec![DistributionSource::producer("0xalice", 8_000_000, 50)];
//! engine.distribute("0xop", &sources, 0).unwrap();
//!
//! // Bob's meter draws 20 kWh
//! let requests = vec![ConsumptionRequest::new(9, 20)];
//! engine.consume("0xop", &requests, &[]).unwrap();
//!
//! assert_eq!(engine.cash_credit_balance("0xalice").unwrap(), 160_000_000);
//! assert_eq!(engine.cash_credit_balance("0xbob").unwrap(), -160_000_000);
//! assert_eq!(engine.verify_zero_sum(), (true, 0));
//! ```

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::ledger::{BalanceDeltas, LedgerAccounts};
use crate::pool::EnergyPool;
use crate::registry::MembershipRegistry;
use crate::types::units::{batch_cost, to_amount};
use crate::types::{
    Amount, BatchOwner, Battery, BatteryState, DeviceId, Energy, EnergyBatch, MemberId, Money,
    OperationKind, OperationReceipt,
};

/// Default pre-allocated pool capacity in batches.
pub const DEFAULT_POOL_CAPACITY: usize = 1_024;

/// Configuration for a [`ClearingEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Label used in log output
    pub label: String,

    /// Addresses whitelisted at bootstrap
    pub operators: Vec<String>,

    /// Pre-allocated pool capacity in batches
    pub pool_capacity: usize,
}

impl EngineConfig {
    /// Create a configuration with no operators and default capacity.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            operators: Vec::new(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }

    /// Whitelist `address` from the first operation on.
    pub fn with_operator(mut self, address: impl Into<String>) -> Self {
        self.operators.push(address.into());
        self
    }

    /// Override the pre-allocated pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}

/// Where distributed energy comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplyOrigin {
    /// A member's own production, credited to that member on consumption
    Producer(String),

    /// Grid import, credited to the import counterparty on consumption
    Import,
}

/// One energy source entering the pool during a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSource {
    /// Who gets paid when this energy is consumed
    pub origin: SupplyOrigin,

    /// Price per kWh in micro currency units
    pub price_micros: Money,

    /// Metered quantity in kWh
    pub quantity_kwh: Energy,
}

impl DistributionSource {
    /// Source backed by a member's production.
    pub fn producer(address: impl Into<String>, price_micros: Money, quantity_kwh: Energy) -> Self {
        Self {
            origin: SupplyOrigin::Producer(address.into()),
            price_micros,
            quantity_kwh,
        }
    }

    /// Source backed by grid import.
    pub fn import(price_micros: Money, quantity_kwh: Energy) -> Self {
        Self {
            origin: SupplyOrigin::Import,
            price_micros,
            quantity_kwh,
        }
    }
}

/// One metered consumption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionRequest {
    /// Consuming device; resolved to the owning member
    pub device_id: DeviceId,

    /// Metered quantity in kWh
    pub quantity_kwh: Energy,
}

impl ConsumptionRequest {
    pub fn new(device_id: DeviceId, quantity_kwh: Energy) -> Self {
        Self {
            device_id,
            quantity_kwh,
        }
    }
}

/// One metered export request: energy sold out of the community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    /// Exporting device; resolved to the owning member
    pub device_id: DeviceId,

    /// Metered quantity in kWh
    pub quantity_kwh: Energy,
}

impl ExportRequest {
    pub fn new(device_id: DeviceId, quantity_kwh: Energy) -> Self {
        Self {
            device_id,
            quantity_kwh,
        }
    }
}

/// Engine lifecycle phase.
///
/// Every mutating operation enters from `Idle` and returns to `Idle`
/// before its result is handed back, so between calls the phase always
/// reads `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Distributing,
    Consuming,
    AdminReset,
}

/// One planned draw against a pool slab key.
#[derive(Debug, Clone, Copy)]
struct PlannedDraw {
    key: usize,
    quantity: Energy,
}

/// Community clearing engine.
///
/// Owns the membership registry, the energy pool, the ledger, and the
/// optional shared battery as a single unit, so every operation sees and
/// mutates one consistent state.
#[derive(Debug)]
pub struct ClearingEngine {
    /// Bootstrap configuration
    config: EngineConfig,

    /// Members, devices, whitelist
    registry: MembershipRegistry,

    /// Undrawn energy batches in merit order
    pool: EnergyPool,

    /// Zero-sum balance ledger
    ledger: LedgerAccounts,

    /// Shared battery; `None` until an administrator configures one
    battery: Option<Battery>,

    /// Export price per kWh; `None` until configured
    export_price: Option<Money>,

    /// Current lifecycle phase
    phase: EnginePhase,

    /// Latched invariant failure; blocks all mutations except the
    /// emergency reset
    corrupted: Option<Amount>,

    /// Audit trail, one receipt per committed mutation
    receipts: Vec<OperationReceipt>,

    /// Next receipt sequence number (starts at 1, never reused)
    next_op_seq: u64,
}

impl ClearingEngine {
    /// Bring up an engine from its configuration.
    ///
    /// Configured operators are whitelisted before the first operation;
    /// everything else starts empty.
    pub fn bootstrap(config: EngineConfig) -> Self {
        let mut registry = MembershipRegistry::new();
        for operator in &config.operators {
            registry.set_whitelist(operator, true);
        }
        let pool = EnergyPool::with_capacity(config.pool_capacity);
        info!(
            "[{}] clearing engine ready, {} operator(s) whitelisted",
            config.label,
            config.operators.len()
        );
        Self {
            config,
            registry,
            pool,
            ledger: LedgerAccounts::new(),
            battery: None,
            export_price: None,
            phase: EnginePhase::Idle,
            corrupted: None,
            receipts: Vec::new(),
            next_op_seq: 1,
        }
    }

    // ========================================================================
    // Clearing Operations
    // ========================================================================

    /// Distribute a metering period's production into the pool.
    ///
    /// Each source becomes exactly one batch with its price and quantity
    /// verbatim. The previous distribution must be fully consumed first;
    /// validation completes before the first batch is inserted, so a
    /// failed call inserts nothing.
    ///
    /// # Arguments
    ///
    /// * `caller` - Whitelisted address performing the distribution
    /// * `sources` - Non-empty list of energy sources
    /// * `battery_snapshot_kwh` - Host meter reading of the battery,
    ///   recorded in the receipt only
    pub fn distribute(
        &mut self,
        caller: &str,
        sources: &[DistributionSource],
        battery_snapshot_kwh: Energy,
    ) -> EngineResult<()> {
        self.guard_mutation(caller)?;

        if !self.pool.is_empty() {
            let remaining_kwh = self.pool.total_quantity_kwh();
            let batches = self.pool.batch_count();
            debug!(
                "[{}] rejected distribution, {} kWh unconsumed in {} batch(es)",
                self.config.label, remaining_kwh, batches
            );
            return Err(EngineError::PriorDistributionUnconsumed {
                remaining_kwh,
                batches,
            });
        }
        if sources.is_empty() {
            return Err(EngineError::EmptyDistribution);
        }

        // Validate every source before the first insertion
        let mut planned: Vec<(BatchOwner, Money, Energy)> = Vec::with_capacity(sources.len());
        let mut total_kwh: Energy = 0;
        for source in sources {
            if source.quantity_kwh == 0 {
                return Err(EngineError::ZeroQuantity);
            }
            batch_cost(source.price_micros, source.quantity_kwh).ok_or(
                EngineError::ArithmeticOverflow {
                    context: "batch notional",
                },
            )?;
            total_kwh = total_kwh.checked_add(source.quantity_kwh).ok_or(
                EngineError::ArithmeticOverflow {
                    context: "distribution total",
                },
            )?;
            let owner = match &source.origin {
                SupplyOrigin::Import => BatchOwner::Import,
                SupplyOrigin::Producer(address) => {
                    BatchOwner::Member(self.registry.require_active(address)?)
                }
            };
            planned.push((owner, source.price_micros, source.quantity_kwh));
        }

        self.phase = EnginePhase::Distributing;
        for (owner, price_micros, quantity_kwh) in planned {
            self.pool.add_batch(owner, price_micros, quantity_kwh);
        }
        let result = self.finish_commit(
            OperationKind::Distribute,
            sources.len() as u64,
            total_kwh,
            battery_snapshot_kwh,
        );
        self.phase = EnginePhase::Idle;
        if result.is_ok() {
            info!(
                "[{}] distributed {} kWh across {} batch(es)",
                self.config.label,
                total_kwh,
                sources.len()
            );
        }
        result
    }

    /// Clear a metering period's consumption against the pool.
    ///
    /// Export requests settle first, each drawing from the exporter's own
    /// batches in arrival order at the community export price. Remaining
    /// requests then drain the pool in merit order, settling each draw at
    /// the batch price against the batch owner.
    ///
    /// The whole call is all-or-nothing: every draw and every balance
    /// delta is planned and validated before anything is written, and a
    /// failure anywhere leaves the engine byte-identical.
    ///
    /// # Arguments
    ///
    /// * `caller` - Whitelisted address performing the clearing
    /// * `requests` - Metered consumption, settled in request order
    /// * `export_requests` - Metered exports, settled first
    pub fn consume(
        &mut self,
        caller: &str,
        requests: &[ConsumptionRequest],
        export_requests: &[ExportRequest],
    ) -> EngineResult<()> {
        self.guard_mutation(caller)?;

        if requests.is_empty() && export_requests.is_empty() {
            return Err(EngineError::EmptyRequest);
        }

        // Resolve every device before planning any draw
        let mut consumers: Vec<(MemberId, Energy)> = Vec::with_capacity(requests.len());
        for request in requests {
            if request.quantity_kwh == 0 {
                return Err(EngineError::ZeroQuantity);
            }
            let member = self.registry.resolve_device(request.device_id)?;
            consumers.push((member, request.quantity_kwh));
        }
        let mut exporters: Vec<(MemberId, Energy)> = Vec::with_capacity(export_requests.len());
        for request in export_requests {
            if request.quantity_kwh == 0 {
                return Err(EngineError::ZeroQuantity);
            }
            let member = self.registry.resolve_device(request.device_id)?;
            exporters.push((member, request.quantity_kwh));
        }

        // Plan phase: draws accumulate in an overlay so the pool itself
        // stays untouched until every request is known to clear
        let mut drawn: HashMap<usize, Energy> = HashMap::new();
        let mut plan: Vec<PlannedDraw> = Vec::new();
        let mut deltas = BalanceDeltas::new();

        if !exporters.is_empty() {
            let export_price = self
                .export_price
                .ok_or(EngineError::ExportPriceNotConfigured)?;
            for (exporter, quantity) in &exporters {
                let mut outstanding = *quantity;
                for key in self.pool.owner_keys(BatchOwner::Member(*exporter)) {
                    if outstanding == 0 {
                        break;
                    }
                    let available = self.planned_available(&drawn, key);
                    if available == 0 {
                        continue;
                    }
                    let take = available.min(outstanding);
                    *drawn.entry(key).or_insert(0) += take;
                    plan.push(PlannedDraw { key, quantity: take });
                    outstanding -= take;
                }
                if outstanding > 0 {
                    let available = *quantity - outstanding;
                    warn!(
                        "[{}] export rejected, member {} owns {} kWh of {} requested",
                        self.config.label, exporter, available, quantity
                    );
                    return Err(EngineError::InsufficientEnergy {
                        requested: *quantity,
                        available,
                    });
                }
                let proceeds = to_amount(batch_cost(export_price, *quantity).ok_or(
                    EngineError::ArithmeticOverflow {
                        context: "export proceeds",
                    },
                )?);
                deltas.add_member(*exporter, proceeds)?;
                deltas.add_export(-proceeds)?;
            }
        }

        // Merit order for ordinary requests: cheapest level first, FIFO
        // within a level. The key order is fixed for the whole plan
        // because nothing is inserted or removed while planning.
        let merit = self.pool.merit_keys();
        for (consumer, quantity) in &consumers {
            let mut outstanding = *quantity;
            for &key in &merit {
                if outstanding == 0 {
                    break;
                }
                let available = self.planned_available(&drawn, key);
                if available == 0 {
                    continue;
                }
                let (price_micros, owner) = match self.pool.get_batch(key) {
                    Some(batch) => (batch.price_micros, batch.owner()),
                    None => continue,
                };
                let take = available.min(outstanding);
                let cost = to_amount(batch_cost(price_micros, take).ok_or(
                    EngineError::ArithmeticOverflow {
                        context: "draw cost",
                    },
                )?);
                deltas.add_member(*consumer, -cost)?;
                match owner {
                    BatchOwner::Import => deltas.add_import(cost)?,
                    BatchOwner::Member(producer) => deltas.add_member(producer, cost)?,
                }
                *drawn.entry(key).or_insert(0) += take;
                plan.push(PlannedDraw { key, quantity: take });
                outstanding -= take;
            }
            if outstanding > 0 {
                let available = *quantity - outstanding;
                warn!(
                    "[{}] pool exhausted, member {} requested {} kWh with {} available",
                    self.config.label, consumer, quantity, available
                );
                return Err(EngineError::InsufficientEnergy {
                    requested: *quantity,
                    available,
                });
            }
        }

        // Pre-commit gates: the plan must net to zero and every resulting
        // balance must be representable
        if !deltas.is_balanced() {
            let observed = deltas.sum().unwrap_or(Amount::MAX);
            error!(
                "[{}] planned deltas do not balance, observed {}",
                self.config.label, observed
            );
            return Err(EngineError::InvariantViolation { observed });
        }
        self.ledger.check_apply(&deltas)?;

        // Commit: ledger first (internally staged), then the planned
        // draws, which cannot fail for a validated plan
        self.phase = EnginePhase::Consuming;
        let batches_touched = drawn.len() as u64;
        let apply = self.ledger.apply(&deltas);
        let result = match apply {
            Err(err) => Err(err),
            Ok(()) => {
                let mut total_kwh: Energy = 0;
                for draw in &plan {
                    let taken = self.pool.draw(draw.key, draw.quantity);
                    total_kwh = total_kwh.saturating_add(taken);
                }
                self.finish_commit(
                    OperationKind::Consume,
                    batches_touched,
                    total_kwh,
                    self.battery_stored(),
                )
                .map(|()| total_kwh)
            }
        };
        self.phase = EnginePhase::Idle;
        match result {
            Ok(total_kwh) => {
                info!(
                    "[{}] cleared {} kWh from {} batch(es) for {} request(s), {} export(s)",
                    self.config.label,
                    total_kwh,
                    batches_touched,
                    requests.len(),
                    export_requests.len()
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Battery Operations
    // ========================================================================

    /// Store surplus energy in the shared battery.
    pub fn charge_battery(&mut self, caller: &str, quantity_kwh: Energy) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        if quantity_kwh == 0 {
            return Err(EngineError::ZeroQuantity);
        }
        let battery = self
            .battery
            .as_mut()
            .ok_or(EngineError::BatteryNotConfigured)?;
        battery.charge(quantity_kwh)?;
        let stored = battery.stored_kwh();
        debug!(
            "[{}] battery charged {} kWh, {} kWh stored",
            self.config.label, quantity_kwh, stored
        );
        self.finish_commit(OperationKind::BatteryCharge, 0, quantity_kwh, stored)
    }

    /// Release stored energy from the shared battery.
    pub fn discharge_battery(&mut self, caller: &str, quantity_kwh: Energy) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        if quantity_kwh == 0 {
            return Err(EngineError::ZeroQuantity);
        }
        let battery = self
            .battery
            .as_mut()
            .ok_or(EngineError::BatteryNotConfigured)?;
        battery.discharge(quantity_kwh)?;
        let stored = battery.stored_kwh();
        debug!(
            "[{}] battery discharged {} kWh, {} kWh stored",
            self.config.label, quantity_kwh, stored
        );
        self.finish_commit(OperationKind::BatteryDischarge, 0, quantity_kwh, stored)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Register a new member with their devices and ownership share.
    ///
    /// The member's ledger slot is provisioned immediately so the
    /// canonical participant enumeration covers them from this receipt on.
    pub fn add_member(
        &mut self,
        caller: &str,
        address: &str,
        device_ids: &[DeviceId],
        share_bps: u32,
    ) -> EngineResult<MemberId> {
        self.guard_mutation(caller)?;
        let member = self.registry.add_member(address, device_ids, share_bps)?;
        self.ledger.ensure_member(member);
        info!(
            "[{}] member {} registered as id {} with {} device(s), {} bps",
            self.config.label,
            address,
            member,
            device_ids.len(),
            share_bps
        );
        self.finish_admin()?;
        Ok(member)
    }

    /// Deactivate a member.
    ///
    /// The member's balance and device bindings survive; their devices
    /// stop resolving until the member is re-added.
    pub fn remove_member(&mut self, caller: &str, address: &str) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        let member = self.registry.remove_member(address)?;
        info!(
            "[{}] member {} (id {}) deactivated",
            self.config.label, address, member
        );
        self.finish_admin()
    }

    /// Grant or revoke operation rights for an address.
    pub fn set_whitelist(&mut self, caller: &str, address: &str, allowed: bool) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        self.registry.set_whitelist(address, allowed);
        info!(
            "[{}] whitelist {} for {}",
            self.config.label,
            if allowed { "granted" } else { "revoked" },
            address
        );
        self.finish_admin()
    }

    /// Set the community export price per kWh.
    pub fn set_export_price(&mut self, caller: &str, price_micros: Money) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        self.export_price = Some(price_micros);
        info!(
            "[{}] export price set to {} micros per kWh",
            self.config.label, price_micros
        );
        self.finish_admin()
    }

    /// Designate the device whose owner absorbs community-level metering.
    pub fn set_community_device(&mut self, caller: &str, device_id: DeviceId) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        self.registry.set_community_device(device_id)?;
        info!(
            "[{}] community device set to {}",
            self.config.label, device_id
        );
        self.finish_admin()
    }

    /// Configure or reconfigure the shared battery.
    ///
    /// Reconfiguration keeps the stored energy; shrinking capacity below
    /// the current charge is rejected.
    pub fn configure_battery(
        &mut self,
        caller: &str,
        capacity_kwh: Energy,
        price_micros: Money,
    ) -> EngineResult<()> {
        self.guard_mutation(caller)?;
        match self.battery.as_mut() {
            Some(battery) => battery.reconfigure(capacity_kwh, price_micros)?,
            None => self.battery = Some(Battery::new(capacity_kwh, price_micros)),
        }
        info!(
            "[{}] battery configured, {} kWh capacity at {} micros per kWh",
            self.config.label, capacity_kwh, price_micros
        );
        self.finish_admin()
    }

    /// Zero every ledger balance and clear a latched invariant failure.
    ///
    /// This is the only mutation that runs while the engine is corrupted.
    /// The pool, battery, registry, and audit trail are untouched; the
    /// closing invariant check passes trivially on the zeroed ledger.
    pub fn emergency_reset(&mut self, caller: &str) -> EngineResult<()> {
        self.registry.require_authorized(caller)?;
        self.phase = EnginePhase::AdminReset;
        self.ledger.reset();
        self.corrupted = None;
        let result = self.finish_commit(
            OperationKind::EmergencyReset,
            0,
            0,
            self.battery_stored(),
        );
        self.phase = EnginePhase::Idle;
        warn!(
            "[{}] emergency reset by {}, all balances zeroed",
            self.config.label, caller
        );
        result
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Net ledger position for a member address.
    ///
    /// Positive means the community owes the member; negative means the
    /// member owes the community. Inactive members keep a readable
    /// balance.
    pub fn cash_credit_balance(&self, address: &str) -> EngineResult<Amount> {
        let member = self.registry.require_member(address)?;
        Ok(self.ledger.balance(member))
    }

    /// Net position of the grid-import counterparty.
    #[inline]
    pub fn import_balance(&self) -> Amount {
        self.ledger.import_balance()
    }

    /// Net position of the grid-export counterparty.
    #[inline]
    pub fn export_balance(&self) -> Amount {
        self.ledger.export_balance()
    }

    /// Remaining batches in arrival order.
    pub fn collective_consumption(&self) -> Vec<EnergyBatch> {
        self.pool.batches_by_seq()
    }

    /// Snapshot of the shared battery.
    pub fn battery_info(&self) -> BatteryState {
        match &self.battery {
            Some(battery) => battery.snapshot(),
            None => BatteryState::unconfigured(),
        }
    }

    /// Re-run the zero-sum check without mutating anything.
    pub fn verify_zero_sum(&self) -> (bool, Amount) {
        self.ledger.verify_zero_sum()
    }

    /// Audit trail of committed operations, oldest first.
    #[inline]
    pub fn receipts(&self) -> &[OperationReceipt] {
        &self.receipts
    }

    /// Receipt of the most recent committed operation.
    #[inline]
    pub fn last_receipt(&self) -> Option<&OperationReceipt> {
        self.receipts.last()
    }

    /// SHA-256 fingerprint of the current ledger, pool, and battery state.
    ///
    /// Two engines with equal state report equal roots; any committed
    /// mutation changes the root.
    pub fn state_root(&self) -> [u8; 32] {
        let mut data = Vec::new();
        self.ledger.encode_state(&mut data);
        for batch in self.pool.batches_by_seq() {
            data.extend_from_slice(&batch.id.to_le_bytes());
            data.push(batch.owner_raw);
            data.extend_from_slice(&batch.owner_member.to_le_bytes());
            data.extend_from_slice(&batch.price_micros.to_le_bytes());
            data.extend_from_slice(&batch.remaining_kwh.to_le_bytes());
            data.extend_from_slice(&batch.seq.to_le_bytes());
        }
        match &self.battery {
            Some(battery) => {
                data.push(1);
                data.extend_from_slice(&battery.capacity_kwh().to_le_bytes());
                data.extend_from_slice(&battery.stored_kwh().to_le_bytes());
                data.extend_from_slice(&battery.price_micros().to_le_bytes());
            }
            None => data.push(0),
        }
        OperationReceipt::compute_hash(&data)
    }

    /// Whether an invariant failure is latched.
    #[inline]
    pub fn is_corrupted(&self) -> bool {
        self.corrupted.is_some()
    }

    /// Current lifecycle phase.
    #[inline]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Whether `address` may perform mutating operations.
    #[inline]
    pub fn is_authorized(&self, address: &str) -> bool {
        self.registry.is_authorized(address)
    }

    /// Total undrawn energy across the pool in kWh.
    #[inline]
    pub fn pool_quantity_kwh(&self) -> Energy {
        self.pool.total_quantity_kwh()
    }

    /// Number of batches currently in the pool.
    #[inline]
    pub fn batch_count(&self) -> usize {
        self.pool.batch_count()
    }

    /// Configured export price, if any.
    #[inline]
    pub fn export_price(&self) -> Option<Money> {
        self.export_price
    }

    /// Read-only view of the membership registry.
    #[inline]
    pub fn registry(&self) -> &MembershipRegistry {
        &self.registry
    }

    /// Label this engine logs under.
    #[inline]
    pub fn label(&self) -> &str {
        &self.config.label
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Gate shared by every mutating operation except the emergency reset.
    fn guard_mutation(&self, caller: &str) -> EngineResult<()> {
        self.registry.require_authorized(caller)?;
        if let Some(observed) = self.corrupted {
            return Err(EngineError::InvariantViolation { observed });
        }
        Ok(())
    }

    /// Energy still drawable from `key` under the planning overlay.
    fn planned_available(&self, drawn: &HashMap<usize, Energy>, key: usize) -> Energy {
        let remaining = match self.pool.get_batch(key) {
            Some(batch) => batch.remaining_kwh,
            None => return 0,
        };
        remaining.saturating_sub(drawn.get(&key).copied().unwrap_or(0))
    }

    /// Battery charge, zero while unconfigured.
    fn battery_stored(&self) -> Energy {
        match &self.battery {
            Some(battery) => battery.stored_kwh(),
            None => 0,
        }
    }

    /// Close a committed mutation: verify the invariant, then append the
    /// receipt.
    ///
    /// A failing check latches the corrupted state and no receipt is
    /// written for the poisoned mutation.
    fn finish_commit(
        &mut self,
        kind: OperationKind,
        batches_touched: u64,
        quantity_kwh: Energy,
        battery_snapshot_kwh: Energy,
    ) -> EngineResult<()> {
        let (holds, observed) = self.ledger.verify_zero_sum();
        if !holds {
            self.corrupted = Some(observed);
            error!(
                "[{}] zero-sum invariant violated after {:?}, observed {}",
                self.config.label, kind, observed
            );
            return Err(EngineError::InvariantViolation { observed });
        }
        let state_root = self.state_root();
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        self.receipts.push(OperationReceipt::new(
            seq,
            kind,
            batches_touched,
            quantity_kwh,
            battery_snapshot_kwh,
            state_root,
        ));
        Ok(())
    }

    /// Close an administrative mutation with an `AdminConfig` receipt.
    fn finish_admin(&mut self) -> EngineResult<()> {
        self.finish_commit(OperationKind::AdminConfig, 0, 0, self.battery_stored())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
