//! Scenario tests for the GridShare clearing engine.
//!
//! These tests verify:
//! 1. A full metering cycle settles exactly (distribution, merit-order
//!    consumption, export, invariant check)
//! 2. Failed operations leave the engine byte-identical
//! 3. Determinism is preserved across runs
//! 4. The zero-sum invariant survives long random operation sequences
//!
//! ## Running Scenario Tests
//!
//! ```bash
//! # Run all scenario tests
//! cargo test --test clearing_scenarios -- --nocapture
//!
//! # Run a specific test
//! cargo test --test clearing_scenarios end_to_end_metering_cycle -- --nocapture
//! ```

use std::time::Instant;

use gridshare::engine::{
    ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig, ExportRequest,
};
use gridshare::{EngineError, OperationKind};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

const OPERATOR: &str = "0xoperator";

/// Member addresses with their metering devices, registration order.
const MEMBERS: [(&str, u64); 4] = [
    ("0xalice", 10),
    ("0xbob", 20),
    ("0xcarol", 30),
    ("0xdana", 40),
];

/// Cycles for the random stress test
const STRESS_CYCLES: usize = 250;

/// Floor for mixed operations under stress (debug builds included)
const MIN_THROUGHPUT: f64 = 1_000.0;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Engine with the four standard members, a battery, and an export price.
fn community_engine() -> ClearingEngine {
    let config = EngineConfig::new("scenario").with_operator(OPERATOR);
    let mut engine = ClearingEngine::bootstrap(config);
    for (address, device) in MEMBERS {
        engine
            .add_member(OPERATOR, address, &[device], 2_500)
            .unwrap();
    }
    engine.configure_battery(OPERATOR, 500, 5_000_000).unwrap();
    engine.set_export_price(OPERATOR, 10_000_000).unwrap();
    engine
}

/// Run `cycles` full distribute-then-drain cycles from a seeded RNG.
///
/// Every cycle distributes one batch per member plus an import tail, then
/// splits the exact total across the members' devices, so the pool is
/// empty again at the end of each cycle. Same seed = same final state.
fn run_random_cycles(seed: u64, cycles: usize) -> ClearingEngine {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut engine = community_engine();

    for _ in 0..cycles {
        let mut sources = Vec::with_capacity(MEMBERS.len() + 1);
        let mut total: u64 = 0;
        for (address, _) in MEMBERS {
            let quantity = rng.gen_range(5..=40u64);
            let price = rng.gen_range(1..=30u64) * 1_000_000;
            total += quantity;
            sources.push(DistributionSource::producer(address, price, quantity));
        }
        let import_quantity = rng.gen_range(5..=20u64);
        let import_price = rng.gen_range(20..=60u64) * 1_000_000;
        total += import_quantity;
        sources.push(DistributionSource::import(import_price, import_quantity));
        engine.distribute(OPERATOR, &sources, 0).unwrap();

        // Split the full pool across the devices; the last one drains it
        let mut remaining = total;
        let mut requests = Vec::with_capacity(MEMBERS.len());
        for (index, (_, device)) in MEMBERS.iter().enumerate() {
            let take = if index == MEMBERS.len() - 1 {
                remaining
            } else {
                rng.gen_range(0..=remaining)
            };
            if take > 0 {
                requests.push(ConsumptionRequest::new(*device, take));
                remaining -= take;
            }
        }
        engine.consume(OPERATOR, &requests, &[]).unwrap();

        assert_eq!(engine.pool_quantity_kwh(), 0);
        assert_eq!(engine.verify_zero_sum(), (true, 0));
    }
    engine
}

// ============================================================================
// SCENARIO TESTS
// ============================================================================

/// One full metering cycle: setup, distribution, merit-order consumption,
/// an export, and the closing invariant check.
#[test]
fn end_to_end_metering_cycle() {
    println!("\n=== END-TO-END METERING CYCLE ===\n");

    let config = EngineConfig::new("cycle").with_operator(OPERATOR);
    let mut engine = ClearingEngine::bootstrap(config);

    let roster: [(&str, u64, u32); 5] = [
        ("0xalice", 10, 3_000),
        ("0xbob", 20, 2_500),
        ("0xcarol", 30, 2_000),
        ("0xdana", 40, 1_500),
        ("0xeve", 50, 1_000),
    ];
    for (address, device, share_bps) in roster {
        engine
            .add_member(OPERATOR, address, &[device], share_bps)
            .unwrap();
    }
    engine.configure_battery(OPERATOR, 500, 5_000_000).unwrap();
    engine.charge_battery(OPERATOR, 120).unwrap();

    println!("Distributing 150@8.00 + 100@12.00 + 80@30.00 (import)...");
    let sources = vec![
        DistributionSource::producer("0xalice", 8_000_000, 150),
        DistributionSource::producer("0xbob", 12_000_000, 100),
        DistributionSource::import(30_000_000, 80),
    ];
    engine.distribute(OPERATOR, &sources, 120).unwrap();
    assert_eq!(engine.pool_quantity_kwh(), 330);
    assert_eq!(engine.last_receipt().unwrap().battery_snapshot_kwh, 120);

    println!("Clearing [40, 35, 25] kWh in merit order...");
    let requests = vec![
        ConsumptionRequest::new(30, 40),
        ConsumptionRequest::new(40, 35),
        ConsumptionRequest::new(50, 25),
    ];
    engine.consume(OPERATOR, &requests, &[]).unwrap();

    // All 100 kWh clear from alice's 150 kWh batch at 8.00
    assert_eq!(engine.pool_quantity_kwh(), 230);
    assert_eq!(engine.cash_credit_balance("0xalice").unwrap(), 800_000_000);
    assert_eq!(engine.cash_credit_balance("0xbob").unwrap(), 0);
    assert_eq!(
        engine.cash_credit_balance("0xcarol").unwrap(),
        -320_000_000
    );
    assert_eq!(engine.cash_credit_balance("0xdana").unwrap(), -280_000_000);
    assert_eq!(engine.cash_credit_balance("0xeve").unwrap(), -200_000_000);
    assert_eq!(engine.import_balance(), 0);
    assert_eq!(engine.verify_zero_sum(), (true, 0));

    println!("Exporting 10 kWh of alice's surplus at 10.00...");
    engine.set_export_price(OPERATOR, 10_000_000).unwrap();
    let exports = vec![ExportRequest::new(10, 10)];
    engine.consume(OPERATOR, &[], &exports).unwrap();

    assert_eq!(engine.pool_quantity_kwh(), 220);
    assert_eq!(engine.cash_credit_balance("0xalice").unwrap(), 900_000_000);
    assert_eq!(engine.export_balance(), -100_000_000);
    assert_eq!(engine.verify_zero_sum(), (true, 0));

    println!("  Final state root: {}", hex::encode(engine.state_root()));
    println!("  Receipts: {}", engine.receipts().len());
    println!("\n=== CYCLE SETTLED EXACTLY ===\n");
}

/// Every rejected operation must leave the engine byte-identical: same
/// state root, same receipts.
#[test]
fn failed_operations_leave_state_untouched() {
    println!("\n=== FAILURE ATOMICITY TEST ===\n");

    let mut engine = community_engine();
    let sources = vec![DistributionSource::producer("0xalice", 8_000_000, 30)];
    engine.distribute(OPERATOR, &sources, 0).unwrap();

    let root = engine.state_root();
    let receipts = engine.receipts().len();

    let checks: Vec<(&str, EngineError)> = vec![
        (
            "overdraw",
            engine
                .consume(OPERATOR, &[ConsumptionRequest::new(20, 31)], &[])
                .unwrap_err(),
        ),
        (
            "double distribution",
            engine.distribute(OPERATOR, &sources, 0).unwrap_err(),
        ),
        (
            "foreign export",
            engine
                .consume(OPERATOR, &[], &[ExportRequest::new(20, 5)])
                .unwrap_err(),
        ),
        (
            "unknown device",
            engine
                .consume(OPERATOR, &[ConsumptionRequest::new(404, 1)], &[])
                .unwrap_err(),
        ),
        (
            "unauthorized caller",
            engine.distribute("0xrando", &sources, 0).unwrap_err(),
        ),
        (
            "battery overcharge",
            engine.charge_battery(OPERATOR, 501).unwrap_err(),
        ),
    ];

    for (label, err) in checks {
        println!("  {label}: {err}");
        assert_eq!(engine.state_root(), root, "{label} mutated state");
        assert_eq!(engine.receipts().len(), receipts, "{label} minted a receipt");
    }

    // The pool still clears normally afterwards
    engine
        .consume(OPERATOR, &[ConsumptionRequest::new(20, 30)], &[])
        .unwrap();
    assert_eq!(engine.verify_zero_sum(), (true, 0));

    println!("\n=== FAILURE ATOMICITY VERIFIED ===\n");
}

/// Same seed, same cycles: identical balances, receipts, and state root.
///
/// This is what makes the settlement replayable - a host can re-derive
/// the full ledger from the operation log alone.
#[test]
fn verify_determinism() {
    println!("\n=== DETERMINISM TEST ===\n");

    const CYCLES: usize = 40;
    const SEED: u64 = 12345;

    println!("Running {CYCLES} random cycles twice (seed={SEED})...");
    let first = run_random_cycles(SEED, CYCLES);
    let second = run_random_cycles(SEED, CYCLES);

    println!("  Run 1 state root: {}", hex::encode(first.state_root()));
    println!("  Run 2 state root: {}", hex::encode(second.state_root()));
    assert_eq!(first.state_root(), second.state_root());
    assert_eq!(first.receipts().len(), second.receipts().len());
    for (a, b) in first.receipts().iter().zip(second.receipts().iter()) {
        assert_eq!(a, b);
    }
    for (address, _) in MEMBERS {
        assert_eq!(
            first.cash_credit_balance(address).unwrap(),
            second.cash_credit_balance(address).unwrap()
        );
    }

    // A different seed must diverge
    let third = run_random_cycles(SEED + 1, CYCLES);
    println!("  Different seed:   {}", hex::encode(third.state_root()));
    assert_ne!(first.state_root(), third.state_root());

    println!("\n=== DETERMINISM VERIFIED ===\n");
}

/// The reset wipes balances and nothing else.
#[test]
fn emergency_reset_scope() {
    println!("\n=== EMERGENCY RESET TEST ===\n");

    let mut engine = community_engine();
    engine.charge_battery(OPERATOR, 75).unwrap();
    let sources = vec![
        DistributionSource::producer("0xalice", 8_000_000, 40),
        DistributionSource::import(30_000_000, 20),
    ];
    engine.distribute(OPERATOR, &sources, 75).unwrap();
    engine
        .consume(OPERATOR, &[ConsumptionRequest::new(20, 25)], &[])
        .unwrap();
    let receipts_before = engine.receipts().len();

    engine.emergency_reset(OPERATOR).unwrap();

    for (address, _) in MEMBERS {
        assert_eq!(engine.cash_credit_balance(address).unwrap(), 0);
    }
    assert_eq!(engine.import_balance(), 0);
    assert_eq!(engine.export_balance(), 0);
    assert_eq!(engine.verify_zero_sum(), (true, 0));
    // Energy state and the audit trail survive
    assert_eq!(engine.pool_quantity_kwh(), 35);
    assert_eq!(engine.battery_info().stored_kwh, 75);
    assert_eq!(engine.receipts().len(), receipts_before + 1);
    assert_eq!(
        engine.last_receipt().unwrap().kind(),
        OperationKind::EmergencyReset
    );

    println!("=== RESET SCOPE VERIFIED ===\n");
}

// ============================================================================
// STRESS TESTS
// ============================================================================

/// Long random operation sequence: the invariant must hold after every
/// cycle and throughput must stay reasonable even in debug builds.
#[test]
fn stress_random_cycles() {
    println!("\n=== STRESS TEST: {STRESS_CYCLES} Random Cycles ===\n");

    let start = Instant::now();
    let engine = run_random_cycles(42, STRESS_CYCLES);
    let elapsed = start.elapsed();

    // Each cycle is one distribution and one consumption
    let ops = (STRESS_CYCLES * 2) as f64;
    let throughput = ops / elapsed.as_secs_f64();

    println!("  Cycles:       {:>10}", STRESS_CYCLES);
    println!("  Receipts:     {:>10}", engine.receipts().len());
    println!("  Elapsed:      {:>10.2?}", elapsed);
    println!("  Throughput:   {:>10.0} ops/sec", throughput);
    println!("  State root:   {}", hex::encode(engine.state_root()));

    let (holds, observed) = engine.verify_zero_sum();
    println!(
        "  Zero-sum:     {} (observed {})",
        if holds { "PASS ✓" } else { "FAIL ✗" },
        observed
    );

    assert!(holds, "invariant violated after stress, observed {observed}");
    assert_eq!(observed, 0);
    assert!(
        throughput >= MIN_THROUGHPUT,
        "Throughput {throughput:.0} ops/sec below floor {MIN_THROUGHPUT:.0}"
    );

    println!("\n=== STRESS TEST PASSED ===\n");
}

/// Accumulating remainders: cycles that do not fully drain the pool keep
/// the undrawn energy priced and attributed, and a later drain settles it.
#[test]
fn stress_partial_drains_then_settle() {
    println!("\n=== PARTIAL DRAIN TEST ===\n");

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut engine = community_engine();

    let mut sources = Vec::new();
    let mut total: u64 = 0;
    for (address, _) in MEMBERS {
        let quantity = rng.gen_range(50..=90u64);
        total += quantity;
        sources.push(DistributionSource::producer(
            address,
            rng.gen_range(1..=20u64) * 1_000_000,
            quantity,
        ));
    }
    engine.distribute(OPERATOR, &sources, 0).unwrap();

    // Draw the pool down in small random bites
    let mut drained: u64 = 0;
    while drained < total {
        let left = total - drained;
        let take = rng.gen_range(1..=left.min(25));
        let device = MEMBERS[rng.gen_range(0..MEMBERS.len())].1;
        engine
            .consume(OPERATOR, &[ConsumptionRequest::new(device, take)], &[])
            .unwrap();
        drained += take;
        assert_eq!(engine.pool_quantity_kwh(), total - drained);
        assert_eq!(engine.verify_zero_sum(), (true, 0));
    }

    assert_eq!(engine.pool_quantity_kwh(), 0);
    assert!(engine.collective_consumption().is_empty());

    // The next distribution is accepted again
    engine
        .distribute(
            OPERATOR,
            &[DistributionSource::import(30_000_000, 10)],
            0,
        )
        .unwrap();

    println!("  Drained {total} kWh in random bites, invariant held throughout");
    println!("\n=== PARTIAL DRAIN TEST PASSED ===\n");
}
