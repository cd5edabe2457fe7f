//! GridShare - Binary Entry Point
//!
//! Walks one full metering cycle against an in-memory engine: membership
//! setup, a distribution, merit-order consumption, an export, and the
//! closing invariant check.
//!
//! Run with `RUST_LOG=debug` to see the engine's own log output.

use std::process;

use gridshare::engine::{
    ClearingEngine, ConsumptionRequest, DistributionSource, EngineConfig, ExportRequest,
};
use gridshare::error::EngineError;
use gridshare::types::units::PRICE_SCALE;
use gridshare::types::Amount;

const OPERATOR: &str = "0xoperator";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("gridshare demo failed: {err}");
        process::exit(1);
    }
}

/// Micros to a human-readable currency amount, display only.
fn human(amount: Amount) -> f64 {
    amount as f64 / PRICE_SCALE as f64
}

fn run() -> Result<(), EngineError> {
    println!("===========================================");
    println!("  GridShare - Community Clearing Engine");
    println!("===========================================");
    println!();

    let config = EngineConfig::new("demo").with_operator(OPERATOR);
    let mut engine = ClearingEngine::bootstrap(config);

    println!("Registering members...");
    let members: [(&str, u64, u32); 5] = [
        ("0xalice", 10, 3_000),
        ("0xbob", 20, 2_500),
        ("0xcarol", 30, 2_000),
        ("0xdana", 40, 1_500),
        ("0xeve", 50, 1_000),
    ];
    for (address, device, share_bps) in members {
        let id = engine.add_member(OPERATOR, address, &[device], share_bps)?;
        println!("  {address} -> member {id} (device {device}, {share_bps} bps)");
    }
    println!();

    println!("Configuring the shared battery (500 kWh at 5.00/kWh)...");
    engine.configure_battery(OPERATOR, 500, 5_000_000)?;
    engine.charge_battery(OPERATOR, 120)?;
    println!("  stored: {} kWh", engine.battery_info().stored_kwh);
    println!();

    println!("Distributing the metering period...");
    let sources = vec![
        DistributionSource::producer("0xalice", 8_000_000, 150),
        DistributionSource::producer("0xbob", 12_000_000, 100),
        DistributionSource::import(30_000_000, 80),
    ];
    engine.distribute(OPERATOR, &sources, 120)?;
    println!(
        "  {} batches, {} kWh in the pool",
        engine.batch_count(),
        engine.pool_quantity_kwh()
    );
    println!();

    println!("Clearing consumption [40, 35, 25] kWh in merit order...");
    let requests = vec![
        ConsumptionRequest::new(30, 40),
        ConsumptionRequest::new(40, 35),
        ConsumptionRequest::new(50, 25),
    ];
    engine.consume(OPERATOR, &requests, &[])?;
    println!("  {} kWh left in the pool", engine.pool_quantity_kwh());
    println!();

    println!("Exporting 10 kWh of alice's surplus at 10.00/kWh...");
    engine.set_export_price(OPERATOR, 10_000_000)?;
    let exports = vec![ExportRequest::new(10, 10)];
    engine.consume(OPERATOR, &[], &exports)?;
    println!("  {} kWh left in the pool", engine.pool_quantity_kwh());
    println!();

    println!("Member balances:");
    for (address, _, _) in members {
        let balance = engine.cash_credit_balance(address)?;
        println!("  {address}: {balance} micros ({:.2})", human(balance));
    }
    println!(
        "  import: {} micros ({:.2})",
        engine.import_balance(),
        human(engine.import_balance())
    );
    println!(
        "  export: {} micros ({:.2})",
        engine.export_balance(),
        human(engine.export_balance())
    );
    println!();

    let (holds, observed) = engine.verify_zero_sum();
    println!("Zero-sum invariant: holds={holds} observed={observed}");
    println!("State root: {}", hex::encode(engine.state_root()));
    println!();

    println!("Audit trail ({} receipts):", engine.receipts().len());
    for receipt in engine.receipts() {
        println!(
            "  #{} {:?}: {} kWh across {} batch(es)",
            receipt.seq,
            receipt.kind(),
            receipt.quantity_kwh,
            receipt.batches_touched
        );
    }

    Ok(())
}
