//! Fixed-point units for deterministic energy accounting.
//!
//! All money values are `u64` fixed-point integers with 6 decimal places
//! (micro-units of the community currency). Energy is counted in whole
//! kilowatt-hours. Ledger balances are signed `i128` micro-units so that
//! debits and credits cancel exactly. No floating point appears anywhere
//! in the engine; arithmetic is identical on every platform.
//!
//! # Example
//!
//! ```
//! use gridshare::types::units::{to_fixed, from_fixed};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let price = Decimal::from_str("8.25").unwrap();
//! let fixed = to_fixed(price).unwrap();
//! assert_eq!(fixed, 8_250_000);
//! assert_eq!(from_fixed(fixed), price);
//! ```

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Price or cost in micro-units of the community currency.
pub type Money = u64;

/// Energy quantity in whole kilowatt-hours.
pub type Energy = u64;

/// Signed ledger balance in micro-units. Wide enough that no realistic
/// sequence of operations can overflow it.
pub type Amount = i128;

/// Dense arena index of a registered member.
pub type MemberId = u32;

/// Opaque identifier of a production or consumption device.
pub type DeviceId = u64;

/// Number of decimal places in the fixed-point money representation.
pub const PRICE_DECIMALS: u32 = 6;

/// Scaling factor between decimal currency and fixed-point micro-units.
pub const PRICE_SCALE: u64 = 1_000_000;

/// Convert a decimal price to fixed-point micro-units.
///
/// Returns `None` if the price is negative, carries more than
/// [`PRICE_DECIMALS`] decimal places, or does not fit in a `u64`.
///
/// # Arguments
///
/// * `price` - Decimal price per kWh
///
/// # Example
///
/// ```
/// use gridshare::types::units::to_fixed;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(to_fixed(Decimal::from_str("12").unwrap()), Some(12_000_000));
/// assert_eq!(to_fixed(Decimal::from_str("-1").unwrap()), None);
/// assert_eq!(to_fixed(Decimal::from_str("0.0000001").unwrap()), None);
/// ```
pub fn to_fixed(price: Decimal) -> Option<Money> {
    if price.is_sign_negative() {
        return None;
    }
    let scaled = price.checked_mul(Decimal::from(PRICE_SCALE))?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.to_u64()
}

/// Convert fixed-point micro-units back to a decimal price.
pub fn from_fixed(fixed: Money) -> Decimal {
    Decimal::from(fixed) / Decimal::from(PRICE_SCALE)
}

/// Cost of drawing `quantity` kWh at `price` micro-units per kWh.
///
/// Energy is an unscaled integer count, so the product is already in
/// micro-units. Returns `None` on overflow.
///
/// # Example
///
/// ```
/// use gridshare::types::units::batch_cost;
///
/// // 10 kWh at 8.000000 per kWh costs 80.000000
/// assert_eq!(batch_cost(8_000_000, 10), Some(80_000_000));
/// ```
pub fn batch_cost(price: Money, quantity: Energy) -> Option<Money> {
    price.checked_mul(quantity)
}

/// Widen an unsigned money value into a signed ledger amount.
pub fn to_amount(value: Money) -> Amount {
    value as Amount
}
