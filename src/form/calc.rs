//! Pure grid-form arithmetic

use crate::api::types::BotType;

/// Lower and upper grid bounds `range_percent` either side of `price`
///
/// Returns `None` when no usable price is known yet.
pub fn grid_bounds(price: f64, range_percent: u32) -> Option<(f64, f64)> {
    if price.is_nan() || price <= 0.0 {
        return None;
    }
    let r = f64::from(range_percent.min(100)) / 100.0;
    Some((price * (1.0 - r), price * (1.0 + r)))
}

/// Distance between adjacent levels of a grid with `grid_size` levels
pub fn grid_step(lower: f64, upper: f64, grid_size: u32) -> Option<f64> {
    if grid_size < 2 || !lower.is_finite() || !upper.is_finite() {
        return None;
    }
    Some((upper - lower) / f64::from(grid_size - 1))
}

/// Grid step expressed as a percentage of the current price
pub fn step_percent_of_price(step: f64, price: f64) -> Option<f64> {
    (price > 0.0).then(|| step / price * 100.0)
}

/// Order slots the allocation is spread over
///
/// A two-sided grid reserves one slot per level on each side.
pub fn position_slots(bot_type: BotType, grid_size: u32) -> u32 {
    match bot_type {
        BotType::Long | BotType::Short => grid_size,
        BotType::Both => grid_size.saturating_mul(2),
    }
}

/// Base-asset quantity per grid order
pub fn quantity_per_grid(allocation: f64, leverage: u32, slots: u32, price: f64) -> Option<f64> {
    if price.is_nan() || price <= 0.0 || allocation.is_nan() || allocation <= 0.0 || slots == 0 {
        return None;
    }
    Some(allocation * f64::from(leverage) / (f64::from(slots) * price))
}

/// Wallet amount committed to the grid
pub fn allocation_amount(wallet_balance: f64, allocation_percent: f64) -> f64 {
    wallet_balance * (allocation_percent / 100.0)
}
