use primitives::Money;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * 60;

/// Cost of growing a plot from level `from` to level `to`: each level gained costs
/// `level_price` times its number.
pub fn expansion_price(level_price: Money, from: u32, to: u32) -> Money {
    ((from + 1)..=to).map(|level| level_price * Money::from(level)).sum()
}

/// Rentals are charged for every minute started.
pub fn per_started_minute(seconds: u64, price_per_minute: Money) -> Money {
    started(seconds, MINUTE) * price_per_minute
}

pub fn per_started_day(seconds: u64, price_per_day: Money) -> Money {
    started(seconds, DAY) * price_per_day
}

#[inline]
fn started(seconds: u64, unit: u64) -> u64 {
    (seconds + unit - 1) / unit
}
