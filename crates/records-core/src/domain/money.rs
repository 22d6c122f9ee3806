//! Decimal money arithmetic for line totals and contract totals.
//!
//! Amounts are stored as `NUMERIC(18,2)`, so every computed amount must stay
//! below 10^16. Arithmetic is checked; overflow is a `ValidationError`, never a
//! panic.

use records_shared::constants::MONEY_SCALE;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::DomainError;

/// Exclusive upper bound of a stored amount (`NUMERIC(18,2)`).
pub fn max_amount() -> Decimal {
    Decimal::from(10_000_000_000_000_000_i64)
}

pub fn within_storage_bound(value: Decimal) -> bool {
    value.abs() < max_amount()
}

/// Round to the currency minor unit (2 places, half away from zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(what: &str) -> DomainError {
    DomainError::ValidationError(format!("{} exceeds the storable amount range", what))
}

fn bounded(value: Decimal, what: &str) -> Result<Decimal, DomainError> {
    if within_storage_bound(value) {
        Ok(value)
    } else {
        Err(overflow(what))
    }
}

/// `quantity × unit_price × (1 − discount_pct / 100)`, rounded to the minor unit.
pub fn line_total(quantity: Decimal, unit_price: Decimal, discount_pct: Decimal) -> Result<Decimal, DomainError> {
    let factor = discount_pct
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|d| Decimal::ONE.checked_sub(d))
        .ok_or_else(|| overflow("discount"))?;
    let total = quantity
        .checked_mul(unit_price)
        .and_then(|gross| gross.checked_mul(factor))
        .ok_or_else(|| overflow("line total"))?;
    bounded(round_money(total), "line total")
}

/// Sum already-rounded line totals. Empty input yields zero.
pub fn sum_totals<I: IntoIterator<Item = Decimal>>(totals: I) -> Result<Decimal, DomainError> {
    let sum = totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t))
        .ok_or_else(|| overflow("contract total"))?;
    bounded(round_money(sum), "contract total")
}
