//! Sample statistics over `Decimal` slices.
//!
//! Every estimator here uses the n-1 (sample) denominator, matching how the
//! hedge ratio, volatility and effectiveness figures are quoted. Deviations
//! are taken from the mean before any product is formed, and every product
//! is checked: a value outside the `Decimal` range is an `InvalidInput`
//! error, never a panic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::HedgingError;
use crate::HedgingResult;

/// Error for an intermediate that left the `Decimal` range.
pub fn overflow(context: &str) -> HedgingError {
    HedgingError::InvalidInput {
        field: context.into(),
        reason: "intermediate value exceeds the Decimal range".into(),
    }
}

/// `a * b`, or an overflow error naming `context`.
pub fn mul(a: Decimal, b: Decimal, context: &str) -> HedgingResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

/// `a / b`; a zero divisor is `DivisionByZero`.
pub fn div(a: Decimal, b: Decimal, context: &str) -> HedgingResult<Decimal> {
    if b.is_zero() {
        return Err(HedgingError::DivisionByZero {
            context: context.into(),
        });
    }
    a.checked_div(b).ok_or_else(|| overflow(context))
}

fn checked_sum<I: IntoIterator<Item = Decimal>>(items: I, context: &str) -> HedgingResult<Decimal> {
    items.into_iter().try_fold(Decimal::ZERO, |acc, x| {
        acc.checked_add(x).ok_or_else(|| overflow(context))
    })
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(data: &[Decimal]) -> HedgingResult<Decimal> {
    if data.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let sum = checked_sum(data.iter().copied(), "mean")?;
    div(sum, Decimal::from(data.len() as i64), "mean")
}

/// Sample variance (n-1 denominator). Zero when fewer than 2 observations.
pub fn sample_variance(data: &[Decimal]) -> HedgingResult<Decimal> {
    sample_covariance(data, data)
}

/// Sample covariance (n-1 denominator) over the common prefix of `x` and `y`.
pub fn sample_covariance(x: &[Decimal], y: &[Decimal]) -> HedgingResult<Decimal> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Ok(Decimal::ZERO);
    }
    let (x, y) = (&x[..n], &y[..n]);
    let x_mean = mean(x)?;
    let y_mean = mean(y)?;
    let mut sum = Decimal::ZERO;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi.checked_sub(x_mean).ok_or_else(|| overflow("covariance"))?;
        let dy = yi.checked_sub(y_mean).ok_or_else(|| overflow("covariance"))?;
        sum = sum
            .checked_add(mul(dx, dy, "covariance")?)
            .ok_or_else(|| overflow("covariance"))?;
    }
    div(sum, Decimal::from((n - 1) as i64), "covariance")
}

/// Sample standard deviation.
pub fn sample_std_dev(data: &[Decimal]) -> HedgingResult<Decimal> {
    Ok(sqrt_decimal(sample_variance(data)?))
}

/// Square root via `Decimal::sqrt()`; non-positive inputs map to zero.
pub fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Percentile of an ascending-sorted slice with linear interpolation between
/// order statistics. `pct` is a fraction in [0, 1]; the rank position is
/// `pct * (n - 1)`.
pub fn percentile_sorted(sorted: &[Decimal], pct: Decimal) -> Option<Decimal> {
    if sorted.is_empty() || pct < Decimal::ZERO || pct > Decimal::ONE {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }

    let rank = pct * Decimal::from((n - 1) as i64);
    let lower = rank.floor().to_usize()?.min(n - 1);
    let upper = rank.ceil().to_usize()?.min(n - 1);
    let frac = rank - rank.floor();

    let gap = sorted[upper].checked_sub(sorted[lower])?;
    sorted[lower].checked_add(gap.checked_mul(frac)?)
}
