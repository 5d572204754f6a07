use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HedgingError;
use crate::market_data::{HedgeRatioSeries, PortfolioValueSeries, PriceSeries};
use crate::stats;
use crate::types::HedgeRatio;
use crate::HedgingResult;

/// How much futures exposure a strategy carries, and how it is valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "ratio")]
pub enum HedgeSchedule {
    /// Unhedged spot exposure.
    Unhedged,
    /// One ratio for the whole horizon, valued at price level:
    /// `spot - ratio * (futures - futures[0])`.
    Static(HedgeRatio),
    /// Ratio per return date, valued by accumulating daily P&L.
    Dynamic(HedgeRatioSeries),
}

impl HedgeSchedule {
    /// Ratio in force for the price move ending at index `i` (i >= 1).
    pub(crate) fn ratio_for_step(&self, i: usize) -> HedgeRatio {
        match self {
            HedgeSchedule::Unhedged => Decimal::ZERO,
            HedgeSchedule::Static(r) => *r,
            HedgeSchedule::Dynamic(series) => series.values()[i - 1],
        }
    }
}

fn check_alignment(spot: &PriceSeries, futures: &PriceSeries) -> HedgingResult<()> {
    if spot.is_empty() {
        return Err(HedgingError::InsufficientData(
            "portfolio valuation needs at least 1 spot price".into(),
        ));
    }
    if !spot.shares_index(futures) {
        return Err(HedgingError::InvalidInput {
            field: "futures".into(),
            reason: "spot and futures prices must share the same dates".into(),
        });
    }
    Ok(())
}

/// Price-level hedge evaluated pointwise: `spot[t] - ratio * (futures[t] - futures[0])`.
pub fn static_hedge_values(
    spot: &PriceSeries,
    futures: &PriceSeries,
    ratio: HedgeRatio,
) -> HedgingResult<PortfolioValueSeries> {
    check_alignment(spot, futures)?;
    let f0 = futures.values()[0];
    let values = spot
        .values()
        .iter()
        .zip(futures.values())
        .map(|(s, f)| {
            let hedge = stats::mul(ratio, f - f0, "static hedge value")?;
            s.checked_sub(hedge)
                .ok_or_else(|| stats::overflow("static hedge value"))
        })
        .collect::<HedgingResult<Vec<_>>>()?;
    PortfolioValueSeries::new(spot.dates().to_vec(), values)
}

/// Cumulative P&L hedge with a time-varying ratio:
/// `v[0] = spot[0]`, `v[i] = v[i-1] + Δspot[i] - ratio[i] * Δfutures[i]`.
///
/// `ratios` must be keyed by the return dates, i.e. `spot.dates()[1..]`.
pub fn dynamic_hedge_values(
    spot: &PriceSeries,
    futures: &PriceSeries,
    ratios: &HedgeRatioSeries,
) -> HedgingResult<PortfolioValueSeries> {
    check_alignment(spot, futures)?;
    if ratios.dates() != &spot.dates()[1..] {
        return Err(HedgingError::InvalidInput {
            field: "ratios".into(),
            reason: format!(
                "expected one ratio per return date ({}), got {}",
                spot.len() - 1,
                ratios.len()
            ),
        });
    }

    let s = spot.values();
    let f = futures.values();
    let r = ratios.values();
    let mut values = Vec::with_capacity(s.len());
    values.push(s[0]);
    for i in 1..s.len() {
        let prev = values[i - 1];
        let hedge_pnl = stats::mul(r[i - 1], f[i] - f[i - 1], "dynamic hedge value")?;
        let value = prev
            .checked_add(s[i] - s[i - 1])
            .and_then(|v| v.checked_sub(hedge_pnl))
            .ok_or_else(|| stats::overflow("dynamic hedge value"))?;
        values.push(value);
    }
    PortfolioValueSeries::new(spot.dates().to_vec(), values)
}

/// Value a portfolio under any hedge schedule.
pub fn value_portfolio(
    spot: &PriceSeries,
    futures: &PriceSeries,
    schedule: &HedgeSchedule,
) -> HedgingResult<PortfolioValueSeries> {
    let values = match schedule {
        HedgeSchedule::Unhedged => static_hedge_values(spot, futures, Decimal::ZERO),
        HedgeSchedule::Static(ratio) => static_hedge_values(spot, futures, *ratio),
        HedgeSchedule::Dynamic(ratios) => dynamic_hedge_values(spot, futures, ratios),
    }?;
    debug!(observations = values.len(), "valued hedged portfolio");
    Ok(values)
}
