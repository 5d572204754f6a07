use rust_decimal::Decimal;
use tracing::debug;

use super::valuation::HedgeSchedule;
use crate::error::HedgingError;
use crate::market_data::PriceSeries;
use crate::stats;
use crate::types::Price;
use crate::HedgingResult;

/// Mean ratio-weighted absolute futures move:
/// `mean(|ratio[i]| * |futures[i] - futures[i-1]|)`. Zero when unhedged.
pub fn estimate_hedge_cost(futures: &PriceSeries, schedule: &HedgeSchedule) -> HedgingResult<Price> {
    if matches!(schedule, HedgeSchedule::Unhedged) {
        return Ok(Decimal::ZERO);
    }
    let f = futures.values();
    if f.len() < 2 {
        return Err(HedgingError::InsufficientData(format!(
            "hedge cost needs at least 2 futures prices, got {}",
            f.len()
        )));
    }
    if let HedgeSchedule::Dynamic(ratios) = schedule {
        if ratios.len() != f.len() - 1 {
            return Err(HedgingError::InvalidInput {
                field: "ratios".into(),
                reason: format!(
                    "expected {} ratios for {} futures prices, got {}",
                    f.len() - 1,
                    f.len(),
                    ratios.len()
                ),
            });
        }
    }

    let weighted_moves = (1..f.len())
        .map(|i| {
            stats::mul(
                schedule.ratio_for_step(i).abs(),
                (f[i] - f[i - 1]).abs(),
                "hedge cost",
            )
        })
        .collect::<HedgingResult<Vec<_>>>()?;
    let cost = stats::mean(&weighted_moves)?;
    debug!(%cost, steps = f.len() - 1, "estimated hedge cost");
    Ok(cost)
}
