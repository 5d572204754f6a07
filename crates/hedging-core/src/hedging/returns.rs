use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HedgingError;
use crate::market_data::{PriceSeries, ReturnSeries};
use crate::stats;
use crate::types::Rate;
use crate::HedgingResult;

/// Frequency of price observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl ReturnFrequency {
    /// Number of periods in a year for annualisation
    pub fn periods_per_year(&self) -> Decimal {
        match self {
            ReturnFrequency::Daily => dec!(252),
            ReturnFrequency::Weekly => dec!(52),
            ReturnFrequency::Monthly => dec!(12),
            ReturnFrequency::Quarterly => dec!(4),
            ReturnFrequency::Annual => dec!(1),
        }
    }
}

/// Simple period returns: `r[t] = p[t] / p[t-1] - 1`.
///
/// The result is keyed by the later date of each pair, so it is one
/// observation shorter than `prices`.
pub fn calculate_returns(prices: &PriceSeries) -> HedgingResult<ReturnSeries> {
    let n = prices.len();
    if n < 2 {
        return Err(HedgingError::InsufficientData(format!(
            "returns need at least 2 prices, got {n}"
        )));
    }

    let dates = prices.dates();
    let values = prices.values();
    let mut returns = Vec::with_capacity(n - 1);
    for i in 1..n {
        let prev = values[i - 1];
        if prev.is_zero() {
            return Err(HedgingError::DivisionByZero {
                context: format!("return on {} (previous value is zero)", dates[i]),
            });
        }
        let growth = stats::div(values[i], prev, &format!("return on {}", dates[i]))?;
        returns.push(growth - Decimal::ONE);
    }

    debug!(observations = returns.len(), "calculated period returns");
    ReturnSeries::new(dates[1..].to_vec(), returns)
}

/// Compounded return over the whole series: `prod(1 + r) - 1`.
pub fn cumulative_return(returns: &[Rate]) -> HedgingResult<Rate> {
    let growth = returns.iter().try_fold(Decimal::ONE, |acc, r| {
        stats::mul(acc, Decimal::ONE + r, "cumulative return")
    })?;
    Ok(growth - Decimal::ONE)
}
