use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::returns::calculate_returns;
use crate::error::HedgingError;
use crate::market_data::{HedgeRatioSeries, PriceSeries, ReturnSeries};
use crate::stats;
use crate::types::*;
use crate::HedgingResult;

/// How slots before the first full rolling window are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillPolicy {
    /// Copy the first computed ratio back to index 0. Uses a later
    /// observation for earlier dates, so it is not causal.
    #[default]
    Backward,
    /// Leave early slots at zero (unhedged until the window fills).
    Zero,
    /// Estimate early slots from the shorter trailing window `[0, i)`.
    Expanding,
}

/// Minimum-variance ratio for one window: `cov(spot, futures) / var(futures)`.
///
/// Zero when the futures window has no variance or the spot window has no
/// dispersion. Both moments are taken about the window means.
pub fn window_ratio(spot: &[Rate], futures: &[Rate]) -> HedgingResult<HedgeRatio> {
    let n = spot.len().min(futures.len());
    if n < 2 {
        return Ok(Decimal::ZERO);
    }
    let (spot, futures) = (&spot[..n], &futures[..n]);

    let futures_var = stats::sample_variance(futures)?;
    if futures_var <= Decimal::ZERO || stats::sample_std_dev(spot)?.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let cov = stats::sample_covariance(spot, futures)?;
    stats::div(cov, futures_var, "hedge ratio")
}

/// Rolling minimum-variance hedge ratios over aligned return series.
///
/// Slot `i >= window` uses the trailing observations `[i - window, i)`;
/// earlier slots are filled according to `policy`. A window of zero, or a
/// series with no full window, leaves every slot at zero under `Backward`
/// and `Zero`.
pub fn rolling_min_variance_ratios(
    spot_returns: &ReturnSeries,
    futures_returns: &ReturnSeries,
    window: usize,
    policy: BackfillPolicy,
) -> HedgingResult<HedgeRatioSeries> {
    if !spot_returns.shares_index(futures_returns) {
        return Err(HedgingError::InvalidInput {
            field: "futures_returns".into(),
            reason: "spot and futures returns must share the same dates".into(),
        });
    }

    let spot = spot_returns.values();
    let futures = futures_returns.values();
    let n = spot.len();

    let mut ratios: Vec<Option<HedgeRatio>> = vec![None; n];
    if window > 0 {
        for i in window..n {
            ratios[i] = Some(window_ratio(
                &spot[i - window..i],
                &futures[i - window..i],
            )?);
        }
    }

    let first_defined = ratios.iter().position(Option::is_some);
    if first_defined.is_none() {
        warn!(
            observations = n,
            window,
            "rolling window never fills; early ratios use the fallback policy"
        );
    }

    let filled: Vec<HedgeRatio> = match policy {
        BackfillPolicy::Backward => {
            let seed = first_defined
                .and_then(|idx| ratios[idx])
                .unwrap_or(Decimal::ZERO);
            ratios.iter().map(|r| r.unwrap_or(seed)).collect()
        }
        BackfillPolicy::Zero => ratios.iter().map(|r| r.unwrap_or(Decimal::ZERO)).collect(),
        BackfillPolicy::Expanding => ratios
            .iter()
            .enumerate()
            .map(|(i, r)| match r {
                Some(v) => Ok(*v),
                None if i >= 2 => window_ratio(&spot[..i], &futures[..i]),
                None => Ok(Decimal::ZERO),
            })
            .collect::<HedgingResult<_>>()?,
    };

    debug!(
        observations = n,
        window,
        ?policy,
        first_defined = ?first_defined,
        "rolling minimum-variance hedge ratios"
    );

    HedgeRatioSeries::new(spot_returns.dates().to_vec(), filled)
}

/// Input for a stand-alone minimum-variance hedge ratio estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinVarianceInput {
    pub spot: PriceSeries,
    pub futures: PriceSeries,
    pub rolling_window: usize,
    #[serde(default)]
    pub backfill_policy: BackfillPolicy,
}

/// Output of a stand-alone minimum-variance hedge ratio estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinVarianceOutput {
    /// Ratio over the whole sample (single window covering every return)
    pub full_sample_ratio: HedgeRatio,
    pub mean_ratio: HedgeRatio,
    pub latest_ratio: HedgeRatio,
    /// Slots computed from a full window, before any backfill
    pub full_window_observations: usize,
    pub ratios: HedgeRatioSeries,
}

/// Estimate the rolling minimum-variance hedge ratio series from prices.
pub fn estimate_min_variance_ratios(
    input: &MinVarianceInput,
) -> HedgingResult<ComputationOutput<MinVarianceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if !input.spot.shares_index(&input.futures) {
        return Err(HedgingError::InvalidInput {
            field: "futures".into(),
            reason: "spot and futures prices must share the same dates".into(),
        });
    }

    let spot_returns = calculate_returns(&input.spot)?;
    let futures_returns = calculate_returns(&input.futures)?;
    let n = spot_returns.len();

    if input.rolling_window == 0 || input.rolling_window >= n {
        warnings.push(format!(
            "Rolling window {} needs at least {} returns, have {n}; ratios fall back to the {:?} policy",
            input.rolling_window,
            input.rolling_window + 1,
            input.backfill_policy
        ));
    }

    let ratios = rolling_min_variance_ratios(
        &spot_returns,
        &futures_returns,
        input.rolling_window,
        input.backfill_policy,
    )?;

    let output = MinVarianceOutput {
        full_sample_ratio: window_ratio(spot_returns.values(), futures_returns.values())?,
        mean_ratio: stats::mean(ratios.values())?,
        latest_ratio: ratios.last().map(|(_, r)| *r).unwrap_or(Decimal::ZERO),
        full_window_observations: if input.rolling_window == 0 {
            0
        } else {
            n.saturating_sub(input.rolling_window)
        },
        ratios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rolling Minimum-Variance Hedge Ratio (cov(spot, futures) / var(futures))",
        &serde_json::json!({
            "observations": n,
            "rolling_window": input.rolling_window,
            "backfill_policy": input.backfill_policy,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn series(values: Vec<Decimal>) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates = (0..values.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        ReturnSeries::new(dates, values).unwrap()
    }

    #[test]
    fn test_window_ratio_proportional_series() {
        let f = [dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005)];
        let s: Vec<Decimal> = f.iter().map(|x| x * dec!(2)).collect();
        assert_eq!(window_ratio(&s, &f).unwrap(), dec!(2));
    }

    #[test]
    fn test_window_ratio_zero_futures_variance() {
        let f = [dec!(0.01); 4];
        let s = [dec!(0.01), dec!(0.02), dec!(-0.01), dec!(0.0)];
        assert_eq!(window_ratio(&s, &f).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_window_ratio_flat_spot() {
        let f = [dec!(0.01), dec!(0.02), dec!(-0.01)];
        let s = [dec!(0.0); 3];
        assert_eq!(window_ratio(&s, &f).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_window_ratio_constant_inexact_futures_returns() {
        let third = Decimal::ONE / dec!(3);
        let s = [dec!(0.01), dec!(0.02), dec!(-0.01), dec!(0.0)];
        assert_eq!(window_ratio(&s, &[third; 4]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_geometric_futures_prices_give_zero_ratios() {
        // Each futures step is x4/3, so every return is the inexact 1/3
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates: Vec<NaiveDate> = (0..6).map(|i| start + chrono::Days::new(i)).collect();
        let mut futures_prices = vec![dec!(3)];
        for _ in 1..6 {
            let last = *futures_prices.last().unwrap();
            futures_prices.push(last * dec!(4) / dec!(3));
        }
        let futures = PriceSeries::new(dates.clone(), futures_prices).unwrap();
        let spot = PriceSeries::new(
            dates,
            vec![dec!(100), dec!(102), dec!(101), dec!(104), dec!(103), dec!(106)],
        )
        .unwrap();

        let f = calculate_returns(&futures).unwrap();
        let s = calculate_returns(&spot).unwrap();
        let ratios = rolling_min_variance_ratios(&s, &f, 3, BackfillPolicy::Zero).unwrap();
        assert_eq!(ratios.len(), 5);
        assert!(ratios.values().iter().all(|r| r.is_zero()), "{:?}", ratios.values());
    }

    #[test]
    fn test_window_ratio_overflow_is_an_error() {
        let f = [dec!(-1), dec!(1000000000000000), dec!(-1)];
        let s = [dec!(0.01), dec!(0.02), dec!(-0.01)];
        assert!(window_ratio(&s, &f).is_err());
    }

    #[test]
    fn test_backward_fill_copies_first_ratio() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005), dec!(0.01)]);
        let s = f.map_values(|x| x * dec!(0.5));
        let ratios = rolling_min_variance_ratios(&s, &f, 3, BackfillPolicy::Backward).unwrap();
        assert_eq!(ratios.len(), 5);
        assert!(ratios.values().iter().all(|r| *r == dec!(0.5)));
    }

    #[test]
    fn test_zero_fill_is_causal() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005), dec!(0.01)]);
        let s = f.map_values(|x| x * dec!(0.5));
        let ratios = rolling_min_variance_ratios(&s, &f, 3, BackfillPolicy::Zero).unwrap();
        assert_eq!(
            ratios.values(),
            &[dec!(0), dec!(0), dec!(0), dec!(0.5), dec!(0.5)]
        );
    }

    #[test]
    fn test_expanding_fill_uses_available_history() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005), dec!(0.01)]);
        let s = f.map_values(|x| x * dec!(0.5));
        let ratios = rolling_min_variance_ratios(&s, &f, 4, BackfillPolicy::Expanding).unwrap();
        assert_eq!(
            ratios.values(),
            &[dec!(0), dec!(0), dec!(0.5), dec!(0.5), dec!(0.5)]
        );
    }

    #[test]
    fn test_window_never_fills_gives_zeros() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03)]);
        let s = f.map_values(|x| x * dec!(0.5));
        let ratios = rolling_min_variance_ratios(&s, &f, 3, BackfillPolicy::Backward).unwrap();
        assert!(ratios.values().iter().all(|r| r.is_zero()));
    }

    #[test]
    fn test_window_of_one_is_zero() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03)]);
        let s = f.map_values(|x| x * dec!(0.5));
        let ratios = rolling_min_variance_ratios(&s, &f, 1, BackfillPolicy::Backward).unwrap();
        assert!(ratios.values().iter().all(|r| r.is_zero()));
    }

    #[test]
    fn test_misaligned_series_rejected() {
        let f = series(vec![dec!(0.01), dec!(-0.02), dec!(0.03)]);
        let s = series(vec![dec!(0.01), dec!(-0.02)]);
        assert!(rolling_min_variance_ratios(&s, &f, 1, BackfillPolicy::Zero).is_err());
    }

    #[test]
    fn test_estimate_warns_when_window_too_long() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates: Vec<NaiveDate> = (0..4).map(|i| start + chrono::Days::new(i)).collect();
        let input = MinVarianceInput {
            spot: PriceSeries::new(dates.clone(), vec![dec!(100), dec!(102), dec!(101), dec!(105)])
                .unwrap(),
            futures: PriceSeries::new(dates, vec![dec!(50), dec!(51), dec!(50), dec!(53)]).unwrap(),
            rolling_window: 20,
            backfill_policy: BackfillPolicy::Backward,
        };
        let out = estimate_min_variance_ratios(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.full_window_observations, 0);
        assert!(out.result.ratios.values().iter().all(|r| r.is_zero()));
        assert!(out.result.full_sample_ratio > Decimal::ZERO);
    }
}
