use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::returns::{cumulative_return, ReturnFrequency};
use crate::error::HedgingError;
use crate::stats;
use crate::types::*;
use crate::HedgingResult;

/// Input for stand-alone risk metrics on a return list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricsInput {
    /// Periodic returns (as decimals)
    pub returns: Vec<Rate>,
    /// Confidence level for VaR/CVaR (e.g. 0.95)
    pub confidence_level: Rate,
    /// Observation frequency used for annualisation
    #[serde(default)]
    pub frequency: ReturnFrequency,
}

/// Output of stand-alone risk metrics.
///
/// VaR and CVaR are loss magnitudes: the negated return quantile and the
/// negated tail mean, so a loss-making tail reports a positive number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricsOutput {
    pub annualised_volatility: Rate,
    pub value_at_risk: Rate,
    pub conditional_value_at_risk: Rate,
    pub cumulative_return: Rate,
    pub max_drawdown: Rate,
    pub confidence_level: Rate,
    pub observations: usize,
}

/// Annualised volatility: sample standard deviation × √(periods per year).
pub fn annualised_volatility(returns: &[Rate], frequency: ReturnFrequency) -> HedgingResult<Rate> {
    if returns.len() < 2 {
        return Err(HedgingError::InsufficientData(format!(
            "volatility needs at least 2 returns, got {}",
            returns.len()
        )));
    }
    let std_dev = stats::sample_std_dev(returns)?;
    stats::mul(
        std_dev,
        stats::sqrt_decimal(frequency.periods_per_year()),
        "volatility",
    )
}

/// Daily-data volatility (252 trading days).
pub fn volatility(returns: &[Rate]) -> HedgingResult<Rate> {
    annualised_volatility(returns, ReturnFrequency::Daily)
}

/// The return at the `(1 - confidence)` quantile, before negation.
fn var_threshold(returns: &[Rate], confidence_level: Rate) -> HedgingResult<Rate> {
    validate_confidence(confidence_level)?;
    if returns.is_empty() {
        return Err(HedgingError::InsufficientData(
            "VaR needs at least 1 return".into(),
        ));
    }
    let mut sorted = returns.to_vec();
    sorted.sort();
    stats::percentile_sorted(&sorted, Decimal::ONE - confidence_level)
        .ok_or_else(|| stats::overflow("value_at_risk"))
}

/// Historical VaR with linear interpolation between order statistics,
/// reported as a loss magnitude.
pub fn value_at_risk(returns: &[Rate], confidence_level: Rate) -> HedgingResult<Rate> {
    Ok(-var_threshold(returns, confidence_level)?)
}

/// Expected shortfall: negated mean of returns at or below the VaR
/// threshold. Falls back to VaR when the tail is empty.
pub fn conditional_value_at_risk(returns: &[Rate], confidence_level: Rate) -> HedgingResult<Rate> {
    let threshold = var_threshold(returns, confidence_level)?;
    let tail: Vec<Rate> = returns.iter().copied().filter(|r| *r <= threshold).collect();
    if tail.is_empty() {
        return Ok(-threshold);
    }
    Ok(-stats::mean(&tail)?)
}

/// Largest peak-to-trough decline of a value series, as a fraction of the
/// running peak. Non-positive peaks are skipped.
pub fn max_drawdown(values: &[Decimal]) -> HedgingResult<Rate> {
    let mut peak: Option<Decimal> = None;
    let mut max_dd = Decimal::ZERO;

    for v in values {
        let p = match peak {
            Some(p) if p >= *v => p,
            _ => {
                peak = Some(*v);
                *v
            }
        };
        if p > Decimal::ZERO {
            let fall = p.checked_sub(*v).ok_or_else(|| stats::overflow("max_drawdown"))?;
            let dd = stats::div(fall, p, "max_drawdown")?;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    Ok(max_dd)
}

fn validate_confidence(confidence_level: Rate) -> HedgingResult<()> {
    if confidence_level <= Decimal::ZERO || confidence_level >= Decimal::ONE {
        return Err(HedgingError::InvalidInput {
            field: "confidence_level".into(),
            reason: "Confidence level must be between 0 and 1 (exclusive)".into(),
        });
    }
    Ok(())
}

/// Calculate volatility, VaR, CVaR, compounded return and drawdown for a
/// return list.
pub fn calculate_risk_metrics(
    input: &RiskMetricsInput,
) -> HedgingResult<ComputationOutput<RiskMetricsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let annualised_volatility = annualised_volatility(&input.returns, input.frequency)?;
    let value_at_risk = value_at_risk(&input.returns, input.confidence_level)?;
    let conditional_value_at_risk =
        conditional_value_at_risk(&input.returns, input.confidence_level)?;

    // Drawdown on the compounded growth path starting at 1
    let mut growth = Vec::with_capacity(input.returns.len() + 1);
    growth.push(Decimal::ONE);
    for r in &input.returns {
        let last = growth.last().copied().unwrap_or(Decimal::ONE);
        growth.push(stats::mul(last, Decimal::ONE + r, "growth path")?);
    }
    let max_drawdown = max_drawdown(&growth)?;

    if value_at_risk < Decimal::ZERO {
        warnings.push(
            "VaR quantile is a gain; no loss is expected at this confidence level".into(),
        );
    }

    debug!(
        observations = input.returns.len(),
        %value_at_risk,
        %conditional_value_at_risk,
        "calculated risk metrics"
    );

    let output = RiskMetricsOutput {
        annualised_volatility,
        value_at_risk,
        conditional_value_at_risk,
        cumulative_return: cumulative_return(&input.returns)?,
        max_drawdown,
        confidence_level: input.confidence_level,
        observations: input.returns.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Historical Risk Metrics (Volatility, VaR, CVaR, Drawdown)",
        &serde_json::json!({
            "observations": input.returns.len(),
            "confidence_level": input.confidence_level.to_string(),
            "frequency": format!("{:?}", input.frequency),
            "var_sign": "positive = loss",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_returns() -> Vec<Decimal> {
        vec![
            dec!(0.01),
            dec!(-0.02),
            dec!(0.015),
            dec!(0.003),
            dec!(-0.01),
            dec!(0.02),
            dec!(0.004),
            dec!(-0.15),
            dec!(0.012),
            dec!(0.006),
        ]
    }

    #[test]
    fn test_volatility_annualised() {
        let r = sample_returns();
        let vol = volatility(&r).unwrap();
        let expected = stats::sample_std_dev(&r).unwrap() * stats::sqrt_decimal(dec!(252));
        assert_eq!(vol, expected);
        assert!(vol > Decimal::ZERO);
    }

    #[test]
    fn test_volatility_empty_is_insufficient() {
        assert!(matches!(
            volatility(&[]),
            Err(HedgingError::InsufficientData(_))
        ));
        assert!(volatility(&[dec!(0.01)]).is_err());
    }

    #[test]
    fn test_var_interpolated() {
        // Sorted: -0.15, -0.02, -0.01, 0.003, ... ; rank 0.05 * 9 = 0.45
        // threshold = -0.15 + 0.45 * (-0.02 - -0.15) = -0.0915
        let var = value_at_risk(&sample_returns(), dec!(0.95)).unwrap();
        assert_eq!(var, dec!(0.0915));
    }

    #[test]
    fn test_cvar_at_least_var_with_outlier() {
        let r = sample_returns();
        let var = value_at_risk(&r, dec!(0.95)).unwrap();
        let cvar = conditional_value_at_risk(&r, dec!(0.95)).unwrap();
        // Only the -0.15 outlier is at or below the threshold
        assert_eq!(cvar, dec!(0.15));
        assert!(cvar >= var);
    }

    #[test]
    fn test_cvar_all_equal_returns_equals_var() {
        let r = vec![dec!(0.01); 5];
        let var = value_at_risk(&r, dec!(0.95)).unwrap();
        let cvar = conditional_value_at_risk(&r, dec!(0.95)).unwrap();
        assert_eq!(var, dec!(-0.01));
        assert_eq!(cvar, var);
    }

    #[test]
    fn test_invalid_confidence() {
        assert!(value_at_risk(&sample_returns(), dec!(1)).is_err());
        assert!(conditional_value_at_risk(&sample_returns(), dec!(0)).is_err());
    }

    #[test]
    fn test_max_drawdown() {
        let values = [dec!(100), dec!(110), dec!(88), dec!(95), dec!(120)];
        assert_eq!(max_drawdown(&values).unwrap(), dec!(0.2));
        assert_eq!(
            max_drawdown(&[dec!(1), dec!(2), dec!(3)]).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_calculate_risk_metrics_envelope() {
        let input = RiskMetricsInput {
            returns: sample_returns(),
            confidence_level: dec!(0.95),
            frequency: ReturnFrequency::Daily,
        };
        let out = calculate_risk_metrics(&input).unwrap();
        assert_eq!(out.result.observations, 10);
        assert!(out.result.max_drawdown > dec!(0.14));
        assert!(out.warnings.is_empty());
    }
}
