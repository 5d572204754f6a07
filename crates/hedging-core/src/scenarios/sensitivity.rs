use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::HedgingError;
use crate::hedging::comparison::{run_analysis, StrategyOutcome};
use crate::hedging::config::AnalysisConfig;
use crate::hedging::strategy::{StrategyKind, StrategyResult};
use crate::market_data::PriceTable;
use crate::types::*;
use crate::HedgingResult;

/// Configuration field a sensitivity variable may sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    FixedHedgeRatio,
    ConfidenceLevel,
    RollingWindow,
}

impl SweepParameter {
    /// Copy of `config` with this parameter set to `value`.
    pub fn apply(&self, config: &AnalysisConfig, value: Decimal) -> HedgingResult<AnalysisConfig> {
        let mut cfg = config.clone();
        match self {
            SweepParameter::FixedHedgeRatio => cfg.fixed_hedge_ratio = value,
            SweepParameter::ConfidenceLevel => cfg.confidence_level = value,
            SweepParameter::RollingWindow => {
                if !value.fract().is_zero() {
                    return Err(HedgingError::InvalidInput {
                        field: "rolling_window".into(),
                        reason: format!("Rolling window must be a whole number, got {value}"),
                    });
                }
                cfg.rolling_window =
                    value
                        .to_usize()
                        .ok_or_else(|| HedgingError::InvalidInput {
                            field: "rolling_window".into(),
                            reason: format!("Rolling window must be non-negative, got {value}"),
                        })?;
            }
        }
        Ok(cfg)
    }

    /// Current value of this parameter in `config`.
    pub fn current(&self, config: &AnalysisConfig) -> Decimal {
        match self {
            SweepParameter::FixedHedgeRatio => config.fixed_hedge_ratio,
            SweepParameter::ConfidenceLevel => config.confidence_level,
            SweepParameter::RollingWindow => Decimal::from(config.rolling_window as u64),
        }
    }
}

impl FromStr for SweepParameter {
    type Err = HedgingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "fixed_hedge_ratio" | "hedge_ratio" | "ratio" => Ok(SweepParameter::FixedHedgeRatio),
            "confidence_level" | "confidence" => Ok(SweepParameter::ConfidenceLevel),
            "rolling_window" | "window" => Ok(SweepParameter::RollingWindow),
            _ => Err(HedgingError::InvalidInput {
                field: "variable".into(),
                reason: format!(
                    "Unknown variable '{s}'. Use: fixed_hedge_ratio, confidence_level, rolling_window"
                ),
            }),
        }
    }
}

/// Strategy figure read from each grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    CumulativeReturn,
    AnnualVolatility,
    #[default]
    ValueAtRisk,
    ConditionalValueAtRisk,
    EstimatedCost,
    MaxDrawdown,
    HedgeEffectiveness,
}

impl PerformanceMetric {
    pub fn extract(&self, result: &StrategyResult) -> HedgingResult<Decimal> {
        match self {
            PerformanceMetric::CumulativeReturn => Ok(result.cumulative_return),
            PerformanceMetric::AnnualVolatility => result.annual_volatility.ok_or_else(|| {
                HedgingError::InsufficientData("annual volatility needs at least 2 returns".into())
            }),
            PerformanceMetric::ValueAtRisk => Ok(result.value_at_risk),
            PerformanceMetric::ConditionalValueAtRisk => Ok(result.conditional_value_at_risk),
            PerformanceMetric::EstimatedCost => Ok(result.estimated_cost),
            PerformanceMetric::MaxDrawdown => Ok(result.max_drawdown),
            PerformanceMetric::HedgeEffectiveness => result.hedge_effectiveness.ok_or_else(|| {
                HedgingError::InsufficientData(
                    "hedge effectiveness undefined: unhedged return variance is zero".into(),
                )
            }),
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerformanceMetric::CumulativeReturn => "Cumulative Return",
            PerformanceMetric::AnnualVolatility => "Annual Volatility",
            PerformanceMetric::ValueAtRisk => "VaR",
            PerformanceMetric::ConditionalValueAtRisk => "CVaR",
            PerformanceMetric::EstimatedCost => "Estimated Cost",
            PerformanceMetric::MaxDrawdown => "Max Drawdown",
            PerformanceMetric::HedgeEffectiveness => "Hedge Effectiveness",
        };
        f.write_str(name)
    }
}

impl FromStr for PerformanceMetric {
    type Err = HedgingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cumulative_return" | "return" => Ok(PerformanceMetric::CumulativeReturn),
            "annual_volatility" | "volatility" => Ok(PerformanceMetric::AnnualVolatility),
            "value_at_risk" | "var" => Ok(PerformanceMetric::ValueAtRisk),
            "conditional_value_at_risk" | "cvar" => Ok(PerformanceMetric::ConditionalValueAtRisk),
            "estimated_cost" | "cost" => Ok(PerformanceMetric::EstimatedCost),
            "max_drawdown" | "drawdown" => Ok(PerformanceMetric::MaxDrawdown),
            "hedge_effectiveness" | "effectiveness" => Ok(PerformanceMetric::HedgeEffectiveness),
            _ => Err(HedgingError::InvalidInput {
                field: "metric".into(),
                reason: format!("Unknown metric '{s}'"),
            }),
        }
    }
}

/// Input for a one- or two-way sensitivity sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Base case configuration; swept fields are overridden per cell
    #[serde(default)]
    pub base_config: AnalysisConfig,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub metric: PerformanceMetric,
    /// Row variable
    pub variable_1: SensitivityVariable,
    /// Column variable; a one-way sweep when absent
    #[serde(default)]
    pub variable_2: Option<SensitivityVariable>,
}

/// Output of a sensitivity sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub strategy: StrategyKind,
    pub metric: PerformanceMetric,
    pub variable_1_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_2_name: Option<String>,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    /// matrix[i][j] = metric at variable_1_values[i], variable_2_values[j].
    /// One-way sweeps have a single column.
    pub matrix: Vec<Vec<Decimal>>,
    pub base_case_value: Decimal,
    /// Cell closest to the base configuration (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> HedgingResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(HedgingError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(HedgingError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }
    Ok(values)
}

fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a sensitivity grid with a caller-supplied cell function.
///
/// `eval_fn` receives the configuration for one cell. Cells whose
/// evaluation fails are recorded as zero with a warning.
pub fn evaluate_sensitivity<F>(
    input: &SensitivityInput,
    eval_fn: F,
) -> HedgingResult<ComputationOutput<SensitivityOutput>>
where
    F: Fn(&AnalysisConfig) -> HedgingResult<Decimal>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let param_1: SweepParameter = input.variable_1.name.parse()?;
    let param_2: Option<SweepParameter> = input
        .variable_2
        .as_ref()
        .map(|v| v.name.parse())
        .transpose()?;
    if param_2 == Some(param_1) {
        return Err(HedgingError::InvalidInput {
            field: "variable_2".into(),
            reason: "Sensitivity variables must be different".into(),
        });
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = match &input.variable_2 {
        Some(v) => generate_sweep_values(v)?,
        None => Vec::new(),
    };

    let mut cell = |cfg: HedgingResult<AnalysisConfig>, label: String| -> Decimal {
        match cfg.and_then(|c| eval_fn(&c)) {
            Ok(val) => val,
            Err(e) => {
                warn!(cell = %label, error = %e, "sensitivity cell failed");
                warnings.push(format!("Evaluation failed at {label}: {e}"));
                Decimal::ZERO
            }
        }
    };

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let row = match param_2 {
            None => vec![cell(param_1.apply(&input.base_config, *v1), format!("({v1})"))],
            Some(p2) => v2_values
                .iter()
                .map(|v2| {
                    let cfg = param_1
                        .apply(&input.base_config, *v1)
                        .and_then(|c| p2.apply(&c, *v2));
                    cell(cfg, format!("({v1}, {v2})"))
                })
                .collect(),
        };
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, param_1.current(&input.base_config));
    let base_col = param_2
        .map(|p2| closest_index(&v2_values, p2.current(&input.base_config)))
        .unwrap_or(0);
    let base_case_value = matrix
        .get(base_row)
        .and_then(|row| row.get(base_col))
        .copied()
        .unwrap_or(Decimal::ZERO);

    debug!(
        rows = v1_values.len(),
        cols = v2_values.len().max(1),
        failed = warnings.len(),
        "evaluated sensitivity grid"
    );

    let output = SensitivityOutput {
        strategy: input.strategy,
        metric: input.metric,
        variable_1_name: input.variable_1.name.clone(),
        variable_2_name: input.variable_2.as_ref().map(|v| v.name.clone()),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Hedging Strategy Sensitivity Grid",
        &serde_json::json!({
            "strategy": input.strategy,
            "metric": input.metric,
            "variable_1": input.variable_1.name,
            "variable_2": input.variable_2.as_ref().map(|v| &v.name),
            "base_config": input.base_config,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Sweep the comparison engine over `table` and read one metric of one
/// strategy per cell.
pub fn run_sensitivity(
    table: &PriceTable,
    input: &SensitivityInput,
) -> HedgingResult<ComputationOutput<SensitivityOutput>> {
    evaluate_sensitivity(input, |cfg| {
        let analysis = run_analysis(table, cfg)?;
        let report = analysis.result.report(input.strategy).ok_or_else(|| {
            HedgingError::InsufficientData("no observations in the selected date range".into())
        })?;
        match &report.outcome {
            StrategyOutcome::Completed { result } => input.metric.extract(result),
            StrategyOutcome::Failed { error } => Err(HedgingError::InsufficientData(error.clone())),
        }
    })
}
