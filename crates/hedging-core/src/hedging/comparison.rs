use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use super::config::AnalysisConfig;
use super::hedge_ratio::rolling_min_variance_ratios;
use super::returns::calculate_returns;
use super::strategy::{evaluate_strategy, HedgeInstrument, StrategyKind, StrategyResult};
use super::valuation::HedgeSchedule;
use crate::error::HedgingError;
use crate::market_data::table::{DEFAULT_NEAR_COLUMN, FUTURES_PREFIX};
use crate::market_data::{HedgeRatioSeries, PriceSeries, PriceSeriesLoader, PriceTable};
use crate::stats;
use crate::types::*;
use crate::HedgingResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Category of a non-fatal condition raised during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The date filter left no rows; no strategy was evaluated.
    EmptyRange,
    /// The requested basis column is missing; the near column was used.
    BasisFallback,
    /// Too few returns for a full rolling window.
    WindowNotFilled,
    /// One strategy could not be evaluated; siblings are unaffected.
    StrategyFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Completed { result: StrategyResult },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: StrategyKind,
    pub name: String,
    #[serde(flatten)]
    pub outcome: StrategyOutcome,
}

/// One row of the comparison table. Failed strategies are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub strategy: String,
    pub cumulative_return: Rate,
    pub annual_volatility: Option<Rate>,
    pub value_at_risk: Rate,
    pub conditional_value_at_risk: Rate,
    pub estimated_cost: Price,
    pub max_drawdown: Rate,
    pub hedge_effectiveness: Option<Rate>,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub near_column: String,
    pub basis_column: String,
    pub observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
    pub performance: Vec<PerformanceRow>,
    pub strategies: Vec<StrategyReport>,
    /// Rolling ratios used by the minimum-variance strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_variance_ratios: Option<HedgeRatioSeries>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisBundle {
    /// True when the date filter left nothing to analyse.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn report(&self, kind: StrategyKind) -> Option<&StrategyReport> {
        self.strategies.iter().find(|r| r.strategy == kind)
    }

    /// Result of a strategy that completed.
    pub fn result(&self, kind: StrategyKind) -> Option<&StrategyResult> {
        match &self.report(kind)?.outcome {
            StrategyOutcome::Completed { result } => Some(result),
            StrategyOutcome::Failed { .. } => None,
        }
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Resolve the near-maturity column: the configured one (must exist), else
/// `Futures_Price_Near`, else the first futures column.
pub fn resolve_near_column(table: &PriceTable, config: &AnalysisConfig) -> HedgingResult<String> {
    if let Some(name) = &config.near_maturity_column {
        if !table.has_column(name) {
            return Err(HedgingError::MissingColumn {
                column: name.clone(),
            });
        }
        return Ok(name.clone());
    }
    if table.has_column(DEFAULT_NEAR_COLUMN) {
        return Ok(DEFAULT_NEAR_COLUMN.to_string());
    }
    table
        .futures_columns()
        .first()
        .map(|c| c.to_string())
        .ok_or_else(|| HedgingError::MissingColumn {
            column: format!("{FUTURES_PREFIX}*"),
        })
}

/// Compare the five hedging strategies on a validated price table.
///
/// Only configuration and column errors are returned as `Err`. An empty date
/// range, an unfilled rolling window, a missing basis column and individual
/// strategy failures are reported as diagnostics inside the bundle.
pub fn run_analysis(
    table: &PriceTable,
    config: &AnalysisConfig,
) -> HedgingResult<ComputationOutput<AnalysisBundle>> {
    let start = Instant::now();
    let mut warnings = config.validate()?;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let near_column = resolve_near_column(table, config)?;
    let basis_column = match &config.basis_maturity_column {
        Some(name) if table.has_column(name) => name.clone(),
        Some(name) => {
            let message = format!(
                "Basis column '{name}' not found; using near-maturity column '{near_column}'"
            );
            warn!("{message}");
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::BasisFallback,
                strategy: Some(StrategyKind::BasisRiskHedge),
                message,
            });
            near_column.clone()
        }
        None => near_column.clone(),
    };

    info!(
        rows = table.len(),
        near = %near_column,
        basis = %basis_column,
        fixed_hedge_ratio = %config.fixed_hedge_ratio,
        rolling_window = config.rolling_window,
        "running hedging analysis"
    );

    let filtered = match table.filter_range(config.start_date, config.end_date) {
        Ok(t) => t,
        Err(e @ HedgingError::EmptyRange { .. }) => {
            warn!("{e}");
            warnings.push(format!("No data available for the selected date range: {e}"));
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::EmptyRange,
                strategy: None,
                message: e.to_string(),
            });
            let bundle = AnalysisBundle {
                near_column,
                basis_column,
                observations: 0,
                first_date: None,
                last_date: None,
                performance: Vec::new(),
                strategies: Vec::new(),
                min_variance_ratios: None,
                diagnostics,
            };
            return Ok(finish(start, config, warnings, bundle));
        }
        Err(e) => return Err(e),
    };

    let spot = filtered.spot()?;
    let near = filtered.series(&near_column)?;
    let basis = filtered.series(&basis_column)?;

    let min_variance_ratios = match min_variance_schedule(&spot, &near, config) {
        Ok(ratios) => Some(ratios),
        Err(e) => {
            warn!(error = %e, "minimum-variance ratios unavailable");
            None
        }
    };
    let returns = spot.len().saturating_sub(1);
    if returns <= config.rolling_window {
        let message = format!(
            "Rolling window {} needs at least {} returns, have {returns}; ratios use the {:?} fallback",
            config.rolling_window,
            config.rolling_window + 1,
            config.backfill_policy
        );
        warn!("{message}");
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::WindowNotFilled,
            strategy: Some(StrategyKind::MinimumVarianceHedge),
            message,
        });
    }

    let mut strategies = Vec::with_capacity(StrategyKind::ALL.len());
    for kind in StrategyKind::ALL {
        let futures = match kind.instrument() {
            HedgeInstrument::BasisMaturity => &basis,
            HedgeInstrument::None | HedgeInstrument::NearMaturity => &near,
        };
        let outcome = schedule_for(kind, config, min_variance_ratios.as_ref()).and_then(|schedule| {
            evaluate_strategy(
                kind,
                &spot,
                futures,
                &schedule,
                config.confidence_level,
                config.frequency,
            )
        });

        let outcome = match outcome {
            Ok(result) => StrategyOutcome::Completed { result },
            Err(e) => {
                warn!(strategy = %kind, error = %e, "strategy evaluation failed");
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::StrategyFailed,
                    strategy: Some(kind),
                    message: e.to_string(),
                });
                StrategyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        strategies.push(StrategyReport {
            strategy: kind,
            name: kind.label().to_string(),
            outcome,
        });
    }

    attach_hedge_effectiveness(&mut strategies);
    let performance = performance_table(&strategies);

    let bundle = AnalysisBundle {
        near_column,
        basis_column,
        observations: filtered.len(),
        first_date: filtered.dates().first().copied(),
        last_date: filtered.dates().last().copied(),
        performance,
        strategies,
        min_variance_ratios,
        diagnostics,
    };

    info!(
        observations = bundle.observations,
        completed = bundle.performance.len(),
        diagnostics = bundle.diagnostics.len(),
        "hedging analysis complete"
    );
    Ok(finish(start, config, warnings, bundle))
}

/// Load prices from `loader` and run the comparison.
pub fn run_analysis_from<L: PriceSeriesLoader + ?Sized>(
    loader: &L,
    config: &AnalysisConfig,
) -> HedgingResult<ComputationOutput<AnalysisBundle>> {
    let table = loader.load()?;
    run_analysis(&table, config)
}

fn min_variance_schedule(
    spot: &PriceSeries,
    near: &PriceSeries,
    config: &AnalysisConfig,
) -> HedgingResult<HedgeRatioSeries> {
    let spot_returns = calculate_returns(spot)?;
    let futures_returns = calculate_returns(near)?;
    rolling_min_variance_ratios(
        &spot_returns,
        &futures_returns,
        config.rolling_window,
        config.backfill_policy,
    )
}

fn schedule_for(
    kind: StrategyKind,
    config: &AnalysisConfig,
    min_variance_ratios: Option<&HedgeRatioSeries>,
) -> HedgingResult<HedgeSchedule> {
    match kind {
        StrategyKind::NoHedge => Ok(HedgeSchedule::Unhedged),
        StrategyKind::NaiveHedge | StrategyKind::BasisRiskHedge => {
            Ok(HedgeSchedule::Static(Decimal::ONE))
        }
        StrategyKind::FixedHedge => Ok(HedgeSchedule::Static(config.fixed_hedge_ratio)),
        StrategyKind::MinimumVarianceHedge => min_variance_ratios
            .cloned()
            .map(HedgeSchedule::Dynamic)
            .ok_or_else(|| {
                HedgingError::InsufficientData(
                    "minimum-variance ratios need at least 2 prices".into(),
                )
            }),
    }
}

/// Variance of the simple returns of a portfolio value series.
fn return_variance(result: &StrategyResult) -> Option<Decimal> {
    let returns = calculate_returns(&result.portfolio_values).ok()?;
    stats::sample_variance(returns.values()).ok()
}

fn attach_hedge_effectiveness(strategies: &mut [StrategyReport]) {
    let baseline = strategies
        .iter()
        .find(|r| r.strategy == StrategyKind::NoHedge)
        .and_then(|r| match &r.outcome {
            StrategyOutcome::Completed { result } => return_variance(result),
            StrategyOutcome::Failed { .. } => None,
        })
        .filter(|v| !v.is_zero());

    let Some(unhedged_var) = baseline else {
        return;
    };
    for report in strategies.iter_mut() {
        if let StrategyOutcome::Completed { result } = &mut report.outcome {
            result.hedge_effectiveness = return_variance(result)
                .and_then(|v| stats::div(v, unhedged_var, "hedge effectiveness").ok())
                .map(|share| Decimal::ONE - share);
        }
    }
}

fn performance_table(strategies: &[StrategyReport]) -> Vec<PerformanceRow> {
    strategies
        .iter()
        .filter_map(|report| match &report.outcome {
            StrategyOutcome::Completed { result } => Some(PerformanceRow {
                strategy: report.name.clone(),
                cumulative_return: result.cumulative_return,
                annual_volatility: result.annual_volatility,
                value_at_risk: result.value_at_risk,
                conditional_value_at_risk: result.conditional_value_at_risk,
                estimated_cost: result.estimated_cost,
                max_drawdown: result.max_drawdown,
                hedge_effectiveness: result.hedge_effectiveness,
            }),
            StrategyOutcome::Failed { .. } => None,
        })
        .collect()
}

fn finish(
    start: Instant,
    config: &AnalysisConfig,
    warnings: Vec<String>,
    bundle: AnalysisBundle,
) -> ComputationOutput<AnalysisBundle> {
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Hedging Strategy Comparison (No / Naive / Fixed / Minimum-Variance / Basis-Risk)",
        config,
        warnings,
        elapsed,
        bundle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::table::SPOT_COLUMN;
    use crate::market_data::PriceColumn;
    use rust_decimal_macros::dec;

    fn table(spot: Vec<Decimal>, near: Vec<Decimal>) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let dates = (0..spot.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        PriceTable::new(
            dates,
            vec![
                PriceColumn {
                    name: SPOT_COLUMN.into(),
                    values: spot,
                },
                PriceColumn {
                    name: DEFAULT_NEAR_COLUMN.into(),
                    values: near,
                },
            ],
        )
        .unwrap()
    }

    fn scenario() -> PriceTable {
        table(
            vec![dec!(100), dec!(102), dec!(101), dec!(105)],
            vec![dec!(50), dec!(51), dec!(50), dec!(53)],
        )
    }

    #[test]
    fn test_all_five_strategies_reported_in_order() {
        let out = run_analysis(&scenario(), &AnalysisConfig::default()).unwrap();
        let kinds: Vec<StrategyKind> = out.result.strategies.iter().map(|r| r.strategy).collect();
        assert_eq!(kinds, StrategyKind::ALL.to_vec());
    }

    #[test]
    fn test_fixed_and_naive_values() {
        let out = run_analysis(&scenario(), &AnalysisConfig::default()).unwrap();
        let fixed = out.result.result(StrategyKind::FixedHedge).unwrap();
        let naive = out.result.result(StrategyKind::NaiveHedge).unwrap();
        assert_eq!(fixed.portfolio_values.values()[3], dec!(103.5));
        assert_eq!(naive.portfolio_values.values()[3], dec!(102));
    }

    #[test]
    fn test_basis_defaults_to_near() {
        let out = run_analysis(&scenario(), &AnalysisConfig::default()).unwrap();
        let bundle = &out.result;
        assert_eq!(bundle.basis_column, DEFAULT_NEAR_COLUMN);
        assert_eq!(
            bundle.result(StrategyKind::BasisRiskHedge).unwrap().portfolio_values,
            bundle.result(StrategyKind::NaiveHedge).unwrap().portfolio_values
        );
    }

    #[test]
    fn test_missing_basis_column_falls_back() {
        let cfg = AnalysisConfig {
            basis_maturity_column: Some("Futures_Price_Far".into()),
            ..Default::default()
        };
        let out = run_analysis(&scenario(), &cfg).unwrap();
        assert_eq!(out.result.basis_column, DEFAULT_NEAR_COLUMN);
        assert!(out.result.has_diagnostic(DiagnosticKind::BasisFallback));
    }

    #[test]
    fn test_missing_near_column_is_fatal() {
        let cfg = AnalysisConfig {
            near_maturity_column: Some("Futures_Price_Mid".into()),
            ..Default::default()
        };
        let err = run_analysis(&scenario(), &cfg).unwrap_err();
        assert!(matches!(err, HedgingError::MissingColumn { column } if column == "Futures_Price_Mid"));
    }

    #[test]
    fn test_empty_range_is_not_an_error() {
        let cfg = AnalysisConfig {
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..Default::default()
        };
        let out = run_analysis(&scenario(), &cfg).unwrap();
        assert!(out.result.is_empty());
        assert!(out.result.performance.is_empty());
        assert!(out.result.has_diagnostic(DiagnosticKind::EmptyRange));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_window_not_filled_diagnostic() {
        let out = run_analysis(&scenario(), &AnalysisConfig::default()).unwrap();
        assert!(out.result.has_diagnostic(DiagnosticKind::WindowNotFilled));
        let ratios = out.result.min_variance_ratios.as_ref().unwrap();
        assert!(ratios.values().iter().all(|r| r.is_zero()));
    }

    #[test]
    fn test_zero_portfolio_value_isolated_to_one_strategy() {
        // Naive hedge value hits zero on day 2: 100 - (150 - 50) = 0
        let t = table(
            vec![dec!(100), dec!(100), dec!(100), dec!(101)],
            vec![dec!(50), dec!(150), dec!(60), dec!(55)],
        );
        let out = run_analysis(&t, &AnalysisConfig::default()).unwrap();
        let bundle = &out.result;
        assert!(matches!(
            bundle.report(StrategyKind::NaiveHedge).unwrap().outcome,
            StrategyOutcome::Failed { .. }
        ));
        assert!(bundle.result(StrategyKind::NoHedge).is_some());
        assert!(bundle.result(StrategyKind::FixedHedge).is_some());
        assert_eq!(bundle.performance.len(), 3);
        assert!(bundle.has_diagnostic(DiagnosticKind::StrategyFailed));
    }

    #[test]
    fn test_decimal_overflow_isolated_to_hedged_strategies() {
        // Naive value collapses to 1e-13 on day 2, so its next return is ~1e15
        let t = table(
            vec![dec!(100), dec!(100), dec!(100), dec!(100)],
            vec![dec!(50), dec!(149.9999999999999), dec!(50), dec!(50)],
        );
        let out = run_analysis(&t, &AnalysisConfig::default()).unwrap();
        let bundle = &out.result;
        for kind in [StrategyKind::NaiveHedge, StrategyKind::BasisRiskHedge] {
            match &bundle.report(kind).unwrap().outcome {
                StrategyOutcome::Failed { error } => {
                    assert!(error.contains("Decimal range"), "{error}")
                }
                other => panic!("{kind} should fail, got {other:?}"),
            }
        }
        assert!(bundle.result(StrategyKind::NoHedge).is_some());
        assert!(bundle.result(StrategyKind::FixedHedge).is_some());
        assert!(bundle.result(StrategyKind::MinimumVarianceHedge).is_some());
        assert_eq!(bundle.performance.len(), 3);
    }

    #[test]
    fn test_two_rows_report_every_strategy_without_volatility() {
        let t = table(vec![dec!(100), dec!(102)], vec![dec!(50), dec!(51)]);
        let out = run_analysis(&t, &AnalysisConfig::default()).unwrap();
        let bundle = &out.result;
        assert_eq!(bundle.performance.len(), 5);
        assert!(!bundle.has_diagnostic(DiagnosticKind::StrategyFailed));
        assert!(bundle.performance.iter().all(|row| row.annual_volatility.is_none()));
        let no_hedge = bundle.result(StrategyKind::NoHedge).unwrap();
        assert_eq!(no_hedge.cumulative_return, dec!(0.02));
        assert_eq!(no_hedge.value_at_risk, dec!(-0.02));
    }

    #[test]
    fn test_no_hedge_effectiveness_is_zero() {
        let out = run_analysis(&scenario(), &AnalysisConfig::default()).unwrap();
        let no_hedge = out.result.result(StrategyKind::NoHedge).unwrap();
        assert_eq!(no_hedge.hedge_effectiveness, Some(Decimal::ZERO));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let cfg = AnalysisConfig {
            confidence_level: dec!(1.2),
            ..Default::default()
        };
        assert!(run_analysis(&scenario(), &cfg).is_err());
    }
}
