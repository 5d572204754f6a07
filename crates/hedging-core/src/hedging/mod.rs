//! Hedging analytics: returns, risk, hedge ratios, portfolio valuation,
//! cost and the strategy comparison engine.

pub mod comparison;
pub mod config;
pub mod cost;
pub mod hedge_ratio;
pub mod returns;
pub mod risk;
pub mod strategy;
pub mod valuation;

pub use comparison::{
    resolve_near_column, run_analysis, run_analysis_from, AnalysisBundle, Diagnostic,
    DiagnosticKind, PerformanceRow, StrategyOutcome, StrategyReport,
};
pub use config::AnalysisConfig;
pub use cost::estimate_hedge_cost;
pub use hedge_ratio::{
    estimate_min_variance_ratios, rolling_min_variance_ratios, BackfillPolicy, MinVarianceInput,
    MinVarianceOutput,
};
pub use returns::{calculate_returns, cumulative_return, ReturnFrequency};
pub use risk::{calculate_risk_metrics, RiskMetricsInput, RiskMetricsOutput};
pub use strategy::{evaluate_strategy, HedgeInstrument, StrategyKind, StrategyResult};
pub use valuation::{value_portfolio, HedgeSchedule};
