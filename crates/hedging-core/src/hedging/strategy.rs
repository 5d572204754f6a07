use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cost::estimate_hedge_cost;
use super::returns::{calculate_returns, cumulative_return, ReturnFrequency};
use super::risk;
use super::valuation::{value_portfolio, HedgeSchedule};
use crate::error::HedgingError;
use crate::market_data::{PortfolioValueSeries, PriceSeries};
use crate::types::{Price, Rate};
use crate::HedgingResult;

// ---------------------------------------------------------------------------
// Strategy set
// ---------------------------------------------------------------------------

/// The fixed set of compared hedging strategies, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Spot exposure only.
    NoHedge,
    /// Static 1:1 hedge with the near-maturity contract.
    NaiveHedge,
    /// Static hedge at the configured ratio with the near-maturity contract.
    FixedHedge,
    /// Rolling minimum-variance ratio, valued by accumulating daily P&L.
    MinimumVarianceHedge,
    /// Static 1:1 hedge with the basis-maturity contract.
    BasisRiskHedge,
}

/// Which futures column a strategy trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeInstrument {
    None,
    NearMaturity,
    BasisMaturity,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::NoHedge,
        StrategyKind::NaiveHedge,
        StrategyKind::FixedHedge,
        StrategyKind::MinimumVarianceHedge,
        StrategyKind::BasisRiskHedge,
    ];

    /// Display name used in performance tables.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::NoHedge => "No Hedge",
            StrategyKind::NaiveHedge => "Naive Hedge",
            StrategyKind::FixedHedge => "Fixed Hedge",
            StrategyKind::MinimumVarianceHedge => "Minimum-Variance Hedge",
            StrategyKind::BasisRiskHedge => "Basis-Risk Hedge",
        }
    }

    pub fn instrument(&self) -> HedgeInstrument {
        match self {
            StrategyKind::NoHedge => HedgeInstrument::None,
            StrategyKind::BasisRiskHedge => HedgeInstrument::BasisMaturity,
            _ => HedgeInstrument::NearMaturity,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyKind {
    type Err = HedgingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "no_hedge" | "none" => Ok(StrategyKind::NoHedge),
            "naive_hedge" | "naive" => Ok(StrategyKind::NaiveHedge),
            "fixed_hedge" | "fixed_ratio_hedge" | "fixed" => Ok(StrategyKind::FixedHedge),
            "minimum_variance_hedge" | "min_variance" | "minimum_variance" => {
                Ok(StrategyKind::MinimumVarianceHedge)
            }
            "basis_risk_hedge" | "basis_risk" | "basis" => Ok(StrategyKind::BasisRiskHedge),
            _ => Err(HedgingError::InvalidInput {
                field: "strategy".into(),
                reason: format!(
                    "Unknown strategy '{s}'. Use: no_hedge, naive_hedge, fixed_hedge, \
                     minimum_variance_hedge, basis_risk_hedge"
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-strategy result
// ---------------------------------------------------------------------------

/// Performance of one strategy over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub portfolio_values: PortfolioValueSeries,
    /// Compounded return of the portfolio value series
    pub cumulative_return: Rate,
    /// Undefined with fewer than 2 returns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_volatility: Option<Rate>,
    /// Loss magnitude at the configured confidence level
    pub value_at_risk: Rate,
    /// Mean tail loss magnitude at the configured confidence level
    pub conditional_value_at_risk: Rate,
    pub estimated_cost: Price,
    pub max_drawdown: Rate,
    /// 1 - Var(hedged returns) / Var(unhedged returns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hedge_effectiveness: Option<Rate>,
}

/// Value one strategy and compute its risk/return figures.
pub fn evaluate_strategy(
    kind: StrategyKind,
    spot: &PriceSeries,
    futures: &PriceSeries,
    schedule: &HedgeSchedule,
    confidence_level: Rate,
    frequency: ReturnFrequency,
) -> HedgingResult<StrategyResult> {
    let portfolio_values = value_portfolio(spot, futures, schedule)?;
    let returns = calculate_returns(&portfolio_values)?;
    let r = returns.values();

    let estimated_cost = match kind.instrument() {
        HedgeInstrument::None => Decimal::ZERO,
        _ => estimate_hedge_cost(futures, schedule)?,
    };

    // A single return still yields every other figure
    let annual_volatility = match risk::annualised_volatility(r, frequency) {
        Ok(vol) => Some(vol),
        Err(HedgingError::InsufficientData(reason)) => {
            debug!(strategy = %kind, %reason, "annual volatility undefined");
            None
        }
        Err(e) => return Err(e),
    };

    let result = StrategyResult {
        cumulative_return: cumulative_return(r)?,
        annual_volatility,
        value_at_risk: risk::value_at_risk(r, confidence_level)?,
        conditional_value_at_risk: risk::conditional_value_at_risk(r, confidence_level)?,
        estimated_cost,
        max_drawdown: risk::max_drawdown(portfolio_values.values())?,
        hedge_effectiveness: None,
        portfolio_values,
    };

    debug!(
        strategy = %kind,
        cumulative_return = %result.cumulative_return,
        annual_volatility = ?result.annual_volatility,
        "evaluated strategy"
    );
    Ok(result)
}
