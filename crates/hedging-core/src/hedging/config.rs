use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::hedge_ratio::BackfillPolicy;
use super::returns::ReturnFrequency;
use crate::error::HedgingError;
use crate::types::{HedgeRatio, Rate};
use crate::HedgingResult;

/// Parameters of one analysis run. Every field has a default, so a partial
/// JSON or YAML document deserializes into a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Ratio used by the fixed-ratio strategy, in [0, 2]
    #[serde(default = "default_fixed_hedge_ratio")]
    pub fixed_hedge_ratio: HedgeRatio,
    /// VaR/CVaR confidence level, in (0, 1)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: Rate,
    /// Trailing window (in returns) of the minimum-variance estimator
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    /// Futures column hedged by the naive, fixed and minimum-variance
    /// strategies. Defaults to `Futures_Price_Near`, else the first futures
    /// column.
    #[serde(default)]
    pub near_maturity_column: Option<String>,
    /// Futures column hedged by the basis-risk strategy; falls back to the
    /// near column when absent from the data.
    #[serde(default)]
    pub basis_maturity_column: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub backfill_policy: BackfillPolicy,
    #[serde(default)]
    pub frequency: ReturnFrequency,
}

fn default_fixed_hedge_ratio() -> HedgeRatio {
    dec!(0.5)
}

fn default_confidence_level() -> Rate {
    dec!(0.95)
}

fn default_rolling_window() -> usize {
    20
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fixed_hedge_ratio: default_fixed_hedge_ratio(),
            confidence_level: default_confidence_level(),
            rolling_window: default_rolling_window(),
            near_maturity_column: None,
            basis_maturity_column: None,
            start_date: None,
            end_date: None,
            backfill_policy: BackfillPolicy::default(),
            frequency: ReturnFrequency::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reject values outside the hard bounds; return warnings for values
    /// outside the recommended operating ranges.
    pub fn validate(&self) -> HedgingResult<Vec<String>> {
        let mut warnings = Vec::new();

        if self.fixed_hedge_ratio < Decimal::ZERO || self.fixed_hedge_ratio > dec!(2) {
            return Err(HedgingError::InvalidInput {
                field: "fixed_hedge_ratio".into(),
                reason: "Fixed hedge ratio must be between 0 and 2".into(),
            });
        }
        if self.confidence_level <= Decimal::ZERO || self.confidence_level >= Decimal::ONE {
            return Err(HedgingError::InvalidInput {
                field: "confidence_level".into(),
                reason: "Confidence level must be between 0 and 1 (exclusive)".into(),
            });
        }
        if self.rolling_window == 0 {
            return Err(HedgingError::InvalidInput {
                field: "rolling_window".into(),
                reason: "Rolling window must be at least 1".into(),
            });
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(HedgingError::DateError(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        if self.confidence_level < dec!(0.8) || self.confidence_level > dec!(0.99) {
            warnings.push(format!(
                "Confidence level {} is outside the usual 0.80-0.99 range",
                self.confidence_level
            ));
        }
        if !(10..=252).contains(&self.rolling_window) {
            warnings.push(format!(
                "Rolling window {} is outside the usual 10-252 range",
                self.rolling_window
            ));
        }

        for w in &warnings {
            warn!("{w}");
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let warnings = AnalysisConfig::default().validate().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"fixed_hedge_ratio": "0.8", "backfill_policy": "zero"}"#)
                .unwrap();
        assert_eq!(cfg.fixed_hedge_ratio, dec!(0.8));
        assert_eq!(cfg.confidence_level, dec!(0.95));
        assert_eq!(cfg.rolling_window, 20);
        assert_eq!(cfg.backfill_policy, BackfillPolicy::Zero);
    }

    #[test]
    fn test_ratio_out_of_bounds() {
        let cfg = AnalysisConfig {
            fixed_hedge_ratio: dec!(2.5),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let cfg = AnalysisConfig {
            rolling_window: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let cfg = AnalysisConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(HedgingError::DateError(_))));
    }

    #[test]
    fn test_unusual_values_warn() {
        let cfg = AnalysisConfig {
            confidence_level: dec!(0.5),
            rolling_window: 3,
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap().len(), 2);
    }
}
