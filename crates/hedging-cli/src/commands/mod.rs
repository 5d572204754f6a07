pub mod compare;
pub mod hedge_ratio;
pub mod risk;
pub mod sensitivity;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;

use hedging_core::hedging::{AnalysisConfig, BackfillPolicy, ReturnFrequency};
use hedging_core::market_data::PriceTable;

use crate::input;

/// Price input and analysis settings shared by the price-driven commands.
///
/// Settings are layered: explicit flags win over `--config`, which wins
/// over the built-in defaults.
#[derive(Args, Debug, Default)]
pub struct AnalysisArgs {
    /// Price file (.csv, or JSON rows); reads JSON rows from stdin if omitted
    #[arg(long)]
    pub input: Option<String>,

    /// JSON or YAML analysis config file
    #[arg(long)]
    pub config: Option<String>,

    /// Hedge ratio of the fixed-ratio strategy (0 to 2)
    #[arg(long)]
    pub fixed_ratio: Option<Decimal>,

    /// Confidence level for VaR/CVaR (e.g. 0.95)
    #[arg(long)]
    pub confidence: Option<Decimal>,

    /// Rolling window, in returns, of the minimum-variance estimator
    #[arg(long)]
    pub window: Option<usize>,

    /// Near-maturity futures column
    #[arg(long)]
    pub near_column: Option<String>,

    /// Futures column for the basis-risk hedge
    #[arg(long)]
    pub basis_column: Option<String>,

    /// First date to include (inclusive)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to include (inclusive)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Fill for ratios before the window fills: backward, zero, expanding
    #[arg(long, value_parser = parse_snake_case::<BackfillPolicy>)]
    pub backfill: Option<BackfillPolicy>,

    /// Return frequency: daily, weekly, monthly, quarterly, annual
    #[arg(long, value_parser = parse_snake_case::<ReturnFrequency>)]
    pub frequency: Option<ReturnFrequency>,
}

/// Parse a snake_case enum name through its serde representation.
pub fn parse_snake_case<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_lowercase()))
        .map_err(|_| format!("unrecognised value '{s}'"))
}

impl AnalysisArgs {
    pub fn build_config(&self) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
        let base = match &self.config {
            Some(path) => input::file::read_config(path)?,
            None => AnalysisConfig::default(),
        };
        let cfg = self.apply_overrides(base);
        debug!(?cfg, "resolved analysis config");
        Ok(cfg)
    }

    fn apply_overrides(&self, mut cfg: AnalysisConfig) -> AnalysisConfig {
        if let Some(v) = self.fixed_ratio {
            cfg.fixed_hedge_ratio = v;
        }
        if let Some(v) = self.confidence {
            cfg.confidence_level = v;
        }
        if let Some(v) = self.window {
            cfg.rolling_window = v;
        }
        if let Some(v) = &self.near_column {
            cfg.near_maturity_column = Some(v.clone());
        }
        if let Some(v) = &self.basis_column {
            cfg.basis_maturity_column = Some(v.clone());
        }
        if self.start.is_some() {
            cfg.start_date = self.start;
        }
        if self.end.is_some() {
            cfg.end_date = self.end;
        }
        if let Some(v) = self.backfill {
            cfg.backfill_policy = v;
        }
        if let Some(v) = self.frequency {
            cfg.frequency = v;
        }
        cfg
    }

    pub fn load_prices(&self) -> Result<PriceTable, Box<dyn std::error::Error>> {
        let loader = input::prices::loader_for(self.input.as_deref())?;
        Ok(loader.load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_defaults() {
        let args = AnalysisArgs {
            fixed_ratio: Some(dec!(0.8)),
            window: Some(30),
            backfill: Some(BackfillPolicy::Expanding),
            ..Default::default()
        };
        let cfg = args.apply_overrides(AnalysisConfig::default());
        assert_eq!(cfg.fixed_hedge_ratio, dec!(0.8));
        assert_eq!(cfg.rolling_window, 30);
        assert_eq!(cfg.confidence_level, dec!(0.95));
        assert_eq!(cfg.backfill_policy, BackfillPolicy::Expanding);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let from_file: AnalysisConfig =
            serde_yaml::from_str("confidence_level: '0.99'\nrolling_window: 60\n").unwrap();
        let cfg = AnalysisArgs::default().apply_overrides(from_file);
        assert_eq!(cfg.confidence_level, dec!(0.99));
        assert_eq!(cfg.rolling_window, 60);
    }

    #[test]
    fn test_parse_snake_case_enum() {
        assert_eq!(
            parse_snake_case::<ReturnFrequency>("Weekly").unwrap(),
            ReturnFrequency::Weekly
        );
        assert!(parse_snake_case::<BackfillPolicy>("sideways").is_err());
    }
}
