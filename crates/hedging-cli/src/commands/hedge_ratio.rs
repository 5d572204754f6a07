use clap::Args;
use serde_json::Value;

use hedging_core::hedging::hedge_ratio::{self, MinVarianceInput};
use hedging_core::hedging::resolve_near_column;

use super::AnalysisArgs;

/// Arguments for the rolling minimum-variance hedge ratio
#[derive(Args)]
pub struct HedgeRatioArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

pub fn run_hedge_ratio(args: HedgeRatioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.analysis.build_config()?;
    config.validate()?;
    let table = args
        .analysis
        .load_prices()?
        .filter_range(config.start_date, config.end_date)?;
    let near = resolve_near_column(&table, &config)?;

    let mv_input = MinVarianceInput {
        spot: table.spot()?,
        futures: table.series(&near)?,
        rolling_window: config.rolling_window,
        backfill_policy: config.backfill_policy,
    };
    let result = hedge_ratio::estimate_min_variance_ratios(&mv_input)?;
    Ok(serde_json::to_value(result)?)
}
