use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use hedging_core::hedging::StrategyKind;
use hedging_core::scenarios::sensitivity::{self, PerformanceMetric, SensitivityInput};
use hedging_core::SensitivityVariable;

use super::AnalysisArgs;

/// Arguments for a hedging sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Strategy whose metric is read (e.g. minimum_variance_hedge)
    #[arg(long, default_value = "minimum_variance_hedge")]
    pub strategy: StrategyKind,

    /// Metric read per cell (e.g. value_at_risk, cvar, cost, effectiveness)
    #[arg(long, default_value = "value_at_risk")]
    pub metric: PerformanceMetric,

    /// First sensitivity variable in format name:min:max:step
    /// (e.g. "fixed_hedge_ratio:0:1:0.25")
    #[arg(long)]
    pub var1: String,

    /// Second sensitivity variable (optional, creates a 2D table)
    #[arg(long)]
    pub var2: Option<String>,
}

fn parse_sens_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input = SensitivityInput {
        base_config: args.analysis.build_config()?,
        strategy: args.strategy,
        metric: args.metric,
        variable_1: parse_sens_var(&args.var1)?,
        variable_2: args.var2.as_deref().map(parse_sens_var).transpose()?,
    };
    let table = args.analysis.load_prices()?;
    let result = sensitivity::run_sensitivity(&table, &sens_input)?;
    Ok(serde_json::to_value(result)?)
}
