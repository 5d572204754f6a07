use clap::Args;
use serde_json::Value;
use tracing::info;

use hedging_core::hedging::comparison;

use super::AnalysisArgs;

/// Arguments for the five-strategy hedging comparison
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Omit per-strategy portfolio value series and the ratio series
    #[arg(long)]
    pub summary: bool,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.analysis.build_config()?;
    let table = args.analysis.load_prices()?;
    info!(rows = table.len(), "loaded price table");

    let output = comparison::run_analysis(&table, &config)?;
    let mut value = serde_json::to_value(output)?;
    if args.summary {
        strip_series(&mut value);
    }
    Ok(value)
}

/// Drop the bulky series from a serialized analysis envelope.
fn strip_series(value: &mut Value) {
    let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) else {
        return;
    };
    result.remove("min_variance_ratios");
    if let Some(Value::Array(reports)) = result.get_mut("strategies") {
        for report in reports {
            if let Some(res) = report.get_mut("result").and_then(Value::as_object_mut) {
                res.remove("portfolio_values");
            }
        }
    }
}
