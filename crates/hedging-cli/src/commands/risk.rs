use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use hedging_core::hedging::risk::{self, RiskMetricsInput};
use hedging_core::hedging::{calculate_returns, ReturnFrequency};
use hedging_core::market_data::table::SPOT_COLUMN;

use super::parse_snake_case;
use crate::input;

/// Arguments for volatility, VaR and CVaR of a return list
#[derive(Args)]
pub struct RiskArgs {
    /// JSON file with returns (array or {"returns": [...]}), or a price
    /// CSV whose --column is converted to returns
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic returns (e.g. "0.01,-0.02,0.005")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<Decimal>>,

    /// Price column used when --input is a CSV file
    #[arg(long, default_value = SPOT_COLUMN)]
    pub column: String,

    /// Confidence level for VaR/CVaR (e.g. 0.95 for 95%)
    #[arg(long, default_value = "0.95")]
    pub confidence: Decimal,

    /// Return frequency for annualisation: daily, weekly, monthly, quarterly, annual
    #[arg(long, default_value = "daily", value_parser = parse_snake_case::<ReturnFrequency>)]
    pub frequency: ReturnFrequency,
}

fn returns_from_json(data: Value) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    let arr = match data {
        Value::Array(arr) => arr,
        Value::Object(mut obj) => match obj.remove("returns") {
            Some(Value::Array(arr)) => arr,
            _ => return Err("JSON object must contain a 'returns' array".into()),
        },
        _ => return Err("Expected a JSON array of returns or object with 'returns' key".into()),
    };
    Ok(serde_json::from_value(Value::Array(arr))?)
}

fn get_returns(args: &RiskArgs) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        if path.to_lowercase().ends_with(".csv") {
            let table = input::prices::loader_for(Some(path.as_str()))?.load()?;
            let prices = table.series(&args.column)?;
            return Ok(calculate_returns(&prices)?.values().to_vec());
        }
        returns_from_json(input::file::read_json(path)?)
    } else if let Some(ref rets) = args.returns {
        Ok(rets.clone())
    } else if let Some(text) = input::stdin::read_stdin()? {
        returns_from_json(serde_json::from_str(&text)?)
    } else {
        Err("--input <file>, --returns, or stdin required for risk metrics".into())
    }
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input = RiskMetricsInput {
        returns: get_returns(&args)?,
        confidence_level: args.confidence,
        frequency: args.frequency,
    };
    let result = risk::calculate_risk_metrics(&risk_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_returns_from_array_and_object() {
        let from_array = returns_from_json(json!(["0.01", "-0.02"])).unwrap();
        let from_object = returns_from_json(json!({"returns": ["0.01", "-0.02"]})).unwrap();
        assert_eq!(from_array, vec![dec!(0.01), dec!(-0.02)]);
        assert_eq!(from_array, from_object);
    }

    #[test]
    fn test_returns_object_without_key() {
        assert!(returns_from_json(json!({"values": []})).is_err());
    }
}
