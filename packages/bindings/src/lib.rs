use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use hedging_core::hedging::{self, AnalysisConfig};
use hedging_core::market_data::{PriceRow, PriceTable};
use hedging_core::scenarios::{run_sensitivity, SensitivityInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Price rows plus analysis settings, as sent by the presentation layer.
#[derive(Deserialize)]
struct AnalysisRequest {
    prices: Vec<PriceRow>,
    #[serde(default)]
    config: AnalysisConfig,
}

#[derive(Deserialize)]
struct SensitivityRequest {
    prices: Vec<PriceRow>,
    #[serde(flatten)]
    sweep: SensitivityInput,
}

fn price_table(rows: Vec<PriceRow>) -> NapiResult<PriceTable> {
    PriceTable::from_rows(rows).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Strategy comparison
// ---------------------------------------------------------------------------

#[napi]
pub fn run_analysis(input_json: String) -> NapiResult<String> {
    let request: AnalysisRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let table = price_table(request.prices)?;
    let output = hedging::run_analysis(&table, &request.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[napi]
pub fn min_variance_ratios(input_json: String) -> NapiResult<String> {
    let input: hedging::MinVarianceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = hedging::estimate_min_variance_ratios(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn risk_metrics(input_json: String) -> NapiResult<String> {
    let input: hedging::RiskMetricsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = hedging::calculate_risk_metrics(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity(input_json: String) -> NapiResult<String> {
    let request: SensitivityRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let table = price_table(request.prices)?;
    let output = run_sensitivity(&table, &request.sweep).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
