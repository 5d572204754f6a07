pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Performance table columns: (result key, header label).
pub const PERFORMANCE_COLUMNS: [(&str, &str); 8] = [
    ("strategy", "Strategy"),
    ("cumulative_return", "Cumulative Return"),
    ("annual_volatility", "Annual Volatility"),
    ("value_at_risk", "VaR"),
    ("conditional_value_at_risk", "CVaR"),
    ("estimated_cost", "Estimated Cost"),
    ("max_drawdown", "Max Drawdown"),
    ("hedge_effectiveness", "Hedge Effectiveness"),
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object of a computation envelope, or the value itself.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Scalar rendering shared by the text formatters. Date/value series are
/// summarised by their length.
pub fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Object(map) if map.contains_key("dates") && map.contains_key("values") => {
            let n = map.get("dates").and_then(Value::as_array).map_or(0, Vec::len);
            format!("({n} observations)")
        }
        Value::Array(arr) if arr.iter().all(|v| !v.is_object() && !v.is_array()) => arr
            .iter()
            .map(format_scalar)
            .collect::<Vec<_>>()
            .join(", "),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Header row and body rows of a performance table.
pub fn performance_rows(rows: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let header = PERFORMANCE_COLUMNS
        .iter()
        .map(|(_, label)| label.to_string())
        .collect();
    let body = rows
        .iter()
        .map(|row| {
            PERFORMANCE_COLUMNS
                .iter()
                .map(|(key, _)| row.get(*key).map(format_scalar).unwrap_or_default())
                .collect()
        })
        .collect();
    (header, body)
}

/// Header row and body rows of a sensitivity grid.
pub fn grid_rows(result: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    let name_1 = result
        .get("variable_1_name")
        .map(format_scalar)
        .unwrap_or_default();
    let v1 = result
        .get("variable_1_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let v2 = result
        .get("variable_2_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let matrix = result
        .get("matrix")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut header = vec![match result.get("variable_2_name") {
        Some(name) if !name.is_null() => format!("{} \\ {}", name_1, format_scalar(name)),
        _ => name_1,
    }];
    if v2.is_empty() {
        header.push(result.get("metric").map(format_scalar).unwrap_or_default());
    } else {
        header.extend(v2.iter().map(format_scalar));
    }

    let body = v1
        .iter()
        .zip(&matrix)
        .map(|(v, row)| {
            let mut cells = vec![format_scalar(v)];
            if let Some(row) = row.as_array() {
                cells.extend(row.iter().map(format_scalar));
            }
            cells
        })
        .collect();
    (header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_scalar_summarises_series() {
        let series = json!({"dates": ["2024-01-01", "2024-01-02"], "values": ["1", "2"]});
        assert_eq!(format_scalar(&series), "(2 observations)");
        assert_eq!(format_scalar(&json!(["0.1", "0.2"])), "0.1, 0.2");
        assert_eq!(format_scalar(&Value::Null), "");
    }

    #[test]
    fn test_performance_rows_follow_column_order() {
        let rows = vec![json!({
            "strategy": "Fixed Hedge",
            "cumulative_return": "0.035",
            "annual_volatility": "0.2",
            "value_at_risk": "0.01",
            "conditional_value_at_risk": "0.012",
            "estimated_cost": "0.75",
            "max_drawdown": "0.02",
            "hedge_effectiveness": null
        })];
        let (header, body) = performance_rows(&rows);
        assert_eq!(header[3], "VaR");
        assert_eq!(body[0][0], "Fixed Hedge");
        assert_eq!(body[0][5], "0.75");
        assert_eq!(body[0][7], "");
    }

    #[test]
    fn test_grid_rows_one_way() {
        let result = json!({
            "variable_1_name": "fixed_hedge_ratio",
            "variable_1_values": ["0", "0.5"],
            "variable_2_values": [],
            "metric": "estimated_cost",
            "matrix": [["0"], ["0.8"]]
        });
        let (header, body) = grid_rows(&result);
        assert_eq!(header, vec!["fixed_hedge_ratio", "estimated_cost"]);
        assert_eq!(body[1], vec!["0.5", "0.8"]);
    }
}
