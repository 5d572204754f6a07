use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_scalar, grid_rows, performance_rows, result_of};

fn build(header: Vec<String>, body: Vec<Vec<String>>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in body {
        builder.push_record(row);
    }
    Table::from(builder)
}

/// Render the result of any command as text tables.
pub fn render(value: &Value) -> String {
    let result = result_of(value);
    let mut out = String::new();

    match result {
        Value::Object(res) => {
            if let Some(Value::Array(rows)) = res.get("performance") {
                out.push_str(&render_comparison(res, rows));
            } else if res.contains_key("matrix") {
                let (header, body) = grid_rows(result);
                out.push_str(&build(header, body).to_string());
            } else {
                out.push_str(&render_fields(res));
                if let Some(series) = res.get("ratios") {
                    out.push_str("\n\n");
                    out.push_str(&render_series(series, "Hedge Ratio"));
                }
            }
        }
        other => out.push_str(&format_scalar(other)),
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                out.push_str("\n\nWarnings:");
                for w in warnings.iter().filter_map(Value::as_str) {
                    out.push_str(&format!("\n  - {}", w));
                }
            }
        }
        if let Some(Value::String(meth)) = envelope.get("methodology") {
            out.push_str(&format!("\n\nMethodology: {}", meth));
        }
    }
    out
}

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    println!("{}", render(value));
}

fn render_comparison(res: &serde_json::Map<String, Value>, rows: &[Value]) -> String {
    let mut out = String::new();
    let field = |k: &str| res.get(k).map(format_scalar).unwrap_or_default();
    out.push_str(&format!(
        "Near: {}  Basis: {}  Observations: {} ({} to {})\n",
        field("near_column"),
        field("basis_column"),
        field("observations"),
        field("first_date"),
        field("last_date"),
    ));

    if rows.is_empty() {
        out.push_str("(no strategies evaluated)");
    } else {
        let (header, body) = performance_rows(rows);
        out.push_str(&build(header, body).to_string());
    }

    if let Some(Value::Array(diags)) = res.get("diagnostics") {
        if !diags.is_empty() {
            out.push_str("\n\nDiagnostics:");
            for d in diags {
                let kind = d.get("kind").map(format_scalar).unwrap_or_default();
                let msg = d.get("message").map(format_scalar).unwrap_or_default();
                out.push_str(&format!("\n  [{}] {}", kind, msg));
            }
        }
    }
    out
}

fn render_fields(res: &serde_json::Map<String, Value>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in res {
        builder.push_record([key.as_str(), &format_scalar(val)]);
    }
    Table::from(builder).to_string()
}

fn render_series(series: &Value, label: &str) -> String {
    let dates = series.get("dates").and_then(Value::as_array);
    let values = series.get("values").and_then(Value::as_array);
    let (Some(dates), Some(values)) = (dates, values) else {
        return format_scalar(series);
    };
    let body = dates
        .iter()
        .zip(values)
        .map(|(d, v)| vec![format_scalar(d), format_scalar(v)])
        .collect();
    build(vec!["Date".to_string(), label.to_string()], body).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_comparison_with_diagnostics() {
        let value = json!({
            "result": {
                "near_column": "Futures_Price_Near",
                "basis_column": "Futures_Price_Near",
                "observations": 4,
                "first_date": "2024-01-01",
                "last_date": "2024-01-04",
                "performance": [{"strategy": "No Hedge", "estimated_cost": "0"}],
                "diagnostics": [{"kind": "basis_fallback", "message": "using near"}]
            },
            "warnings": ["window short"],
            "methodology": "Hedging Strategy Comparison"
        });
        let text = render(&value);
        assert!(text.contains("No Hedge"));
        assert!(text.contains("Estimated Cost"));
        assert!(text.contains("[basis_fallback] using near"));
        assert!(text.contains("  - window short"));
    }

    #[test]
    fn test_render_empty_comparison() {
        let value = json!({"result": {"performance": [], "diagnostics": []}});
        assert!(render(&value).contains("(no strategies evaluated)"));
    }

    #[test]
    fn test_render_ratio_series() {
        let value = json!({"result": {
            "latest_ratio": "0.9",
            "ratios": {"dates": ["2024-01-02"], "values": ["0.9"]}
        }});
        let text = render(&value);
        assert!(text.contains("Hedge Ratio"));
        assert!(text.contains("2024-01-02"));
    }
}
