use serde_json::Value;

use super::{format_scalar, result_of};

/// Key answer fields, in order of priority.
const PRIORITY_KEYS: [&str; 5] = [
    "base_case_value",
    "latest_ratio",
    "value_at_risk",
    "conditional_value_at_risk",
    "annualised_volatility",
];

/// The key answer of a result as plain lines.
///
/// A comparison prints one `strategy: VaR` line per evaluated strategy;
/// other results print the first priority field present, then fall back
/// to the first field in the result object.
pub fn render(value: &Value) -> String {
    let result = result_of(value);

    let Value::Object(map) = result else {
        return format_scalar(result);
    };

    if let Some(Value::Array(rows)) = map.get("performance") {
        return rows
            .iter()
            .map(|row| {
                format!(
                    "{}: {}",
                    row.get("strategy").map(format_scalar).unwrap_or_default(),
                    row.get("value_at_risk").map(format_scalar).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    for key in &PRIORITY_KEYS {
        if let Some(val) = map.get(*key) {
            if !val.is_null() {
                return format_scalar(val);
            }
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{}: {}", key, format_scalar(val)),
        None => String::new(),
    }
}

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", render(value));
}
