use serde_json::Value;
use std::io;

use super::{format_scalar, grid_rows, performance_rows, result_of};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        eprintln!("CSV output error: {}", e);
    }
}

/// Performance rows, sensitivity grids and ratio series are written as
/// tables; any other result as `field,value` pairs.
pub fn write_csv<W: io::Write>(value: &Value, out: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    let result = result_of(value);

    if let Some(Value::Array(rows)) = result.get("performance") {
        let (header, body) = performance_rows(rows);
        write_rows(&mut wtr, header, body)?;
    } else if result.get("matrix").is_some() {
        let (header, body) = grid_rows(result);
        write_rows(&mut wtr, header, body)?;
    } else if let Some(series) = result.get("ratios") {
        wtr.write_record(["date", "ratio"])?;
        let dates = series.get("dates").and_then(Value::as_array);
        let values = series.get("values").and_then(Value::as_array);
        if let (Some(dates), Some(values)) = (dates, values) {
            for (d, v) in dates.iter().zip(values) {
                wtr.write_record([format_scalar(d), format_scalar(v)])?;
            }
        }
    } else if let Value::Object(map) = result {
        wtr.write_record(["field", "value"])?;
        for (key, val) in map {
            wtr.write_record([key.as_str(), &format_scalar(val)])?;
        }
    } else {
        wtr.write_record([format_scalar(result)])?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_rows<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    header: Vec<String>,
    body: Vec<Vec<String>>,
) -> Result<(), csv::Error> {
    wtr.write_record(&header)?;
    for row in body {
        wtr.write_record(&row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_string(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(value, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_ratio_series_csv() {
        let value = json!({"result": {
            "ratios": {"dates": ["2024-01-02", "2024-01-03"], "values": ["0.8", "0.85"]}
        }});
        assert_eq!(
            to_string(&value),
            "date,ratio\n2024-01-02,0.8\n2024-01-03,0.85\n"
        );
    }

    #[test]
    fn test_performance_csv_header() {
        let value = json!({"result": {"performance": [{"strategy": "No Hedge"}]}});
        let text = to_string(&value);
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Strategy,Cumulative Return,Annual Volatility,VaR,CVaR"));
        assert!(text.lines().nth(1).unwrap().starts_with("No Hedge,"));
    }

    #[test]
    fn test_plain_result_csv() {
        let value = json!({"result": {"value_at_risk": "0.0915"}});
        assert_eq!(to_string(&value), "field,value\nvalue_at_risk,0.0915\n");
    }
}
