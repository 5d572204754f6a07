use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use hedging_core::market_data::table::is_price_column;
use hedging_core::market_data::{PriceColumn, PriceRow, PriceSeriesLoader, PriceTable};
use hedging_core::{HedgingError, HedgingResult};

use super::{file, stdin};

/// Date layouts accepted in the `Date` column, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

const DATE_COLUMN: &str = "Date";

fn io_error(path: &Path, e: impl std::fmt::Display) -> HedgingError {
    HedgingError::InvalidInput {
        field: "input".into(),
        reason: format!("{}: {e}", path.display()),
    }
}

/// Parse a calendar date in any accepted layout. A trailing time part
/// (`2024-01-02 00:00:00`, `2024-01-02T00:00:00`) is ignored.
pub fn parse_date(raw: &str) -> HedgingResult<NaiveDate> {
    let day = raw
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .ok_or_else(|| HedgingError::DateError(format!("unrecognised date '{raw}'")))
}

/// Price table from CSV text with a `Date` header and one column per price
/// series. Columns other than `Spot_Price` and `Futures_*` are ignored.
pub fn parse_csv<R: Read>(reader: R) -> HedgingResult<PriceTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| HedgingError::SerializationError(e.to_string()))?
        .clone();
    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(DATE_COLUMN))
        .ok_or_else(|| HedgingError::MissingColumn {
            column: DATE_COLUMN.into(),
        })?;

    let mut price_idx = Vec::new();
    for (i, name) in headers.iter().enumerate() {
        if is_price_column(name) {
            price_idx.push(i);
        } else if i != date_idx {
            debug!(column = name, "ignoring non-price column");
        }
    }

    let mut dates = Vec::new();
    let mut columns: Vec<PriceColumn> = price_idx
        .iter()
        .map(|&i| PriceColumn {
            name: headers[i].to_string(),
            values: Vec::new(),
        })
        .collect();

    for (n, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| HedgingError::SerializationError(e.to_string()))?;
        // Header is line 1
        let line = n + 2;
        dates.push(parse_date(record.get(date_idx).unwrap_or_default())?);
        for (col, &i) in columns.iter_mut().zip(&price_idx) {
            let cell = record.get(i).unwrap_or_default();
            if cell.is_empty() {
                return Err(HedgingError::InvalidInput {
                    field: col.name.clone(),
                    reason: format!("empty value on line {line}"),
                });
            }
            let value = Decimal::from_str(cell)
                .or_else(|_| Decimal::from_scientific(cell))
                .map_err(|_| HedgingError::InvalidInput {
                    field: col.name.clone(),
                    reason: format!("'{cell}' on line {line} is not a number"),
                })?;
            col.values.push(value);
        }
    }

    debug!(rows = dates.len(), columns = columns.len(), "parsed price csv");
    PriceTable::new(dates, columns)
}

/// Price table from a JSON array of row objects:
/// `[{"Date": "2024-01-02", "Spot_Price": "80.1", "Futures_Price_Near": "79.6"}, ...]`.
pub fn parse_json_rows(text: &str) -> HedgingResult<PriceTable> {
    let rows: Vec<PriceRow> = serde_json::from_str(text)?;
    PriceTable::from_rows(rows)
}

/// Loads prices from a CSV file.
pub struct CsvPriceLoader {
    path: PathBuf,
}

impl CsvPriceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceSeriesLoader for CsvPriceLoader {
    fn load(&self) -> HedgingResult<PriceTable> {
        let f = std::fs::File::open(&self.path).map_err(|e| io_error(&self.path, e))?;
        parse_csv(f)
    }
}

/// Loads prices from a JSON file, or from piped stdin when no path is set.
pub struct JsonPriceLoader {
    path: Option<PathBuf>,
}

impl JsonPriceLoader {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn from_stdin() -> Self {
        Self { path: None }
    }
}

impl PriceSeriesLoader for JsonPriceLoader {
    fn load(&self) -> HedgingResult<PriceTable> {
        let text = match &self.path {
            Some(path) => file::read_to_string(path).map_err(|e| io_error(path, e))?,
            None => stdin::read_stdin()
                .map_err(|e| HedgingError::InvalidInput {
                    field: "stdin".into(),
                    reason: e.to_string(),
                })?
                .ok_or_else(|| HedgingError::InvalidInput {
                    field: "input".into(),
                    reason: "Provide --input <file> or pipe JSON price rows via stdin".into(),
                })?,
        };
        parse_json_rows(&text)
    }
}

/// Pick a loader for `--input`: `.csv` files go through the CSV reader,
/// anything else is read as JSON, and no path means stdin.
pub fn loader_for(
    input: Option<&str>,
) -> Result<Box<dyn PriceSeriesLoader>, Box<dyn std::error::Error>> {
    let Some(path) = input else {
        return Ok(Box::new(JsonPriceLoader::from_stdin()));
    };
    let resolved = file::resolve_path(path)?;
    let is_csv = resolved
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(Box::new(CsvPriceLoader::new(resolved)))
    } else {
        Ok(Box::new(JsonPriceLoader::from_file(resolved)))
    }
}
