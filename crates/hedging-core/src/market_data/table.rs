use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::series::PriceSeries;
use crate::error::HedgingError;
use crate::types::Price;
use crate::HedgingResult;

/// Required spot price column.
pub const SPOT_COLUMN: &str = "Spot_Price";

/// Prefix shared by every futures price column.
pub const FUTURES_PREFIX: &str = "Futures_";

/// Near-maturity column used when the caller does not name one.
pub const DEFAULT_NEAR_COLUMN: &str = "Futures_Price_Near";

/// One named price column of a [`PriceTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceColumn {
    pub name: String,
    pub values: Vec<Price>,
}

/// True for `Spot_Price` and every `Futures_*` column.
pub fn is_price_column(name: &str) -> bool {
    name == SPOT_COLUMN || name.starts_with(FUTURES_PREFIX)
}

/// A single dated row as produced by row-oriented sources (JSON, stdin).
/// Fields other than the date and the price columns are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRow {
    #[serde(alias = "Date")]
    pub date: NaiveDate,
    #[serde(flatten, deserialize_with = "price_fields")]
    pub prices: BTreeMap<String, Price>,
}

fn price_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, Price>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .filter(|(name, _)| is_price_column(name))
        .map(|(name, value)| {
            let price = <Price as Deserialize>::deserialize(value)
                .map_err(|e| D::Error::custom(format!("{name}: {e}")))?;
            Ok((name, price))
        })
        .collect()
}

/// Validated, date-sorted table of spot and futures prices.
///
/// Holds a `Spot_Price` column and at least one `Futures_*` column, all on
/// one strictly increasing date index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<PriceColumn>,
}

#[derive(Deserialize)]
struct TableParts {
    dates: Vec<NaiveDate>,
    columns: Vec<PriceColumn>,
}

impl TryFrom<TableParts> for PriceTable {
    type Error = HedgingError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        PriceTable::new(parts.dates, parts.columns)
    }
}

impl PriceTable {
    /// Build a table from column data. Rows are sorted by date; duplicate
    /// dates, ragged columns and missing required columns are rejected.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<PriceColumn>) -> HedgingResult<Self> {
        for col in &columns {
            if col.values.len() != dates.len() {
                return Err(HedgingError::InvalidInput {
                    field: col.name.clone(),
                    reason: format!(
                        "column has {} values but the table has {} dates",
                        col.values.len(),
                        dates.len()
                    ),
                });
            }
        }
        if !columns.iter().any(|c| c.name == SPOT_COLUMN) {
            return Err(HedgingError::MissingColumn {
                column: SPOT_COLUMN.into(),
            });
        }
        if !columns.iter().any(|c| c.name.starts_with(FUTURES_PREFIX)) {
            return Err(HedgingError::MissingColumn {
                column: format!("{FUTURES_PREFIX}*"),
            });
        }

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        if let Some(w) = order.windows(2).find(|w| dates[w[0]] == dates[w[1]]) {
            return Err(HedgingError::DateError(format!(
                "duplicate date {}",
                dates[w[0]]
            )));
        }

        let sorted_dates: Vec<NaiveDate> = order.iter().map(|&i| dates[i]).collect();
        let sorted_columns = columns
            .into_iter()
            .map(|col| PriceColumn {
                values: order.iter().map(|&i| col.values[i]).collect(),
                name: col.name,
            })
            .collect();

        Ok(Self {
            dates: sorted_dates,
            columns: sorted_columns,
        })
    }

    /// Build a table from dated rows. Every row must carry the same columns.
    pub fn from_rows(rows: Vec<PriceRow>) -> HedgingResult<Self> {
        let names: Vec<String> = match rows.first() {
            Some(first) => first.prices.keys().cloned().collect(),
            None => {
                return Err(HedgingError::InsufficientData(
                    "price input contains no rows".into(),
                ))
            }
        };

        let mut dates = Vec::with_capacity(rows.len());
        let mut columns: Vec<PriceColumn> = names
            .iter()
            .map(|name| PriceColumn {
                name: name.clone(),
                values: Vec::with_capacity(rows.len()),
            })
            .collect();

        for row in rows {
            for col in columns.iter_mut() {
                let value = row.prices.get(&col.name).ok_or_else(|| {
                    HedgingError::InvalidInput {
                        field: col.name.clone(),
                        reason: format!("missing value on {}", row.date),
                    }
                })?;
                col.values.push(*value);
            }
            dates.push(row.date);
        }

        PriceTable::new(dates, columns)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Futures columns in table order.
    pub fn futures_columns(&self) -> Vec<&str> {
        self.column_names()
            .filter(|name| name.starts_with(FUTURES_PREFIX))
            .collect()
    }

    /// The named column as a price series.
    pub fn series(&self, name: &str) -> HedgingResult<PriceSeries> {
        let col = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| HedgingError::MissingColumn {
                column: name.to_string(),
            })?;
        PriceSeries::new(self.dates.clone(), col.values.clone())
    }

    pub fn spot(&self) -> HedgingResult<PriceSeries> {
        self.series(SPOT_COLUMN)
    }

    /// Rows with `start <= date <= end`. Open bounds are unbounded.
    ///
    /// Returns `EmptyRange` when no row survives the filter.
    pub fn filter_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> HedgingResult<PriceTable> {
        let keep: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(i, _)| i)
            .collect();

        debug!(
            rows_in = self.len(),
            rows_out = keep.len(),
            ?start,
            ?end,
            "filtered price table"
        );

        if keep.is_empty() {
            return Err(HedgingError::EmptyRange {
                start: start
                    .or_else(|| self.dates.first().copied())
                    .unwrap_or(NaiveDate::MIN),
                end: end
                    .or_else(|| self.dates.last().copied())
                    .unwrap_or(NaiveDate::MAX),
            });
        }

        Ok(PriceTable {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|col| PriceColumn {
                    name: col.name.clone(),
                    values: keep.iter().map(|&i| col.values[i]).collect::<Vec<Decimal>>(),
                })
                .collect(),
        })
    }
}

/// Source of validated price tables.
///
/// Implementations own all I/O; the analytics never read files themselves.
pub trait PriceSeriesLoader {
    fn load(&self) -> HedgingResult<PriceTable>;
}

impl PriceSeriesLoader for PriceTable {
    fn load(&self) -> HedgingResult<PriceTable> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn col(name: &str, values: Vec<Decimal>) -> PriceColumn {
        PriceColumn {
            name: name.into(),
            values,
        }
    }

    fn sample() -> PriceTable {
        PriceTable::new(
            vec![d(3), d(1), d(2)],
            vec![
                col(SPOT_COLUMN, vec![dec!(103), dec!(101), dec!(102)]),
                col(DEFAULT_NEAR_COLUMN, vec![dec!(53), dec!(51), dec!(52)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rows_sorted_by_date() {
        let table = sample();
        assert_eq!(table.dates(), &[d(1), d(2), d(3)]);
        let spot = table.spot().unwrap();
        assert_eq!(spot.values(), &[dec!(101), dec!(102), dec!(103)]);
    }

    #[test]
    fn test_missing_spot_column() {
        let err = PriceTable::new(vec![d(1)], vec![col(DEFAULT_NEAR_COLUMN, vec![dec!(1)])])
            .unwrap_err();
        match err {
            HedgingError::MissingColumn { column } => assert_eq!(column, SPOT_COLUMN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_futures_column() {
        let err = PriceTable::new(vec![d(1)], vec![col(SPOT_COLUMN, vec![dec!(1)])]).unwrap_err();
        assert!(matches!(err, HedgingError::MissingColumn { .. }));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let err = PriceTable::new(
            vec![d(1), d(1)],
            vec![
                col(SPOT_COLUMN, vec![dec!(1), dec!(2)]),
                col(DEFAULT_NEAR_COLUMN, vec![dec!(1), dec!(2)]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, HedgingError::DateError(_)));
    }

    #[test]
    fn test_filter_range_inclusive() {
        let filtered = sample().filter_range(Some(d(2)), Some(d(3))).unwrap();
        assert_eq!(filtered.dates(), &[d(2), d(3)]);
        assert_eq!(
            filtered.series(DEFAULT_NEAR_COLUMN).unwrap().values(),
            &[dec!(52), dec!(53)]
        );
    }

    #[test]
    fn test_filter_range_empty() {
        let err = sample().filter_range(Some(d(10)), Some(d(20))).unwrap_err();
        assert!(matches!(err, HedgingError::EmptyRange { .. }));
    }

    #[test]
    fn test_from_rows() {
        let json = r#"[
            {"date": "2024-01-02", "Spot_Price": 102, "Futures_Price_Near": 52},
            {"date": "2024-01-01", "Spot_Price": 101, "Futures_Price_Near": 51}
        ]"#;
        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        let table = PriceTable::from_rows(rows).unwrap();
        assert_eq!(table.dates(), &[d(1), d(2)]);
        assert_eq!(table.futures_columns(), vec![DEFAULT_NEAR_COLUMN]);
    }

    #[test]
    fn test_from_rows_ignores_non_price_fields() {
        let json = r#"[
            {"Date": "2024-01-01", "Spot_Price": "101", "Futures_Price_Near": "51", "Note": "x"},
            {"Date": "2024-01-02", "Spot_Price": "102", "Futures_Price_Near": "52", "Volume": 7}
        ]"#;
        let rows: Vec<PriceRow> = serde_json::from_str(json).unwrap();
        assert!(rows.iter().all(|r| r.prices.len() == 2));
        let table = PriceTable::from_rows(rows).unwrap();
        assert!(!table.has_column("Note"));
        assert_eq!(table.spot().unwrap().values(), &[dec!(101), dec!(102)]);
    }

    #[test]
    fn test_from_rows_rejects_non_numeric_price() {
        let json = r#"[{"Date": "2024-01-01", "Spot_Price": "n/a", "Futures_Price_Near": "51"}]"#;
        assert!(serde_json::from_str::<Vec<PriceRow>>(json).is_err());
    }
}
