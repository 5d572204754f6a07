use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::HedgingError;
use crate::types::{HedgeRatio, Price, Rate};
use crate::HedgingResult;

/// Date-indexed sequence of values. Dates are strictly increasing; the
/// constructor rejects anything else, so every series in the crate is sorted
/// and duplicate-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "SeriesParts<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct TimeSeries<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

/// Spot or futures prices.
pub type PriceSeries = TimeSeries<Price>;

/// Period returns; one shorter than the price series it came from.
pub type ReturnSeries = TimeSeries<Rate>;

/// Hedge ratio per return date.
pub type HedgeRatioSeries = TimeSeries<HedgeRatio>;

/// Hedged (or unhedged) portfolio value per price date.
pub type PortfolioValueSeries = TimeSeries<Price>;

#[derive(Deserialize)]
struct SeriesParts<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

impl<T> TryFrom<SeriesParts<T>> for TimeSeries<T> {
    type Error = HedgingError;

    fn try_from(parts: SeriesParts<T>) -> Result<Self, Self::Error> {
        TimeSeries::new(parts.dates, parts.values)
    }
}

impl<T> TimeSeries<T> {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<T>) -> HedgingResult<Self> {
        if dates.len() != values.len() {
            return Err(HedgingError::InvalidInput {
                field: "values".into(),
                reason: format!(
                    "{} dates but {} values; series must be the same length",
                    dates.len(),
                    values.len()
                ),
            });
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(HedgingError::DateError(format!(
                "dates must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { dates, values })
    }

    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn first(&self) -> Option<(NaiveDate, &T)> {
        Some((*self.dates.first()?, self.values.first()?))
    }

    pub fn last(&self) -> Option<(NaiveDate, &T)> {
        Some((*self.dates.last()?, self.values.last()?))
    }

    /// Value observed on `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| &self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &T)> + '_ {
        self.dates.iter().copied().zip(self.values.iter())
    }

    /// True when both series are keyed by exactly the same dates.
    pub fn shares_index<U>(&self, other: &TimeSeries<U>) -> bool {
        self.dates == other.dates
    }

    /// Same index, transformed values.
    pub fn map_values<U>(&self, f: impl FnMut(&T) -> U) -> TimeSeries<U> {
        TimeSeries {
            dates: self.dates.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl TimeSeries<Decimal> {
    /// Series with every value set to `value` on the given index.
    pub fn constant(dates: &[NaiveDate], value: Decimal) -> HedgingResult<Self> {
        TimeSeries::new(dates.to_vec(), vec![value; dates.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_rejects_unsorted_dates() {
        let err = TimeSeries::new(vec![d(2), d(1)], vec![dec!(1), dec!(2)]).unwrap_err();
        assert!(matches!(err, HedgingError::DateError(_)));
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        assert!(TimeSeries::new(vec![d(1), d(1)], vec![dec!(1), dec!(2)]).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = TimeSeries::new(vec![d(1)], vec![dec!(1), dec!(2)]).unwrap_err();
        assert!(matches!(err, HedgingError::InvalidInput { .. }));
    }

    #[test]
    fn test_get_by_date() {
        let s = TimeSeries::new(vec![d(1), d(4), d(5)], vec![dec!(10), dec!(11), dec!(12)]).unwrap();
        assert_eq!(s.get(d(4)), Some(&dec!(11)));
        assert_eq!(s.get(d(3)), None);
        assert_eq!(s.last(), Some((d(5), &dec!(12))));
    }

    #[test]
    fn test_deserialize_validates() {
        let bad = r#"{"dates":["2024-03-02","2024-03-01"],"values":["1","2"]}"#;
        assert!(serde_json::from_str::<PriceSeries>(bad).is_err());

        let good = r#"{"dates":["2024-03-01","2024-03-02"],"values":["1","2"]}"#;
        let s: PriceSeries = serde_json::from_str(good).unwrap();
        assert_eq!(s.len(), 2);
    }
}
