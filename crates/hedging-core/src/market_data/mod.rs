pub mod series;
pub mod table;

pub use series::{HedgeRatioSeries, PortfolioValueSeries, PriceSeries, ReturnSeries, TimeSeries};
pub use table::{PriceColumn, PriceRow, PriceSeriesLoader, PriceTable};
