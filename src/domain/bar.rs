//! Market bar representation.
//!
//! [`ClosedBar`] is what a feed delivers; [`MarketBar`] is the same bar once
//! the [`crate::domain::clock::BarClock`] has assigned it an index.

use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Reference moving average at this bar's close, if warmed up.
    pub reference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketBar {
    pub index: u64,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub reference: Option<f64>,
}

impl MarketBar {
    pub fn from_closed(index: u64, bar: &ClosedBar) -> Self {
        MarketBar {
            index,
            time: bar.time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            reference: bar.reference,
        }
    }

    /// UTC calendar day, used for the per-day entry counter.
    pub fn day(&self) -> NaiveDate {
        self.time.date_naive()
    }
}

/// Daily open of an external reference instrument and its current price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReference {
    pub price: f64,
    pub daily_open: f64,
}

/// Per-bar context from collaborators that cannot be derived from the bar
/// stream itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarContext {
    pub trend: Option<TrendReference>,
    pub feed_age_ms: Option<i64>,
    pub spread_pct: Option<f64>,
    pub available_capital: Option<f64>,
}

/// Truncate to 6 decimal places for log output. Never compare with this.
pub fn display_price(value: f64) -> f64 {
    (value * 1_000_000.0).trunc() / 1_000_000.0
}
