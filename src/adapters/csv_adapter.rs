//! CSV replay bar feed.
//!
//! Required columns: `time` (RFC 3339 or epoch milliseconds), `open`, `high`,
//! `low`, `close`. Optional: `reference`, `trend_price`, `trend_daily_open`,
//! `spread_pct`, `feed_age_ms`, `available_capital`. A row whose OHLC cells
//! are all empty is replayed as a feed gap. Without a `reference` column the
//! reference is an EMA of closes.

use crate::domain::bar::{BarContext, ClosedBar, TrendReference};
use crate::domain::ema::Ema;
use crate::domain::error::EngineError;
use crate::ports::data_port::{BarFeed, FeedPoll};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_EMA_PERIOD: usize = 9;

pub struct CsvBarFeed {
    polls: VecDeque<FeedPoll>,
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    reference: Option<usize>,
    trend_price: Option<usize>,
    trend_daily_open: Option<usize>,
    spread_pct: Option<usize>,
    feed_age_ms: Option<usize>,
    available_capital: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, EngineError> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let require = |name: &str| {
            find(name).ok_or_else(|| EngineError::Feed {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            time: require("time")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            reference: find("reference"),
            trend_price: find("trend_price"),
            trend_daily_open: find("trend_daily_open"),
            spread_pct: find("spread_pct"),
            feed_age_ms: find("feed_age_ms"),
            available_capital: find("available_capital"),
        })
    }
}

impl CsvBarFeed {
    pub fn from_path<P: AsRef<Path>>(path: P, ema_period: usize) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| EngineError::Feed {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_csv_str(&content, ema_period)
    }

    pub fn from_csv_str(content: &str, ema_period: usize) -> Result<Self, EngineError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let columns = Columns::from_headers(rdr.headers()?)?;
        let mut ema = columns.reference.is_none().then(|| Ema::new(ema_period));
        let mut polls = VecDeque::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let line = row + 2;

            let ohlc = [columns.open, columns.high, columns.low, columns.close];
            if ohlc.iter().all(|&i| cell(&record, i).is_none()) {
                polls.push_back(FeedPoll::Gap);
                continue;
            }

            let close: f64 = required(&record, columns.close, "close", line)?;
            let reference = match (&mut ema, columns.reference) {
                (Some(ema), _) => ema.update(close),
                (None, Some(i)) => optional(&record, Some(i), "reference", line)?,
                (None, None) => None,
            };

            let bar = ClosedBar {
                time: parse_time(&record, columns.time, line)?,
                open: required(&record, columns.open, "open", line)?,
                high: required(&record, columns.high, "high", line)?,
                low: required(&record, columns.low, "low", line)?,
                close,
                reference,
            };

            let trend_price: Option<f64> =
                optional(&record, columns.trend_price, "trend_price", line)?;
            let trend_open: Option<f64> =
                optional(&record, columns.trend_daily_open, "trend_daily_open", line)?;
            let ctx = BarContext {
                trend: trend_price
                    .zip(trend_open)
                    .map(|(price, daily_open)| TrendReference { price, daily_open }),
                feed_age_ms: optional(&record, columns.feed_age_ms, "feed_age_ms", line)?,
                spread_pct: optional(&record, columns.spread_pct, "spread_pct", line)?,
                available_capital: optional(
                    &record,
                    columns.available_capital,
                    "available_capital",
                    line,
                )?,
            };

            polls.push_back(FeedPoll::Bar(bar, ctx));
        }

        Ok(Self { polls })
    }

    pub fn remaining(&self) -> usize {
        self.polls.len()
    }
}

impl BarFeed for CsvBarFeed {
    fn poll(&mut self) -> Result<FeedPoll, EngineError> {
        Ok(self.polls.pop_front().unwrap_or(FeedPoll::Exhausted))
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<&str> {
    record.get(index).filter(|s| !s.is_empty())
}

fn required<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<T, EngineError> {
    let raw = cell(record, index).ok_or_else(|| EngineError::Feed {
        reason: format!("line {line}: missing {name} value"),
    })?;
    raw.parse().map_err(|_| EngineError::Feed {
        reason: format!("line {line}: invalid {name} value '{raw}'"),
    })
}

fn optional<T: FromStr>(
    record: &csv::StringRecord,
    index: Option<usize>,
    name: &str,
    line: usize,
) -> Result<Option<T>, EngineError> {
    match index.and_then(|i| cell(record, i)) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| EngineError::Feed {
            reason: format!("line {line}: invalid {name} value '{raw}'"),
        }),
    }
}

fn parse_time(
    record: &csv::StringRecord,
    index: usize,
    line: usize,
) -> Result<DateTime<Utc>, EngineError> {
    let raw = cell(record, index).ok_or_else(|| EngineError::Feed {
        reason: format!("line {line}: missing time value"),
    })?;
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single().ok_or_else(|| EngineError::Feed {
            reason: format!("line {line}: timestamp out of range '{raw}'"),
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EngineError::Feed {
            reason: format!("line {line}: invalid time '{raw}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn next_bar(feed: &mut CsvBarFeed) -> (ClosedBar, BarContext) {
        match feed.poll().unwrap() {
            FeedPoll::Bar(bar, ctx) => (bar, ctx),
            other => panic!("expected bar, got {other:?}"),
        }
    }

    #[test]
    fn reads_bars_with_reference_column() {
        let csv = "time,open,high,low,close,reference\n\
                   2024-05-01T00:00:00Z,10.0,10.2,9.8,10.1,10.05\n\
                   2024-05-01T00:05:00Z,10.1,10.3,10.0,10.2,\n";
        let mut feed = CsvBarFeed::from_csv_str(csv, 9).unwrap();
        let (bar, ctx) = next_bar(&mut feed);
        assert_eq!(bar.low, 9.8);
        assert_eq!(bar.reference, Some(10.05));
        assert_eq!(ctx, BarContext::default());
        let (bar, _) = next_bar(&mut feed);
        assert_eq!(bar.reference, None);
        assert_eq!(feed.poll().unwrap(), FeedPoll::Exhausted);
        assert_eq!(feed.poll().unwrap(), FeedPoll::Exhausted);
    }

    #[test]
    fn computes_ema_when_reference_absent() {
        let csv = "time,open,high,low,close\n\
                   1714521600000,1,1,1,10\n\
                   1714521900000,1,1,1,20\n\
                   1714522200000,1,1,1,30\n";
        let mut feed = CsvBarFeed::from_csv_str(csv, 2).unwrap();
        assert_eq!(next_bar(&mut feed).0.reference, None);
        assert_eq!(next_bar(&mut feed).0.reference, Some(15.0));
        let (bar, _) = next_bar(&mut feed);
        assert!((bar.reference.unwrap() - (30.0 * 2.0 / 3.0 + 15.0 / 3.0)).abs() < 1e-12);
        assert_eq!(bar.time, Utc.timestamp_millis_opt(1714522200000).unwrap());
    }

    #[test]
    fn reads_context_columns() {
        let csv = "time,open,high,low,close,reference,\
                   trend_price,trend_daily_open,spread_pct,feed_age_ms,available_capital\n\
                   2024-05-01T00:00:00Z,1,1,1,1,1,99.5,100,0.02,1500,42\n";
        let mut feed = CsvBarFeed::from_csv_str(csv, 9).unwrap();
        let (_, ctx) = next_bar(&mut feed);
        assert_eq!(
            ctx.trend,
            Some(TrendReference {
                price: 99.5,
                daily_open: 100.0
            })
        );
        assert_eq!(ctx.spread_pct, Some(0.02));
        assert_eq!(ctx.feed_age_ms, Some(1500));
        assert_eq!(ctx.available_capital, Some(42.0));
    }

    #[test]
    fn empty_ohlc_row_is_a_gap() {
        let csv = "time,open,high,low,close\n\
                   2024-05-01T00:00:00Z,,,,\n";
        let mut feed = CsvBarFeed::from_csv_str(csv, 9).unwrap();
        assert_eq!(feed.poll().unwrap(), FeedPoll::Gap);
    }

    #[test]
    fn missing_column_is_feed_error() {
        let result = CsvBarFeed::from_csv_str("time,open,high,low\n", 9);
        assert!(matches!(result, Err(EngineError::Feed { .. })));
    }

    #[test]
    fn bad_value_reports_line() {
        let csv = "time,open,high,low,close\n2024-05-01T00:00:00Z,1,1,x,1\n";
        match CsvBarFeed::from_csv_str(csv, 9) {
            Err(EngineError::Feed { reason }) => assert!(reason.contains("line 2")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "time,open,high,low,close\n2024-05-01T00:00:00Z,1,2,0.5,1.5\n").unwrap();
        let feed = CsvBarFeed::from_path(file.path(), 9).unwrap();
        assert_eq!(feed.remaining(), 1);
    }

    #[test]
    fn from_path_missing_file() {
        assert!(matches!(
            CsvBarFeed::from_path("/nonexistent/bars.csv", 9),
            Err(EngineError::Feed { .. })
        ));
    }
}
