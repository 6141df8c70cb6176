//! Writes the audit trail and closed trades as CSV files into a directory.
//!
//! Files: `executions.csv`, `exits.csv`, `levels.csv`, `trades.csv`. Each is
//! rewritten in full on every call.

use crate::domain::audit::AuditLog;
use crate::domain::error::EngineError;
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::AuditPort;
use chrono::SecondsFormat;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAuditAdapter {
    dir: PathBuf,
}

impl CsvAuditAdapter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&self, name: &str) -> Result<csv::Writer<fs::File>, EngineError> {
        let path = self.dir.join(name);
        csv::Writer::from_path(&path).map_err(|e| EngineError::Report {
            reason: format!("failed to create {}: {}", path.display(), e),
        })
    }
}

fn ts(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn row<I, T>(wtr: &mut csv::Writer<fs::File>, record: I) -> Result<(), EngineError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    wtr.write_record(record).map_err(|e| EngineError::Report {
        reason: format!("failed to write audit row: {e}"),
    })
}

fn finish(mut wtr: csv::Writer<fs::File>) -> Result<(), EngineError> {
    wtr.flush().map_err(|e| EngineError::Report {
        reason: format!("failed to flush audit file: {e}"),
    })
}

impl AuditPort for CsvAuditAdapter {
    fn write(&self, audit: &AuditLog, trades: &[ClosedTrade]) -> Result<(), EngineError> {
        fs::create_dir_all(&self.dir).map_err(|e| EngineError::Report {
            reason: format!("failed to create {}: {}", self.dir.display(), e),
        })?;

        let mut wtr = self.writer("executions.csv")?;
        row(&mut wtr, [
            "bar",
            "time",
            "granted_bar",
            "entry_price",
            "capital",
            "stop_loss",
            "take_profit",
            "reason",
        ])?;
        for e in &audit.executions {
            row(&mut wtr, [
                e.bar.to_string(),
                ts(&e.time),
                e.granted_bar.to_string(),
                e.entry_price.to_string(),
                e.capital.to_string(),
                e.stop_loss.to_string(),
                e.take_profit.to_string(),
                e.reason.clone(),
            ])?;
        }
        finish(wtr)?;

        let mut wtr = self.writer("exits.csv")?;
        row(&mut wtr, ["bar", "time", "signal", "close", "confirm_count"])?;
        for x in &audit.exits {
            row(&mut wtr, [
                x.bar.to_string(),
                ts(&x.time),
                x.signal.to_string(),
                x.close.to_string(),
                x.confirm_count.to_string(),
            ])?;
        }
        finish(wtr)?;

        let mut wtr = self.writer("levels.csv")?;
        row(&mut wtr, [
            "bar",
            "time",
            "entry_price",
            "stop_loss",
            "take_profit",
            "anchor",
            "trailing_stop",
            "close",
            "unrealized_pnl",
        ])?;
        for l in &audit.levels {
            row(&mut wtr, [
                l.bar.to_string(),
                ts(&l.time),
                l.entry_price.to_string(),
                l.stop_loss.to_string(),
                l.take_profit.to_string(),
                l.anchor.to_string(),
                l.trailing_stop.to_string(),
                l.close.to_string(),
                l.unrealized_pnl.to_string(),
            ])?;
        }
        finish(wtr)?;

        let mut wtr = self.writer("trades.csv")?;
        row(&mut wtr, [
            "cycle_id",
            "entry_bar",
            "exit_bar",
            "entry_time",
            "exit_time",
            "entry_price",
            "exit_price",
            "capital",
            "signal",
            "pnl",
        ])?;
        for t in trades {
            row(&mut wtr, [
                t.cycle_id.to_string(),
                t.entry_bar.to_string(),
                t.exit_bar.to_string(),
                ts(&t.entry_time),
                ts(&t.exit_time),
                t.entry_price.to_string(),
                t.exit_price.to_string(),
                t.capital.to_string(),
                t.signal.to_string(),
                t.pnl.to_string(),
            ])?;
        }
        finish(wtr)
    }
}
