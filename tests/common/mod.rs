#![allow(dead_code)]

use bargate::adapters::file_config_adapter::FileConfigAdapter;
use bargate::domain::bar::{BarContext, ClosedBar};
use bargate::domain::config::EngineConfig;
use bargate::domain::config_validation::build_engine_config;
use bargate::domain::error::EngineError;
use bargate::ports::data_port::{BarFeed, FeedPoll};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::io::Write;
use std::process::ExitCode;

/// Permissive configuration: every optional gate off, confirm over 3 bars.
pub const VALID_INI: &str = r#"
[engine]
symbol = WOOUSDT
engine_enable = true
candidate_enable = true
entry_exec_enable = true
entry_timing = next_bar

[capital]
base = 60
use_fixed = true
max_loss_pct = 100
fail_safe_mode = hard_stop

[candidate]
body_below_reference = true
min_gap_bars = 0
pool_ttl_bars = 100
pool_max_size = 100
entry_lookback_bars = 100

[gates]
slope_min_pct = 0
slope_lookback_bars = 0
max_entries_per_cycle = 2
max_entries_per_day = 20
reentry_entry_cooldown_bars = 0
reentry_exit_cooldown_bars = 0
reentry_same_reason_block = false

[entry]
min_price_move_pct = 0
only_on_new_low = false

[exit]
sl_pct = 0.6
tp_pct = 0.8
trailing_pct = 0.4
confirm_bars = 3

[log]
log_candidates = true
log_executions = true
"#;

/// Replace `key = value` lines of [`VALID_INI`]; keys not present are
/// appended to `section`.
pub fn ini_with(overrides: &[(&str, &str, &str)]) -> String {
    let mut lines: Vec<String> = VALID_INI.lines().map(str::to_string).collect();
    for &(section, key, value) in overrides {
        let existing = lines
            .iter()
            .position(|l| l.split('=').next().map(str::trim) == Some(key));
        match existing {
            Some(i) => lines[i] = format!("{key} = {value}"),
            None => {
                let header = format!("[{section}]");
                let at = lines
                    .iter()
                    .position(|l| l.trim() == header)
                    .map(|i| i + 1)
                    .unwrap_or(lines.len());
                lines.insert(at, format!("{key} = {value}"));
            }
        }
    }
    lines.join("\n")
}

pub fn config_from(ini: &str) -> EngineConfig {
    let adapter = FileConfigAdapter::from_string(ini).unwrap();
    build_engine_config(&adapter).unwrap()
}

pub fn valid_config() -> EngineConfig {
    config_from(VALID_INI)
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn bar_time(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::minutes(5 * n)
}

/// Bar `n` with open == close, so the body sits wholly below `reference`
/// whenever `close < reference`.
pub fn closed(n: i64, low: f64, close: f64, reference: f64) -> ClosedBar {
    ClosedBar {
        time: bar_time(n),
        open: close,
        high: close.max(low) + 0.01,
        low,
        close,
        reference: Some(reference),
    }
}

/// `(low, close, reference)` rows as a replay CSV with a reference column.
pub fn bars_csv(rows: &[(f64, f64, f64)]) -> String {
    let mut out = String::from("time,open,high,low,close,reference\n");
    for (i, &(low, close, reference)) in rows.iter().enumerate() {
        let b = closed(i as i64 + 1, low, close, reference);
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.time.to_rfc3339(),
            b.open,
            b.high,
            b.low,
            b.close,
            reference
        ));
    }
    out
}

/// Candidate + permit on bar 1, short at 10.0 on bar 2, then three closes
/// above the 10.06 stop.
pub const STOP_LOSS_ROWS: &[(f64, f64, f64)] = &[
    (9.9, 9.95, 10.0),
    (10.0, 10.0, 9.9),
    (10.05, 10.1, 9.9),
    (10.05, 10.1, 9.9),
    (10.05, 10.1, 9.9),
];

pub struct VecFeed(pub VecDeque<FeedPoll>);

impl VecFeed {
    pub fn from_bars(bars: Vec<ClosedBar>) -> Self {
        VecFeed(
            bars.into_iter()
                .map(|b| FeedPoll::Bar(b, BarContext::default()))
                .collect(),
        )
    }
}

impl BarFeed for VecFeed {
    fn poll(&mut self) -> Result<FeedPoll, EngineError> {
        Ok(self.0.pop_front().unwrap_or(FeedPoll::Exhausted))
    }
}

pub fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(
        format!("{code:?}"),
        format!("{:?}", ExitCode::from(expected)),
        "unexpected exit code"
    );
}
