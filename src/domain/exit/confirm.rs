//! N-bar exit confirmation.
//!
//! ```text
//! Idle --signal--> Counting(1) --same--> ... Counting(N-1) --same--> Confirmed
//!   ^                 |  other signal: restart at 1                     |
//!   +---- no signal --+------------------------------------------------+
//! ```
//!
//! `Confirmed` holds a [`FireLock`] so the confirmation is reported as newly
//! fired exactly once, however many times the same state is re-evaluated
//! before the executor consumes it.

use crate::domain::position::OpenPosition;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitSignal {
    StopLoss,
    TakeProfit,
    Trailing,
}

impl ExitSignal {
    pub fn label(self) -> &'static str {
        match self {
            ExitSignal::StopLoss => "SL",
            ExitSignal::TakeProfit => "TP",
            ExitSignal::Trailing => "TRAIL",
        }
    }
}

impl fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify the bar close against the position's levels.
///
/// Priority: SL beats TP beats TRAIL. A TP hit arms trailing for the rest of
/// the position's life.
pub fn detect_signal(position: &mut OpenPosition, close: f64) -> Option<ExitSignal> {
    if position.should_stop_loss(close) {
        Some(ExitSignal::StopLoss)
    } else if position.should_take_profit(close) {
        position.tp_touched = true;
        Some(ExitSignal::TakeProfit)
    } else if position.should_trail(close) {
        Some(ExitSignal::Trailing)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireLock {
    pub bar: u64,
    pub signal: ExitSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPhase {
    #[default]
    Idle,
    Counting {
        signal: ExitSignal,
        count: u32,
    },
    Confirmed {
        signal: ExitSignal,
        count: u32,
        lock: FireLock,
    },
}

/// What one observation did to the confirmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStep {
    Idle,
    Counting { signal: ExitSignal, count: u32 },
    Confirmed {
        signal: ExitSignal,
        count: u32,
        newly_fired: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ExitConfirmer {
    phase: ConfirmPhase,
}

impl ExitConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        bar: u64,
        signal: Option<ExitSignal>,
        confirm_bars: u32,
    ) -> ConfirmStep {
        let Some(signal) = signal else {
            self.phase = ConfirmPhase::Idle;
            return ConfirmStep::Idle;
        };

        let count = match self.phase {
            ConfirmPhase::Counting { signal: prev, count }
            | ConfirmPhase::Confirmed {
                signal: prev,
                count,
                ..
            } if prev == signal => count.saturating_add(1),
            _ => 1,
        };

        if count >= confirm_bars.max(1) {
            if let ConfirmPhase::Confirmed { signal: prev, lock, .. } = self.phase {
                if prev == signal {
                    self.phase = ConfirmPhase::Confirmed { signal, count, lock };
                    return ConfirmStep::Confirmed {
                        signal,
                        count,
                        newly_fired: false,
                    };
                }
            }
            self.phase = ConfirmPhase::Confirmed {
                signal,
                count,
                lock: FireLock { bar, signal },
            };
            return ConfirmStep::Confirmed {
                signal,
                count,
                newly_fired: true,
            };
        }

        self.phase = ConfirmPhase::Counting { signal, count };
        ConfirmStep::Counting { signal, count }
    }

    pub fn reset(&mut self) {
        self.phase = ConfirmPhase::Idle;
    }

    pub fn phase(&self) -> ConfirmPhase {
        self.phase
    }

    /// Consecutive bars the current signal has been observed.
    pub fn count(&self) -> u32 {
        match self.phase {
            ConfirmPhase::Idle => 0,
            ConfirmPhase::Counting { count, .. } | ConfirmPhase::Confirmed { count, .. } => count,
        }
    }

    pub fn signal(&self) -> Option<ExitSignal> {
        match self.phase {
            ConfirmPhase::Idle => None,
            ConfirmPhase::Counting { signal, .. } | ConfirmPhase::Confirmed { signal, .. } => {
                Some(signal)
            }
        }
    }

    pub fn fire_lock(&self) -> Option<FireLock> {
        match self.phase {
            ConfirmPhase::Confirmed { lock, .. } => Some(lock),
            _ => None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::test_config;
    use crate::domain::exit::levels::{ExitLevels, TrailingStop};
    use chrono::{TimeZone, Utc};

    fn position() -> OpenPosition {
        let cfg = test_config().exit;
        OpenPosition {
            entry_bar: 1,
            entry_time: Utc.timestamp_opt(0, 0).unwrap(),
            entry_price: 100.0,
            capital: 60.0,
            reason: "reference_penetration".into(),
            levels: ExitLevels::at_entry(100.0, &cfg),
            trailing: TrailingStop::at_entry(100.0, cfg.trailing_pct),
            tp_touched: false,
        }
    }

    #[test]
    fn detect_priority_and_tp_arming() {
        let mut pos = position();
        assert_eq!(detect_signal(&mut pos, 101.0), Some(ExitSignal::StopLoss));
        assert!(!pos.tp_touched);
        assert_eq!(detect_signal(&mut pos, 100.0), None);
        assert_eq!(detect_signal(&mut pos, 99.0), Some(ExitSignal::TakeProfit));
        assert!(pos.tp_touched);
        pos.trailing.update(98.0);
        assert_eq!(detect_signal(&mut pos, 98.5), Some(ExitSignal::Trailing));
    }

    #[test]
    fn trail_not_signalled_before_tp() {
        let mut pos = position();
        pos.trailing.update(99.5);
        assert_eq!(detect_signal(&mut pos, 99.95), None);
    }

    #[test]
    fn three_consecutive_bars_confirm_once() {
        let mut c = ExitConfirmer::new();
        let sl = Some(ExitSignal::StopLoss);
        assert_eq!(
            c.observe(10, sl, 3),
            ConfirmStep::Counting {
                signal: ExitSignal::StopLoss,
                count: 1
            }
        );
        assert_eq!(
            c.observe(11, sl, 3),
            ConfirmStep::Counting {
                signal: ExitSignal::StopLoss,
                count: 2
            }
        );
        assert_eq!(
            c.observe(12, sl, 3),
            ConfirmStep::Confirmed {
                signal: ExitSignal::StopLoss,
                count: 3,
                newly_fired: true
            }
        );
        assert_eq!(
            c.observe(13, sl, 3),
            ConfirmStep::Confirmed {
                signal: ExitSignal::StopLoss,
                count: 4,
                newly_fired: false
            }
        );
        assert_eq!(
            c.fire_lock(),
            Some(FireLock {
                bar: 12,
                signal: ExitSignal::StopLoss
            })
        );
    }

    #[test]
    fn no_signal_resets_to_zero() {
        let mut c = ExitConfirmer::new();
        c.observe(1, Some(ExitSignal::TakeProfit), 3);
        c.observe(2, Some(ExitSignal::TakeProfit), 3);
        assert_eq!(c.observe(3, None, 3), ConfirmStep::Idle);
        assert_eq!(c.count(), 0);
        assert!(!c.is_in_progress());
    }

    #[test]
    fn switching_signal_restarts_at_one() {
        let mut c = ExitConfirmer::new();
        c.observe(1, Some(ExitSignal::TakeProfit), 3);
        c.observe(2, Some(ExitSignal::TakeProfit), 3);
        c.observe(3, Some(ExitSignal::Trailing), 3);
        assert_eq!(c.count(), 1);
        assert_eq!(c.signal(), Some(ExitSignal::Trailing));
    }

    #[test]
    fn switching_after_confirmation_drops_the_lock() {
        let mut c = ExitConfirmer::new();
        c.observe(1, Some(ExitSignal::StopLoss), 1);
        assert!(c.fire_lock().is_some());
        let step = c.observe(2, Some(ExitSignal::TakeProfit), 2);
        assert_eq!(
            step,
            ConfirmStep::Counting {
                signal: ExitSignal::TakeProfit,
                count: 1
            }
        );
        assert!(c.fire_lock().is_none());
    }

    #[test]
    fn single_bar_confirmation() {
        let mut c = ExitConfirmer::new();
        assert!(matches!(
            c.observe(7, Some(ExitSignal::StopLoss), 1),
            ConfirmStep::Confirmed {
                newly_fired: true,
                ..
            }
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = ExitConfirmer::new();
        c.observe(1, Some(ExitSignal::StopLoss), 1);
        c.reset();
        assert_eq!(c.phase(), ConfirmPhase::Idle);
        assert!(c.fire_lock().is_none());
        assert!(c.signal().is_none());
    }

    #[test]
    fn labels() {
        assert_eq!(ExitSignal::StopLoss.to_string(), "SL");
        assert_eq!(ExitSignal::TakeProfit.to_string(), "TP");
        assert_eq!(ExitSignal::Trailing.to_string(), "TRAIL");
    }
}
