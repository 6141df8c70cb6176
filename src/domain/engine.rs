//! Bar-synchronous decision engine.
//!
//! One call to [`Engine::on_bar`] runs the whole pipeline for one closed bar:
//!
//! ```text
//! BarClock -> candidates -> gates -> entry decision -> entry executor
//!          -> exit levels -> exit confirmer -> exit executor -> fail-safe
//! ```
//!
//! The engine never performs I/O. It returns decision events and order
//! intents; collaborators act on them.

use tracing::{debug, info, warn};

use crate::domain::audit::{AuditLog, ExecutionRecord, ExitRecord};
use crate::domain::bar::{display_price, BarContext, ClosedBar, MarketBar};
use crate::domain::clock::BarClock;
use crate::domain::config::EngineConfig;
use crate::domain::entry::decision::{decide, Decision};
use crate::domain::entry::executor::{execute_entry, EntryExecution};
use crate::domain::error::EngineError;
use crate::domain::events::{EngineEvent, OrderIntent};
use crate::domain::exit::confirm::{detect_signal, ConfirmStep};
use crate::domain::exit::executor::execute_exit;
use crate::domain::exit::levels::update_levels;
use crate::domain::failsafe::{self, FailSafeAction};
use crate::domain::gates::{evaluate_chain, GateContext, GateVerdict};
use crate::domain::state::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarStatus {
    /// Evaluated as bar number `n`.
    Evaluated(u64),
    /// Same or older timestamp than the last bar; nothing changed.
    Duplicate,
    /// The engine was halted by the fail-safe before this bar.
    Halted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarReport {
    pub status: BarStatus,
    pub events: Vec<EngineEvent>,
    pub intents: Vec<OrderIntent>,
    pub gate: Option<GateVerdict>,
}

impl BarReport {
    fn skipped(status: BarStatus) -> Self {
        BarReport {
            status,
            events: Vec::new(),
            intents: Vec::new(),
            gate: None,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    cfg: EngineConfig,
    clock: BarClock,
    state: EngineState,
    audit: AuditLog,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        if !cfg.engine_enable {
            return Err(EngineError::EngineDisabled);
        }
        info!(
            symbol = %cfg.symbol,
            capital = cfg.capital.base,
            entry_timing = %cfg.entry_timing,
            fail_safe = %cfg.capital.fail_safe,
            "Engine initialised"
        );
        let state = EngineState::new(&cfg);
        Ok(Engine {
            cfg,
            clock: BarClock::new(),
            state,
            audit: AuditLog::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    pub fn on_bar(&mut self, closed: &ClosedBar, ctx: &BarContext) -> BarReport {
        if self.state.halted {
            return BarReport::skipped(BarStatus::Halted);
        }
        let Some(index) = self.clock.advance(closed.time) else {
            debug!(time = %closed.time, "Duplicate or out-of-order bar skipped");
            return BarReport::skipped(BarStatus::Duplicate);
        };

        let bar = MarketBar::from_closed(index, closed);
        let mut events = Vec::new();
        let mut intents = Vec::new();

        self.refresh_context(&bar, ctx);
        self.track_candidates(&bar, &mut events);

        let verdict = evaluate_chain(&GateContext {
            cfg: &self.cfg,
            bar: &bar,
            ctx,
            state: &self.state,
        });
        self.state.gate = verdict.outcome.clone();
        if let Some(kind) = verdict.blocked_by {
            debug!(
                bar = index,
                gate = %kind,
                reason = verdict.outcome.reason_or(""),
                "Gate blocked"
            );
        }

        if self.state.position.is_flat() {
            self.decide_entry(&bar, &verdict, &mut events);
        }
        self.consume_permit(&bar, &mut events, &mut intents);
        self.manage_exit(&bar, &mut events, &mut intents);

        self.state.ledger.record_equity(index, bar.time);
        self.check_fail_safe(&mut events);

        BarReport {
            status: BarStatus::Evaluated(index),
            events,
            intents,
            gate: Some(verdict),
        }
    }

    fn refresh_context(&mut self, bar: &MarketBar, ctx: &BarContext) {
        self.state.bar = bar.index;
        if !self.cfg.capital.use_fixed {
            self.state.ledger.capital = ctx
                .available_capital
                .map_or(self.cfg.capital.base, |available| available.max(0.0));
        }
        if self.state.counters.roll_day(bar.day()) {
            debug!(bar = bar.index, day = %bar.day(), "Day rollover, daily entry count reset");
        }
        self.state.window.push(bar);
    }

    fn track_candidates(&mut self, bar: &MarketBar, events: &mut Vec<EngineEvent>) {
        if self.cfg.candidate_enable {
            if let Some(c) = self.state.candidates.observe(bar, &self.cfg.candidate) {
                if self.cfg.log.log_candidates {
                    info!(
                        bar = c.bar,
                        low = display_price(c.trigger_price),
                        reference = display_price(c.reference),
                        "New candidate"
                    );
                }
                events.push(EngineEvent::CandidateCreated {
                    bar: c.bar,
                    trigger_price: c.trigger_price,
                    reference: c.reference,
                });
            }
        }
        let pruned = self.state.candidates.prune(bar.index, &self.cfg.candidate);
        if pruned > 0 {
            debug!(
                bar = bar.index,
                pruned,
                remaining = self.state.candidates.len(),
                "Candidates pruned"
            );
        }
    }

    fn decide_entry(
        &mut self,
        bar: &MarketBar,
        verdict: &GateVerdict,
        events: &mut Vec<EngineEvent>,
    ) {
        match decide(&self.cfg, &mut self.state, bar, verdict) {
            Decision::Granted(permit) => {
                info!(
                    bar = bar.index,
                    valid_bar = permit.valid_bar,
                    reason = %permit.reason,
                    "Entry permit granted"
                );
                events.push(EngineEvent::EntryPermitGranted {
                    bar: permit.granted_bar,
                    valid_bar: permit.valid_bar,
                    reason: permit.reason,
                });
            }
            Decision::Kept(_) => {}
            Decision::Revoked { permit, reason } => {
                info!(
                    bar = bar.index,
                    granted_bar = permit.granted_bar,
                    reason = %reason,
                    "Entry permit revoked"
                );
                events.push(EngineEvent::EntryPermitExpired {
                    granted_bar: permit.granted_bar,
                    reason,
                });
            }
            Decision::Blocked(reason) => {
                debug!(bar = bar.index, reason = %reason, "Entry not ready");
            }
        }
    }

    fn consume_permit(
        &mut self,
        bar: &MarketBar,
        events: &mut Vec<EngineEvent>,
        intents: &mut Vec<OrderIntent>,
    ) {
        let granted_bar = self.state.permit.as_ref().map(|p| p.granted_bar);
        match execute_entry(&self.cfg, &mut self.state, bar) {
            EntryExecution::Idle | EntryExecution::Waiting { .. } => {}
            EntryExecution::Opened(position) => {
                if self.cfg.log.log_executions {
                    info!(
                        bar = bar.index,
                        price = display_price(position.entry_price),
                        capital = position.capital,
                        sl = display_price(position.levels.stop_loss),
                        tp = display_price(position.levels.take_profit),
                        "Short opened"
                    );
                }
                self.audit.executions.push(ExecutionRecord {
                    bar: bar.index,
                    time: bar.time,
                    granted_bar: granted_bar.unwrap_or(bar.index),
                    entry_price: position.entry_price,
                    capital: position.capital,
                    stop_loss: position.levels.stop_loss,
                    take_profit: position.levels.take_profit,
                    reason: position.reason.clone(),
                });
                events.push(EngineEvent::PositionOpened {
                    bar: bar.index,
                    price: position.entry_price,
                    capital: position.capital,
                    quantity: position.quantity(),
                });
                intents.push(OrderIntent::open(bar.index, position.capital, position.entry_price));
            }
            EntryExecution::Expired { permit, reason } => {
                info!(
                    bar = bar.index,
                    granted_bar = permit.granted_bar,
                    reason = %reason,
                    "Entry permit expired"
                );
                events.push(EngineEvent::EntryPermitExpired {
                    granted_bar: permit.granted_bar,
                    reason,
                });
            }
        }
    }

    fn manage_exit(
        &mut self,
        bar: &MarketBar,
        events: &mut Vec<EngineEvent>,
        intents: &mut Vec<OrderIntent>,
    ) {
        let Some(position) = self.state.position.open_mut() else {
            return;
        };
        let Some(snapshot) = update_levels(position, bar) else {
            return;
        };
        let signal = detect_signal(position, bar.close);
        self.audit.levels.push(snapshot);

        let step = self
            .state
            .confirmer
            .observe(bar.index, signal, self.cfg.exit.confirm_bars);
        match step {
            ConfirmStep::Idle => {}
            ConfirmStep::Counting { signal, count } => {
                debug!(bar = bar.index, signal = %signal, count, "Exit signal counting");
            }
            ConfirmStep::Confirmed {
                signal,
                count,
                newly_fired,
            } => {
                if newly_fired {
                    info!(
                        bar = bar.index,
                        signal = %signal,
                        close = display_price(bar.close),
                        "Exit confirmed"
                    );
                    self.audit.exits.push(ExitRecord {
                        bar: bar.index,
                        time: bar.time,
                        signal,
                        close: bar.close,
                        confirm_count: count,
                    });
                    events.push(EngineEvent::ExitConfirmed {
                        bar: bar.index,
                        signal,
                    });
                }
            }
        }

        if let Some(trade) = execute_exit(&mut self.state, bar) {
            if self.cfg.log.log_executions {
                info!(
                    bar = bar.index,
                    signal = %trade.signal,
                    exit_price = display_price(trade.exit_price),
                    pnl = display_price(trade.pnl),
                    equity = display_price(self.state.ledger.equity()),
                    "Short closed"
                );
            }
            events.push(EngineEvent::PositionClosed {
                bar: bar.index,
                exit_price: trade.exit_price,
                pnl: trade.pnl,
            });
            intents.push(OrderIntent::close(bar.index, trade.capital, trade.exit_price));
        }
    }

    fn check_fail_safe(&mut self, events: &mut Vec<EngineEvent>) {
        match failsafe::check(&self.cfg.capital, &mut self.state) {
            FailSafeAction::WithinLimit | FailSafeAction::Suppressed => {}
            FailSafeAction::Halt { loss, limit } => {
                let reason = format!(
                    "fail-safe: loss {} exceeds limit {}",
                    display_price(loss),
                    display_price(limit)
                );
                warn!(bar = self.state.bar, %reason, "Engine halted");
                events.push(EngineEvent::EngineHalted { reason });
            }
            FailSafeAction::Notify { loss, limit } => {
                warn!(
                    bar = self.state.bar,
                    loss = display_price(loss),
                    limit = display_price(limit),
                    "Fail-safe tripped (notify only)"
                );
                events.push(EngineEvent::FailSafeTripped { loss, limit });
            }
        }
    }
}
