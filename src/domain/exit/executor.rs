//! Closes a confirmed position exactly once.

use crate::domain::bar::MarketBar;
use crate::domain::position::{short_pnl, ClosedTrade, PositionState};
use crate::domain::state::EngineState;

/// Execute the confirmed exit at `bar.close`.
///
/// Returns `None` when nothing is confirmed, the position is already flat,
/// or this confirmation's lock was executed before.
pub fn execute_exit(state: &mut EngineState, bar: &MarketBar) -> Option<ClosedTrade> {
    let lock = state.confirmer.fire_lock()?;
    if state.executed_lock == Some(lock) {
        return None;
    }
    let PositionState::Open(position) = &state.position else {
        return None;
    };

    let exit_price = bar.close;
    let trade = ClosedTrade {
        cycle_id: state.counters.cycle_id,
        entry_bar: position.entry_bar,
        exit_bar: bar.index,
        entry_time: position.entry_time,
        exit_time: bar.time,
        entry_price: position.entry_price,
        exit_price,
        capital: position.capital,
        signal: lock.signal,
        pnl: short_pnl(position.entry_price, exit_price, position.capital),
    };

    state.executed_lock = Some(lock);
    state.ledger.record_trade(trade.clone());
    state.history.last_exit_bar = Some(bar.index);
    state.history.last_exit_price = Some(exit_price);
    state.counters.cycle_id += 1;
    state.counters.entries_in_cycle = 0;
    state.reset_to_flat();

    Some(trade)
}
