//! In-memory order sink used for replays and dry runs.

use crate::domain::error::EngineError;
use crate::domain::events::{OrderIntent, OrderSide};
use crate::ports::order_port::OrderPort;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub symbol: String,
    pub intent: OrderIntent,
}

/// Accepts every intent and keeps it. Refuses an open while one is already
/// outstanding, mirroring a venue that allows a single short per symbol.
#[derive(Debug, Default)]
pub struct PaperOrderAdapter {
    orders: Vec<SubmittedOrder>,
    open: bool,
}

impl PaperOrderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> &[SubmittedOrder] {
        &self.orders
    }
}

impl OrderPort for PaperOrderAdapter {
    fn submit(&mut self, symbol: &str, intent: &OrderIntent) -> Result<(), EngineError> {
        match intent.side {
            OrderSide::Open if self.open => {
                return Err(EngineError::Order {
                    reason: format!("{symbol}: open rejected, position already open"),
                });
            }
            OrderSide::Close if !self.open => {
                return Err(EngineError::Order {
                    reason: format!("{symbol}: reduce-only close with no open position"),
                });
            }
            OrderSide::Open => self.open = true,
            OrderSide::Close => self.open = false,
        }

        info!(
            symbol,
            bar = intent.bar,
            side = %intent.side,
            reduce_only = intent.reduce_only,
            capital = intent.capital,
            price = intent.reference_price,
            "Paper order filled"
        );
        self.orders.push(SubmittedOrder {
            symbol: symbol.to_string(),
            intent: intent.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_open_then_close() {
        let mut port = PaperOrderAdapter::new();
        port.submit("BTCUSDT", &OrderIntent::open(3, 60.0, 10.0)).unwrap();
        port.submit("BTCUSDT", &OrderIntent::close(5, 60.0, 9.9)).unwrap();
        port.submit("BTCUSDT", &OrderIntent::open(7, 60.0, 10.0)).unwrap();
        assert_eq!(port.orders().len(), 3);
        assert!(port.orders()[1].intent.reduce_only);
    }

    #[test]
    fn rejects_second_open() {
        let mut port = PaperOrderAdapter::new();
        port.submit("BTCUSDT", &OrderIntent::open(3, 60.0, 10.0)).unwrap();
        let err = port.submit("BTCUSDT", &OrderIntent::open(4, 60.0, 10.0));
        assert!(matches!(err, Err(EngineError::Order { .. })));
        assert_eq!(port.orders().len(), 1);
    }

    #[test]
    fn rejects_close_when_flat() {
        let mut port = PaperOrderAdapter::new();
        assert!(port.submit("BTCUSDT", &OrderIntent::close(2, 60.0, 9.0)).is_err());
    }
}
