//! Exponential moving average of closes, used as the reference series when
//! the bar source does not supply one.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). The first (n-1) values are `None`.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seen: usize,
    sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            sum: 0.0,
            value: None,
        }
    }

    /// Feed the next close; returns the EMA once warmed up.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.seen += 1;
        self.value = match self.value {
            Some(prev) => Some(close * self.k + prev * (1.0 - self.k)),
            None => {
                self.sum += close;
                (self.seen == self.period).then(|| self.sum / self.period as f64)
            }
        };
        self.value
    }
}
