//! Elapsed-time counters for periodic work

/// Fires once every `period` seconds of accumulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    period: f32,
    elapsed: f32,
}

impl Interval {
    /// Counter that first fires after one full period.
    #[must_use]
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Counter that fires on its first tick.
    #[must_use]
    pub fn immediate(period: f32) -> Self {
        let period = period.max(0.0);
        Self {
            period,
            elapsed: period,
        }
    }

    #[must_use]
    pub fn period(&self) -> f32 {
        self.period
    }

    /// Seconds accumulated since the last firing.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Accumulate `dt` and report whether the interval is due.
    ///
    /// A long `dt` fires at most once; the remainder carries over modulo
    /// the period so a stall never produces a burst of catch-up runs.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        if self.elapsed < self.period {
            return false;
        }
        self.elapsed = if self.period > 0.0 {
            (self.elapsed - self.period) % self.period
        } else {
            0.0
        };
        true
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}
