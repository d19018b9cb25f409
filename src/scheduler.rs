//! Interval timers for the cooperative control loop.
//!
//! ```text
//!   tick(now_ms)
//!     ├─ serial drain + dispatch        every tick
//!     ├─ sampling + safety              every REFRESH_MS
//!     └─ probe refresh + dew control    every SENSOR_READ_INTERVAL_MS
//! ```
//!
//! Time is a free-running millisecond counter; all arithmetic wraps, so
//! the counter rolling over after ~49 days does not stall a timer.

/// Fires at most once per `interval_ms`.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval_ms: u32,
    last_ms: Option<u32>,
}

impl IntervalTimer {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// `true` on the first call and whenever `interval_ms` has elapsed
    /// since the last time it returned `true`.
    pub fn due(&mut self, now_ms: u32) -> bool {
        let fire = match self.last_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.interval_ms,
        };
        if fire {
            self.last_ms = Some(now_ms);
        }
        fire
    }
}
