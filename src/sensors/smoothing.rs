//! Fixed-point smoothing filters.
//!
//! [`RollingAverage`] backs the voltage/current measurements,
//! [`EmaFilter`] backs the ambient probe readings.  Both are integer-only
//! so they behave identically on every target.

/// Mean of the last `N` samples (fewer until the window has filled).
#[derive(Debug, Clone)]
pub struct RollingAverage<const N: usize> {
    buf: [i32; N],
    sum: i64,
    index: usize,
    count: usize,
}

impl<const N: usize> Default for RollingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RollingAverage<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            sum: 0,
            index: 0,
            count: 0,
        }
    }

    /// Push a sample and return the updated average.
    pub fn add(&mut self, value: i32) -> i32 {
        if self.count < N {
            self.count += 1;
        } else {
            self.sum -= i64::from(self.buf[self.index]);
        }
        self.buf[self.index] = value;
        self.sum += i64::from(value);
        self.index = (self.index + 1) % N;
        self.average()
    }

    /// Current average, truncated towards zero; 0 when empty.
    pub fn average(&self) -> i32 {
        if self.count == 0 {
            return 0;
        }
        (self.sum / self.count as i64) as i32
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Exponential moving average with a Q8 coefficient.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaFilter {
    value: i32,
    initialized: bool,
}

impl EmaFilter {
    pub const fn new() -> Self {
        Self {
            value: 0,
            initialized: false,
        }
    }

    /// Fold in a sample.  `alpha_q8` is the weight of the new sample out
    /// of 256.  The first sample seeds the filter directly.
    pub fn update(&mut self, sample: i32, alpha_q8: u16) -> i32 {
        if !self.initialized {
            self.value = sample;
            self.initialized = true;
            return self.value;
        }
        let diff = i64::from(sample) - i64::from(self.value);
        self.value += ((diff * i64::from(alpha_q8)) >> 8) as i32;
        self.value
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
