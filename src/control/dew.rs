//! Dew-heater control loop.
//!
//! Hysteresis on the ambient-to-dewpoint margin decides whether the heater
//! is engaged; while engaged the duty follows a linear ramp between the
//! configured bounds, slew-limited per update.

use crate::board::{DEW_FULL_MARGIN_CENTI, DEW_HYSTERESIS_CENTI, DEW_SLEW_STEP_PCT};
use crate::config::DeviceConfig;

/// Tuning taken from the persisted config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DewTuning {
    pub on_margin_centi: i32,
    pub duty_min_pct: u8,
    pub duty_max_pct: u8,
}

impl DewTuning {
    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self {
            on_margin_centi: i32::from(cfg.dew_on_margin_centi),
            duty_min_pct: cfg.dew_duty_min_pct.min(100),
            duty_max_pct: cfg.dew_duty_max_pct.clamp(cfg.dew_duty_min_pct.min(100), 100),
        }
    }

    /// Margin above which an active heater releases.
    pub fn off_margin_centi(&self) -> i32 {
        self.on_margin_centi + DEW_HYSTERESIS_CENTI
    }

    /// Duty the heater would settle at for `margin_centi`.
    ///
    /// `duty_min_pct` at the turn-on margin, `duty_max_pct` at the
    /// fully-clear margin, linear in between.
    pub fn target_duty(&self, margin_centi: i32) -> u8 {
        let (min, max) = (i32::from(self.duty_min_pct), i32::from(self.duty_max_pct));
        let span = self.on_margin_centi - DEW_FULL_MARGIN_CENTI;
        let duty = if span <= 0 || margin_centi <= DEW_FULL_MARGIN_CENTI {
            max
        } else if margin_centi >= self.on_margin_centi {
            min
        } else {
            min + (max - min) * (self.on_margin_centi - margin_centi) / span
        };
        duty.clamp(min, max) as u8
    }
}

/// Outcome of one control update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DewUpdate {
    /// Duty to apply to dew-ambient ports (0-100%).
    pub duty_pct: u8,
    /// `Some(active)` when the heater changed state this update.
    pub transition: Option<bool>,
}

/// Hysteresis + slew state of the dew heater.
#[derive(Debug, Clone, Default)]
pub struct DewController {
    active: bool,
    duty_pct: u8,
}

impl DewController {
    pub const fn new() -> Self {
        Self {
            active: false,
            duty_pct: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duty_pct(&self) -> u8 {
        self.duty_pct
    }

    /// Run one control step for the given margin.
    pub fn update(&mut self, margin_centi: i32, tuning: &DewTuning) -> DewUpdate {
        let was_active = self.active;
        if was_active {
            if margin_centi > tuning.off_margin_centi() {
                self.active = false;
            }
        } else if margin_centi <= tuning.on_margin_centi {
            self.active = true;
        }

        self.duty_pct = match (was_active, self.active) {
            (_, false) => 0,
            (false, true) => tuning.duty_min_pct,
            (true, true) => {
                let current = self.duty_pct.clamp(tuning.duty_min_pct, tuning.duty_max_pct);
                slew_toward(current, tuning.target_duty(margin_centi))
            }
        };

        DewUpdate {
            duty_pct: self.duty_pct,
            transition: (was_active != self.active).then_some(self.active),
        }
    }

    /// Forget all state; the next update starts inactive.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Step `current` toward `target` by at most [`DEW_SLEW_STEP_PCT`].
pub fn slew_toward(current: u8, target: u8) -> u8 {
    if target > current {
        current.saturating_add(DEW_SLEW_STEP_PCT).min(target)
    } else {
        current.saturating_sub(DEW_SLEW_STEP_PCT).max(target)
    }
}
