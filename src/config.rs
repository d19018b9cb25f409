//! Persisted device configuration
//!
//! The record that survives power cycles: which ports are on, the PWM
//! levels and modes, and the dew-control tuning.  Stored by the rotating
//! [`ConfigStore`](crate::storage::config_log::ConfigStore).

use serde::{Deserialize, Serialize};

use crate::board::{
    DEW_DUTY_MAX_PCT, DEW_DUTY_MIN_PCT, DEW_ON_MARGIN_CENTI, DEW_ON_MARGIN_MAX_CENTI, PORT_COUNT,
    PORT_TYPES, PWM_PORT_COUNT, PortType,
};
use crate::power::PwmMode;

/// Core persisted configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Bit `i` set = port `i` on.
    pub port_status: u16,
    /// Stored level per compact PWM index.
    pub pwm_level: [u8; PWM_PORT_COUNT],
    /// Raw [`PwmMode`] per compact PWM index.  Kept raw so that values
    /// written by other firmware revisions can be detected on load.
    pub pwm_mode: [u8; PWM_PORT_COUNT],
    /// Margin (centi-degC) at or below which the dew heater engages.
    pub dew_on_margin_centi: i16,
    /// Lower duty bound while the dew heater is active (0-100%).
    pub dew_duty_min_pct: u8,
    /// Upper duty bound while the dew heater is active (0-100%).
    pub dew_duty_max_pct: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::defaults_for(&PORT_TYPES)
    }
}

impl DeviceConfig {
    /// Factory defaults for a given port layout: everything off except the
    /// always-on ports, all PWM channels variable at level 0.
    pub fn defaults_for(layout: &[PortType; PORT_COUNT]) -> Self {
        Self {
            port_status: always_on_mask(layout),
            pwm_level: [0; PWM_PORT_COUNT],
            pwm_mode: [PwmMode::Variable as u8; PWM_PORT_COUNT],
            dew_on_margin_centi: DEW_ON_MARGIN_CENTI,
            dew_duty_min_pct: DEW_DUTY_MIN_PCT,
            dew_duty_max_pct: DEW_DUTY_MAX_PCT,
        }
    }

    /// Mode of a compact PWM index, falling back to Variable for values
    /// that [`sanitize`](Self::sanitize) would have replaced.
    pub fn mode(&self, pwm_index: usize) -> PwmMode {
        self.pwm_mode
            .get(pwm_index)
            .and_then(|&m| PwmMode::from_u8(m))
            .unwrap_or(PwmMode::Variable)
    }

    /// Whether port `port` is marked on.
    pub fn port_on(&self, port: usize) -> bool {
        port < PORT_COUNT && self.port_status & (1 << port) != 0
    }

    /// Force field-level invariants.  Offending fields are reset to their
    /// defaults; returns `true` if anything changed.
    pub fn sanitize(&mut self, layout: &[PortType; PORT_COUNT]) -> bool {
        let mut corrected = false;

        for mode in &mut self.pwm_mode {
            if PwmMode::from_u8(*mode).is_none() {
                *mode = PwmMode::Variable as u8;
                corrected = true;
            }
        }

        let masked = self.port_status & valid_port_mask();
        if masked != self.port_status {
            self.port_status = masked;
            corrected = true;
        }

        let always_on = always_on_mask(layout);
        if self.port_status & always_on != always_on {
            self.port_status |= always_on;
            corrected = true;
        }

        if !(0..=DEW_ON_MARGIN_MAX_CENTI).contains(&self.dew_on_margin_centi) {
            self.dew_on_margin_centi = DEW_ON_MARGIN_CENTI;
            corrected = true;
        }

        if self.dew_duty_min_pct > 100
            || self.dew_duty_max_pct > 100
            || self.dew_duty_min_pct > self.dew_duty_max_pct
        {
            self.dew_duty_min_pct = DEW_DUTY_MIN_PCT;
            self.dew_duty_max_pct = DEW_DUTY_MAX_PCT;
            corrected = true;
        }

        corrected
    }
}

/// Bits that correspond to real ports.
pub const fn valid_port_mask() -> u16 {
    if PORT_COUNT >= 16 {
        u16::MAX
    } else {
        (1u16 << PORT_COUNT) - 1
    }
}

fn always_on_mask(layout: &[PortType; PORT_COUNT]) -> u16 {
    layout
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == PortType::AlwaysOn)
        .fold(0, |mask, (i, _)| mask | (1 << i))
}
