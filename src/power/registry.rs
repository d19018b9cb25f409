//! Port registry: typed state machine for every power output.
//!
//! Each port has an immutable [`PortType`] taken from the board signature
//! and a mutable on/off state.  PWM ports additionally carry a
//! [`PwmMode`] and an 8-bit level, tracked by a compact PWM index derived
//! from the port's position among the PWM ports.
//!
//! All mutations validate first and touch state only after the request is
//! known to be legal, so a rejected request never leaves a half-applied
//! change behind.

use log::{debug, warn};

use crate::app::ports::{AnalogPort, OutputPort};
use crate::board::{PORT_COUNT, PORT_TYPES, PWM_PORT_COUNT, PortType};
use crate::config::DeviceConfig;
use crate::control::slew_toward;
use crate::error::{PortError, Result};

use super::measure::Measurements;
use super::{PwmMode, percent_to_level};

/// Live state of all ports plus their measurements.
#[derive(Debug, Clone)]
pub struct PortRegistry {
    layout: [PortType; PORT_COUNT],
    on: [bool; PORT_COUNT],
    pwm_mode: [PwmMode; PWM_PORT_COUNT],
    pwm_level: [u8; PWM_PORT_COUNT],
    /// Duty each dew-ambient port is running at; only meaningful while
    /// its level is non-zero.
    dew_pct: [u8; PWM_PORT_COUNT],
    measurements: Measurements,
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortRegistry {
    /// Registry for this board's layout.  Always-on ports start on,
    /// everything else off.
    pub fn new() -> Self {
        Self::with_layout(PORT_TYPES)
    }

    /// Registry for an alternative layout of the same port count.
    pub fn with_layout(layout: [PortType; PORT_COUNT]) -> Self {
        let mut on = [false; PORT_COUNT];
        for (state, t) in on.iter_mut().zip(layout.iter()) {
            *state = *t == PortType::AlwaysOn;
        }
        Self {
            layout,
            on,
            pwm_mode: [PwmMode::Variable; PWM_PORT_COUNT],
            pwm_level: [0; PWM_PORT_COUNT],
            dew_pct: [0; PWM_PORT_COUNT],
            measurements: Measurements::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn layout(&self) -> &[PortType; PORT_COUNT] {
        &self.layout
    }

    pub fn port_type(&self, port: usize) -> Option<PortType> {
        self.layout.get(port).copied()
    }

    pub fn is_controllable(&self, port: usize) -> bool {
        self.port_type(port).is_some_and(PortType::is_controllable)
    }

    /// Compact PWM index of `port`: the number of PWM ports before it.
    pub fn pwm_index(&self, port: usize) -> Option<usize> {
        if self.port_type(port)? != PortType::Pwm {
            return None;
        }
        let idx = self.layout[..port]
            .iter()
            .filter(|t| **t == PortType::Pwm)
            .count();
        (idx < PWM_PORT_COUNT).then_some(idx)
    }

    pub fn is_on(&self, port: usize) -> bool {
        self.on.get(port).copied().unwrap_or(false)
    }

    pub fn pwm_mode(&self, port: usize) -> Option<PwmMode> {
        self.pwm_index(port).map(|i| self.pwm_mode[i])
    }

    pub fn pwm_level(&self, port: usize) -> Option<u8> {
        self.pwm_index(port).map(|i| self.pwm_level[i])
    }

    /// Value reported in the status response: 0/1 for switched ports, the
    /// raw 0-255 level for PWM ports (255/0 when switchable).
    pub fn status_value(&self, port: usize) -> u8 {
        match self.pwm_index(port) {
            Some(idx) => self.pwm_level[idx],
            None => u8::from(self.is_on(port)),
        }
    }

    /// On/off bitmap as persisted in [`DeviceConfig::port_status`].
    pub fn port_status_bits(&self) -> u16 {
        self.on
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0, |bits, (i, _)| bits | (1 << i))
    }

    /// Whether any PWM port is in dew-ambient mode.
    pub fn has_dew_ports(&self) -> bool {
        (0..PORT_COUNT).any(|p| self.pwm_mode(p) == Some(PwmMode::DewAmbient))
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    // ── Control ───────────────────────────────────────────────

    /// Switch a relay, direct, or switchable-PWM port.
    pub fn set_output(&mut self, port: usize, on: bool, hw: &mut impl OutputPort) -> Result<()> {
        let port_type = self.port_type(port).ok_or(PortError::OutOfRange)?;
        match port_type {
            PortType::AlwaysOn => return Err(PortError::NotControllable.into()),
            PortType::Relay => hw.set_relay(port, on)?,
            PortType::DirectGpio => hw.set_direct(port, on),
            PortType::Pwm => {
                let idx = self.pwm_index(port).ok_or(PortError::NotPwm)?;
                if self.pwm_mode[idx] != PwmMode::Switchable {
                    return Err(PortError::WrongMode.into());
                }
                let level = if on { u8::MAX } else { 0 };
                hw.set_pwm(port, level);
                self.pwm_level[idx] = level;
            }
        }
        self.on[port] = on;
        debug!("port {port} -> {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// Set the duty of a variable-mode PWM port.
    pub fn set_pwm_level(&mut self, port: usize, level: u8, hw: &mut impl OutputPort) -> Result<()> {
        let idx = self.require_pwm(port)?;
        if self.pwm_mode[idx] != PwmMode::Variable {
            return Err(PortError::WrongMode.into());
        }
        hw.set_pwm(port, level);
        self.pwm_level[idx] = level;
        self.on[port] = level > 0;
        debug!("port {port} level {level}");
        Ok(())
    }

    /// Change the mode of a PWM port and re-derive its output.
    ///
    /// Leaving dew-ambient mode zeroes the output first.  Then: switchable
    /// keeps the current on/off as 255/0, dew-ambient forces off, and
    /// variable re-applies the stored level.
    pub fn set_pwm_mode(&mut self, port: usize, mode: PwmMode, hw: &mut impl OutputPort) -> Result<()> {
        let idx = self.require_pwm(port)?;

        if self.pwm_mode[idx] == PwmMode::DewAmbient && mode != PwmMode::DewAmbient {
            self.pwm_level[idx] = 0;
            self.on[port] = false;
        }
        self.pwm_mode[idx] = mode;

        match mode {
            PwmMode::Switchable => {
                let on = self.pwm_level[idx] > 0 || self.on[port];
                self.pwm_level[idx] = if on { u8::MAX } else { 0 };
                self.on[port] = on;
            }
            PwmMode::DewAmbient => {
                self.pwm_level[idx] = 0;
                self.on[port] = false;
            }
            PwmMode::Variable => {
                self.on[port] = self.pwm_level[idx] > 0;
            }
        }
        hw.set_pwm(port, self.pwm_level[idx]);
        debug!("port {port} mode {mode:?}");
        Ok(())
    }

    /// Force every switchable port off and every PWM channel back to
    /// variable mode at level 0.  Always-on ports are untouched.
    pub fn all_off(&mut self, hw: &mut impl OutputPort) {
        for port in 0..PORT_COUNT {
            match self.layout[port] {
                PortType::AlwaysOn => continue,
                PortType::Relay => {
                    if let Err(e) = hw.set_relay(port, false) {
                        warn!("all_off: relay {port} write failed: {e}");
                    }
                }
                PortType::DirectGpio => hw.set_direct(port, false),
                PortType::Pwm => {
                    let Some(idx) = self.pwm_index(port) else {
                        continue;
                    };
                    self.pwm_level[idx] = 0;
                    self.pwm_mode[idx] = PwmMode::Variable;
                    hw.set_pwm(port, 0);
                }
            }
            self.on[port] = false;
        }
    }

    /// Take on/off state, levels and modes from a loaded config.  Does not
    /// drive outputs; follow with [`apply_config`](Self::apply_config).
    pub fn load_config(&mut self, cfg: &DeviceConfig) {
        for port in 0..PORT_COUNT {
            match self.layout[port] {
                PortType::AlwaysOn => self.on[port] = true,
                PortType::Relay | PortType::DirectGpio => self.on[port] = cfg.port_on(port),
                PortType::Pwm => {
                    let Some(idx) = self.pwm_index(port) else {
                        self.on[port] = false;
                        continue;
                    };
                    let mode = cfg.mode(idx);
                    self.pwm_mode[idx] = mode;
                    match mode {
                        PwmMode::Variable => {
                            self.pwm_level[idx] = cfg.pwm_level[idx];
                            self.on[port] = cfg.pwm_level[idx] > 0;
                        }
                        PwmMode::Switchable => {
                            let on = cfg.port_on(port);
                            self.pwm_level[idx] = if on { u8::MAX } else { 0 };
                            self.on[port] = on;
                        }
                        PwmMode::DewAmbient => {
                            self.pwm_level[idx] = 0;
                            self.on[port] = false;
                        }
                    }
                }
            }
        }
    }

    /// Re-drive every physical output from the in-memory state.
    pub fn apply_config(&mut self, hw: &mut impl OutputPort) {
        for port in 0..PORT_COUNT {
            match self.layout[port] {
                PortType::AlwaysOn => {}
                PortType::Relay => {
                    if let Err(e) = hw.set_relay(port, self.on[port]) {
                        warn!("apply_config: relay {port} write failed: {e}");
                    }
                }
                PortType::DirectGpio => hw.set_direct(port, self.on[port]),
                PortType::Pwm => {
                    let Some(idx) = self.pwm_index(port) else {
                        continue;
                    };
                    if self.pwm_mode[idx] == PwmMode::DewAmbient {
                        self.pwm_level[idx] = 0;
                        self.on[port] = false;
                    }
                    hw.set_pwm(port, self.pwm_level[idx]);
                }
            }
        }
    }

    // ── Dew heater outputs ────────────────────────────────────

    /// Move every dew-ambient port toward the shared `duty_pct`.
    ///
    /// A port that is currently off starts at `start_pct`, or one slew step
    /// when that is zero, capped at `duty_pct`.  A running port moves at
    /// most one slew step.  Zero duty
    /// turns all of them off at once.
    pub fn apply_dew_duty(&mut self, duty_pct: u8, start_pct: u8, hw: &mut impl OutputPort) {
        for port in 0..PORT_COUNT {
            let Some(idx) = self.pwm_index(port) else {
                continue;
            };
            if self.pwm_mode[idx] != PwmMode::DewAmbient {
                continue;
            }
            let pct = if duty_pct == 0 {
                0
            } else if self.pwm_level[idx] == 0 {
                start_pct.max(slew_toward(0, duty_pct)).min(duty_pct)
            } else {
                slew_toward(self.dew_pct[idx], duty_pct)
            };
            let level = percent_to_level(pct);
            self.dew_pct[idx] = pct;
            self.pwm_level[idx] = level;
            self.on[port] = level > 0;
            hw.set_pwm(port, level);
        }
    }

    /// Return every dew-ambient port to variable mode at level 0.
    /// Returns `true` if any port changed.
    pub fn disable_dew_mode(&mut self, hw: &mut impl OutputPort) -> bool {
        let mut changed = false;
        for port in 0..PORT_COUNT {
            let Some(idx) = self.pwm_index(port) else {
                continue;
            };
            if self.pwm_mode[idx] != PwmMode::DewAmbient {
                continue;
            }
            self.pwm_mode[idx] = PwmMode::Variable;
            self.pwm_level[idx] = 0;
            self.on[port] = false;
            hw.set_pwm(port, 0);
            changed = true;
        }
        changed
    }

    // ── Sampling ──────────────────────────────────────────────

    /// Sample input voltage/current and every port's output current.
    pub fn sample(&mut self, analog: &mut impl AnalogPort) {
        self.measurements.sample_inputs(analog);
        for port in 0..PORT_COUNT {
            self.measurements.sample_port(port, self.layout[port], analog);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn require_pwm(&self, port: usize) -> Result<usize> {
        if port >= PORT_COUNT {
            return Err(PortError::OutOfRange.into());
        }
        Ok(self.pwm_index(port).ok_or(PortError::NotPwm)?)
    }
}
