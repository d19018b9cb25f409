//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the I2C bus (shared by the relay expander and the probes)
//! and exposes the board through [`OutputPort`], [`AnalogPort`] and
//! [`ProbePort`].  This is the only module in the system that touches
//! actual hardware.  Off-target the raw pin helpers in
//! [`hw_init`](crate::drivers::hw_init) are no-ops, so the adapter still
//! runs against any `embedded-hal` bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{AnalogPort, OutputPort, ProbePort, ProbeReading};
use crate::drivers::hw_init::{adc1_read_mv, gpio_write, ledc_channel, ledc_set, select_sense_channel};
use crate::drivers::mcp23017::Mcp23017;
use crate::drivers::probe::ProbeSet;
use crate::error::BusError;
use crate::pins;

/// Settling time after switching the current-sense multiplexer.
const SENSE_SETTLE_US: u32 = 100;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I2C, D> {
    i2c: I2C,
    delay: D,
    expander: Mcp23017,
    probes: Option<ProbeSet>,
}

impl<I2C: I2c, D: DelayNs> HardwareAdapter<I2C, D> {
    /// Initialise the expander (all relays off) and detect the probes.
    pub fn new(mut i2c: I2C, mut delay: D) -> Self {
        let mut expander = Mcp23017::new(pins::EXPANDER_ADDR);
        if let Err(e) = expander.init(&mut i2c) {
            warn!("expander init failed: {e}");
        }
        let probes = ProbeSet::detect(&mut i2c, &mut delay);
        Self {
            i2c,
            delay,
            expander,
            probes,
        }
    }

    pub fn have_ambient(&self) -> bool {
        self.probes.is_some()
    }

    pub fn have_pressure(&self) -> bool {
        self.probes.as_ref().is_some_and(ProbeSet::has_pressure)
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl<I2C: I2c, D: DelayNs> OutputPort for HardwareAdapter<I2C, D> {
    fn set_relay(&mut self, port: usize, on: bool) -> Result<(), BusError> {
        let pin = pins::PORT_PIN.get(port).copied().ok_or(BusError::Nack)?;
        self.expander.write_pin(&mut self.i2c, pin as u8, on)
    }

    fn set_direct(&mut self, port: usize, on: bool) {
        if let Some(&pin) = pins::PORT_PIN.get(port) {
            gpio_write(pin, on);
        }
    }

    fn set_pwm(&mut self, port: usize, level: u8) {
        if let Some(channel) = ledc_channel(port) {
            ledc_set(channel, level);
        }
    }
}

// ── AnalogPort implementation ─────────────────────────────────

impl<I2C: I2c, D: DelayNs> AnalogPort for HardwareAdapter<I2C, D> {
    fn input_voltage_sense_mv(&mut self) -> Option<i32> {
        adc1_read_mv(pins::ADC1_CH_VSIN)
    }

    fn input_current_sense_mv(&mut self) -> Option<i32> {
        adc1_read_mv(pins::ADC1_CH_ISIN)
    }

    fn port_current_sense_mv(&mut self, port: usize) -> Option<i32> {
        select_sense_channel(port);
        self.delay.delay_us(SENSE_SETTLE_US);
        adc1_read_mv(pins::ADC1_CH_ISOUT)
    }
}

// ── ProbePort implementation ──────────────────────────────────

impl<I2C: I2c, D: DelayNs> ProbePort for HardwareAdapter<I2C, D> {
    fn read(&mut self) -> Result<ProbeReading, BusError> {
        match self.probes.as_mut() {
            Some(probes) => probes.read(&mut self.i2c, &mut self.delay),
            None => Err(BusError::Nack),
        }
    }
}
