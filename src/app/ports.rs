//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PowerBox (domain)
//! ```
//!
//! Driven adapters (output drivers, ADC, probe, EEPROM, UART, event sinks)
//! implement these traits.  The [`PowerBox`](super::service::PowerBox)
//! consumes them via generics, so the domain core never touches hardware
//! directly and runs unchanged against the mocks in `tests/`.

use crate::error::{BusError, StorageError};

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → switches)
// ───────────────────────────────────────────────────────────────

/// Write-side port: physical drive of the power outputs.
pub trait OutputPort {
    /// Set the expander bit behind a relay port.
    fn set_relay(&mut self, port: usize, on: bool) -> Result<(), BusError>;

    /// Set the MCU pin behind a direct port.
    fn set_direct(&mut self, port: usize, on: bool);

    /// Set the duty of a PWM port (0 = off, 255 = fully on).
    fn set_pwm(&mut self, port: usize, level: u8);
}

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: ADC → domain)
// ───────────────────────────────────────────────────────────────

/// Raw sense voltages at the ADC pins, in millivolts.
///
/// `None` means the conversion failed; callers keep the previous
/// smoothed value.
pub trait AnalogPort {
    /// Tap of the input voltage divider.
    fn input_voltage_sense_mv(&mut self) -> Option<i32>;

    /// Output of the input current sensor.
    fn input_current_sense_mv(&mut self) -> Option<i32>;

    /// Current-sense output of one port (the adapter handles mux selection).
    fn port_current_sense_mv(&mut self, port: usize) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Probe port (driven adapter: ambient probe → domain)
// ───────────────────────────────────────────────────────────────

/// One raw reading from the detected ambient probe set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReading {
    pub temperature_centi: i32,
    pub humidity_centi: Option<i32>,
    pub pressure_pa: Option<u32>,
}

/// Read-side port for the ambient probe detected at boot.
pub trait ProbePort {
    fn read(&mut self) -> Result<ProbeReading, BusError>;
}

// ───────────────────────────────────────────────────────────────
// EEPROM port (driven adapter: domain ↔ non-volatile bytes)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile storage.  Erased cells read as `0xFF`.
pub trait EepromPort {
    /// Total size in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Store `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Serial port (driven adapter: host link)
// ───────────────────────────────────────────────────────────────

/// Byte-level host link.
pub trait SerialPort {
    /// Next received byte, or `None` when the receive buffer is empty.
    fn read_byte(&mut self) -> Option<u8>;

    /// Transmit a complete response frame.
    fn write_all(&mut self, bytes: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
