//! Peripheral drivers, hardware initialisation, and bus helpers.
//!
//! I2C drivers are written against the `embedded-hal` 1.0 traits and take
//! the bus per call, so the expander and the probes share one bus
//! without a mutex.

pub mod ahtx0;
pub mod bme280;
pub mod bmp280;
pub mod hw_init;
pub mod mcp23017;
pub mod probe;
pub mod sht31;
pub mod watchdog;

use log::debug;

use crate::error::BusError;

/// Collapse a HAL bus error into the firmware's transport error.
pub(crate) fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> BusError {
    debug!("i2c: {:?}", e.kind());
    BusError::Nack
}
