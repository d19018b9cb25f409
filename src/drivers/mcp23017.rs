//! MCP23017 16-bit I2C GPIO expander.
//!
//! Port A drives the relay ports (GPA0..GPA7), port B is unused and held
//! low.  Writes go through a cached output latch so changing one relay is
//! a single register write that leaves the other bits alone.

use embedded_hal::i2c::I2c;

use crate::error::BusError;

use super::bus_error;

const REG_IODIRA: u8 = 0x00;
const REG_IODIRB: u8 = 0x01;
const REG_GPIOA: u8 = 0x12;
const REG_GPIOB: u8 = 0x13;

/// Expander state; the bus is passed in per call so it can be shared with
/// the ambient probe.
#[derive(Debug, Clone)]
pub struct Mcp23017 {
    addr: u8,
    gpio_a: u8,
}

impl Mcp23017 {
    pub const fn new(addr: u8) -> Self {
        Self { addr, gpio_a: 0 }
    }

    /// Configure both ports as outputs and drive them low.
    pub fn init<I: I2c>(&mut self, i2c: &mut I) -> Result<(), BusError> {
        self.gpio_a = 0;
        self.write_reg(i2c, REG_IODIRA, 0x00)?;
        self.write_reg(i2c, REG_IODIRB, 0x00)?;
        self.write_reg(i2c, REG_GPIOA, 0x00)?;
        self.write_reg(i2c, REG_GPIOB, 0x00)
    }

    /// Set one port A pin.  The latch only changes once the write is
    /// acknowledged.
    pub fn write_pin<I: I2c>(&mut self, i2c: &mut I, pin: u8, high: bool) -> Result<(), BusError> {
        if pin > 7 {
            return Err(BusError::Nack);
        }
        let next = if high {
            self.gpio_a | (1 << pin)
        } else {
            self.gpio_a & !(1 << pin)
        };
        self.write_reg(i2c, REG_GPIOA, next)?;
        self.gpio_a = next;
        Ok(())
    }

    /// Read back the port A pin levels.
    pub fn read_gpio_a<I: I2c>(&self, i2c: &mut I) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        i2c.write_read(self.addr, &[REG_GPIOA], &mut buf)
            .map_err(bus_error)?;
        Ok(buf[0])
    }

    /// Cached port A output latch.
    pub fn latch(&self) -> u8 {
        self.gpio_a
    }

    fn write_reg<I: I2c>(&self, i2c: &mut I, reg: u8, value: u8) -> Result<(), BusError> {
        i2c.write(self.addr, &[reg, value]).map_err(bus_error)
    }
}
