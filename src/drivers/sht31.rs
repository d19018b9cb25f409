//! Sensirion SHT31 temperature / humidity probe.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::BusError;

use super::bus_error;

/// Addresses the probe answers on (ADDR pin low / high).
pub const ADDRESSES: [u8; 2] = [0x44, 0x45];

const CMD_READ_STATUS: [u8; 2] = [0xF3, 0x2D];
/// Single shot, high repeatability, no clock stretching.
const CMD_MEASURE: [u8; 2] = [0x24, 0x00];
const MEASURE_MS: u32 = 15;

#[derive(Debug, Clone)]
pub struct Sht31 {
    addr: u8,
}

impl Sht31 {
    /// Check for a probe at `addr` by reading its status register.
    pub fn detect<I: I2c>(i2c: &mut I, addr: u8) -> Option<Self> {
        let mut status = [0u8; 3];
        i2c.write_read(addr, &CMD_READ_STATUS, &mut status).ok()?;
        (crc8(&status[..2]) == status[2]).then_some(Self { addr })
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// One measurement as (centi-degC, centi-%RH).
    pub fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(i32, i32), BusError> {
        i2c.write(self.addr, &CMD_MEASURE).map_err(bus_error)?;
        delay.delay_ms(MEASURE_MS);

        let mut buf = [0u8; 6];
        i2c.read(self.addr, &mut buf).map_err(bus_error)?;
        if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
            return Err(BusError::Nack);
        }

        let raw_t = u16::from_be_bytes([buf[0], buf[1]]);
        let raw_h = u16::from_be_bytes([buf[3], buf[4]]);
        Ok((temperature_centi(raw_t), humidity_centi(raw_h)))
    }
}

fn temperature_centi(raw: u16) -> i32 {
    -4500 + ((17_500 * i64::from(raw) + 32_767) / 65_535) as i32
}

fn humidity_centi(raw: u16) -> i32 {
    ((10_000 * i64::from(raw) + 32_767) / 65_535) as i32
}

/// CRC-8, polynomial 0x31, init 0xFF.
pub(crate) fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
