//! Aosong AHT10/AHT20 (AHTx0) temperature / humidity probe.
//!
//! A measurement is triggered, then the status byte is polled until the
//! busy bit clears.  The poll is bounded at [`MAX_POLLS`] x [`POLL_MS`];
//! past that the read fails with [`BusError::Timeout`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::BusError;

use super::bus_error;

pub const ADDRESS: u8 = 0x38;

const CMD_INIT: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];
const STATUS_BUSY: u8 = 0x80;
const POWER_UP_MS: u32 = 50;
const INIT_MS: u32 = 10;

pub const MAX_POLLS: u32 = 20;
pub const POLL_MS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Ahtx0 {
    addr: u8,
}

impl Ahtx0 {
    /// Send the calibration/init command; an acknowledge means a probe is
    /// present.
    pub fn detect<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D, addr: u8) -> Option<Self> {
        delay.delay_ms(POWER_UP_MS);
        i2c.write(addr, &CMD_INIT).ok()?;
        delay.delay_ms(INIT_MS);
        Some(Self { addr })
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
        i2c.write(self.addr, &CMD_TRIGGER).map_err(bus_error)?;

        let mut buf = [0u8; 6];
        let mut ready = false;
        for _ in 0..MAX_POLLS {
            delay.delay_ms(POLL_MS);
            i2c.read(self.addr, &mut buf).map_err(bus_error)?;
            if buf[0] & STATUS_BUSY == 0 {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(BusError::Timeout);
        }

        let raw_h = (u32::from(buf[1]) << 12) | (u32::from(buf[2]) << 4) | u32::from(buf[3] >> 4);
        let raw_t = (u32::from(buf[3] & 0x0F) << 16) | (u32::from(buf[4]) << 8) | u32::from(buf[5]);
        Ok((temperature_centi(raw_t), humidity_centi(raw_h)))
    }
}

fn humidity_centi(raw: u32) -> i32 {
    ((u64::from(raw) * 10_000) >> 20).min(10_000) as i32
}

fn temperature_centi(raw: u32) -> i32 {
    ((u64::from(raw) * 20_000) >> 20) as i32 - 5_000
}
