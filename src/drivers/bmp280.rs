//! Bosch BMP280 barometric pressure probe.
//!
//! The probe is put in normal mode at detection, so a read just fetches the
//! latest conversion.  Register map and temperature/pressure compensation
//! are shared with the BME280.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::BusError;

use super::bus_error;

/// Addresses the probe answers on (SDO low / high).
pub const ADDRESSES: [u8; 2] = [0x76, 0x77];

pub(crate) const REG_CHIP_ID: u8 = 0xD0;
pub(crate) const REG_CALIB: u8 = 0x88;
pub(crate) const REG_CTRL_MEAS: u8 = 0xF4;
pub(crate) const REG_CONFIG: u8 = 0xF5;
pub(crate) const REG_DATA: u8 = 0xF7;
/// Temperature and pressure oversampling x1, normal mode.
pub(crate) const CTRL_MEAS_NORMAL: u8 = 0x27;
pub(crate) const SETTLE_MS: u32 = 10;
pub(crate) const CALIB_LEN: usize = 24;

const CHIP_ID: u8 = 0x58;

/// Factory trimming for temperature and pressure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p: [i16; 8],
}

impl Calibration {
    pub(crate) fn parse(raw: &[u8]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p: core::array::from_fn(|k| s(8 + 2 * k)),
        }
    }

    /// Temperature in centi-degC and the fine value the other channels
    /// compensate against.
    pub(crate) fn temperature(&self, adc: i32) -> (i32, i32) {
        let adc = i64::from(adc);
        let t1 = i64::from(self.t1);
        let var1 = (((adc >> 3) - (t1 << 1)) * i64::from(self.t2)) >> 11;
        let d = (adc >> 4) - t1;
        let var2 = (((d * d) >> 12) * i64::from(self.t3)) >> 14;
        let fine = (var1 + var2) as i32;
        ((fine * 5 + 128) >> 8, fine)
    }

    /// Pressure in Pa.  Zero when the trimming is blank.
    pub(crate) fn pressure_pa(&self, adc: i32, fine: i32) -> u32 {
        let [p2, p3, p4, p5, p6, p7, p8, p9] = self.p.map(i64::from);
        let mut var1 = i64::from(fine) - 128_000;
        let mut var2 = var1 * var1 * p6;
        var2 += (var1 * p5) << 17;
        var2 += p4 << 35;
        var1 = ((var1 * var1 * p3) >> 8) + ((var1 * p2) << 12);
        var1 = (((1i64 << 47) + var1) * i64::from(self.p1)) >> 33;
        if var1 == 0 {
            return 0;
        }
        let mut p = 1_048_576 - i64::from(adc);
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (p9 * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (p8 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (p7 << 4);
        (p >> 8).clamp(0, i64::from(u32::MAX)) as u32
    }
}

pub(crate) fn read_regs<I: I2c>(i2c: &mut I, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
    i2c.write_read(addr, &[reg], buf).map_err(bus_error)
}

pub(crate) fn write_reg<I: I2c>(i2c: &mut I, addr: u8, reg: u8, value: u8) -> Result<(), BusError> {
    i2c.write(addr, &[reg, value]).map_err(bus_error)
}

/// 20-bit conversion result, MSB first, low nibble in the top of the
/// third byte.
pub(crate) fn adc20(b: &[u8]) -> i32 {
    (i32::from(b[0]) << 12) | (i32::from(b[1]) << 4) | i32::from(b[2] >> 4)
}

/// Chip id at `addr`, if anything answers.
pub(crate) fn chip_id<I: I2c>(i2c: &mut I, addr: u8) -> Option<u8> {
    let mut id = [0u8; 1];
    read_regs(i2c, addr, REG_CHIP_ID, &mut id).ok()?;
    Some(id[0])
}

#[derive(Debug, Clone)]
pub struct Bmp280 {
    addr: u8,
    cal: Calibration,
}

impl Bmp280 {
    /// Check the chip id at `addr`, load the trimming and start normal mode.
    pub fn detect<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D, addr: u8) -> Option<Self> {
        if chip_id(i2c, addr)? != CHIP_ID {
            return None;
        }
        let mut raw = [0u8; CALIB_LEN];
        read_regs(i2c, addr, REG_CALIB, &mut raw).ok()?;
        write_reg(i2c, addr, REG_CONFIG, 0).ok()?;
        write_reg(i2c, addr, REG_CTRL_MEAS, CTRL_MEAS_NORMAL).ok()?;
        delay.delay_ms(SETTLE_MS);
        Some(Self {
            addr,
            cal: Calibration::parse(&raw),
        })
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Latest conversion as (centi-degC, Pa).
    pub fn read<I: I2c>(&mut self, i2c: &mut I) -> Result<(i32, u32), BusError> {
        let mut buf = [0u8; 6];
        read_regs(i2c, self.addr, REG_DATA, &mut buf)?;
        let (t_centi, fine) = self.cal.temperature(adc20(&buf[3..6]));
        Ok((t_centi, self.cal.pressure_pa(adc20(&buf[0..3]), fine)))
    }
}
