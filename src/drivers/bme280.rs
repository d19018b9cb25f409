//! Bosch BME280 temperature / humidity / pressure probe.
//!
//! Same register map and temperature/pressure trimming as the BMP280, plus
//! a humidity channel with its own trimming block.  Every read re-arms the
//! control registers before fetching the conversion.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::BusError;

use super::bmp280::{
    CALIB_LEN, CTRL_MEAS_NORMAL, Calibration, REG_CALIB, REG_CONFIG, REG_CTRL_MEAS, REG_DATA,
    SETTLE_MS, adc20, chip_id, read_regs, write_reg,
};

pub use super::bmp280::ADDRESSES;

const CHIP_ID: u8 = 0x60;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CALIB_H: u8 = 0xE1;
/// Humidity oversampling x1.
const CTRL_HUM_X1: u8 = 0x01;

/// Factory trimming for humidity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HumidityCalibration {
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

impl HumidityCalibration {
    /// `h1` sits at 0xA1; the rest is the 7-byte block from 0xE1.
    fn parse(h1: u8, raw: &[u8; 7]) -> Self {
        Self {
            h1,
            h2: i16::from_le_bytes([raw[0], raw[1]]),
            h3: raw[2],
            h4: (i16::from(raw[3] as i8) << 4) | i16::from(raw[4] & 0x0F),
            h5: (i16::from(raw[5] as i8) << 4) | i16::from(raw[4] >> 4),
            h6: raw[6] as i8,
        }
    }

    /// Relative humidity in centi-%.
    fn humidity_centi(&self, adc: i32, fine: i32) -> i32 {
        let adc = i64::from(adc);
        let v = i64::from(fine) - 76_800;
        let scaled = (((adc << 14) - (i64::from(self.h4) << 20) - (i64::from(self.h5) * v)) + 16_384) >> 15;
        let gain = (((((v * i64::from(self.h6)) >> 10) * (((v * i64::from(self.h3)) >> 11) + 32_768)) >> 10)
            + 2_097_152)
            * i64::from(self.h2)
            + 8_192;
        let mut v = scaled * (gain >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * i64::from(self.h1)) >> 4;
        let q10 = v.clamp(0, 419_430_400) >> 12;
        ((q10 * 100 + 512) / 1024) as i32
    }
}

#[derive(Debug, Clone)]
pub struct Bme280 {
    addr: u8,
    cal: Calibration,
    cal_h: HumidityCalibration,
}

impl Bme280 {
    /// Check the chip id at `addr`, load both trimming blocks and start
    /// normal mode.
    pub fn detect<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D, addr: u8) -> Option<Self> {
        if chip_id(i2c, addr)? != CHIP_ID {
            return None;
        }
        let mut raw = [0u8; CALIB_LEN + 2];
        read_regs(i2c, addr, REG_CALIB, &mut raw).ok()?;
        let mut raw_h = [0u8; 7];
        read_regs(i2c, addr, REG_CALIB_H, &mut raw_h).ok()?;

        let mut probe = Self {
            addr,
            cal: Calibration::parse(&raw[..CALIB_LEN]),
            cal_h: HumidityCalibration::parse(raw[CALIB_LEN + 1], &raw_h),
        };
        write_reg(i2c, addr, REG_CONFIG, 0).ok()?;
        probe.arm(i2c).ok()?;
        delay.delay_ms(SETTLE_MS);
        Some(probe)
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// ctrl_hum only latches on the following ctrl_meas write.
    fn arm<I: I2c>(&mut self, i2c: &mut I) -> Result<(), BusError> {
        write_reg(i2c, self.addr, REG_CTRL_HUM, CTRL_HUM_X1)?;
        write_reg(i2c, self.addr, REG_CTRL_MEAS, CTRL_MEAS_NORMAL)
    }

    /// One measurement as (centi-degC, centi-%RH, Pa).
    pub fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(i32, i32, u32), BusError> {
        self.arm(i2c)?;
        delay.delay_ms(SETTLE_MS);

        let mut buf = [0u8; 8];
        read_regs(i2c, self.addr, REG_DATA, &mut buf)?;
        let (t_centi, fine) = self.cal.temperature(adc20(&buf[3..6]));
        let pressure = self.cal.pressure_pa(adc20(&buf[0..3]), fine);
        let adc_h = (i32::from(buf[6]) << 8) | i32::from(buf[7]);
        Ok((t_centi, self.cal_h.humidity_centi(adc_h, fine), pressure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::bmp280::tests::{DATASHEET_CALIB, DATASHEET_DATA};
    use crate::drivers::testing::{FakeBus, NoDelay};

    /// h1 = 75, h2 = 362, h3 = 0, h4 = 313, h5 = 50, h6 = 30.
    const HUMIDITY_BLOCK: [u8; 7] = [106, 1, 0, 19, 41, 3, 30];

    fn calib_with_h1(h1: u8) -> Vec<u8> {
        let mut raw = DATASHEET_CALIB.to_vec();
        raw.extend_from_slice(&[0, h1]);
        raw
    }

    #[test]
    fn humidity_block_unpacks_nibbles() {
        let cal = HumidityCalibration::parse(75, &HUMIDITY_BLOCK);
        assert_eq!(
            cal,
            HumidityCalibration {
                h1: 75,
                h2: 362,
                h3: 0,
                h4: 313,
                h5: 50,
                h6: 30,
            }
        );
    }

    #[test]
    fn humidity_compensation() {
        let cal = HumidityCalibration::parse(75, &HUMIDITY_BLOCK);
        assert_eq!(cal.humidity_centi(30_000, 128_422), 5_500);
        // Saturates instead of going negative.
        assert_eq!(cal.humidity_centi(0, 128_422), 0);
    }

    #[test]
    fn detect_reads_both_trimming_blocks() {
        let mut bus = FakeBus::default();
        bus.reads.push_back(vec![CHIP_ID]);
        bus.reads.push_back(calib_with_h1(75));
        bus.reads.push_back(HUMIDITY_BLOCK.to_vec());
        let probe = Bme280::detect(&mut bus, &mut NoDelay, 0x77).unwrap();
        assert_eq!(probe.addr(), 0x77);
        assert_eq!(probe.cal_h.h1, 75);
        assert_eq!(probe.cal, Calibration::parse(&DATASHEET_CALIB));

        // A BMP280 answers with a different id.
        let mut other = FakeBus::default();
        other.reads.push_back(vec![0x58]);
        assert!(Bme280::detect(&mut other, &mut NoDelay, 0x76).is_none());
    }

    #[test]
    fn reads_all_three_channels() {
        let mut bus = FakeBus::default();
        let mut frame = DATASHEET_DATA.to_vec();
        frame.extend_from_slice(&30_000u16.to_be_bytes());
        bus.reads.push_back(frame);
        let mut probe = Bme280 {
            addr: 0x76,
            cal: Calibration::parse(&DATASHEET_CALIB),
            cal_h: HumidityCalibration::parse(75, &HUMIDITY_BLOCK),
        };
        assert_eq!(probe.read(&mut bus, &mut NoDelay), Ok((2508, 5_500, 100_653)));
        assert_eq!(bus.writes[0], (0x76, vec![REG_CTRL_HUM, CTRL_HUM_X1]));
        assert_eq!(bus.writes[1], (0x76, vec![REG_CTRL_MEAS, CTRL_MEAS_NORMAL]));
    }
}
