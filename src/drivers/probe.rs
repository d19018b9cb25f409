//! Ambient and pressure probe detection.
//!
//! Ambient detection order: SHT31 at 0x44 then 0x45, AHTx0 at 0x38, then
//! BME280 at 0x76/0x77 (which also covers pressure).  Next to an SHT31 or
//! AHTx0 a BMP280 at 0x76/0x77 is picked up as the pressure source.  What
//! is found at boot stays for the process lifetime.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::ProbeReading;
use crate::error::BusError;

use super::ahtx0::{self, Ahtx0};
use super::bme280::{self, Bme280};
use super::bmp280::{self, Bmp280};
use super::sht31::{self, Sht31};

/// The detected ambient probe.
#[derive(Debug, Clone)]
pub enum AmbientProbe {
    Sht31(Sht31),
    Ahtx0(Ahtx0),
    Bme280(Bme280),
}

impl AmbientProbe {
    fn detect<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D) -> Option<Self> {
        if let Some(p) = sht31::ADDRESSES.iter().find_map(|&addr| Sht31::detect(i2c, addr)) {
            return Some(Self::Sht31(p));
        }
        if let Some(p) = Ahtx0::detect(i2c, delay, ahtx0::ADDRESS) {
            return Some(Self::Ahtx0(p));
        }
        bme280::ADDRESSES
            .iter()
            .find_map(|&addr| Bme280::detect(i2c, delay, addr))
            .map(Self::Bme280)
    }

    fn describe(&self) -> (&'static str, u8) {
        match self {
            Self::Sht31(p) => ("SHT31", p.addr()),
            Self::Ahtx0(p) => ("AHTx0", p.addr()),
            Self::Bme280(p) => ("BME280", p.addr()),
        }
    }
}

/// Everything found on the probe connector.
#[derive(Debug, Clone)]
pub struct ProbeSet {
    ambient: AmbientProbe,
    barometer: Option<Bmp280>,
}

impl ProbeSet {
    /// `None` when no ambient probe answers; a lone BMP280 is not used.
    pub fn detect<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D) -> Option<Self> {
        let Some(ambient) = AmbientProbe::detect(i2c, delay) else {
            info!("probe: none detected");
            return None;
        };
        let (name, addr) = ambient.describe();
        info!("probe: {name} at 0x{addr:02x}");

        let barometer = if matches!(ambient, AmbientProbe::Bme280(_)) {
            None
        } else {
            bmp280::ADDRESSES
                .iter()
                .find_map(|&addr| Bmp280::detect(i2c, delay, addr))
        };
        if let Some(b) = &barometer {
            info!("probe: BMP280 at 0x{:02x}", b.addr());
        }
        Some(Self { ambient, barometer })
    }

    /// Whether readings carry barometric pressure.
    pub fn has_pressure(&self) -> bool {
        matches!(self.ambient, AmbientProbe::Bme280(_)) || self.barometer.is_some()
    }

    /// A failed ambient read fails the whole reading; a failed barometer
    /// read only drops the pressure.
    pub fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<ProbeReading, BusError> {
        let (temperature_centi, humidity_centi, mut pressure_pa) = match &mut self.ambient {
            AmbientProbe::Sht31(p) => {
                let (t, h) = p.read(i2c, delay)?;
                (t, h, None)
            }
            AmbientProbe::Ahtx0(p) => {
                let (t, h) = p.read(i2c, delay)?;
                (t, h, None)
            }
            AmbientProbe::Bme280(p) => {
                let (t, h, pa) = p.read(i2c, delay)?;
                (t, h, Some(pa))
            }
        };
        if let Some(b) = self.barometer.as_mut() {
            match b.read(i2c) {
                Ok((_, pa)) => pressure_pa = Some(pa),
                Err(e) => warn!("probe: BMP280 read failed: {e}"),
            }
        }
        Ok(ProbeReading {
            temperature_centi,
            humidity_centi: Some(humidity_centi),
            pressure_pa,
        })
    }
}
