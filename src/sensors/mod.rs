//! Sensor subsystem: smoothing primitives and the [`ProbeAggregator`].
//!
//! The aggregator owns the EMA-smoothed ambient readings fed by whichever
//! probe was detected at boot, and derives the dewpoint and margin the dew
//! controller runs on.  Probe presence is fixed for the process lifetime.

pub mod smoothing;

use log::debug;

use crate::app::ports::ProbePort;
use crate::board::{DEBUG_FAKE_HUMID_CENTI, DEBUG_FAKE_TEMP_CENTI, SENSOR_EMA_ALPHA};
use crate::error::{BusError, ProtocolError};
use smoothing::EmaFilter;

/// Smoothed ambient readings plus the debug override.
#[derive(Debug, Clone)]
pub struct ProbeAggregator {
    have_ambient: bool,
    have_pressure: bool,
    temperature: EmaFilter,
    humidity: EmaFilter,
    pressure: EmaFilter,
    dewpoint_centi: i32,
    debug_enabled: bool,
    /// Fixed (temperature, humidity) in centi-units fed instead of the probe.
    debug_override: Option<(i32, i32)>,
    /// No real probe was found; the debug constants stand in for it.
    fake_probe: bool,
}

impl ProbeAggregator {
    /// `debug_enabled` turns on the override command and, when no ambient
    /// probe was found, substitutes a fake one.
    pub fn new(have_ambient: bool, have_pressure: bool, debug_enabled: bool) -> Self {
        let fake_probe = debug_enabled && !have_ambient;
        Self {
            have_ambient: have_ambient || fake_probe,
            have_pressure: have_ambient && have_pressure,
            temperature: EmaFilter::new(),
            humidity: EmaFilter::new(),
            pressure: EmaFilter::new(),
            dewpoint_centi: 0,
            debug_enabled,
            debug_override: None,
            fake_probe,
        }
    }

    pub fn have_ambient(&self) -> bool {
        self.have_ambient
    }

    pub fn have_pressure(&self) -> bool {
        self.have_pressure
    }

    pub fn temperature_centi(&self) -> i32 {
        self.temperature.value()
    }

    pub fn humidity_centi(&self) -> i32 {
        self.humidity.value()
    }

    pub fn pressure_hpa(&self) -> i32 {
        self.pressure.value()
    }

    pub fn dewpoint_centi(&self) -> i32 {
        self.dewpoint_centi
    }

    /// Ambient temperature minus dewpoint, once a reading has arrived.
    pub fn margin_centi(&self) -> Option<i32> {
        (self.have_ambient && self.temperature.is_initialized())
            .then(|| self.temperature.value() - self.dewpoint_centi)
    }

    /// Feed fixed values instead of probe readings, or `None` to go back
    /// to the probe.  Rejected unless the debug flag is on.
    pub fn set_debug_override(
        &mut self,
        values: Option<(i32, i32)>,
    ) -> Result<(), ProtocolError> {
        if !self.debug_enabled {
            return Err(ProtocolError::Disabled);
        }
        self.debug_override = values;
        Ok(())
    }

    /// Pull one reading through the EMA filters.
    ///
    /// No-op without an ambient probe.  On a failed read the previous
    /// smoothed values are kept and the error is returned.
    pub fn update(&mut self, probe: &mut impl ProbePort) -> Result<(), BusError> {
        if !self.have_ambient {
            return Ok(());
        }

        let (t_centi, rh_centi) = if let Some(values) = self.debug_override {
            values
        } else if self.fake_probe {
            (DEBUG_FAKE_TEMP_CENTI, DEBUG_FAKE_HUMID_CENTI)
        } else {
            let reading = probe.read()?;
            if let Some(pa) = reading.pressure_pa.filter(|_| self.have_pressure) {
                let hpa = i32::try_from(pa / 100).unwrap_or(i32::MAX);
                self.pressure.update(hpa, SENSOR_EMA_ALPHA);
            }
            let rh = reading
                .humidity_centi
                .unwrap_or_else(|| self.humidity.value());
            (reading.temperature_centi, rh)
        };

        let t = self.temperature.update(t_centi, SENSOR_EMA_ALPHA);
        let rh = self.humidity.update(rh_centi, SENSOR_EMA_ALPHA);
        self.dewpoint_centi = dewpoint_centi(t, rh);
        debug!("ambient {t} cC, {rh} c%RH, dewpoint {} cC", self.dewpoint_centi);
        Ok(())
    }
}

/// Magnus approximation of the dewpoint (centi-degC) from temperature
/// (centi-degC) and relative humidity (centi-%).
pub fn dewpoint_centi(temperature_centi: i32, humidity_centi: i32) -> i32 {
    const B: f32 = 17.62;
    const C: f32 = 243.12;

    let t = temperature_centi as f32 / 100.0;
    let rh = (humidity_centi as f32 / 100.0).clamp(1.0, 100.0);
    let gamma = (rh / 100.0).ln() + B * t / (C + t);
    let dp = C * gamma / (B - gamma);
    (dp * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ProbeReading;

    struct ScriptedProbe {
        reading: Result<ProbeReading, BusError>,
        reads: usize,
    }

    impl ProbePort for ScriptedProbe {
        fn read(&mut self) -> Result<ProbeReading, BusError> {
            self.reads += 1;
            self.reading
        }
    }

    fn probe(t: i32, rh: i32, pa: Option<u32>) -> ScriptedProbe {
        ScriptedProbe {
            reading: Ok(ProbeReading {
                temperature_centi: t,
                humidity_centi: Some(rh),
                pressure_pa: pa,
            }),
            reads: 0,
        }
    }

    #[test]
    fn dewpoint_tracks_humidity_and_temperature() {
        // Saturated air: dewpoint equals temperature.
        assert!((dewpoint_centi(2000, 10_000) - 2000).abs() <= 1);
        // 20 degC / 50 %RH is about 9.3 degC.
        let dp = dewpoint_centi(2000, 5000);
        assert!((900..960).contains(&dp), "{dp}");
        assert!(dewpoint_centi(2000, 6000) > dp);
        assert!(dewpoint_centi(2500, 5000) > dp);
    }

    #[test]
    fn first_reading_seeds_filters() {
        let mut agg = ProbeAggregator::new(true, true, false);
        let mut p = probe(1500, 5000, Some(101_325));
        assert_eq!(agg.margin_centi(), None);
        agg.update(&mut p).unwrap();
        assert_eq!(agg.temperature_centi(), 1500);
        assert_eq!(agg.humidity_centi(), 5000);
        assert_eq!(agg.pressure_hpa(), 1013);
        let margin = agg.margin_centi().unwrap();
        assert_eq!(margin, 1500 - agg.dewpoint_centi());
    }

    #[test]
    fn failed_read_keeps_previous_values() {
        let mut agg = ProbeAggregator::new(true, false, false);
        let mut p = probe(1000, 4000, None);
        agg.update(&mut p).unwrap();
        p.reading = Err(BusError::Timeout);
        assert_eq!(agg.update(&mut p), Err(BusError::Timeout));
        assert_eq!(agg.temperature_centi(), 1000);
        assert_eq!(agg.humidity_centi(), 4000);
    }

    #[test]
    fn no_probe_is_a_no_op() {
        let mut agg = ProbeAggregator::new(false, false, false);
        let mut p = probe(1000, 4000, None);
        agg.update(&mut p).unwrap();
        assert_eq!(p.reads, 0);
        assert_eq!(agg.margin_centi(), None);
    }

    #[test]
    fn debug_override_requires_flag() {
        let mut agg = ProbeAggregator::new(true, false, false);
        assert_eq!(
            agg.set_debug_override(Some((500, 9000))),
            Err(ProtocolError::Disabled)
        );
    }

    #[test]
    fn debug_override_bypasses_probe() {
        let mut agg = ProbeAggregator::new(true, false, true);
        let mut p = probe(1000, 4000, None);
        agg.set_debug_override(Some((500, 9000))).unwrap();
        agg.update(&mut p).unwrap();
        assert_eq!(p.reads, 0);
        assert_eq!(agg.temperature_centi(), 500);

        agg.set_debug_override(None).unwrap();
        agg.update(&mut p).unwrap();
        assert_eq!(p.reads, 1);
    }

    #[test]
    fn fake_probe_stands_in_when_debugging() {
        let mut agg = ProbeAggregator::new(false, false, true);
        assert!(agg.have_ambient());
        let mut p = ScriptedProbe {
            reading: Err(BusError::Nack),
            reads: 0,
        };
        agg.update(&mut p).unwrap();
        assert_eq!(agg.temperature_centi(), DEBUG_FAKE_TEMP_CENTI);
        assert_eq!(agg.humidity_centi(), DEBUG_FAKE_HUMID_CENTI);
    }
}
