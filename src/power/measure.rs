//! Input and per-port voltage/current measurement.
//!
//! Raw sense voltages come from the [`AnalogPort`]; this module converts
//! them to board units and smooths them with a short rolling average.
//! Failed conversions leave the previous average untouched.

use crate::app::ports::AnalogPort;
use crate::board::{
    ADC_SMOOTHING_WINDOW, K_ALWAYS_ON_MV_PER_A, K_ILIS, K_INPUT_MV_PER_A, PORT_COUNT, PortType,
    R_SENSE_OHMS, RDIV_IN_OHMS, RDIV_OUT_OHMS, SENSOR_VCC_MV,
};
use crate::sensors::smoothing::RollingAverage;

type Window = RollingAverage<ADC_SMOOTHING_WINDOW>;

/// Smoothed electrical readings.
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    input_mv: i32,
    input_ma: i32,
    port_ma: [i32; PORT_COUNT],
    input_mv_avg: Window,
    input_ma_avg: Window,
    port_ma_avg: [Window; PORT_COUNT],
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample input voltage and input current once.
    pub fn sample_inputs(&mut self, analog: &mut impl AnalogPort) {
        if let Some(sense) = analog.input_voltage_sense_mv() {
            self.input_mv = self.input_mv_avg.add(divider_input_mv(sense));
        }
        if let Some(sense) = analog.input_current_sense_mv() {
            self.input_ma = self.input_ma_avg.add(hall_current_ma(sense, K_INPUT_MV_PER_A));
        }
    }

    /// Sample the output current of one port.
    pub fn sample_port(&mut self, port: usize, port_type: PortType, analog: &mut impl AnalogPort) {
        if port >= PORT_COUNT {
            return;
        }
        let Some(sense) = analog.port_current_sense_mv(port) else {
            return;
        };
        let raw_ma = match port_type {
            PortType::AlwaysOn => hall_current_ma(sense, K_ALWAYS_ON_MV_PER_A),
            PortType::Relay | PortType::Pwm | PortType::DirectGpio => high_side_current_ma(sense),
        };
        self.port_ma[port] = self.port_ma_avg[port].add(raw_ma);
    }

    /// Smoothed input voltage (mV).
    pub fn input_mv(&self) -> i32 {
        self.input_mv
    }

    /// Smoothed input current (mA).
    pub fn input_ma(&self) -> i32 {
        self.input_ma
    }

    /// Smoothed output current of `port` (mA); 0 for unknown ports.
    pub fn port_ma(&self, port: usize) -> i32 {
        self.port_ma.get(port).copied().unwrap_or(0)
    }
}

/// Undo the input divider.
pub fn divider_input_mv(sense_mv: i32) -> i32 {
    (i64::from(sense_mv) * i64::from(RDIV_IN_OHMS) / i64::from(RDIV_OUT_OHMS)) as i32
}

/// Bidirectional hall sensor centred on half its supply rail.
pub fn hall_current_ma(sense_mv: i32, mv_per_a: i32) -> i32 {
    let delta = i64::from(sense_mv) - i64::from(SENSOR_VCC_MV / 2);
    (delta * 1000 / i64::from(mv_per_a)) as i32
}

/// High-side switch current mirror across the sense resistor.
pub fn high_side_current_ma(sense_mv: i32) -> i32 {
    (i64::from(sense_mv) * i64::from(K_ILIS) / i64::from(R_SENSE_OHMS)) as i32
}
