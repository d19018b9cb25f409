//! Mock adapters for integration tests.
//!
//! Records every output call so tests can assert on the full drive
//! history without touching real GPIO/PWM registers, and serves scripted
//! analog and probe readings.

use powerbox::adapters::eeprom::MemEeprom;
use powerbox::adapters::serial::BufferedSerial;
use powerbox::app::events::AppEvent;
use powerbox::app::ports::{AnalogPort, EventSink, OutputPort, ProbePort, ProbeReading};
use powerbox::app::service::PowerBox;
use powerbox::board::PORT_COUNT;
use powerbox::error::BusError;
use powerbox::storage::EEPROM_SIZE;

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Relay { port: usize, on: bool },
    Direct { port: usize, on: bool },
    Pwm { port: usize, level: u8 },
}

// ── MockHardware ──────────────────────────────────────────────

/// Sense voltage that reads back as 12.0 V after the input divider.
pub const SENSE_12V: i32 = 4_000;
/// Sense voltage that reads back as 15.0 V, above the safety ceiling.
pub const SENSE_15V: i32 = 5_000;

pub struct MockHardware {
    pub calls: Vec<OutputCall>,
    /// Fail every expander write.
    pub relay_fail: bool,
    pub input_sense_mv: Option<i32>,
    pub input_current_sense_mv: Option<i32>,
    pub port_sense_mv: [Option<i32>; PORT_COUNT],
    /// `None` makes the probe read fail.
    pub probe: Option<ProbeReading>,
    pub probe_reads: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            relay_fail: false,
            input_sense_mv: Some(SENSE_12V),
            input_current_sense_mv: Some(2_350),
            port_sense_mv: [Some(0); PORT_COUNT],
            probe: None,
            probe_reads: 0,
        }
    }

    pub fn with_ambient(temperature_centi: i32, humidity_centi: i32) -> Self {
        let mut hw = Self::new();
        hw.set_ambient(temperature_centi, humidity_centi);
        hw
    }

    pub fn set_ambient(&mut self, temperature_centi: i32, humidity_centi: i32) {
        self.probe = Some(ProbeReading {
            temperature_centi,
            humidity_centi: Some(humidity_centi),
            pressure_pa: None,
        });
    }

    /// Last level driven onto a PWM port.
    pub fn pwm_level(&self, port: usize) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Pwm { port: p, level } if *p == port => Some(*level),
            _ => None,
        })
    }

    /// Last state written to a relay port.
    pub fn relay_on(&self, port: usize) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Relay { port: p, on } if *p == port => Some(*on),
            _ => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPort for MockHardware {
    fn set_relay(&mut self, port: usize, on: bool) -> Result<(), BusError> {
        if self.relay_fail {
            return Err(BusError::Nack);
        }
        self.calls.push(OutputCall::Relay { port, on });
        Ok(())
    }

    fn set_direct(&mut self, port: usize, on: bool) {
        self.calls.push(OutputCall::Direct { port, on });
    }

    fn set_pwm(&mut self, port: usize, level: u8) {
        self.calls.push(OutputCall::Pwm { port, level });
    }
}

impl AnalogPort for MockHardware {
    fn input_voltage_sense_mv(&mut self) -> Option<i32> {
        self.input_sense_mv
    }

    fn input_current_sense_mv(&mut self) -> Option<i32> {
        self.input_current_sense_mv
    }

    fn port_current_sense_mv(&mut self, port: usize) -> Option<i32> {
        self.port_sense_mv.get(port).copied().flatten()
    }
}

impl ProbePort for MockHardware {
    fn read(&mut self) -> Result<ProbeReading, BusError> {
        self.probe_reads += 1;
        self.probe.ok_or(BusError::Nack)
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Sink that stores every event for later assertions.
#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Bench: a booted PowerBox plus its adapters ────────────────

pub struct Bench {
    pub pb: PowerBox,
    pub hw: MockHardware,
    pub serial: BufferedSerial,
    pub eeprom: MemEeprom,
    pub sink: LogSink,
    pub now_ms: u32,
}

#[allow(dead_code)]
impl Bench {
    /// Boot a fresh board with blank storage.
    pub fn boot(pb: PowerBox, hw: MockHardware) -> Self {
        Self::boot_with(pb, hw, MemEeprom::new(EEPROM_SIZE))
    }

    /// Boot from an existing storage image.
    pub fn boot_with(mut pb: PowerBox, mut hw: MockHardware, mut eeprom: MemEeprom) -> Self {
        let mut sink = LogSink::new();
        pb.boot(&mut hw, &mut eeprom, &mut sink);
        Self {
            pb,
            hw,
            serial: BufferedSerial::new(),
            eeprom,
            sink,
            now_ms: 0,
        }
    }

    /// Send one command frame and return the response text.
    pub fn send(&mut self, body: &str) -> String {
        self.serial.inject(format!(">{body}#").as_bytes());
        self.tick();
        String::from_utf8(self.serial.take_output()).expect("ascii response")
    }

    /// One loop pass at the current time, then advance 10 ms.
    pub fn tick(&mut self) {
        self.pb.tick(
            self.now_ms,
            &mut self.hw,
            &mut self.serial,
            &mut self.eeprom,
            &mut self.sink,
        );
        self.now_ms = self.now_ms.wrapping_add(10);
    }

    /// Run loop passes until `ms` have elapsed.
    pub fn run_for(&mut self, ms: u32) {
        let end = self.now_ms.wrapping_add(ms);
        while self.now_ms != end {
            self.tick();
        }
    }

    /// Power-cycle: keep the storage image, rebuild everything else.
    pub fn reboot(self, pb: PowerBox, hw: MockHardware) -> Self {
        Self::boot_with(pb, hw, self.eeprom)
    }
}
