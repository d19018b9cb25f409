//! Fuzz target: serial bytes through `PowerBox::tick`
//!
//! Feeds arbitrary byte streams into a booted board and asserts that the
//! loop never panics, every response is a single delimited frame, and the
//! persisted config always reloads with exactly one live slot.
//!
//! cargo fuzz run fuzz_serial_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use powerbox::adapters::eeprom::MemEeprom;
use powerbox::adapters::serial::BufferedSerial;
use powerbox::app::events::AppEvent;
use powerbox::app::ports::{AnalogPort, EventSink, OutputPort, ProbePort, ProbeReading};
use powerbox::app::service::PowerBox;
use powerbox::board::PORT_TYPES;
use powerbox::error::BusError;
use powerbox::storage::{ConfigStore, EEPROM_SIZE};

struct Bench;

impl OutputPort for Bench {
    fn set_relay(&mut self, _port: usize, _on: bool) -> Result<(), BusError> {
        Ok(())
    }
    fn set_direct(&mut self, _port: usize, _on: bool) {}
    fn set_pwm(&mut self, _port: usize, _level: u8) {}
}

impl AnalogPort for Bench {
    fn input_voltage_sense_mv(&mut self) -> Option<i32> {
        Some(4_000)
    }
    fn input_current_sense_mv(&mut self) -> Option<i32> {
        Some(2_350)
    }
    fn port_current_sense_mv(&mut self, _port: usize) -> Option<i32> {
        Some(0)
    }
}

impl ProbePort for Bench {
    fn read(&mut self) -> Result<ProbeReading, BusError> {
        Ok(ProbeReading {
            temperature_centi: 1_000,
            humidity_centi: Some(9_000),
            pressure_pa: None,
        })
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let mut pb = PowerBox::new(true, false, true);
    let mut hw = Bench;
    let mut eeprom = MemEeprom::new(EEPROM_SIZE);
    let mut serial = BufferedSerial::new();
    pb.boot(&mut hw, &mut eeprom, &mut Discard);

    // Each chunk lands in its own loop pass, 250 ms apart.
    for (i, chunk) in data.chunks(16).enumerate() {
        serial.inject(chunk);
        pb.tick(i as u32 * 250, &mut hw, &mut serial, &mut eeprom, &mut Discard);

        let out = serial.take_output();
        let text = core::str::from_utf8(&out).expect("responses are UTF-8");
        for frame in text.split_inclusive('#') {
            assert!(frame.starts_with('>') && frame.ends_with('#'), "{frame:?}");
        }
    }

    let mut store = ConfigStore::new();
    let report = store.load(&mut eeprom, &PORT_TYPES).expect("config reloads");
    assert!(report.found);
});
