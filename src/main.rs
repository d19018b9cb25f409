//! BigPowerBox Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      UartSerial    NvsEeprom    LogEventSink  │
//! │  (Output+Analog+      (SerialPort)  (EepromPort) (EventSink)   │
//! │   Probe)                                                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │               PowerBox (pure logic)                    │    │
//! │  │  registry · dew control · safety · config · protocol   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use log::{error, info, warn};

use powerbox::adapters::eeprom::{MemEeprom, NvsEeprom};
use powerbox::adapters::hardware::HardwareAdapter;
use powerbox::adapters::log_sink::LogEventSink;
use powerbox::adapters::serial::UartSerial;
use powerbox::adapters::time::Esp32TimeAdapter;
use powerbox::app::ports::EepromPort;
use powerbox::app::service::PowerBox;
use powerbox::board::{PROGRAM_NAME, PROGRAM_VERSION, SERIAL_BAUD};
use powerbox::drivers::hw_init;
use powerbox::drivers::watchdog::Watchdog;
use powerbox::error::StorageError;
use powerbox::pins;
use powerbox::storage::EEPROM_SIZE;

/// Idle time between loop passes.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("{} v{} starting", PROGRAM_NAME, PROGRAM_VERSION);

    if let Err(e) = hw_init::init_peripherals() {
        // Watchdog not armed yet; outputs stay in their reset state.
        error!("HAL init failed: {}, halting", e);
        loop {
            FreeRtos::delay_ms(1_000);
        }
    }

    let peripherals = Peripherals::take()?;

    // ── 2. Buses ──────────────────────────────────────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz()),
    )?;
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(SERIAL_BAUD)),
    )?;

    // ── 3. Adapters ───────────────────────────────────────────
    let mut hw = HardwareAdapter::new(i2c, Delay::new_default());
    let mut serial = UartSerial::new(uart);
    let mut sink = LogEventSink::new();
    let time = Esp32TimeAdapter::new();
    let mut eeprom = match NvsEeprom::new(EEPROM_SIZE) {
        Ok(nvs) => Storage::Nvs(nvs),
        Err(e) => {
            warn!("NVS unavailable ({}), settings will not survive a reset", e);
            Storage::Ram(MemEeprom::new(EEPROM_SIZE))
        }
    };

    // ── 4. Core ───────────────────────────────────────────────
    let mut powerbox = PowerBox::new(
        hw.have_ambient(),
        hw.have_pressure(),
        cfg!(feature = "debug-probe"),
    );
    powerbox.boot(&mut hw, &mut eeprom, &mut sink);
    info!("signature {}", powerbox.signature());

    let watchdog = Watchdog::new();

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        powerbox.tick(time.uptime_ms(), &mut hw, &mut serial, &mut eeprom, &mut sink);
        watchdog.feed();
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}

/// NVS-backed storage, or a RAM image when NVS could not be opened.
enum Storage {
    Nvs(NvsEeprom),
    Ram(MemEeprom),
}

impl EepromPort for Storage {
    fn capacity(&self) -> usize {
        match self {
            Self::Nvs(s) => s.capacity(),
            Self::Ram(s) => s.capacity(),
        }
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        match self {
            Self::Nvs(s) => s.read(offset, buf),
            Self::Ram(s) => s.read(offset, buf),
        }
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Nvs(s) => s.write(offset, data),
            Self::Ram(s) => s.write(offset, data),
        }
    }
}
