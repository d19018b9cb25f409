//! Application service: the hexagonal core.
//!
//! [`PowerBox`] owns every piece of mutable device state: the port
//! registry, the persisted config, the probe aggregator, the dew
//! controller, the safety monitor and the serial framer.  All I/O flows
//! through port traits injected at call sites, so the whole service runs
//! against the mock adapters in `tests/`.
//!
//! ```text
//!   SerialPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   AnalogPort ──▶ │           PowerBox           │
//!    ProbePort ──▶ │ registry · dew · safety · io │ ──▶ OutputPort
//!   EepromPort ◀──▶└──────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::board::{
    board_signature, PortType, PORT_COUNT, PORT_TYPES, REFRESH_MS, SENSOR_READ_INTERVAL_MS,
    SIGNATURE_CAPACITY,
};
use crate::config::DeviceConfig;
use crate::control::{DewController, DewTuning};
use crate::error::{PortError, ProtocolError, Result};
use crate::power::{PortRegistry, PwmMode};
use crate::protocol::format::{self, Response};
use crate::protocol::{CommandQueue, FrameEvent, Framer};
use crate::safety::{FaultTransition, SafetyMonitor};
use crate::scheduler::IntervalTimer;
use crate::sensors::ProbeAggregator;
use crate::storage::{ConfigStore, NameTable};

use super::commands::{Command, ResetScope};
use super::events::AppEvent;
use super::ports::{AnalogPort, EepromPort, EventSink, OutputPort, ProbePort, SerialPort};

// ───────────────────────────────────────────────────────────────
// PowerBox
// ───────────────────────────────────────────────────────────────

/// The device context: everything the control loop and the protocol
/// dispatcher act on.
pub struct PowerBox {
    registry: PortRegistry,
    config: DeviceConfig,
    store: ConfigStore,
    probe: ProbeAggregator,
    dew: DewController,
    safety: SafetyMonitor,
    framer: Framer,
    queue: CommandQueue,
    signature: heapless::String<SIGNATURE_CAPACITY>,
    sample_timer: IntervalTimer,
    sensor_timer: IntervalTimer,
}

impl PowerBox {
    /// Context for this board.  Probe presence comes from boot-time
    /// detection and is fixed from here on.
    pub fn new(have_ambient: bool, have_pressure: bool, debug_enabled: bool) -> Self {
        Self::with_layout(PORT_TYPES, have_ambient, have_pressure, debug_enabled)
    }

    /// Context for an alternative port layout.
    pub fn with_layout(
        layout: [PortType; PORT_COUNT],
        have_ambient: bool,
        have_pressure: bool,
        debug_enabled: bool,
    ) -> Self {
        let registry = PortRegistry::with_layout(layout);
        let probe = ProbeAggregator::new(have_ambient, have_pressure, debug_enabled);
        let signature = board_signature(probe.have_ambient(), probe.have_pressure());
        Self {
            config: DeviceConfig::defaults_for(registry.layout()),
            registry,
            store: ConfigStore::new(),
            probe,
            dew: DewController::new(),
            safety: SafetyMonitor::new(),
            framer: Framer::new(),
            queue: CommandQueue::new(),
            signature,
            sample_timer: IntervalTimer::new(REFRESH_MS),
            sensor_timer: IntervalTimer::new(SENSOR_READ_INTERVAL_MS),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load names and config, repair what needs repairing and drive every
    /// output to its persisted state.
    pub fn boot(
        &mut self,
        hw: &mut impl OutputPort,
        eeprom: &mut impl EepromPort,
        sink: &mut impl EventSink,
    ) {
        if let Err(e) = NameTable::init_defaults(eeprom) {
            warn!("port names unavailable: {e}");
        }

        match self.store.load(eeprom, self.registry.layout()) {
            Ok(report) => {
                if report.corrected {
                    sink.emit(&AppEvent::ConfigRecovered);
                }
                if let Some(slot) = report.saved_slot {
                    sink.emit(&AppEvent::ConfigSaved { slot });
                }
                self.config = report.config;
            }
            Err(e) => {
                warn!("config load failed ({e}), running on defaults");
                self.config = DeviceConfig::defaults_for(self.registry.layout());
            }
        }

        self.registry.load_config(&self.config);
        if !self.probe.have_ambient() && self.registry.disable_dew_mode(hw) {
            info!("no ambient probe, dew ports reverted to variable");
            self.sync_config();
            self.save(eeprom, sink);
        }
        self.registry.apply_config(hw);

        info!("{} ready, signature {}", crate::board::PROGRAM_NAME, self.signature);
        sink.emit(&AppEvent::Started {
            have_ambient: self.probe.have_ambient(),
            have_pressure: self.probe.have_pressure(),
        });
    }

    /// One pass of the cooperative loop.
    ///
    /// Drains the serial link, answers every queued command, then runs
    /// sampling and dew control when their intervals have elapsed.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl OutputPort + AnalogPort + ProbePort),
        serial: &mut impl SerialPort,
        eeprom: &mut impl EepromPort,
        sink: &mut impl EventSink,
    ) {
        while let Some(byte) = serial.read_byte() {
            self.receive(byte, sink);
        }

        while let Some(frame) = self.queue.pop() {
            let response = self.handle_frame(&frame, hw, eeprom, sink);
            serial.write_all(response.as_bytes());
        }

        if self.sample_timer.due(now_ms) {
            self.sample(hw, sink);
        }

        if self.sensor_timer.due(now_ms) {
            self.refresh_probe(hw, sink);
            self.run_dew_control(hw, sink);
        }
    }

    /// Feed one received byte to the framer.
    pub fn receive(&mut self, byte: u8, sink: &mut impl EventSink) {
        match self.framer.push_byte(byte, &mut self.queue) {
            FrameEvent::Overflow => sink.emit(&AppEvent::FrameDropped),
            FrameEvent::QueueFull => sink.emit(&AppEvent::QueueOverflow),
            FrameEvent::None | FrameEvent::Queued => {}
        }
    }

    /// Decode and execute one frame body.  Every failure answers `>ERR#`
    /// without touching state.
    pub fn handle_frame(
        &mut self,
        frame: &[u8],
        hw: &mut impl OutputPort,
        eeprom: &mut impl EepromPort,
        sink: &mut impl EventSink,
    ) -> Response {
        let result = Command::parse(frame)
            .map_err(Into::into)
            .and_then(|cmd| self.execute(cmd, hw, eeprom, sink));
        match result {
            Ok(response) => response,
            Err(e) => {
                debug!("command {:?} rejected: {e}", core::str::from_utf8(frame));
                format::err()
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn probe(&self) -> &ProbeAggregator {
        &self.probe
    }

    pub fn dew(&self) -> &DewController {
        &self.dew
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    /// Discovery signature, probe suffix included.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    // ── Dispatch ──────────────────────────────────────────────

    fn execute(
        &mut self,
        cmd: Command,
        hw: &mut impl OutputPort,
        eeprom: &mut impl EepromPort,
        sink: &mut impl EventSink,
    ) -> Result<Response> {
        let response = match cmd {
            Command::Ping => format::ok("POK"),
            Command::Discover => format::discovery(&self.signature),
            Command::Status => format::status(&self.registry, &self.probe),
            Command::PortOn(port) => {
                self.safety.check_switch_on()?;
                self.registry.set_output(port, true, hw)?;
                self.persist(eeprom, sink);
                format::ok("OOK")
            }
            Command::PortOff(port) => {
                self.registry.set_output(port, false, hw)?;
                self.persist(eeprom, sink);
                format::ok("FOK")
            }
            Command::SetPwmLevel { port, level } => {
                if level > 0 {
                    self.safety.check_switch_on()?;
                }
                self.registry.set_pwm_level(port, level, hw)?;
                self.persist(eeprom, sink);
                format::ok("WOK")
            }
            Command::SetPwmMode { port, mode } => {
                if mode == PwmMode::DewAmbient && !self.probe.have_ambient() {
                    return Err(PortError::ProbeRequired.into());
                }
                self.registry.set_pwm_mode(port, mode, hw)?;
                if !self.registry.has_dew_ports() {
                    self.dew.reset();
                }
                self.persist(eeprom, sink);
                format::ok("COK")
            }
            Command::GetPwmMode(port) => {
                let mode = self.registry.pwm_mode(port).ok_or(PortError::NotPwm)?;
                format::pwm_mode(port, mode)
            }
            Command::SetName { port, name } => {
                NameTable::write(eeprom, port, &name)?;
                format::ok("MOK")
            }
            Command::GetName(port) => format::name(port, &NameTable::read(eeprom, port)?),
            Command::LegacyTemperature => format::ok("TOK"),
            Command::LegacyDewMargin(port) => {
                format::dew_margin(port, self.config.dew_on_margin_centi)
            }
            Command::DewTuning {
                on_margin_deg,
                duty_min_pct,
                duty_max_pct,
            } => {
                let min = duty_min_pct.unwrap_or(self.config.dew_duty_min_pct);
                let max = duty_max_pct.unwrap_or(self.config.dew_duty_max_pct);
                if min > max {
                    return Err(ProtocolError::OutOfRange.into());
                }
                self.config.dew_on_margin_centi = i16::from(on_margin_deg) * 100;
                self.config.dew_duty_min_pct = min;
                self.config.dew_duty_max_pct = max;
                self.persist(eeprom, sink);
                format::ok("KOK")
            }
            Command::Reset(scope) => {
                if matches!(scope, ResetScope::Names | ResetScope::All) {
                    NameTable::reset(eeprom)?;
                }
                if matches!(scope, ResetScope::Config | ResetScope::All) {
                    self.factory_reset(hw, eeprom, sink);
                }
                info!("reset {scope:?}");
                format::ok("ROK")
            }
            Command::DebugOverride(values) => {
                self.probe.set_debug_override(values)?;
                format::ok("XOK")
            }
        };
        Ok(response)
    }

    /// Every switchable port off, every PWM channel variable at 0, dew
    /// tuning back to defaults.
    fn factory_reset(
        &mut self,
        hw: &mut impl OutputPort,
        eeprom: &mut impl EepromPort,
        sink: &mut impl EventSink,
    ) {
        self.registry.all_off(hw);
        self.dew.reset();
        self.config = DeviceConfig::defaults_for(self.registry.layout());
        self.save(eeprom, sink);
    }

    // ── Periodic work ─────────────────────────────────────────

    fn sample(&mut self, analog: &mut impl AnalogPort, sink: &mut impl EventSink) {
        self.registry.sample(analog);
        match self.safety.evaluate(self.registry.measurements().input_mv()) {
            Some(FaultTransition::Set(fault)) => sink.emit(&AppEvent::FaultDetected(fault)),
            Some(FaultTransition::Cleared(fault)) => sink.emit(&AppEvent::FaultCleared(fault)),
            None => {}
        }
    }

    fn refresh_probe(&mut self, probe: &mut impl ProbePort, sink: &mut impl EventSink) {
        if let Err(e) = self.probe.update(probe) {
            sink.emit(&AppEvent::ProbeReadFailed(e));
        }
    }

    fn run_dew_control(&mut self, hw: &mut impl OutputPort, sink: &mut impl EventSink) {
        if !self.registry.has_dew_ports() {
            self.dew.reset();
            return;
        }
        let Some(margin_centi) = self.probe.margin_centi() else {
            return;
        };
        let tuning = DewTuning::from_config(&self.config);
        let update = self.dew.update(margin_centi, &tuning);
        if let Some(active) = update.transition {
            sink.emit(&AppEvent::DewStateChanged {
                active,
                margin_centi,
            });
        }
        self.registry.apply_dew_duty(update.duty_pct, tuning.duty_min_pct, hw);
    }

    // ── Persistence ───────────────────────────────────────────

    /// Copy live port state into the config record.  Dew-ambient ports are
    /// driven by the control loop and persist as off at level 0.
    fn sync_config(&mut self) {
        let mut status = self.registry.port_status_bits();
        for port in 0..PORT_COUNT {
            let Some(idx) = self.registry.pwm_index(port) else {
                continue;
            };
            let Some(mode) = self.registry.pwm_mode(port) else {
                continue;
            };
            self.config.pwm_mode[idx] = mode as u8;
            if mode == PwmMode::DewAmbient {
                status &= !(1 << port);
                self.config.pwm_level[idx] = 0;
            } else {
                self.config.pwm_level[idx] = self.registry.pwm_level(port).unwrap_or(0);
            }
        }
        self.config.port_status = status;
    }

    fn persist(&mut self, eeprom: &mut impl EepromPort, sink: &mut impl EventSink) {
        self.sync_config();
        self.save(eeprom, sink);
    }

    fn save(&mut self, eeprom: &mut impl EepromPort, sink: &mut impl EventSink) {
        match self.store.save(eeprom, &self.config) {
            Ok(Some(slot)) => sink.emit(&AppEvent::ConfigSaved { slot }),
            Ok(None) => {}
            Err(e) => warn!("config save failed: {e}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::eeprom::MemEeprom;
    use crate::error::BusError;
    use crate::storage::EEPROM_SIZE;

    #[derive(Default)]
    struct Bench {
        pwm: [u8; PORT_COUNT],
        relay: [bool; PORT_COUNT],
    }

    impl OutputPort for Bench {
        fn set_relay(&mut self, port: usize, on: bool) -> core::result::Result<(), BusError> {
            self.relay[port] = on;
            Ok(())
        }
        fn set_direct(&mut self, _port: usize, _on: bool) {}
        fn set_pwm(&mut self, port: usize, level: u8) {
            self.pwm[port] = level;
        }
    }

    #[derive(Default)]
    struct Events(Vec<AppEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    fn booted(have_ambient: bool) -> (PowerBox, Bench, MemEeprom, Events) {
        let mut pb = PowerBox::new(have_ambient, false, false);
        let mut hw = Bench::default();
        let mut eeprom = MemEeprom::new(EEPROM_SIZE);
        let mut events = Events::default();
        pb.boot(&mut hw, &mut eeprom, &mut events);
        (pb, hw, eeprom, events)
    }

    fn send(pb: &mut PowerBox, hw: &mut Bench, eeprom: &mut MemEeprom, cmd: &str) -> String {
        let mut events = Events::default();
        pb.handle_frame(cmd.as_bytes(), hw, eeprom, &mut events)
            .as_str()
            .to_owned()
    }

    #[test]
    fn fresh_boot_saves_defaults_and_starts() {
        let (pb, _, _, events) = booted(false);
        assert_eq!(pb.signature(), "mmmmmmmmppppaa");
        assert!(events.0.contains(&AppEvent::ConfigSaved { slot: 0 }));
        assert_eq!(
            events.0.last(),
            Some(&AppEvent::Started {
                have_ambient: false,
                have_pressure: false
            })
        );
    }

    #[test]
    fn port_on_persists_bitmap() {
        let (mut pb, mut hw, mut eeprom, _) = booted(false);
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "O:2"), ">OOK#");
        assert!(pb.registry().is_on(2));
        assert!(hw.relay[2]);
        assert!(pb.config().port_on(2));
    }

    #[test]
    fn dew_mode_needs_probe() {
        let (mut pb, mut hw, mut eeprom, _) = booted(false);
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "C:8:2"), ">ERR#");
        assert_eq!(pb.registry().pwm_mode(8), Some(PwmMode::Variable));
    }

    #[test]
    fn dew_tuning_rejects_inverted_bounds() {
        let (mut pb, mut hw, mut eeprom, _) = booted(false);
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "K:2:90"), ">ERR#");
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "K:2:30:60"), ">KOK#");
        assert_eq!(pb.config().dew_on_margin_centi, 200);
        assert_eq!(pb.config().dew_duty_min_pct, 30);
        assert_eq!(pb.config().dew_duty_max_pct, 60);
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "H:8"), ">H:08:2#");
    }

    #[test]
    fn debug_override_disabled_by_default() {
        let (mut pb, mut hw, mut eeprom, _) = booted(true);
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "X:10:90"), ">ERR#");
    }

    #[test]
    fn unchanged_state_writes_nothing() {
        let (mut pb, mut hw, mut eeprom, _) = booted(false);
        let before = eeprom.write_count();
        assert_eq!(send(&mut pb, &mut hw, &mut eeprom, "F:3"), ">FOK#");
        assert_eq!(eeprom.write_count(), before);
    }
}
