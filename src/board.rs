//! Board description for the PowerBox main board.
//!
//! Single source of truth for everything that is fixed per hardware
//! revision: the port layout signature, protocol limits, electrical
//! conversion constants, control-loop timing and dew-control defaults.

use heapless::String;

// ---------------------------------------------------------------------------
// Firmware identity
// ---------------------------------------------------------------------------

/// Name reported in the discovery response.
pub const PROGRAM_NAME: &str = "BigPowerBox";
/// Protocol-visible firmware version.
pub const PROGRAM_VERSION: &str = "013";

// ---------------------------------------------------------------------------
// Port layout
// ---------------------------------------------------------------------------

/// One character per physical port:
///
/// | char | type                               |
/// |------|------------------------------------|
/// | `m`  | relay switched through the expander|
/// | `p`  | PWM output                         |
/// | `s`  | switched directly by an MCU pin    |
/// | `a`  | always on, not switchable          |
pub const BOARD_SIGNATURE_BASE: &str = "mmmmmmmmppppaa";

/// Number of physical output ports.
pub const PORT_COUNT: usize = BOARD_SIGNATURE_BASE.len();

/// Number of PWM channels that can be tracked in config.
pub const PWM_PORT_COUNT: usize = 4;

/// Longest discovery signature: base plus one probe suffix.
pub const SIGNATURE_CAPACITY: usize = 16;

/// Immutable electrical type of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    Relay,
    Pwm,
    DirectGpio,
    AlwaysOn,
}

impl PortType {
    /// Decode one board signature character.
    pub const fn from_signature(c: u8) -> Option<Self> {
        match c {
            b'm' => Some(Self::Relay),
            b'p' => Some(Self::Pwm),
            b's' => Some(Self::DirectGpio),
            b'a' => Some(Self::AlwaysOn),
            _ => None,
        }
    }

    /// Signature character for this type.
    pub const fn as_char(self) -> char {
        match self {
            Self::Relay => 'm',
            Self::Pwm => 'p',
            Self::DirectGpio => 's',
            Self::AlwaysOn => 'a',
        }
    }

    /// Whether the host may switch this port at all.
    pub const fn is_controllable(self) -> bool {
        !matches!(self, Self::AlwaysOn)
    }
}

/// Port types of this board, parsed from [`BOARD_SIGNATURE_BASE`].
pub const PORT_TYPES: [PortType; PORT_COUNT] = parse_layout(BOARD_SIGNATURE_BASE);

const _: () = assert!(
    count_pwm(&PORT_TYPES) <= PWM_PORT_COUNT,
    "board signature has more PWM ports than PWM_PORT_COUNT"
);

const fn parse_layout(signature: &str) -> [PortType; PORT_COUNT] {
    let bytes = signature.as_bytes();
    let mut out = [PortType::AlwaysOn; PORT_COUNT];
    let mut i = 0;
    while i < PORT_COUNT {
        out[i] = match PortType::from_signature(bytes[i]) {
            Some(t) => t,
            None => panic!("unknown port type in board signature"),
        };
        i += 1;
    }
    out
}

const fn count_pwm(layout: &[PortType; PORT_COUNT]) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < PORT_COUNT {
        if matches!(layout[i], PortType::Pwm) {
            n += 1;
        }
        i += 1;
    }
    n
}

/// Discovery signature: the base layout plus `f` (temperature + humidity)
/// or `g` (temperature + humidity + pressure) when a probe was detected.
pub fn board_signature(have_ambient: bool, have_pressure: bool) -> String<SIGNATURE_CAPACITY> {
    let mut sig = String::new();
    // Base is shorter than the capacity; the const assert below guards it.
    let _ = sig.push_str(BOARD_SIGNATURE_BASE);
    if have_ambient {
        let _ = sig.push(if have_pressure { 'g' } else { 'f' });
    }
    sig
}

const _: () = assert!(PORT_COUNT < SIGNATURE_CAPACITY);

// ---------------------------------------------------------------------------
// Serial protocol limits
// ---------------------------------------------------------------------------

/// Start-of-frame delimiter.
pub const FRAME_START: u8 = b'>';
/// End-of-frame delimiter.
pub const FRAME_END: u8 = b'#';
/// Token separator inside a frame.
pub const TOKEN_SEPARATOR: char = ':';
/// Maximum frame size including the terminator slot.
pub const MAX_COMMAND: usize = 21;
/// Maximum number of queued, not yet dispatched commands.
pub const QUEUE_LENGTH: usize = 5;
/// Fixed size of a stored port name including the terminator.
pub const NAME_LENGTH: usize = 16;
/// UART baud rate towards the host.
pub const SERIAL_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Interval between voltage/current samples.
pub const REFRESH_MS: u32 = 200;
/// Interval between probe reads and dew-control updates.
pub const SENSOR_READ_INTERVAL_MS: u32 = 1000;

// ---------------------------------------------------------------------------
// Measurement conversion
// ---------------------------------------------------------------------------

/// Supply rail of the hall-effect current sensors (mV).
pub const SENSOR_VCC_MV: i32 = 4700;
/// Input voltage divider, top resistor plus bottom resistor (ohms).
pub const RDIV_IN_OHMS: i32 = 14_100;
/// Input voltage divider, bottom resistor (ohms).
pub const RDIV_OUT_OHMS: i32 = 4_700;
/// CC6900-30A input current sensor sensitivity (mV per A).
pub const K_INPUT_MV_PER_A: i32 = 67;
/// CC6900-10A always-on port sensor sensitivity (mV per A).
pub const K_ALWAYS_ON_MV_PER_A: i32 = 200;
/// BTS7008 sense resistor (ohms).
pub const R_SENSE_OHMS: i32 = 1_126;
/// BTS7008 current sense ratio.
pub const K_ILIS: i32 = 5_450;
/// Samples in each rolling average.
pub const ADC_SMOOTHING_WINDOW: usize = 4;
/// Outputs may not be switched on above this input voltage (mV).
pub const MAX_INPUT_MV: i32 = 14_700;

// ---------------------------------------------------------------------------
// Probe smoothing
// ---------------------------------------------------------------------------

/// EMA coefficient in Q8 (32/256 = 0.125).
pub const SENSOR_EMA_ALPHA: u16 = 32;

// ---------------------------------------------------------------------------
// Dew control defaults (centi-degC / percent)
// ---------------------------------------------------------------------------

/// Default margin at or below which the heater engages.
pub const DEW_ON_MARGIN_CENTI: i16 = 300;
/// Extra margin above the turn-on point needed before disengaging.
pub const DEW_HYSTERESIS_CENTI: i32 = 50;
/// Margin at which the heater reaches its maximum duty.
pub const DEW_FULL_MARGIN_CENTI: i32 = 50;
/// Default lower duty bound while active.
pub const DEW_DUTY_MIN_PCT: u8 = 20;
/// Default upper duty bound while active.
pub const DEW_DUTY_MAX_PCT: u8 = 80;
/// Largest duty change per control update.
pub const DEW_SLEW_STEP_PCT: u8 = 10;
/// Highest turn-on margin accepted from config (5.00 degC).
pub const DEW_ON_MARGIN_MAX_CENTI: i16 = 500;

// ---------------------------------------------------------------------------
// Debug probe values
// ---------------------------------------------------------------------------

/// Temperature assumed by the fake probe (centi-degC).
pub const DEBUG_FAKE_TEMP_CENTI: i32 = 1500;
/// Humidity assumed by the fake probe (centi-%RH).
pub const DEBUG_FAKE_HUMID_CENTI: i32 = 5000;
