//! GPIO / peripheral pin assignments for the PowerBox main board.
//!
//! Every driver references this module rather than hard-coding pin
//! numbers.  The meaning of [`PORT_PIN`] depends on the port type: an
//! expander bit (GPA0..GPA7) for relay ports, an MCU GPIO for PWM and
//! direct ports, and unused for always-on ports.

use crate::board::PORT_COUNT;

/// Marker for ports without a switchable pin.
pub const NO_PIN: i32 = -1;

/// Per-port pin, interpreted by port type.
pub const PORT_PIN: [i32; PORT_COUNT] = [
    // Relay ports 0-7: MCP23017 GPA0..GPA7
    0, 1, 2, 3, 4, 5, 6, 7,
    // PWM ports 8-11: LEDC-capable GPIOs
    4, 5, 6, 7,
    // Always-on ports 12-13
    NO_PIN, NO_PIN,
];

// ---------------------------------------------------------------------------
// GPIO expander (MCP23017)
// ---------------------------------------------------------------------------

/// 7-bit I2C address of the relay expander.
pub const EXPANDER_ADDR: u8 = 0x20;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for the PWM outputs (heaters, fans, dimmers).
pub const PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Analog inputs (ADC1)
// ---------------------------------------------------------------------------

/// Input voltage divider tap.
pub const ADC1_CH_VSIN: u32 = 0;
/// Input current sensor output.
pub const ADC1_CH_ISIN: u32 = 1;
/// Multiplexed per-port current sense output.
pub const ADC1_CH_ISOUT: u32 = 2;
/// Full-scale input of the ADC at 12 dB attenuation (mV).
pub const ADC_FULL_SCALE_MV: i32 = 3_300;
/// Highest raw reading at 12-bit resolution.
pub const ADC_MAX_RAW: i32 = 4_095;

// ---------------------------------------------------------------------------
// Current-sense multiplexer
// ---------------------------------------------------------------------------

/// Mux address lines, LSB first.
pub const MUX_SELECT_GPIO: [i32; 3] = [10, 11, 12];
/// Selects the second bank of high-side switch sense outputs.
pub const DSEL_GPIO: i32 = 13;
/// Enables the sense outputs of the high-side switches.
pub const SENSE_ENABLE_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// I²C bus (expander + ambient probe)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// UART towards the host
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;
