//! Power outputs: the typed port model and its measurements.
//!
//! [`registry::PortRegistry`] owns the live on/off and PWM state of every
//! port; [`measure::Measurements`] owns the smoothed voltage and current
//! readings the status response reports.

pub mod measure;
pub mod registry;

pub use registry::PortRegistry;

/// Behaviour of a PWM port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PwmMode {
    /// Duty set directly by the host.
    Variable = 0,
    /// Behaves as a binary on/off output.
    Switchable = 1,
    /// Reserved for the automatic dew heater loop.
    DewAmbient = 2,
}

impl PwmMode {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Variable),
            1 => Some(Self::Switchable),
            2 => Some(Self::DewAmbient),
            _ => None,
        }
    }
}

/// Convert a duty percentage to an 8-bit PWM level.
pub const fn percent_to_level(pct: u8) -> u8 {
    let pct = if pct > 100 { 100 } else { pct };
    ((pct as u16 * 255) / 100) as u8
}
