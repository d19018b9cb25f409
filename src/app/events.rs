//! Outbound application events.
//!
//! The [`PowerBox`](super::service::PowerBox) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The log adapter writes
//! them to the console; tests record them.

use crate::error::{BusError, SafetyFault};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot finished; carries the discovery signature suffix state.
    Started { have_ambient: bool, have_pressure: bool },

    /// The dew heater engaged or released.
    DewStateChanged { active: bool, margin_centi: i32 },

    /// A config record was written to slot `slot`.
    ConfigSaved { slot: usize },

    /// Stored config violated an invariant and was repaired on load.
    ConfigRecovered,

    /// A frame overflowed the receive buffer and was dropped.
    FrameDropped,

    /// A complete frame arrived while the command queue was full.
    QueueOverflow,

    /// A safety fault was latched.
    FaultDetected(SafetyFault),

    /// A safety fault condition went away.
    FaultCleared(SafetyFault),

    /// The probe could not be read; the last smoothed value is kept.
    ProbeReadFailed(BusError),
}
