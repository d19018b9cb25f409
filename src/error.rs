//! Unified error types for the PowerBox firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! dispatcher's failure path uniform: whatever goes wrong, the host sees
//! `>ERR#`.  All variants are `Copy` so they pass through the control
//! loop without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A port operation was rejected by the registry.
    Port(PortError),
    /// An I2C transaction failed.
    Bus(BusError),
    /// Non-volatile storage access failed.
    Storage(StorageError),
    /// A command could not be parsed.
    Protocol(ProtocolError),
    /// A safety interlock blocked the request.
    Safety(SafetyFault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port(e) => write!(f, "port: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Port registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// Port index is not below `PORT_COUNT`.
    OutOfRange,
    /// Always-on ports cannot be switched.
    NotControllable,
    /// The operation needs a PWM port.
    NotPwm,
    /// The PWM port is in a mode that forbids the operation.
    WrongMode,
    /// Dew-ambient mode needs a detected ambient probe.
    ProbeRequired,
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "port index out of range"),
            Self::NotControllable => write!(f, "port not controllable"),
            Self::NotPwm => write!(f, "not a PWM port"),
            Self::WrongMode => write!(f, "PWM mode forbids operation"),
            Self::ProbeRequired => write!(f, "ambient probe required"),
        }
    }
}

impl From<PortError> for Error {
    fn from(e: PortError) -> Self {
        Self::Port(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The device did not acknowledge, or the transfer failed.
    Nack,
    /// A "measurement ready" poll exceeded its bound.
    Timeout,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "I2C transfer failed"),
            Self::Timeout => write!(f, "device not ready in time"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access would run past the end of the medium.
    OutOfBounds,
    /// The backend failed to read or commit.
    Io,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Nothing between the delimiters.
    Empty,
    /// First character does not name a command.
    UnknownCommand,
    /// A required token is absent.
    MissingArgument,
    /// A token is not a decimal integer.
    InvalidNumber,
    /// A number is outside its allowed range.
    OutOfRange,
    /// PWM mode number is not 0, 1 or 2.
    InvalidMode,
    /// Reset scope is not `NAMES`, `CONF` or `ALL`.
    InvalidScope,
    /// The command is disabled on this build.
    Disabled,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingArgument => write!(f, "missing argument"),
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::InvalidMode => write!(f, "invalid PWM mode"),
            Self::InvalidScope => write!(f, "invalid reset scope"),
            Self::Disabled => write!(f, "command disabled"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Safety faults are latched in a bitfield by the
/// [`SafetyMonitor`](crate::safety::SafetyMonitor) so that several can be
/// tracked and cleared independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Smoothed input voltage exceeds the switching ceiling.
    InputOvervoltage = 0b0000_0001,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputOvervoltage => write!(f, "input overvoltage"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
