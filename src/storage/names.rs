//! Per-port name table.
//!
//! One [`NAME_LENGTH`]-byte slot per port, NUL-padded, at [`NAME_BASE`].
//! Slots that read as erased get a `PortNN` default on boot.

use core::fmt::Write as _;

use heapless::String;
use log::debug;

use crate::app::ports::EepromPort;
use crate::board::{NAME_LENGTH, PORT_COUNT};
use crate::error::{PortError, Result, StorageError};

use super::NAME_BASE;

/// A port name; one byte of the slot is reserved for the terminator.
pub type PortName = String<{ NAME_LENGTH - 1 }>;

/// Stateless accessor for the name slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameTable;

impl NameTable {
    fn offset(port: usize) -> Result<usize> {
        if port >= PORT_COUNT {
            return Err(PortError::OutOfRange.into());
        }
        Ok(NAME_BASE + port * NAME_LENGTH)
    }

    /// Factory name of `port`.
    pub fn default_name(port: usize) -> PortName {
        let mut name = PortName::new();
        // "PortNN" always fits.
        let _ = write!(name, "Port{port:02}");
        name
    }

    /// Name stored for `port`, up to the first NUL.
    pub fn read(eeprom: &impl EepromPort, port: usize) -> Result<PortName> {
        let mut raw = [0u8; NAME_LENGTH];
        eeprom.read(Self::offset(port)?, &mut raw)?;
        Ok(decode(&raw))
    }

    /// Store `name` (truncated to fit).  Returns `false` when the stored name
    /// already matched and nothing was written.
    pub fn write(eeprom: &mut impl EepromPort, port: usize, name: &str) -> Result<bool> {
        let written = Self::store(eeprom, Self::offset(port)?, name)?;
        if written {
            debug!("port {port} renamed to {name:?}");
        }
        Ok(written)
    }

    /// Give every erased slot its factory name.
    pub fn init_defaults(eeprom: &mut impl EepromPort) -> core::result::Result<(), StorageError> {
        for port in 0..PORT_COUNT {
            let mut raw = [0u8; NAME_LENGTH];
            eeprom.read(NAME_BASE + port * NAME_LENGTH, &mut raw)?;
            if raw.iter().all(|&b| b == 0xFF) {
                Self::write_default(eeprom, port)?;
            }
        }
        Ok(())
    }

    /// Restore every factory name.
    pub fn reset(eeprom: &mut impl EepromPort) -> core::result::Result<(), StorageError> {
        for port in 0..PORT_COUNT {
            Self::write_default(eeprom, port)?;
        }
        Ok(())
    }

    fn write_default(
        eeprom: &mut impl EepromPort,
        port: usize,
    ) -> core::result::Result<(), StorageError> {
        Self::store(eeprom, NAME_BASE + port * NAME_LENGTH, &Self::default_name(port))?;
        Ok(())
    }

    fn store(
        eeprom: &mut impl EepromPort,
        offset: usize,
        name: &str,
    ) -> core::result::Result<bool, StorageError> {
        let name = truncate(name);
        let mut raw = [0u8; NAME_LENGTH];
        eeprom.read(offset, &mut raw)?;
        if decode(&raw).as_str() == name {
            return Ok(false);
        }
        let mut raw = [0u8; NAME_LENGTH];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        eeprom.write(offset, &raw)?;
        Ok(true)
    }
}

fn decode(raw: &[u8; NAME_LENGTH]) -> PortName {
    let end = raw[..NAME_LENGTH - 1]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(NAME_LENGTH - 1);
    let bytes = &raw[..end];
    let text = match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    };
    let mut name = PortName::new();
    let _ = name.push_str(text);
    name
}

fn truncate(name: &str) -> &str {
    let max = NAME_LENGTH - 1;
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
