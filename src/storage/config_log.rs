//! Rotating config log.
//!
//! Every slot is one flag byte followed by a postcard-encoded
//! [`DeviceConfig`] padded to [`PAYLOAD_SIZE`].  Saving invalidates the
//! live slot first and then writes the next one, wrapping at the end of
//! the medium, so writes spread over the whole region.  A power loss
//! between the two steps leaves no live slot; the next load falls back to
//! defaults.  A store that does not know its live slot (never loaded, or
//! load failed) clears every live flag on the medium before writing.

use log::{debug, info, warn};

use crate::app::ports::EepromPort;
use crate::board::{PORT_COUNT, PortType};
use crate::config::DeviceConfig;
use crate::error::StorageError;

use super::{CONFIG_BASE, CURRENT_FLAG, OLD_FLAG};

/// Encoded config bytes per slot (the worst-case postcard size).
pub const PAYLOAD_SIZE: usize = 16;
/// Flag byte plus payload.
pub const SLOT_SIZE: usize = 1 + PAYLOAD_SIZE;

/// What [`ConfigStore::load`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub config: DeviceConfig,
    /// A live slot existed.
    pub found: bool,
    /// Stored fields violated an invariant (or could not be decoded) and
    /// were reset.
    pub corrected: bool,
    /// Slot written during load, if any.
    pub saved_slot: Option<usize>,
}

/// Config persistence with wear-spreading rotation.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    /// Index of the live slot as last seen.
    current: Option<usize>,
    /// Contents of the live slot as last seen.
    snapshot: Option<DeviceConfig>,
}

impl ConfigStore {
    pub const fn new() -> Self {
        Self {
            current: None,
            snapshot: None,
        }
    }

    /// Number of slots that fit between [`CONFIG_BASE`] and the end.
    pub fn slot_count(eeprom: &impl EepromPort) -> usize {
        eeprom.capacity().saturating_sub(CONFIG_BASE) / SLOT_SIZE
    }

    fn slot_offset(slot: usize) -> usize {
        CONFIG_BASE + slot * SLOT_SIZE
    }

    /// Slot currently marked live, as last loaded or saved.
    pub fn current_slot(&self) -> Option<usize> {
        self.current
    }

    /// Read the newest live slot, repair it and persist the result when it
    /// was missing or needed repair.
    pub fn load(
        &mut self,
        eeprom: &mut impl EepromPort,
        layout: &[PortType; PORT_COUNT],
    ) -> Result<LoadReport, StorageError> {
        self.current = Self::scan(eeprom)?;
        self.snapshot = None;
        if let Some(live) = self.current {
            Self::invalidate_stale(eeprom, live)?;
        }

        let mut corrected = false;
        let (mut config, found) = match self.current {
            Some(slot) => match Self::read_slot(eeprom, slot)? {
                Some(cfg) => {
                    self.snapshot = Some(cfg);
                    (cfg, true)
                }
                None => {
                    warn!("config slot {slot} undecodable, using defaults");
                    corrected = true;
                    (DeviceConfig::defaults_for(layout), true)
                }
            },
            None => {
                info!("no stored config, using defaults");
                (DeviceConfig::defaults_for(layout), false)
            }
        };

        if config.sanitize(layout) {
            warn!("stored config repaired");
            corrected = true;
        }

        let saved_slot = if !found || corrected {
            self.save(eeprom, &config)?
        } else {
            None
        };

        debug!("config loaded from slot {:?}", self.current);
        Ok(LoadReport {
            config,
            found,
            corrected,
            saved_slot,
        })
    }

    /// Persist `config` unless it equals the live record.  Returns the slot
    /// written.
    pub fn save(
        &mut self,
        eeprom: &mut impl EepromPort,
        config: &DeviceConfig,
    ) -> Result<Option<usize>, StorageError> {
        if self.snapshot.as_ref() == Some(config) {
            return Ok(None);
        }

        let slots = Self::slot_count(eeprom);
        if slots == 0 {
            return Err(StorageError::OutOfBounds);
        }

        let mut record = [0u8; SLOT_SIZE];
        record[0] = CURRENT_FLAG;
        postcard::to_slice(config, &mut record[1..]).map_err(|_| StorageError::Io)?;

        let last = match self.current {
            Some(slot) => {
                eeprom.write(Self::slot_offset(slot), &[OLD_FLAG])?;
                Some(slot)
            }
            None => Self::invalidate_all(eeprom)?,
        };
        let next = match last {
            Some(slot) if slot + 1 < slots => slot + 1,
            _ => 0,
        };

        // A failed write may still have landed, so the attempted slot counts
        // as live until the next save clears it.
        self.current = Some(next);
        self.snapshot = None;
        eeprom.write(Self::slot_offset(next), &record)?;
        self.snapshot = Some(*config);
        debug!("config saved to slot {next}");
        Ok(Some(next))
    }

    /// Clear every live flag on the medium.  Returns the highest slot that
    /// was live.
    fn invalidate_all(eeprom: &mut impl EepromPort) -> Result<Option<usize>, StorageError> {
        let mut last = None;
        for slot in 0..Self::slot_count(eeprom) {
            let mut flag = [0u8; 1];
            eeprom.read(Self::slot_offset(slot), &mut flag)?;
            if flag[0] == CURRENT_FLAG {
                eeprom.write(Self::slot_offset(slot), &[OLD_FLAG])?;
                last = Some(slot);
            }
        }
        Ok(last)
    }

    /// Highest-addressed slot carrying the live flag.
    fn scan(eeprom: &impl EepromPort) -> Result<Option<usize>, StorageError> {
        let mut found = None;
        for slot in 0..Self::slot_count(eeprom) {
            let mut flag = [0u8; 1];
            eeprom.read(Self::slot_offset(slot), &mut flag)?;
            if flag[0] == CURRENT_FLAG {
                found = Some(slot);
            }
        }
        Ok(found)
    }

    /// Clear the live flag on every slot but `keep`.
    fn invalidate_stale(eeprom: &mut impl EepromPort, keep: usize) -> Result<(), StorageError> {
        for slot in 0..keep {
            let mut flag = [0u8; 1];
            eeprom.read(Self::slot_offset(slot), &mut flag)?;
            if flag[0] == CURRENT_FLAG {
                warn!("config slot {slot} also marked live, invalidating");
                eeprom.write(Self::slot_offset(slot), &[OLD_FLAG])?;
            }
        }
        Ok(())
    }

    fn read_slot(
        eeprom: &impl EepromPort,
        slot: usize,
    ) -> Result<Option<DeviceConfig>, StorageError> {
        let mut payload = [0u8; PAYLOAD_SIZE];
        eeprom.read(Self::slot_offset(slot) + 1, &mut payload)?;
        Ok(postcard::from_bytes(&payload).ok())
    }
}
