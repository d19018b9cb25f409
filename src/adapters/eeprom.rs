//! EEPROM adapters.
//!
//! Implements [`EepromPort`] twice:
//!
//! - [`MemEeprom`]: RAM image, erased to `0xFF`.  Used on the host and in
//!   tests, and as the working copy of the NVS backend.
//! - [`NvsEeprom`] (`target_os = "espidf"`): the same image persisted as a
//!   single NVS blob.  Every write updates the image and commits the blob,
//!   so the image and flash never diverge.

#[cfg(target_os = "espidf")]
use log::{info, warn};

use crate::app::ports::EepromPort;
use crate::error::StorageError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Value of an erased cell.
pub const ERASED: u8 = 0xFF;

/// In-memory EEPROM image.
#[derive(Debug, Clone)]
pub struct MemEeprom {
    bytes: Vec<u8>,
    writes: usize,
}

impl MemEeprom {
    /// A fully erased medium of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
            writes: 0,
        }
    }

    /// Wrap an existing image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of successful `write` calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(StorageError::OutOfBounds);
        }
        Ok(offset..end)
    }
}

impl EepromPort for MemEeprom {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = self.range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// NVS-backed EEPROM (hardware)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &[u8] = b"powerbox\0";
#[cfg(target_os = "espidf")]
const NVS_KEY: &[u8] = b"eeprom\0";

/// Emulated EEPROM stored as one NVS blob.
#[cfg(target_os = "espidf")]
pub struct NvsEeprom {
    image: MemEeprom,
}

#[cfg(target_os = "espidf")]
impl NvsEeprom {
    /// Initialise NVS flash and load the image, erased if absent.
    pub fn new(capacity: usize) -> Result<Self, StorageError> {
        // SAFETY: called once from the main task before any other NVS use.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::Io);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::Io);
        }

        let mut image = MemEeprom::new(capacity);
        let loaded = Self::with_handle(false, |handle| {
            let mut size = capacity;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    NVS_KEY.as_ptr() as *const _,
                    image.bytes.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match loaded {
            Ok(size) => info!("NvsEeprom: loaded {size} bytes"),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => info!("NvsEeprom: blank image"),
            Err(e) => {
                warn!("NvsEeprom: read error {e}, starting blank");
                image = MemEeprom::new(capacity);
            }
        }
        Ok(Self { image })
    }

    fn commit(&self) -> Result<(), StorageError> {
        let bytes = self.image.bytes();
        Self::with_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    NVS_KEY.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NvsEeprom: commit failed: {e}");
            StorageError::Io
        })
    }

    fn with_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(NVS_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

#[cfg(target_os = "espidf")]
impl EepromPort for NvsEeprom {
    fn capacity(&self) -> usize {
        self.image.capacity()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.image.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.image.write(offset, data)?;
        self.commit()
    }
}
