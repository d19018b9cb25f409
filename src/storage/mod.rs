//! Non-volatile layout on top of an [`EepromPort`](crate::app::ports::EepromPort).
//!
//! ```text
//!   0 ............ 224 ........................................ 1024
//!   | name table    | config log: [flag|payload] [flag|payload] ... |
//! ```
//!
//! The name table is a fixed array of [`NAME_LENGTH`] byte slots, one per
//! port.  The config log is a ring of fixed-size slots; exactly one carries
//! [`CURRENT_FLAG`] at any time outside a power-loss window.

pub mod config_log;
pub mod names;

pub use config_log::{ConfigStore, LoadReport};
pub use names::NameTable;

use crate::board::{NAME_LENGTH, PORT_COUNT};

/// Size of the emulated EEPROM region.
pub const EEPROM_SIZE: usize = 1024;
/// Offset of the name table.
pub const NAME_BASE: usize = 0;
/// Offset of the first config slot.
pub const CONFIG_BASE: usize = NAME_BASE + PORT_COUNT * NAME_LENGTH;
/// Flag byte of the live config slot.
pub const CURRENT_FLAG: u8 = 99;
/// Flag byte of a superseded config slot.
pub const OLD_FLAG: u8 = 0;

const _: () = assert!(CONFIG_BASE == 224);
