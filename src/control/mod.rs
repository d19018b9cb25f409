//! Closed-loop control.

pub mod dew;

pub use dew::{DewController, DewTuning, DewUpdate, slew_toward};
