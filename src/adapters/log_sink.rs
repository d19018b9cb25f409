//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger.  The host link carries protocol frames only, so
//! on the board the log goes to the USB console.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::protocol::format::Centi;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                have_ambient,
                have_pressure,
            } => {
                info!("START | ambient={} pressure={}", have_ambient, have_pressure);
            }
            AppEvent::DewStateChanged {
                active,
                margin_centi,
            } => {
                info!(
                    "DEW   | {} at margin {} C",
                    if *active { "engaged" } else { "released" },
                    Centi(*margin_centi)
                );
            }
            AppEvent::ConfigSaved { slot } => info!("CONFIG| saved to slot {}", slot),
            AppEvent::ConfigRecovered => warn!("CONFIG| stored record repaired"),
            AppEvent::FrameDropped => warn!("SERIAL| overlong frame dropped"),
            AppEvent::QueueOverflow => warn!("SERIAL| command queue full, frame dropped"),
            AppEvent::FaultDetected(fault) => warn!("FAULT | {}", fault),
            AppEvent::FaultCleared(fault) => info!("FAULT | cleared: {}", fault),
            AppEvent::ProbeReadFailed(e) => warn!("PROBE | read failed: {}", e),
        }
    }
}
