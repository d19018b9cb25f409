//! Host-link serial adapters.
//!
//! - [`BufferedSerial`]: byte queues on both sides; used on the host to
//!   script a session and capture the responses.
//! - [`UartSerial`] (`target_os = "espidf"`): the ESP-IDF UART driver,
//!   drained without blocking.

use std::collections::VecDeque;

use crate::app::ports::SerialPort;

/// In-memory serial link.
#[derive(Debug, Default)]
pub struct BufferedSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl BufferedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the host had sent them.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything transmitted so far, clearing the buffer.
    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl SerialPort for BufferedSerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_all(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }
}

#[cfg(target_os = "espidf")]
pub use uart::UartSerial;

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
    use esp_idf_hal::uart::UartDriver;
    use log::warn;

    use crate::app::ports::SerialPort;

    pub struct UartSerial<'d> {
        uart: UartDriver<'d>,
    }

    impl<'d> UartSerial<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self { uart }
        }
    }

    impl SerialPort for UartSerial<'_> {
        fn read_byte(&mut self) -> Option<u8> {
            let mut buf = [0u8; 1];
            match self.uart.read(&mut buf, NON_BLOCK) {
                Ok(1) => Some(buf[0]),
                _ => None,
            }
        }

        fn write_all(&mut self, mut bytes: &[u8]) {
            while !bytes.is_empty() {
                match self.uart.write(bytes) {
                    Ok(0) => {
                        // TX ring buffer full; wait for it to drain.
                        let _ = self.uart.wait_tx_done(BLOCK);
                    }
                    Ok(n) => bytes = &bytes[n..],
                    Err(e) => {
                        warn!("uart write failed: {e}");
                        return;
                    }
                }
            }
        }
    }
}
