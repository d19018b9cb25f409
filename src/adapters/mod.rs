//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                          |
//! |-------------|--------------|--------------------------------------|
//! | `eeprom`    | EepromPort   | RAM image / NVS blob                 |
//! | `hardware`  | OutputPort   | MCP23017, LEDC PWM, GPIO             |
//! |             | AnalogPort   | ESP32 ADC1 + sense multiplexer       |
//! |             | ProbePort    | SHT31 / AHTx0 over I2C               |
//! | `log_sink`  | EventSink    | `log` facade                         |
//! | `serial`    | SerialPort   | UART / in-memory queues              |
//! | `time`      | -            | ESP32 system timer                   |

pub mod eeprom;
pub mod hardware;
pub mod log_sink;
pub mod serial;
pub mod time;
