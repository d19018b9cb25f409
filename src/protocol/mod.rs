//! Host serial protocol: byte framing and response formatting.
//!
//! ```text
//!   UART bytes ──▶ Framer ──▶ CommandQueue ──▶ Command::parse ──▶ PowerBox
//!                                                                   │
//!   UART bytes ◀──────────────── format::* ◀───────────────────────-┘
//! ```

pub mod format;
pub mod framing;

pub use format::Response;
pub use framing::{CommandQueue, Frame, FrameEvent, Framer};
