//! Serial framing.
//!
//! Wire format:
//! ```text
//!   '>' TOKEN [':' TOKEN [':' TOKEN]] '#'
//! ```
//!
//! The [`Framer`] consumes one byte at a time.  A start delimiter opens a
//! frame and discards anything accumulated so far; an end delimiter
//! closes it and hands the body to the [`CommandQueue`].  Bytes outside a
//! frame are ignored.  A body longer than [`FRAME_CAPACITY`] drops the
//! whole frame instead of truncating it.

use heapless::{Deque, Vec};

use crate::board::{FRAME_END, FRAME_START, MAX_COMMAND, QUEUE_LENGTH};

/// Body bytes a frame may carry (the last byte of `MAX_COMMAND` is the
/// terminator slot).
pub const FRAME_CAPACITY: usize = MAX_COMMAND - 1;

/// One complete frame body, delimiters stripped.
pub type Frame = Vec<u8, FRAME_CAPACITY>;

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// Nothing notable.
    None,
    /// A frame was completed and queued.
    Queued,
    /// A frame overflowed the buffer and was dropped.
    Overflow,
    /// A frame was completed but the queue was full.
    QueueFull,
}

/// Bounded FIFO of complete frames.  Full queue drops the newest.
#[derive(Debug, Default)]
pub struct CommandQueue {
    frames: Deque<Frame, QUEUE_LENGTH>,
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            frames: Deque::new(),
        }
    }

    /// Append a frame; `false` if the queue was full and it was dropped.
    pub fn push(&mut self, frame: Frame) -> bool {
        self.frames.push_back(frame).is_ok()
    }

    /// Oldest queued frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Byte-stream frame accumulator.
#[derive(Debug, Default)]
pub struct Framer {
    in_frame: bool,
    buf: Frame,
}

impl Framer {
    pub const fn new() -> Self {
        Self {
            in_frame: false,
            buf: Vec::new(),
        }
    }

    /// Whether a frame is currently open.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Consume one byte, pushing completed frames onto `queue`.
    pub fn push_byte(&mut self, byte: u8, queue: &mut CommandQueue) -> FrameEvent {
        if byte == FRAME_START {
            self.in_frame = true;
            self.buf.clear();
            return FrameEvent::None;
        }
        if !self.in_frame {
            return FrameEvent::None;
        }
        if byte == FRAME_END {
            self.in_frame = false;
            let frame = core::mem::take(&mut self.buf);
            return if queue.push(frame) {
                FrameEvent::Queued
            } else {
                FrameEvent::QueueFull
            };
        }
        if self.buf.push(byte).is_err() {
            self.in_frame = false;
            self.buf.clear();
            return FrameEvent::Overflow;
        }
        FrameEvent::None
    }

    /// Feed a slice; convenience for tests and fuzzing.
    pub fn push_bytes(&mut self, bytes: &[u8], queue: &mut CommandQueue) {
        for &b in bytes {
            self.push_byte(b, queue);
        }
    }
}
