//! Console
//!
//! Byte-oriented console used by the console-write and console-read
//! syscalls.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

/// A console device.
pub trait Console: Send {
    /// Write raw bytes to the console.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Read one pending input byte without blocking.
    fn read_byte(&mut self) -> Option<u8>;
}

#[derive(Default)]
struct BufferConsoleInner {
    output: Vec<u8>,
    input: VecDeque<u8>,
}

/// In-memory console: output accumulates in a buffer, input is queued by
/// the owner of another handle.
#[derive(Clone, Default)]
pub struct BufferConsole {
    inner: Arc<Mutex<BufferConsoleInner>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for subsequent reads.
    pub fn push_input(&self, bytes: &[u8]) {
        self.inner.lock().input.extend(bytes.iter().copied());
    }

    /// Everything written so far.
    pub fn output(&self) -> Vec<u8> {
        self.inner.lock().output.clone()
    }
}

impl Console for BufferConsole {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.lock().output.extend_from_slice(bytes);
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.inner.lock().input.pop_front()
    }
}
