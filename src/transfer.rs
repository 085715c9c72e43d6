//! Byte-transfer seam
//!
//! The store never touches the caller's address space directly; payload
//! bytes cross the process boundary through these traits. The host supplies
//! real implementations; `MemSource` and `MemSink` are in-process versions
//! for tests and the demo binary.

use std::io;
use std::sync::{Arc, Mutex};

/// Moves payload bytes from the caller into the store's buffers.
pub trait TransferSource {
    /// Copy exactly `dst.len()` bytes from the caller into `dst`.
    fn transfer_in(&mut self, dst: &mut [u8]) -> io::Result<()>;
}

/// Moves payload bytes from the store's buffers to the caller.
pub trait TransferSink {
    /// Copy `src` to the caller, reporting the number of bytes accepted.
    fn transfer_out(&mut self, src: &[u8]) -> io::Result<usize>;
}

/// In-memory transfer source backed by an owned payload
#[derive(Debug, Clone)]
pub struct MemSource {
    data: Vec<u8>,
}

impl MemSource {
    /// Create a source holding `data`
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Length of the held payload
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the held payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl TransferSource for MemSource {
    fn transfer_in(&mut self, dst: &mut [u8]) -> io::Result<()> {
        if self.data.len() < dst.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "source holds {} bytes, {} requested",
                    self.data.len(),
                    dst.len()
                ),
            ));
        }
        dst.copy_from_slice(&self.data[..dst.len()]);
        Ok(())
    }
}

/// In-memory transfer sink that collects drained bytes
///
/// Cloneable: all clones share one buffer, so a sink can be handed to the
/// dispatcher while the caller keeps a handle to collect the result.
#[derive(Debug, Clone, Default)]
pub struct MemSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the collected bytes, leaving the sink empty
    pub fn take_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buf.lock().unwrap())
    }
}

impl TransferSink for MemSink {
    fn transfer_out(&mut self, src: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(src);
        Ok(src.len())
    }
}
