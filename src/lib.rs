// ClipSlot - Rust Implementation
// An in-memory, capacity-bounded slot store with restart handoff

#![warn(rust_2018_idioms)]

pub mod config;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod transfer;

// Re-exports for convenience
pub use config::{OverwritePolicy, StoreConfig};
pub use service::{SlotService, StartMode};
pub use store::SlotStore;

/// ClipSlot error types
pub mod error {
    use crate::snapshot::channel::ChannelError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        /// Capacity exhausted: every slot charge is in use.
        #[error("store is full: all {0} entry charges are active")]
        Full(usize),

        /// No active entry to read at the current slot.
        #[error("no active entry to read")]
        Empty,

        /// Payload exceeds the per-entry length limit.
        #[error("payload length {len} exceeds per-entry limit {max}")]
        PayloadTooLarge { len: usize, max: usize },

        /// Caller-supplied destination capacity below the stored length.
        #[error("destination capacity {cap} below stored length {len}")]
        DestinationTooSmall { cap: usize, len: usize },

        /// Failed to allocate an entry buffer.
        #[error("failed to allocate {0}-byte entry buffer")]
        OutOfMemory(usize),

        /// The byte-transfer primitive failed mid-copy.
        #[error("byte transfer failed: {0}")]
        Transfer(#[from] std::io::Error),

        /// Select-first-free found no empty slot.
        #[error("no free slot available")]
        NoFreeSlot,

        /// Unknown control code.
        #[error("unsupported control code {0}")]
        UnsupportedOperation(u32),

        /// The persistence channel rejected or lost a key.
        #[error("state channel failure: {0}")]
        Channel(#[from] ChannelError),

        /// Saved state failed validation during restore.
        #[error("snapshot corrupt: {0}")]
        SnapshotCorrupt(String),

        /// Invalid configuration.
        #[error("invalid configuration: {0}")]
        Config(String),

        /// The dispatch actor is gone; the handle can no longer serve requests.
        #[error("dispatch service stopped")]
        ServiceStopped,
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = error::Error::PayloadTooLarge { len: 201, max: 200 };
        assert_eq!(
            err.to_string(),
            "payload length 201 exceeds per-entry limit 200"
        );
    }

    #[test]
    fn test_version_format() {
        let _version: &str = VERSION;
    }
}
