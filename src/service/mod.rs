//! Host-facing service surface
//!
//! Wraps the slot store in the operation set the dispatcher delivers
//! (open/close/write/read/control) and ties its lifecycle to the hosting
//! process: fresh starts and unmanaged restarts come up empty and announce
//! readiness; a managed-restart handoff restores the store from the
//! persistence channel first and keeps quiet.

pub mod dispatch;

pub use dispatch::{Dispatcher, Handle, Reply, Request};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::snapshot::{self, StateChannel};
use crate::store::{SlotStore, StoreStats};
use crate::transfer::{TransferSink, TransferSource};
use tracing::{info, trace};

/// How the hosting process came up, as reported by its lifecycle hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// First start: empty store, readiness announced.
    Fresh,
    /// Unmanaged restart with no saved state: empty store, readiness
    /// announced.
    Restart,
    /// Managed restart: the store is restored from the channel before any
    /// request is dispatched, and the readiness announcement is
    /// suppressed.
    Handoff,
}

/// The slot store behind its request surface
pub struct SlotService {
    store: SlotStore,
    announce: bool,
}

impl SlotService {
    /// Bring the service up for a lifecycle event.
    ///
    /// `channel` is only consulted on `Handoff`; a restore failure aborts
    /// startup rather than serving a partially recovered store.
    pub fn start(
        config: &StoreConfig,
        mode: StartMode,
        channel: Option<&mut dyn StateChannel>,
    ) -> Result<Self> {
        let store = match mode {
            StartMode::Handoff => {
                let channel = channel.ok_or_else(|| {
                    Error::Config("handoff start requires a state channel".to_string())
                })?;
                snapshot::restore(config, channel)?
            }
            StartMode::Fresh | StartMode::Restart => SlotStore::new(config)?,
        };
        info!(?mode, capacity = store.capacity(), "slot service starting");
        Ok(Self {
            store,
            announce: mode != StartMode::Handoff,
        })
    }

    /// Whether this start announces readiness to the dispatcher
    pub fn announces_ready(&self) -> bool {
        self.announce
    }

    /// Acknowledge an open request
    pub fn open(&mut self) -> Result<()> {
        trace!("open");
        Ok(())
    }

    /// Acknowledge a close request
    pub fn close(&mut self) -> Result<()> {
        trace!("close");
        Ok(())
    }

    /// Write a payload into the current slot
    pub fn write(&mut self, source: &mut dyn TransferSource, len: usize) -> Result<usize> {
        self.store.write(source, len)
    }

    /// Read and consume the current slot
    pub fn read(&mut self, sink: &mut dyn TransferSink, cap: usize) -> Result<usize> {
        self.store.read(sink, cap)
    }

    /// Apply a control code
    pub fn control(&mut self, code: u32) -> Result<u32> {
        self.store.control(code)
    }

    /// Snapshot of the store's counters
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Publish the store's state ahead of a managed restart
    pub fn prepare_handoff(&self, channel: &mut dyn StateChannel) -> Result<()> {
        snapshot::save(&self.store, channel)
    }
}
