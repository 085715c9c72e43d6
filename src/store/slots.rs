//! Slot store implementation
//!
//! The ground-truth data structure: a fixed-capacity array of entries, the
//! active-entry counter, and the single shared cursor every operation acts
//! through. One instance per hosting process; the dispatch layer owns it
//! exclusively, so nothing here locks.

use super::control::{ControlRequest, DUMP_STATE};
use super::entry::Entry;
use crate::config::{OverwritePolicy, StoreConfig};
use crate::error::{Error, Result};
use crate::transfer::{TransferSink, TransferSource};
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

/// Fixed-capacity indexed store of opaque byte payloads
pub struct SlotStore {
    /// Entries, indexed `0..capacity`
    slots: Vec<Entry>,
    /// Number of charged active entries
    active_count: usize,
    /// The shared cursor: which slot the next write/read acts on
    current: usize,
    /// Per-entry payload limit
    max_entry_len: usize,
    /// Overwrite accounting policy
    policy: OverwritePolicy,
}

impl SlotStore {
    /// Create an empty store from a validated configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            max_entry_len = config.max_entry_len,
            "initializing slot store"
        );
        Ok(Self {
            slots: vec![Entry::empty(); config.capacity],
            active_count: 0,
            current: 0,
            max_entry_len: config.max_entry_len,
            policy: config.overwrite_policy,
        })
    }

    /// Rebuild a store from restored parts. The snapshot layer validates
    /// the parts before calling this.
    pub(crate) fn from_parts(
        config: &StoreConfig,
        slots: Vec<Entry>,
        active_count: usize,
        current: usize,
    ) -> Self {
        debug_assert_eq!(slots.len(), config.capacity);
        Self {
            slots,
            active_count,
            current,
            max_entry_len: config.max_entry_len,
            policy: config.overwrite_policy,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of charged active entries
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Index of the currently selected slot
    pub fn current(&self) -> usize {
        self.current
    }

    /// Per-entry payload limit
    pub fn max_entry_len(&self) -> usize {
        self.max_entry_len
    }

    /// Borrow the entry at `index`
    pub fn entry(&self, index: usize) -> &Entry {
        &self.slots[index]
    }

    /// Borrow all entries in slot order
    pub(crate) fn entries(&self) -> &[Entry] {
        &self.slots
    }

    /// Write a payload of `len` bytes into the current slot.
    ///
    /// The payload is pulled through `source` into a freshly allocated
    /// buffer. On transfer failure the buffer is released and the slot is
    /// left empty; the counter only moves on success.
    pub fn write(&mut self, source: &mut dyn TransferSource, len: usize) -> Result<usize> {
        if self.active_count >= self.slots.len() {
            return Err(Error::Full(self.slots.len()));
        }
        if len > self.max_entry_len {
            return Err(Error::PayloadTooLarge {
                len,
                max: self.max_entry_len,
            });
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory(len))?;
        buf.resize(len, 0);

        // Displace any occupied entry before the copy lands. Under
        // ChargeNew the displaced charge stays on the counter.
        if self.slots[self.current].take().is_some()
            && self.policy == OverwritePolicy::ReclaimOld
        {
            self.active_count -= 1;
        }

        source.transfer_in(&mut buf)?;

        self.slots[self.current].fill(buf);
        self.active_count += 1;
        trace!(
            slot = self.current,
            len,
            active = self.active_count,
            "wrote entry"
        );
        Ok(len)
    }

    /// Read and consume the entry at the current slot.
    ///
    /// `cap` is the caller's destination capacity; it must cover the stored
    /// length, and any excess goes unused. The entry is freed only after
    /// the transfer succeeds, so a transient fault never loses the payload.
    pub fn read(&mut self, sink: &mut dyn TransferSink, cap: usize) -> Result<usize> {
        if self.active_count == 0 {
            return Err(Error::Empty);
        }
        let bytes = match self.slots[self.current].bytes() {
            Some(bytes) => bytes,
            // The cursor can sit on a free slot while other entries are
            // active; there is nothing here to read.
            None => return Err(Error::Empty),
        };
        let len = bytes.len();
        if cap < len {
            return Err(Error::DestinationTooSmall { cap, len });
        }

        sink.transfer_out(bytes)?;

        self.slots[self.current].take();
        self.active_count -= 1;
        trace!(
            slot = self.current,
            len,
            active = self.active_count,
            "read entry"
        );
        Ok(len)
    }

    /// Move the cursor to `index`, occupied or not
    pub fn select(&mut self, index: usize) -> Result<usize> {
        if index >= self.slots.len() {
            return Err(Error::UnsupportedOperation(index as u32));
        }
        self.current = index;
        Ok(index)
    }

    /// Move the cursor to the first empty slot, scanning in index order.
    /// The cursor is untouched when every slot is occupied.
    pub fn select_first_free(&mut self) -> Result<usize> {
        match self.slots.iter().position(Entry::is_empty) {
            Some(index) => {
                self.current = index;
                Ok(index)
            }
            None => Err(Error::NoFreeSlot),
        }
    }

    /// Apply a control code: dump, scan, or explicit select
    pub fn control(&mut self, code: u32) -> Result<u32> {
        match ControlRequest::decode(code, self.capacity())? {
            ControlRequest::DumpState => {
                let mut dump = String::new();
                let _ = self.dump_state(&mut dump);
                debug!(target: "clipslot::dump", "{}", dump);
                Ok(DUMP_STATE)
            }
            ControlRequest::SelectFirstFree => self.select_first_free().map(|i| i as u32),
            ControlRequest::Select(index) => self.select(index).map(|i| i as u32),
        }
    }

    /// Render the store's state for diagnostics.
    ///
    /// Read-only. Payload bytes are rendered lossily as text; this output
    /// is for humans, not part of the store's contract.
    pub fn dump_state(&self, w: &mut impl fmt::Write) -> fmt::Result {
        writeln!(w, "active entries: {}", self.active_count)?;
        for (index, entry) in self.slots.iter().enumerate() {
            match entry.bytes() {
                None => writeln!(w, "slot {}: empty, length 0", index)?,
                Some(bytes) => writeln!(
                    w,
                    "slot {}: length = {}, content = {}",
                    index,
                    bytes.len(),
                    String::from_utf8_lossy(bytes)
                )?,
            }
        }
        Ok(())
    }

    /// Snapshot of the store's counters
    pub fn stats(&self) -> StoreStats {
        let occupied = self.slots.iter().filter(|e| !e.is_empty()).count();
        StoreStats {
            capacity: self.slots.len(),
            active_entries: self.active_count,
            occupied_slots: occupied,
            stored_bytes: self.slots.iter().map(Entry::len).sum(),
            current_slot: self.current,
        }
    }
}

/// Statistics for the slot store
///
/// `active_entries` can exceed `occupied_slots` under the ChargeNew
/// overwrite policy; the difference is phantom-charged capacity.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStats {
    pub capacity: usize,
    pub active_entries: usize,
    pub occupied_slots: usize,
    pub stored_bytes: usize,
    pub current_slot: usize,
}
