//! Slot store core
//!
//! ```text
//! SlotStore
//!   ├─→ slots[0..capacity]   Entry = optional owned byte buffer
//!   ├─→ active_count         charged active entries
//!   └─→ current              single shared cursor
//!
//! write  → allocate, copy in through TransferSource, charge
//! read   → copy out through TransferSink, free, credit
//! control→ dump / select-first-free / select-explicit
//! ```
//!
//! The cursor is process-wide shared state: interleaved callers selecting
//! different slots observe each other's selection.

pub mod control;
pub mod entry;
pub mod slots;

pub use control::{ControlRequest, DUMP_STATE, SELECT_FIRST_FREE};
pub use entry::Entry;
pub use slots::{SlotStore, StoreStats};
