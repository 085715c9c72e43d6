//! Control-code space
//!
//! The selection/diagnostic interface takes a small integer and turns it
//! into one of three actions. Codes are matched in a fixed order, so the
//! reserved codes shadow their slot indices when the store is configured
//! with a capacity above them.

use crate::error::{Error, Result};

/// Render the store's debug state; acknowledged with the code itself.
pub const DUMP_STATE: u32 = 1337;

/// Move the cursor to the first empty slot.
pub const SELECT_FIRST_FREE: u32 = 100;

/// A decoded control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Render the debug dump; the cursor is untouched.
    DumpState,
    /// Scan for the first empty slot and move the cursor there.
    SelectFirstFree,
    /// Move the cursor to the given slot, occupied or not.
    Select(usize),
}

impl ControlRequest {
    /// Decode a control code against a store of `capacity` slots
    pub fn decode(code: u32, capacity: usize) -> Result<Self> {
        match code {
            DUMP_STATE => Ok(Self::DumpState),
            SELECT_FIRST_FREE => Ok(Self::SelectFirstFree),
            c if (c as usize) < capacity => Ok(Self::Select(c as usize)),
            c => Err(Error::UnsupportedOperation(c)),
        }
    }
}
