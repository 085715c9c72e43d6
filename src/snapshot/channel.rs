//! Persistence channel seam
//!
//! The handoff state travels through an external transient key/value
//! mechanism that holds scalars and blobs by key name. The host supplies
//! the real channel; `MemChannel` is the in-process version used by tests
//! and the demo binary, with an optional key budget that models the real
//! channel's per-key overhead.

use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;

/// Persistence channel failures
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("key '{0}' not found")]
    Missing(String),

    #[error("key '{0}' holds a different value kind")]
    KindMismatch(String),

    #[error("key budget exhausted at {0} keys")]
    KeyBudget(usize),
}

/// Transient key/value channel for restart state transfer
pub trait StateChannel {
    fn publish_u32(&mut self, key: &str, value: u32) -> Result<(), ChannelError>;
    fn retrieve_u32(&mut self, key: &str) -> Result<u32, ChannelError>;
    fn delete_u32(&mut self, key: &str) -> Result<(), ChannelError>;

    fn publish_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), ChannelError>;
    fn retrieve_blob(&mut self, key: &str) -> Result<Bytes, ChannelError>;
    fn delete_blob(&mut self, key: &str) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone)]
enum Value {
    Scalar(u32),
    Blob(Bytes),
}

/// In-memory state channel
#[derive(Debug, Default)]
pub struct MemChannel {
    entries: HashMap<String, Value>,
    key_budget: Option<usize>,
}

impl MemChannel {
    /// Create an unbounded channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel that refuses to hold more than `budget` keys,
    /// mirroring a constrained external channel
    pub fn with_key_budget(budget: usize) -> Self {
        Self {
            entries: HashMap::new(),
            key_budget: Some(budget),
        }
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the channel holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn publish(&mut self, key: &str, value: Value) -> Result<(), ChannelError> {
        if !self.entries.contains_key(key) {
            if let Some(budget) = self.key_budget {
                if self.entries.len() >= budget {
                    return Err(ChannelError::KeyBudget(budget));
                }
            }
        }
        // Re-publishing an existing key overwrites it.
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl StateChannel for MemChannel {
    fn publish_u32(&mut self, key: &str, value: u32) -> Result<(), ChannelError> {
        self.publish(key, Value::Scalar(value))
    }

    fn retrieve_u32(&mut self, key: &str) -> Result<u32, ChannelError> {
        match self.entries.get(key) {
            Some(Value::Scalar(value)) => Ok(*value),
            Some(Value::Blob(_)) => Err(ChannelError::KindMismatch(key.to_string())),
            None => Err(ChannelError::Missing(key.to_string())),
        }
    }

    fn delete_u32(&mut self, key: &str) -> Result<(), ChannelError> {
        match self.entries.get(key) {
            Some(Value::Scalar(_)) => {
                self.entries.remove(key);
                Ok(())
            }
            Some(Value::Blob(_)) => Err(ChannelError::KindMismatch(key.to_string())),
            None => Err(ChannelError::Missing(key.to_string())),
        }
    }

    fn publish_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), ChannelError> {
        self.publish(key, Value::Blob(Bytes::copy_from_slice(bytes)))
    }

    fn retrieve_blob(&mut self, key: &str) -> Result<Bytes, ChannelError> {
        match self.entries.get(key) {
            Some(Value::Blob(bytes)) => Ok(bytes.clone()),
            Some(Value::Scalar(_)) => Err(ChannelError::KindMismatch(key.to_string())),
            None => Err(ChannelError::Missing(key.to_string())),
        }
    }

    fn delete_blob(&mut self, key: &str) -> Result<(), ChannelError> {
        match self.entries.get(key) {
            Some(Value::Blob(_)) => {
                self.entries.remove(key);
                Ok(())
            }
            Some(Value::Scalar(_)) => Err(ChannelError::KindMismatch(key.to_string())),
            None => Err(ChannelError::Missing(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() -> Result<(), ChannelError> {
        let mut channel = MemChannel::new();
        channel.publish_u32("counter", 42)?;
        assert_eq!(channel.retrieve_u32("counter")?, 42);
        channel.delete_u32("counter")?;
        assert!(matches!(
            channel.retrieve_u32("counter"),
            Err(ChannelError::Missing(_))
        ));
        Ok(())
    }

    #[test]
    fn test_blob_round_trip() -> Result<(), ChannelError> {
        let mut channel = MemChannel::new();
        channel.publish_blob("payload", b"abc")?;
        assert_eq!(channel.retrieve_blob("payload")?.as_ref(), b"abc");
        channel.delete_blob("payload")?;
        assert!(channel.is_empty());
        Ok(())
    }

    #[test]
    fn test_kind_mismatch() {
        let mut channel = MemChannel::new();
        channel.publish_u32("k", 1).unwrap();
        assert!(matches!(
            channel.retrieve_blob("k"),
            Err(ChannelError::KindMismatch(_))
        ));
    }

    #[test]
    fn test_republish_overwrites_without_new_key() -> Result<(), ChannelError> {
        let mut channel = MemChannel::with_key_budget(1);
        channel.publish_u32("k", 1)?;
        channel.publish_u32("k", 2)?;
        assert_eq!(channel.retrieve_u32("k")?, 2);
        Ok(())
    }

    #[test]
    fn test_key_budget_enforced() {
        let mut channel = MemChannel::with_key_budget(2);
        channel.publish_u32("a", 1).unwrap();
        channel.publish_blob("b", b"x").unwrap();
        assert!(matches!(
            channel.publish_u32("c", 3),
            Err(ChannelError::KeyBudget(2))
        ));
    }
}
