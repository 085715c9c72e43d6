//! State-transfer codec
//!
//! Carries the slot store across a managed restart through the persistence
//! channel. The channel holds scalars and blobs by key, but each key
//! publish has overhead, so one key per slot is off the table: the codec
//! publishes two scalars, one length blob, and at most `capacity / 2`
//! concatenated pair blobs. Save runs once before the old instance lets
//! go; restore runs once in the new instance before any request is
//! dispatched, and consumes (deletes) every key it reads.

pub mod channel;
pub mod codec;

pub use channel::{ChannelError, MemChannel, StateChannel};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::{Entry, SlotStore};
use tracing::{debug, info};

/// Publish the store's state to the channel
pub fn save(store: &SlotStore, channel: &mut dyn StateChannel) -> Result<()> {
    let capacity = store.capacity();
    channel.publish_u32(codec::KEY_ACTIVE, store.active_count() as u32)?;
    channel.publish_u32(codec::KEY_CURSOR, store.current() as u32)?;

    let lengths: Vec<u32> = store.entries().iter().map(|e| e.len() as u32).collect();
    channel.publish_blob(codec::KEY_LENGTHS, &codec::encode_lengths(&lengths))?;

    let mut pairs_published = 0usize;
    for index in (0..capacity).step_by(2) {
        let first = store.entry(index);
        let second_len = if index + 1 < capacity {
            store.entry(index + 1).len()
        } else {
            0
        };
        if first.len() + second_len == 0 {
            continue;
        }
        let second = if index + 1 < capacity {
            store.entry(index + 1).bytes()
        } else {
            None
        };
        let blob = codec::pack_pair(first.bytes(), second);
        channel.publish_blob(&codec::pair_key(index), &blob)?;
        pairs_published += 1;
    }

    debug!(
        active = store.active_count(),
        cursor = store.current(),
        pairs = pairs_published,
        "published store state for handoff"
    );
    Ok(())
}

/// Rebuild a store from the channel, consuming the published keys.
///
/// Any missing key, short blob, or out-of-range value aborts the restore;
/// a partially recovered store is never returned.
pub fn restore(config: &StoreConfig, channel: &mut dyn StateChannel) -> Result<SlotStore> {
    config.validate()?;
    let capacity = config.capacity;

    let active = channel.retrieve_u32(codec::KEY_ACTIVE)?;
    channel.delete_u32(codec::KEY_ACTIVE)?;
    let cursor = channel.retrieve_u32(codec::KEY_CURSOR)?;
    channel.delete_u32(codec::KEY_CURSOR)?;
    let length_blob = channel.retrieve_blob(codec::KEY_LENGTHS)?;
    channel.delete_blob(codec::KEY_LENGTHS)?;

    if active as usize > capacity {
        return Err(Error::SnapshotCorrupt(format!(
            "active count {} exceeds capacity {}",
            active, capacity
        )));
    }
    if cursor as usize >= capacity {
        return Err(Error::SnapshotCorrupt(format!(
            "cursor {} out of range for capacity {}",
            cursor, capacity
        )));
    }

    let lengths = codec::decode_lengths(&length_blob, capacity)?;
    if let Some(&bad) = lengths.iter().find(|&&l| l as usize > config.max_entry_len) {
        return Err(Error::SnapshotCorrupt(format!(
            "slot length {} exceeds per-entry limit {}",
            bad, config.max_entry_len
        )));
    }

    let mut slots = vec![Entry::empty(); capacity];
    for index in (0..capacity).step_by(2) {
        let len_first = lengths[index] as usize;
        let len_second = if index + 1 < capacity {
            lengths[index + 1] as usize
        } else {
            0
        };
        if len_first + len_second == 0 {
            continue;
        }
        let key = codec::pair_key(index);
        let blob = channel.retrieve_blob(&key)?;
        channel.delete_blob(&key)?;
        let (first, second) = codec::split_pair(&blob, len_first, len_second)?;
        if let Some(buf) = first {
            slots[index].fill(buf);
        }
        if let Some(buf) = second {
            slots[index + 1].fill(buf);
        }
    }

    info!(
        active,
        cursor,
        capacity,
        "restored slot store from handoff state"
    );
    Ok(SlotStore::from_parts(
        config,
        slots,
        active as usize,
        cursor as usize,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{MemSink, MemSource};

    fn populated_store(config: &StoreConfig, fills: &[(usize, &[u8])]) -> SlotStore {
        let mut store = SlotStore::new(config).unwrap();
        for &(slot, payload) in fills {
            store.select(slot).unwrap();
            store
                .write(&mut MemSource::new(payload.to_vec()), payload.len())
                .unwrap();
        }
        store
    }

    fn assert_stores_match(saved: &SlotStore, restored: &SlotStore) {
        assert_eq!(restored.active_count(), saved.active_count());
        assert_eq!(restored.current(), saved.current());
        assert_eq!(restored.capacity(), saved.capacity());
        for index in 0..saved.capacity() {
            assert_eq!(
                restored.entry(index),
                saved.entry(index),
                "slot {} differs",
                index
            );
        }
    }

    #[test]
    fn test_round_trip_mixed_occupancy() -> Result<()> {
        let config = StoreConfig::default();
        // Pairs with both halves, a left-only half, a right-only half, and
        // the very last slot occupied.
        let mut store = populated_store(
            &config,
            &[
                (0, b"zero"),
                (1, b"one"),
                (2, b"two"),
                (7, b"seven"),
                (99, b"last"),
            ],
        );
        store.select(7)?;

        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        let restored = restore(&config, &mut channel)?;

        assert_stores_match(&store, &restored);
        Ok(())
    }

    #[test]
    fn test_round_trip_empty_store() -> Result<()> {
        let config = StoreConfig::default();
        let store = SlotStore::new(&config)?;
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        let restored = restore(&config, &mut channel)?;
        assert_stores_match(&store, &restored);
        Ok(())
    }

    #[test]
    fn test_round_trip_odd_capacity_tail() -> Result<()> {
        let config = StoreConfig {
            capacity: 5,
            max_entry_len: 16,
            ..Default::default()
        };
        let store = populated_store(&config, &[(4, b"tail")]);
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        let restored = restore(&config, &mut channel)?;
        assert_stores_match(&store, &restored);
        Ok(())
    }

    #[test]
    fn test_restore_consumes_every_key() -> Result<()> {
        let config = StoreConfig::default();
        let store = populated_store(&config, &[(0, b"a"), (50, b"b")]);
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        assert!(!channel.is_empty());
        restore(&config, &mut channel)?;
        assert!(channel.is_empty());
        Ok(())
    }

    #[test]
    fn test_full_store_fits_constrained_channel() -> Result<()> {
        let config = StoreConfig::default();
        let mut store = SlotStore::new(&config)?;
        for index in 0..config.capacity {
            store.select(index)?;
            store.write(&mut MemSource::new(vec![index as u8; 200]), 200)?;
        }

        // One key per slot would need 100 keys before the scalars even
        // land; the paired layout stays within 3 + capacity/2.
        let mut channel = MemChannel::with_key_budget(53);
        save(&store, &mut channel)?;
        assert_eq!(channel.len(), 53);

        let restored = restore(&config, &mut channel)?;
        assert_stores_match(&store, &restored);
        Ok(())
    }

    #[test]
    fn test_empty_pairs_publish_no_key() -> Result<()> {
        let config = StoreConfig::default();
        let store = populated_store(&config, &[(10, b"only")]);
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        // Two scalars, the length blob, and a single pair blob.
        assert_eq!(channel.len(), 4);
        Ok(())
    }

    #[test]
    fn test_restore_missing_pair_key_is_fatal() -> Result<()> {
        let config = StoreConfig::default();
        let store = populated_store(&config, &[(2, b"gone")]);
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        channel.delete_blob(&codec::pair_key(2))?;

        assert!(matches!(
            restore(&config, &mut channel),
            Err(Error::Channel(ChannelError::Missing(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_restore_rejects_out_of_range_cursor() -> Result<()> {
        let config = StoreConfig::default();
        let store = SlotStore::new(&config)?;
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        channel.publish_u32(codec::KEY_CURSOR, 100)?;

        assert!(matches!(
            restore(&config, &mut channel),
            Err(Error::SnapshotCorrupt(_))
        ));
        Ok(())
    }

    #[test]
    fn test_restore_rejects_oversized_slot_length() -> Result<()> {
        let config = StoreConfig::default();
        let store = SlotStore::new(&config)?;
        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;

        let mut lengths = vec![0u32; config.capacity];
        lengths[3] = 201;
        channel.publish_blob(codec::KEY_LENGTHS, &codec::encode_lengths(&lengths))?;

        assert!(matches!(
            restore(&config, &mut channel),
            Err(Error::SnapshotCorrupt(_))
        ));
        Ok(())
    }

    #[test]
    fn test_restored_store_serves_reads() -> Result<()> {
        let config = StoreConfig::default();
        let mut store = populated_store(&config, &[(3, b"hello")]);
        store.select(3)?;

        let mut channel = MemChannel::new();
        save(&store, &mut channel)?;
        let mut restored = restore(&config, &mut channel)?;

        let mut sink = MemSink::new();
        assert_eq!(restored.read(&mut sink, 10)?, 5);
        assert_eq!(sink.take_bytes(), b"hello");
        Ok(())
    }
}
