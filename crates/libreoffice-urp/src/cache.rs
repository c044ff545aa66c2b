//! The 256-slot type/OID/TID caches both ends of a URP bridge maintain.
//!
//! The sender decides slot assignment; the receiver only stores what it is
//! told. Index `0xFFFF` means "not cached".

use crate::error::{Result, UrpError};
use crate::types::Type;

pub const CACHE_SIZE: usize = 256;
pub const NO_CACHE: u16 = 0xFFFF;

/// Sender-side view of what the peer has cached. Slots are reused round-robin.
#[derive(Debug)]
pub struct OutboundCache<T> {
    slots: Vec<Option<T>>,
    next: usize,
}

impl<T: Clone + PartialEq> OutboundCache<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![None; CACHE_SIZE],
            next: 0,
        }
    }

    /// Slot holding `value`, assigning one if needed. The flag is `true` when the
    /// value must be sent in full because the peer has not seen it in that slot.
    pub fn slot_for(&mut self, value: &T) -> (u16, bool) {
        if let Some(index) = self.slots.iter().position(|s| s.as_ref() == Some(value)) {
            return (index as u16, false);
        }
        let index = self.next;
        self.slots[index] = Some(value.clone());
        self.next = (self.next + 1) % CACHE_SIZE;
        (index as u16, true)
    }
}

impl<T: Clone + PartialEq> Default for OutboundCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver-side cache, filled as the peer announces new entries.
#[derive(Debug)]
pub struct InboundCache<T> {
    kind: &'static str,
    slots: Vec<Option<T>>,
}

impl<T: Clone> InboundCache<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: vec![None; CACHE_SIZE],
        }
    }

    pub fn store(&mut self, index: u16, value: T) -> Result<()> {
        if index == NO_CACHE {
            return Ok(());
        }
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(UrpError::CacheMiss { kind: self.kind, index })?;
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, index: u16) -> Result<T> {
        self.slots
            .get(index as usize)
            .and_then(|s| s.clone())
            .ok_or(UrpError::CacheMiss { kind: self.kind, index })
    }
}

/// All caches fed by incoming messages. Header and body share the type and OID tables.
#[derive(Debug)]
pub struct InboundCaches {
    pub types: InboundCache<Type>,
    pub oids: InboundCache<String>,
    pub tids: InboundCache<Vec<u8>>,
}

impl InboundCaches {
    pub fn new() -> Self {
        Self {
            types: InboundCache::new("type"),
            oids: InboundCache::new("OID"),
            tids: InboundCache::new("TID"),
        }
    }
}

impl Default for InboundCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_reuses_slot() {
        let mut cache = OutboundCache::new();
        assert_eq!(cache.slot_for(&"ctx".to_string()), (0, true));
        assert_eq!(cache.slot_for(&"desktop".to_string()), (1, true));
        assert_eq!(cache.slot_for(&"ctx".to_string()), (0, false));
    }

    #[test]
    fn test_outbound_wraps_around() {
        let mut cache = OutboundCache::new();
        for n in 0..CACHE_SIZE {
            cache.slot_for(&n);
        }
        assert_eq!(cache.slot_for(&CACHE_SIZE), (0, true));
        // Slot 0 was evicted, so its old value is new again.
        assert_eq!(cache.slot_for(&0), (1, true));
    }

    #[test]
    fn test_inbound_miss_and_hit() {
        let mut cache = InboundCache::new("OID");
        assert!(matches!(
            cache.get(3),
            Err(UrpError::CacheMiss { kind: "OID", index: 3 })
        ));
        cache.store(3, "doc".to_string()).unwrap();
        assert_eq!(cache.get(3).unwrap(), "doc");

        cache.store(NO_CACHE, "ignored".to_string()).unwrap();
        assert!(cache.store(300, "bad".to_string()).is_err());
    }
}
