//! C5 — bounded write queue.
//!
//! Outgoing field overrides queued by [`crate::command::apply_command`] and
//! drained by [`crate::response`] as it builds the next control response.
//! `heapless::Vec` gives the fixed 8-slot capacity with no heap allocation.

use heapless::Vec;

use crate::error::{ControlError, ControlResult};

pub const QUEUE_CAPACITY: usize = 8;

/// An HVAC is given this many chances to echo back a matching overlay
/// before the entry is dropped and the field reverts to pure echo.
pub const MAX_RETRIES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEntry {
    /// The request type of the response this entry overlays (e.g. 0x38 or
    /// 0x3B) — together with `offset` this is the key spec's data model
    /// keys a queued write on; `response::overlay` only applies an entry
    /// to the response it was tagged for.
    pub packet_type: u8,
    /// Offset into the *response* payload layout, not the request/decode
    /// layout — the two differ (see `response.rs`).
    pub offset: u8,
    pub mask: u8,
    pub value: u8,
    pub remaining: u8,
}

#[derive(Debug, Default)]
pub struct WriteQueue {
    entries: Vec<WriteEntry, QUEUE_CAPACITY>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WriteEntry] {
        &self.entries
    }

    /// Queue an overlay at `(packet_type, offset)` with the default retry
    /// budget ([`MAX_RETRIES`]). A pending entry at the same key is
    /// replaced in place rather than duplicated.
    pub fn push(&mut self, packet_type: u8, offset: u8, mask: u8, value: u8) -> ControlResult<()> {
        self.push_with_count(packet_type, offset, mask, value, MAX_RETRIES)
    }

    /// Queue an overlay at `(packet_type, offset)`, injected up to `count`
    /// times before the entry retires and the field reverts to pure echo.
    /// A pending entry at the same key is replaced in place (and its retry
    /// counter reset to `count`) rather than duplicated. Returns
    /// [`ControlError::NoMem`] if the queue is full and no existing entry
    /// matches.
    pub fn push_with_count(
        &mut self,
        packet_type: u8,
        offset: u8,
        mask: u8,
        value: u8,
        count: u8,
    ) -> ControlResult<()> {
        let count = count.max(1);
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.packet_type == packet_type && e.offset == offset)
        {
            existing.mask = mask;
            existing.value = value;
            existing.remaining = count;
            return Ok(());
        }
        self.entries
            .push(WriteEntry {
                packet_type,
                offset,
                mask,
                value,
                remaining: count,
            })
            .map_err(|_| ControlError::NoMem)
    }

    /// Called once per response built from this queue's entries: decrements
    /// every entry's retry counter and drops those that have run out,
    /// reverting those offsets to pure echo.
    pub fn tick(&mut self) {
        for e in self.entries.iter_mut() {
            e.remaining = e.remaining.saturating_sub(1);
        }
        self.entries.retain(|e| e.remaining > 0);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_on_same_offset_does_not_grow_queue() {
        let mut q = WriteQueue::new();
        q.push(0x38, 0, 0xFE, 0x01).unwrap();
        q.push(0x38, 0, 0xFE, 0x00).unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.entries()[0].value, 0x00);
    }

    #[test]
    fn same_offset_different_packet_type_does_not_replace() {
        let mut q = WriteQueue::new();
        q.push(0x38, 0, 0xFE, 0x01).unwrap();
        q.push(0x3B, 0, 0xFE, 0x00).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn overflow_past_capacity_is_no_mem() {
        let mut q = WriteQueue::new();
        for i in 0..QUEUE_CAPACITY as u8 {
            q.push(0x38, i, 0xFF, 0x01).unwrap();
        }
        assert_eq!(
            q.push(0x38, QUEUE_CAPACITY as u8, 0xFF, 0x01),
            Err(ControlError::NoMem)
        );
    }

    #[test]
    fn replace_on_full_queue_still_succeeds() {
        let mut q = WriteQueue::new();
        for i in 0..QUEUE_CAPACITY as u8 {
            q.push(0x38, i, 0xFF, 0x01).unwrap();
        }
        assert!(q.push(0x38, 0, 0xFF, 0x02).is_ok());
        assert_eq!(q.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn retry_exhaustion_drops_entry() {
        let mut q = WriteQueue::new();
        q.push(0x38, 0, 0xFE, 0x01).unwrap();
        for _ in 0..MAX_RETRIES {
            assert!(!q.is_empty());
            q.tick();
        }
        assert!(q.is_empty());
    }

    #[test]
    fn multiple_entries_coexist() {
        let mut q = WriteQueue::new();
        q.push(0x38, 0, 0xFE, 0x01).unwrap();
        q.push(0x38, 2, 0x00, 0xF0).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn custom_count_overrides_default_retries() {
        let mut q = WriteQueue::new();
        q.push_with_count(0x38, 0, 0xFE, 0x01, 1).unwrap();
        q.tick();
        assert!(q.is_empty());
    }

    #[test]
    fn zero_count_clamped_to_one() {
        let mut q = WriteQueue::new();
        q.push_with_count(0x38, 0, 0xFE, 0x01, 0).unwrap();
        assert_eq!(q.entries()[0].remaining, 1);
    }
}
