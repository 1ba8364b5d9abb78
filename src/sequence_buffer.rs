//! Fixed-capacity circular buffer indexed by `sequence mod capacity`.

pub use self::packet_slot::PacketSlot;

use crate::packet::{SequenceNumber, SEQUENCE_MID};

mod packet_slot;

/// Collection to store data of any kind under a sequence number.
///
/// Every sequence number maps onto the slot `sequence % capacity`, so a slot is reused once the
/// sequence numbers have advanced by `capacity`. A lookup only succeeds when the slot still holds
/// exactly the requested sequence number.
///
/// The capacity has to be a power of two, otherwise `u32::MAX` and `0` share a slot.
#[derive(Debug)]
pub struct SequenceBuffer<T> {
    entries: Box<[Option<(SequenceNumber, T)>]>,
}

impl<T> SequenceBuffer<T> {
    /// Creates a buffer with `size` empty slots.
    ///
    /// A size of zero is bumped to one, `Config::validate` rules that out before a transport
    /// is created.
    pub fn with_capacity(size: u32) -> Self {
        let mut entries = Vec::with_capacity(size.max(1) as usize);
        entries.resize_with(size.max(1) as usize, || None);
        Self {
            entries: entries.into_boxed_slice(),
        }
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the slot of `sequence` currently holds `sequence`.
    pub fn exists(&self, sequence: SequenceNumber) -> bool {
        self.get(sequence).is_some()
    }

    /// Returns the entry stored under `sequence`, if its slot was not reused since.
    pub fn get(&self, sequence: SequenceNumber) -> Option<&T> {
        match &self.entries[self.index(sequence)] {
            Some((stored, value)) if *stored == sequence => Some(value),
            _ => None,
        }
    }

    /// Returns the entry stored under `sequence` mutably, if its slot was not reused since.
    pub fn get_mut(&mut self, sequence: SequenceNumber) -> Option<&mut T> {
        let index = self.index(sequence);
        match &mut self.entries[index] {
            Some((stored, value)) if *stored == sequence => Some(value),
            _ => None,
        }
    }

    /// Stores `value` under `sequence` and returns whatever occupied the slot before.
    ///
    /// The previous occupant may belong to an older sequence number that aliases the same slot.
    #[must_use = "the evicted entry may still own resources that need releasing"]
    pub fn insert(&mut self, sequence: SequenceNumber, value: T) -> Option<(SequenceNumber, T)> {
        let index = self.index(sequence);
        self.entries[index].replace((sequence, value))
    }

    /// Removes and returns the entry stored under `sequence`.
    pub fn remove(&mut self, sequence: SequenceNumber) -> Option<T> {
        let index = self.index(sequence);
        match &self.entries[index] {
            Some((stored, _)) if *stored == sequence => {
                self.entries[index].take().map(|(_, value)| value)
            }
            _ => None,
        }
    }

    /// Iterates over all occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (SequenceNumber, &T)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.as_ref().map(|(sequence, value)| (*sequence, value)))
    }

    fn index(&self, sequence: SequenceNumber) -> usize {
        (sequence % self.entries.len() as SequenceNumber) as usize
    }
}

/// Returns true if `s1` comes after `s2`, taking wrap-around into account.
pub fn sequence_greater_than(s1: SequenceNumber, s2: SequenceNumber) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_MID)) || ((s1 < s2) && (s2 - s1 > SEQUENCE_MID))
}

/// Returns true if `s1` comes before `s2`, taking wrap-around into account.
pub fn sequence_less_than(s1: SequenceNumber, s2: SequenceNumber) -> bool {
    sequence_greater_than(s2, s1)
}
