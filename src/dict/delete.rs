//! Removal, grounded in `dictGenericDelete`/`dictUnlink`/
//! `dictFreeUnlinkedEntry`/`dictTwoPhaseUnlinkFind`/
//! `dictTwoPhaseUnlinkFree`.

use std::marker::PhantomData;

use crate::dict::entry::{Entry, EntrySlot, ValueCell};
use crate::dict::table::TableSlot;
use crate::dict::{Dict, TypeDescriptor};

/// An entry detached from its dictionary but not yet destroyed, returned
/// by [`Dict::unlink`] and [`Dict::two_phase_unlink_find`]. Dropping this
/// without passing it to [`Dict::free_unlinked`] still frees the entry's
/// memory (no leak), but if it came from `two_phase_unlink_find` the
/// dictionary's rehash-pause counter is left incremented forever — a
/// caller contract violation, not a memory-safety issue.
pub struct UnlinkedEntry<T: TypeDescriptor> {
    slot: Option<EntrySlot<T::Key, T::Value>>,
    paused_rehash: bool,
    _marker: PhantomData<T>,
}

impl<T: TypeDescriptor> UnlinkedEntry<T> {
    pub fn key(&self) -> &T::Key {
        self.slot.as_ref().expect("UnlinkedEntry already consumed").key()
    }

    pub fn value(&self) -> Option<&ValueCell<T::Value>> {
        self.slot.as_ref().expect("UnlinkedEntry already consumed").value()
    }

    pub fn entry(&self) -> Entry<'_, T::Key, T::Value> {
        Entry::new(self.slot.as_ref().expect("UnlinkedEntry already consumed"))
    }
}

impl<T: TypeDescriptor> Drop for UnlinkedEntry<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.drop_chain();
        }
    }
}

impl<T: TypeDescriptor> Dict<T> {
    /// Removes `key`, returning whether it was present. Composes
    /// [`Dict::unlink`] and [`Dict::free_unlinked`].
    pub fn delete(&mut self, key: &T::Key) -> bool {
        self.piggyback_rehash();
        match self.unlink_detach(key, false) {
            Some(handle) => {
                self.free_unlinked(handle);
                self.shrink_if_needed();
                true
            }
            None => false,
        }
    }

    /// Detaches `key`'s entry from the table structure without running
    /// destructors, so the caller can still inspect it. Mirrors
    /// `dictUnlink`.
    pub fn unlink(&mut self, key: &T::Key) -> Option<UnlinkedEntry<T>> {
        self.piggyback_rehash();
        self.unlink_detach(key, false)
    }

    /// Runs destructors on and frees an entry previously detached by
    /// [`Dict::unlink`] or [`Dict::two_phase_unlink_find`]. Mirrors
    /// `dictFreeUnlinkedEntry` / `dictTwoPhaseUnlinkFree`.
    pub fn free_unlinked(&mut self, mut handle: UnlinkedEntry<T>) {
        if let Some(slot) = handle.slot.take() {
            slot.drop_chain();
        }
        if handle.paused_rehash {
            self.resume_rehashing();
        }
    }

    /// Like [`Dict::unlink`], but additionally pauses rehashing until the
    /// companion [`Dict::free_unlinked`] call, so a caller can inspect
    /// the detached entry across other dictionary operations without a
    /// concurrent rehash altering table structure underneath it. Mirrors
    /// `dictTwoPhaseUnlinkFind`.
    pub fn two_phase_unlink_find(&mut self, key: &T::Key) -> Option<UnlinkedEntry<T>> {
        self.piggyback_rehash();
        let handle = self.unlink_detach(key, true);
        if handle.is_some() {
            self.pause_rehashing();
        }
        handle
    }

    /// Alias for [`Dict::free_unlinked`], named to match
    /// `dictTwoPhaseUnlinkFree` for callers that paired it with
    /// [`Dict::two_phase_unlink_find`].
    pub fn two_phase_unlink_free(&mut self, handle: UnlinkedEntry<T>) {
        self.free_unlinked(handle);
    }

    fn unlink_detach(&mut self, key: &T::Key, will_pause: bool) -> Option<UnlinkedEntry<T>> {
        let hash = self.hash_of(key);
        let slot = unlink_in_table::<T>(&mut self.table[0], &self.type_descriptor, key, hash)
            .or_else(|| {
                if self.is_rehashing() {
                    unlink_in_table::<T>(&mut self.table[1], &self.type_descriptor, key, hash)
                } else {
                    None
                }
            })?;
        Some(UnlinkedEntry {
            slot: Some(slot),
            paused_rehash: will_pause,
            _marker: PhantomData,
        })
    }
}

/// Detaches `key`'s entry from `table`'s chain, if present, leaving its
/// own `next` link cleared (`EntrySlot::take_next` already did that).
fn unlink_in_table<T: TypeDescriptor>(
    table: &mut TableSlot<T::Key, T::Value>,
    td: &T,
    key: &T::Key,
    hash: u64,
) -> Option<EntrySlot<T::Key, T::Value>> {
    if !table.is_allocated() {
        return None;
    }
    let idx = table.bucket_index(hash);
    let bucket = table.bucket_mut(idx);

    let head_matches = bucket.as_ref().map(|h| td.keys_equal(h.key(), key)).unwrap_or(false);
    if head_matches {
        let mut detached = bucket.take().expect("just checked Some above");
        *bucket = detached.take_next();
        table.decrement_used();
        return Some(detached);
    }

    let mut cursor = bucket.as_mut()?;
    loop {
        let next_matches = cursor.next().map(|n| td.keys_equal(n.key(), key)).unwrap_or(false);
        if next_matches {
            let mut found = cursor.take_next().expect("just checked Some above");
            let rest = found.take_next();
            cursor.set_next(rest);
            table.decrement_used();
            return Some(found);
        }
        cursor = cursor.next_mut()?;
    }
}
