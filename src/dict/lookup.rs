//! Read-only lookups, grounded in `dictFind`/`dictFetchValue` and the
//! `dictFindEntryByPtrAndHash` defrag helper.
//!
//! Unlike insert/delete/sampling, lookups here take `&self` rather than
//! `&mut self` and so do *not* piggyback a rehash step (`dictFind` does,
//! in the original). Forcing every read path through an exclusive borrow
//! just to advance a background migration would make the API
//! considerably less pleasant to use from safe Rust for no behavioral
//! payoff the caller can observe; see `DESIGN.md`.

use crate::dict::entry::{Entry, EntrySlot};
use crate::dict::table::TableSlot;
use crate::dict::{Dict, TypeDescriptor};
use crate::hint::unlikely;

impl<T: TypeDescriptor> Dict<T> {
    /// Looks up `key`, searching `table[0]` and then, only while
    /// rehashing, `table[1]`.
    pub fn find(&self, key: &T::Key) -> Option<Entry<'_, T::Key, T::Value>> {
        self.search_slot(key).map(Entry::new)
    }

    #[inline]
    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.search_slot(key).is_some()
    }

    /// Fetches just the value cell for `key`, without the key itself.
    /// Mirrors `dictFetchValue`.
    pub fn fetch_value(&self, key: &T::Key) -> Option<&crate::dict::entry::ValueCell<T::Value>> {
        self.search_slot(key).and_then(|slot| slot.value())
    }

    /// Finds an entry by the address of its key storage and a
    /// precomputed hash, ignoring key equality entirely — an identity
    /// match. Mirrors `dictFindEntryByPtrAndHash`, used by a defrag pass
    /// that has already relocated a key's bytes and needs to find the
    /// dictionary entry that used to point at the old address without
    /// re-running key comparison (which may not even be meaningful
    /// against a half-moved key).
    pub fn find_by_key_addr(&self, addr: usize, hash: u64) -> Option<Entry<'_, T::Key, T::Value>> {
        find_addr_in(&self.table[0], addr, hash)
            .or_else(|| {
                if self.is_rehashing() {
                    find_addr_in(&self.table[1], addr, hash)
                } else {
                    None
                }
            })
            .map(Entry::new)
    }

    pub(crate) fn search_slot(&self, key: &T::Key) -> Option<&EntrySlot<T::Key, T::Value>> {
        let hash = self.hash_of(key);
        find_in(&self.table[0], &self.type_descriptor, key, hash).or_else(|| {
            if self.is_rehashing() {
                find_in(&self.table[1], &self.type_descriptor, key, hash)
            } else {
                None
            }
        })
    }

    pub(crate) fn search_slot_mut(&mut self, key: &T::Key) -> Option<&mut EntrySlot<T::Key, T::Value>> {
        let hash = self.hash_of(key);
        let rehashing = self.is_rehashing();
        let td = &self.type_descriptor;
        if let Some(idx) = find_index_in(&self.table[0], td, key, hash) {
            return self.table[0].bucket_mut(idx).as_mut().and_then(|head| {
                walk_to_match_mut(head, td, key)
            });
        }
        if rehashing {
            if let Some(idx) = find_index_in(&self.table[1], td, key, hash) {
                return self.table[1].bucket_mut(idx).as_mut().and_then(|head| {
                    walk_to_match_mut(head, td, key)
                });
            }
        }
        None
    }
}

fn find_in<'a, T: TypeDescriptor>(
    table: &'a TableSlot<T::Key, T::Value>,
    td: &T,
    key: &T::Key,
    hash: u64,
) -> Option<&'a EntrySlot<T::Key, T::Value>> {
    if !table.is_allocated() {
        return None;
    }
    let idx = table.bucket_index(hash);
    let mut cursor = table.bucket(idx).as_ref();
    while let Some(slot) = cursor {
        if unlikely(td.keys_equal(slot.key(), key)) {
            return Some(slot);
        }
        cursor = slot.next();
    }
    None
}

/// Returns the bucket index `key` hashes to in `table`, if that bucket's
/// chain actually contains `key`. A cheap existence probe used to decide
/// which table/bucket `search_slot_mut` should re-walk mutably, since a
/// shared lookup can't be reused to produce a mutable one.
fn find_index_in<T: TypeDescriptor>(
    table: &TableSlot<T::Key, T::Value>,
    td: &T,
    key: &T::Key,
    hash: u64,
) -> Option<usize> {
    if !table.is_allocated() {
        return None;
    }
    let idx = table.bucket_index(hash);
    if find_in::<T>(table, td, key, hash).is_some() {
        Some(idx)
    } else {
        None
    }
}

fn walk_to_match_mut<'a, T: TypeDescriptor>(
    mut cursor: &'a mut EntrySlot<T::Key, T::Value>,
    td: &T,
    key: &T::Key,
) -> Option<&'a mut EntrySlot<T::Key, T::Value>> {
    loop {
        if td.keys_equal(cursor.key(), key) {
            return Some(cursor);
        }
        cursor = cursor.next_mut()?;
    }
}

fn find_addr_in<K, V>(table: &TableSlot<K, V>, addr: usize, hash: u64) -> Option<&EntrySlot<K, V>> {
    if !table.is_allocated() {
        return None;
    }
    let idx = table.bucket_index(hash);
    let mut cursor = table.bucket(idx).as_ref();
    while let Some(slot) = cursor {
        if (slot.key() as *const K as usize) == addr {
            return Some(slot);
        }
        cursor = slot.next();
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::dict::{Dict, TypeDescriptor};

    #[derive(Default)]
    struct IntMap;

    impl TypeDescriptor for IntMap {
        type Key = i64;
        type Value = i64;

        fn hash_key(&self, key: &i64) -> u64 {
            *key as u64
        }
    }

    #[test]
    fn find_locates_every_inserted_key_and_rejects_absent_ones() {
        let mut dict: Dict<IntMap> = Dict::new();
        for i in 0..50 {
            dict.add(i, i * 2).unwrap();
        }
        for i in 0..50 {
            assert_eq!(dict.find(&i).map(|e| *e.value().unwrap()), Some(i * 2));
        }
        assert!(dict.find(&50).is_none());
    }

    #[test]
    fn contains_key_matches_find_during_an_in_progress_rehash() {
        let mut dict: Dict<IntMap> = Dict::new();
        for i in 0..64 {
            dict.add(i, i).unwrap();
        }
        dict.expand(256).unwrap();
        assert!(dict.is_rehashing());
        for i in 0..64 {
            assert!(dict.contains_key(&i));
        }
        assert!(!dict.contains_key(&64));
    }

    #[test]
    fn fetch_value_returns_the_value_cell_without_the_key() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(9, 81).unwrap();
        let cell = dict.fetch_value(&9).expect("key is present");
        assert_eq!(cell.as_pointer(), Some(&81));
    }

    #[test]
    fn find_by_key_addr_matches_the_entry_that_owns_that_key_storage() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(3, 30).unwrap();
        let slot = dict.search_slot(&3).expect("key is present");
        let addr = slot.key() as *const i64 as usize;
        let hash = dict.hash_of(&3);
        let found = dict.find_by_key_addr(addr, hash).expect("matching address");
        assert_eq!(*found.key(), 3);
    }
}
