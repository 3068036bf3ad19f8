//! Whole-table iteration, grounded in `dictGetIterator`/
//! `dictGetSafeIterator`/`dictNext`/`dictReleaseIterator`.
//!
//! Both [`SafeIter`] and [`UnsafeIter`] are external iterators: `next`
//! takes `&Dict<T>` as an explicit argument rather than the iterator
//! borrowing the dictionary for its own lifetime. A borrowing iterator
//! would conflict with the very feature that makes a safe iterator safe —
//! deleting the entry it just returned — since that delete needs `&mut
//! Dict<T>` while the iterator still holds a live reference into it. Each
//! `next` call instead hands back a [`Entry`] built from a tagged address
//! captured on the *previous* call, the same trick `dictNext` itself
//! plays by caching `nextEntry` before returning `entry`.

use std::marker::PhantomData;

use crate::dict::entry::{Entry, EntrySlot};
use crate::dict::{Dict, TypeDescriptor};

/// The table/bucket/next-link position shared by both iterator flavors.
struct Cursor {
    table_idx: usize,
    bucket_idx: isize,
    next_addr: Option<usize>,
}

impl Cursor {
    fn new() -> Self {
        Self {
            table_idx: 0,
            bucket_idx: -1,
            next_addr: None,
        }
    }

    /// Returns the address of the next entry to visit, advancing past
    /// empty buckets and across the table-0/table-1 boundary while a
    /// rehash is in progress.
    fn advance<T: TypeDescriptor>(&mut self, dict: &Dict<T>) -> Option<usize> {
        loop {
            if let Some(addr) = self.next_addr.take() {
                // SAFETY: `addr` was captured from a live entry on the
                // previous call. The only mutation this walk tolerates
                // between calls is deleting the entry just returned, and
                // deleting it leaves the chain entry it points to (the
                // one named here) allocated and relinked, not freed.
                self.next_addr = unsafe { EntrySlot::<T::Key, T::Value>::next_addr_at(addr) };
                return Some(addr);
            }

            self.bucket_idx += 1;
            if self.bucket_idx >= dict.table[self.table_idx].capacity() as isize {
                if dict.is_rehashing() && self.table_idx == 0 {
                    self.table_idx = 1;
                    self.bucket_idx = 0;
                } else {
                    return None;
                }
                if self.bucket_idx >= dict.table[self.table_idx].capacity() as isize {
                    return None;
                }
            }

            let head = dict.table[self.table_idx]
                .bucket(self.bucket_idx as usize)
                .as_ref();
            if let Some(slot) = head {
                self.next_addr = slot.next().map(|n| n.addr());
                return Some(slot.addr());
            }
        }
    }
}

/// An iterator that tolerates any mix of insertion and deletion between
/// `next` calls (except, as ever, deleting an entry other than the one
/// just returned), by pausing the dictionary's background rehash for as
/// long as it is alive. Mirrors `dictGetSafeIterator`.
pub struct SafeIter<T: TypeDescriptor> {
    cursor: Cursor,
    released: bool,
    _marker: PhantomData<T>,
}

impl<T: TypeDescriptor> SafeIter<T> {
    pub(crate) fn new(dict: &mut Dict<T>) -> Self {
        dict.pause_rehashing();
        Self {
            cursor: Cursor::new(),
            released: false,
            _marker: PhantomData,
        }
    }

    pub fn next<'d>(&mut self, dict: &'d Dict<T>) -> Option<Entry<'d, T::Key, T::Value>> {
        self.cursor
            .advance(dict)
            // SAFETY: `addr` names an entry still allocated in `dict`,
            // which outlives `'d` by construction of this call.
            .map(|addr| unsafe { Entry::from_addr(addr) })
    }

    /// Rewinds this iterator to the start of the table without releasing
    /// the rehash pause it holds, letting a caller walk the dictionary
    /// again from bucket 0. Mirrors `dictResetIterator`'s role of
    /// reinitializing an iterator's cursor fields for reuse.
    pub fn reset(&mut self) {
        self.cursor = Cursor::new();
    }

    /// Resumes background rehashing. Must be called exactly once per
    /// iterator; forgetting it leaves the dictionary's rehash paused
    /// forever. Mirrors `dictReleaseIterator`.
    pub fn release(mut self, dict: &mut Dict<T>) {
        self.released = true;
        dict.resume_rehashing();
    }
}

impl<T: TypeDescriptor> Drop for SafeIter<T> {
    fn drop(&mut self) {
        debug_assert!(self.released, "SafeIter dropped without calling release()");
    }
}

/// A faster iterator for a caller that guarantees the dictionary will not
/// be resized or rehashed, and will delete no entry but the one just
/// returned, for as long as the iterator is alive. [`UnsafeIter::release`]
/// checks (debug builds only) that the dictionary's structural state
/// didn't in fact change, by comparing a fingerprint taken at either end
/// of the walk. Mirrors `dictGetIterator` / the `safe == 0` path of
/// `dictNext`.
pub struct UnsafeIter<T: TypeDescriptor> {
    cursor: Cursor,
    fingerprint: u64,
    released: bool,
    _marker: PhantomData<T>,
}

impl<T: TypeDescriptor> UnsafeIter<T> {
    pub(crate) fn new(dict: &Dict<T>) -> Self {
        Self {
            cursor: Cursor::new(),
            fingerprint: fingerprint(dict),
            released: false,
            _marker: PhantomData,
        }
    }

    pub fn next<'d>(&mut self, dict: &'d Dict<T>) -> Option<Entry<'d, T::Key, T::Value>> {
        self.cursor
            .advance(dict)
            // SAFETY: see `SafeIter::next`.
            .map(|addr| unsafe { Entry::from_addr(addr) })
    }

    /// Rewinds this iterator to the start of the table. The fingerprint
    /// captured at construction is left untouched, since a reset does
    /// not imply the dictionary's structure was (or may now be) mutated.
    pub fn reset(&mut self) {
        self.cursor = Cursor::new();
    }

    pub fn release(mut self, dict: &Dict<T>) {
        self.released = true;
        debug_assert_eq!(
            self.fingerprint,
            fingerprint(dict),
            "dictionary structure changed during unsafe iteration"
        );
    }
}

impl<T: TypeDescriptor> Drop for UnsafeIter<T> {
    fn drop(&mut self) {
        debug_assert!(self.released, "UnsafeIter dropped without calling release()");
    }
}

impl<T: TypeDescriptor> Dict<T> {
    pub fn iter_safe(&mut self) -> SafeIter<T> {
        SafeIter::new(self)
    }

    pub fn iter_unsafe(&self) -> UnsafeIter<T> {
        UnsafeIter::new(self)
    }
}

/// Folds the six values that together describe a dictionary's structural
/// shape (both tables' addresses, size exponents, and used counts) into
/// one number, so two snapshots can be compared cheaply. Mirrors
/// `dictFingerprint`.
fn fingerprint<T: TypeDescriptor>(dict: &Dict<T>) -> u64 {
    let values = [
        dict.table[0].addr(),
        dict.table[0].size_exp().map_or(0, u64::from),
        dict.table[0].used() as u64,
        dict.table[1].addr(),
        dict.table[1].size_exp().map_or(0, u64::from),
        dict.table[1].used() as u64,
    ];
    let mut hash: u64 = 0;
    for v in values {
        hash = hash.wrapping_add(v);
        hash = mix64(hash);
    }
    hash
}

/// Thomas Wang's 64-bit integer hash mix, used here purely to scatter
/// [`fingerprint`]'s inputs rather than to hash keys.
fn mix64(mut x: u64) -> u64 {
    x = (!x).wrapping_add(x << 21);
    x ^= x >> 24;
    x = x.wrapping_add(x << 3).wrapping_add(x << 8);
    x ^= x >> 14;
    x = x.wrapping_add(x << 2).wrapping_add(x << 4);
    x ^= x >> 28;
    x = x.wrapping_add(x << 31);
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Dict;

    #[derive(Default)]
    struct IntSet;

    impl TypeDescriptor for IntSet {
        type Key = i64;
        type Value = ();

        fn hash_key(&self, key: &i64) -> u64 {
            *key as u64
        }
    }

    #[test]
    fn safe_iter_visits_every_inserted_key_exactly_once() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..50 {
            dict.add(i, ()).unwrap();
        }

        let mut seen = Vec::new();
        let mut iter = dict.iter_safe();
        while let Some(entry) = iter.next(&dict) {
            seen.push(*entry.key());
        }
        iter.release(&mut dict);

        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn safe_iter_tolerates_deleting_the_entry_just_returned() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..20 {
            dict.add(i, ()).unwrap();
        }

        let mut seen = Vec::new();
        let mut iter = dict.iter_safe();
        loop {
            let key = match iter.next(&dict) {
                Some(entry) => *entry.key(),
                None => break,
            };
            seen.push(key);
            dict.delete(&key);
        }
        iter.release(&mut dict);

        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        assert!(dict.is_empty());
    }

    #[test]
    fn reset_replays_the_same_walk() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..30 {
            dict.add(i, ()).unwrap();
        }

        let mut iter = dict.iter_safe();
        let mut first_pass = Vec::new();
        while let Some(entry) = iter.next(&dict) {
            first_pass.push(*entry.key());
        }
        iter.reset();
        let mut second_pass = Vec::new();
        while let Some(entry) = iter.next(&dict) {
            second_pass.push(*entry.key());
        }
        iter.release(&mut dict);

        first_pass.sort_unstable();
        second_pass.sort_unstable();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn unsafe_iter_release_accepts_an_untouched_dictionary() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..10 {
            dict.add(i, ()).unwrap();
        }

        let mut count = 0;
        let mut iter = dict.iter_unsafe();
        while iter.next(&dict).is_some() {
            count += 1;
        }
        iter.release(&dict);
        assert_eq!(count, 10);
    }
}
