//! Cursor-based incremental scanning, grounded in `dictScan` /
//! `dictScanDefrag`.
//!
//! A [`Dict::scan`] call visits exactly one bucket (two, while rehashing)
//! per call and returns an opaque cursor to pass to the next call; a
//! caller loops until that cursor comes back as `0`. Mutating the
//! dictionary between calls never causes an element present for the
//! whole walk to be skipped, and never visits one twice, UNLESS it is
//! itself rehashed out of the bucket the cursor is currently covering —
//! both guarantees come from the bit-reversed cursor increment below,
//! which visits buckets in an order that stays correct across a table
//! whose size has doubled or halved since the walk started.

use crate::dict::entry::{self, Entry, EntrySlot};
use crate::dict::table::TableSlot;
use crate::dict::{Dict, TypeDescriptor};

impl<T: TypeDescriptor> Dict<T> {
    /// Visits every entry in the bucket(s) named by `cursor`, calling
    /// `visit` once per entry, and returns the cursor value to pass to
    /// the next call. Rehashing is paused for the duration of the call
    /// (a scan callback may itself want to look entries up).
    pub fn scan(&mut self, cursor: u64, mut visit: impl FnMut(Entry<'_, T::Key, T::Value>)) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.pause_rehashing();
        let next = if !self.is_rehashing() {
            let mask = table_mask(&self.table[0]);
            emit_bucket(&self.table[0], cursor & mask, &mut visit);
            advance_cursor(cursor, mask)
        } else {
            scan_both_tables(&self.table, cursor, &mut visit)
        };
        self.resume_rehashing();
        next
    }

    /// Like [`Dict::scan`], but relocates each visited entry into a
    /// freshly allocated node of the same shape before calling `visit`,
    /// then calls [`TypeDescriptor::after_replace_entry`] so a caller
    /// keeping an external index by address can follow the move. Mirrors
    /// `dictScanDefrag`.
    ///
    /// While a rehash is in progress, relocating storage would race the
    /// migration over which table ends up owning an entry, so this falls
    /// back to the non-relocating behavior of [`Dict::scan`] for the
    /// duration of the rehash.
    pub fn scan_with_defrag(
        &mut self,
        cursor: u64,
        mut visit: impl FnMut(Entry<'_, T::Key, T::Value>),
    ) -> u64
    where
        T::Key: Clone,
        T::Value: Clone,
    {
        if self.is_empty() {
            return 0;
        }
        self.pause_rehashing();
        let next = if !self.is_rehashing() {
            let mask = table_mask(&self.table[0]);
            let idx = (cursor & mask) as usize;
            defrag_bucket(&mut self.table[0], idx, &self.type_descriptor, &mut visit);
            advance_cursor(cursor, mask)
        } else {
            scan_both_tables(&self.table, cursor, &mut visit)
        };
        self.resume_rehashing();
        next
    }
}

/// `dictScan`'s rehashing branch: the smaller table gets exactly one
/// bucket visited, the larger table gets every bucket whose index maps
/// back onto that one smaller-table bucket.
fn scan_both_tables<K, V>(
    table: &[TableSlot<K, V>; 2],
    cursor: u64,
    visit: &mut impl FnMut(Entry<'_, K, V>),
) -> u64 {
    let (small, large) = if table[0].capacity() <= table[1].capacity() {
        (0, 1)
    } else {
        (1, 0)
    };
    let m0 = table_mask(&table[small]);
    let m1 = table_mask(&table[large]);

    emit_bucket(&table[small], cursor & m0, visit);

    let mut v = cursor;
    loop {
        emit_bucket(&table[large], v & m1, visit);
        v = advance_cursor(v, m1);
        if v & (m0 ^ m1) == 0 {
            break;
        }
    }
    v
}

#[inline]
fn table_mask<K, V>(table: &TableSlot<K, V>) -> u64 {
    (table.capacity() as u64).wrapping_sub(1)
}

/// Advances a scan cursor past every index sharing `mask`'s low bits with
/// `v`, by reversing `v`, incrementing, and reversing back. Counting
/// "backwards" in bit-reversed space visits the high-order bit first, so
/// the enumeration order stays a valid traversal of either a table that
/// has since doubled (each old bucket becomes two new ones, both visited
/// consecutively) or halved (two old buckets collapse into the one new
/// one, visited together) in size. Mirrors the `rev()` dance in
/// `dictScan`.
fn advance_cursor(v: u64, mask: u64) -> u64 {
    let v = v | !mask;
    let v = v.reverse_bits();
    let v = v.wrapping_add(1);
    v.reverse_bits()
}

fn emit_bucket<'a, K, V>(
    table: &'a TableSlot<K, V>,
    idx: u64,
    visit: &mut impl FnMut(Entry<'a, K, V>),
) {
    let mut cursor = table.bucket(idx as usize).as_ref();
    while let Some(slot) = cursor {
        let next = slot.next();
        visit(Entry::new(slot));
        cursor = next;
    }
}

fn defrag_bucket<T: TypeDescriptor>(
    table: &mut TableSlot<T::Key, T::Value>,
    idx: usize,
    td: &T,
    visit: &mut impl FnMut(Entry<'_, T::Key, T::Value>),
) where
    T::Key: Clone,
    T::Value: Clone,
{
    let mut relocated = Vec::new();
    let mut cursor = table.bucket_mut(idx).take();
    while let Some(mut slot) = cursor {
        let next = slot.take_next();
        let fresh = entry::clone_shape(&slot);
        slot.drop_chain();

        let mut view = Entry::new(&fresh);
        td.after_replace_entry(&mut view);
        visit(Entry::new(&fresh));

        relocated.push(fresh);
        cursor = next;
    }

    let mut new_head = None;
    for slot in relocated.into_iter().rev() {
        new_head = Some(slot.prepend_to(new_head));
    }
    *table.bucket_mut(idx) = new_head;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Dict;
    use std::collections::HashSet;

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
    fn full_scan_cycle_visits_every_key_exactly_once() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..200 {
            dict.add(i, ()).unwrap();
        }

        let mut seen = HashSet::new();
        let mut cursor = 0u64;
        loop {
            cursor = dict.scan(cursor, |entry| {
                assert!(seen.insert(*entry.key()), "key visited twice in one scan cycle");
            });
            if cursor == 0 {
                break;
            }
        }

        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn scan_with_defrag_relocates_without_losing_entries() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..64 {
            dict.add(i, ()).unwrap();
        }

        let mut seen = HashSet::new();
        let mut cursor = 0u64;
        loop {
            cursor = dict.scan_with_defrag(cursor, |entry| {
                seen.insert(*entry.key());
            });
            if cursor == 0 {
                break;
            }
        }

        assert_eq!(seen.len(), 64);
        for i in 0..64 {
            assert!(dict.contains_key(&i));
        }
    }

    #[test]
    fn scan_of_empty_dictionary_returns_zero_immediately() {
        let mut dict: Dict<IntSet> = Dict::new();
        assert_eq!(dict.scan(0, |_| panic!("nothing to visit")), 0);
    }
}
