//! One of the two bucket arrays a dictionary juggles while rehashing,
//! grounded in the `ht_table`/`ht_size_exp`/`ht_used` trio of arrays in
//! `dict`.

use crate::config::INITIAL_SIZE_EXP;
use crate::dict::entry::EntrySlot;

/// Bucket count for a given size exponent (`1 << exp`), matching
/// `DICTHT_SIZE`.
#[inline]
pub(crate) fn capacity_for_exp(exp: u8) -> usize {
    1usize << exp
}

/// Smallest exponent whose capacity holds at least `size` entries,
/// matching `_dictNextExp`.
pub(crate) fn next_exp(size: usize) -> u8 {
    let mut exp = INITIAL_SIZE_EXP;
    while capacity_for_exp(exp) < size {
        exp += 1;
    }
    exp
}

/// One of a dictionary's two bucket arrays. Unallocated (`size_exp ==
/// None`, matching the C original's `-1` sentinel) until the dictionary
/// first needs it.
pub(crate) struct TableSlot<K, V> {
    buckets: Option<Box<[Option<EntrySlot<K, V>>]>>,
    size_exp: Option<u8>,
    used: usize,
}

impl<K, V> TableSlot<K, V> {
    pub fn empty() -> Self {
        Self {
            buckets: None,
            size_exp: None,
            used: 0,
        }
    }

    pub fn with_exp(exp: u8) -> Self {
        let len = capacity_for_exp(exp);
        let buckets: Vec<Option<EntrySlot<K, V>>> = (0..len).map(|_| None).collect();
        Self {
            buckets: Some(buckets.into_boxed_slice()),
            size_exp: Some(exp),
            used: 0,
        }
    }

    /// Like [`TableSlot::with_exp`] but reports allocation failure
    /// instead of aborting the process, matching the original's
    /// `malloc_failed` out-parameter on `_dictExpand`.
    pub fn try_with_exp(exp: u8) -> std::result::Result<Self, ()> {
        let len = capacity_for_exp(exp);
        let mut buckets: Vec<Option<EntrySlot<K, V>>> = Vec::new();
        buckets.try_reserve_exact(len).map_err(|_| ())?;
        buckets.resize_with(len, || None);
        Ok(Self {
            buckets: Some(buckets.into_boxed_slice()),
            size_exp: Some(exp),
            used: 0,
        })
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.buckets.is_some()
    }

    #[inline]
    pub fn size_exp(&self) -> Option<u8> {
        self.size_exp
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.as_ref().map_or(0, |b| b.len())
    }

    #[inline]
    fn mask(&self) -> usize {
        self.capacity().wrapping_sub(1)
    }

    #[inline]
    pub fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask()
    }

    #[inline]
    pub fn bucket(&self, idx: usize) -> &Option<EntrySlot<K, V>> {
        &self.buckets.as_ref().expect("bucket access on unallocated table")[idx]
    }

    #[inline]
    pub fn bucket_mut(&mut self, idx: usize) -> &mut Option<EntrySlot<K, V>> {
        &mut self.buckets.as_mut().expect("bucket access on unallocated table")[idx]
    }

    /// The bucket array's address, or 0 when unallocated. Used only as
    /// one of the six structural values folded into an unsafe iterator's
    /// fingerprint (`crate::dict::iter::fingerprint`) — never
    /// dereferenced as a pointer.
    #[inline]
    pub fn addr(&self) -> u64 {
        self.buckets.as_ref().map_or(0, |b| b.as_ptr() as *const () as u64)
    }

    #[inline]
    pub fn increment_used(&mut self) {
        self.used += 1;
    }

    #[inline]
    pub fn decrement_used(&mut self) {
        debug_assert!(self.used > 0);
        self.used -= 1;
    }

    /// Swaps this table out for an empty one, handing ownership of its
    /// buckets to the caller (used when a rehash completes and `table[1]`
    /// becomes the new `table[0]`).
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }
}

impl<K, V> Drop for TableSlot<K, V> {
    fn drop(&mut self) {
        if let Some(buckets) = self.buckets.take() {
            for bucket in Vec::from(buckets) {
                if let Some(head) = bucket {
                    head.drop_chain();
                }
            }
        }
    }
}
