//! Entry representation.
//!
//! The C original packs a key, an optional value, and a chain pointer
//! into one `dictEntry`, and shrinks that struct for "no value" dicts
//! (used as sets) by omitting the value word and, for the last entry in
//! a bucket, the `next` word too — the entry is then just a bare key
//! pointer with its two low bits repurposed as a shape tag.
//!
//! [`EntrySlot`] reproduces that trick directly: it is a tagged pointer
//! to one of three shapes, chosen per entry rather than per dictionary,
//! so a `no_value` bucket chain can mix a trailing [`EntryTag::BareKey`]
//! entry with [`EntryTag::KeyNext`] entries ahead of it in the same
//! chain. Mirrors the `Bucket<T>` raw-pointer abstraction this crate's
//! table module is built around, rather than a plain enum, so the space
//! saving is real instead of notional.
//!
//! `BareKey` goes one step further than the other two shapes: when a
//! `TypeDescriptor` reports `keys_are_odd` (its keys are pointer-sized
//! values whose low two bits already read `01`), the key's own bits
//! become the tagged slot directly — no entry is allocated at all,
//! matching `keys_are_odd`'s `void *key = entry` trick in `dict.c`.

use std::marker::PhantomData;
use std::ptr::NonNull;

/// The three on-disk shapes an entry can take.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
pub(crate) enum EntryTag {
    /// Key, value, and a chain pointer. The shape every entry takes in a
    /// dictionary that stores values.
    Full = 0b00,
    /// Key only, no chain pointer: this is the last (often only) entry
    /// in its bucket in a `no_value` dictionary.
    BareKey = 0b01,
    /// Key and a chain pointer, no value: a non-tail entry in a
    /// `no_value` dictionary's bucket.
    KeyNext = 0b10,
}

impl EntryTag {
    const MASK: usize = 0b11;

    #[inline]
    fn from_bits(bits: usize) -> Self {
        match bits & Self::MASK {
            0b00 => EntryTag::Full,
            0b01 => EntryTag::BareKey,
            0b10 => EntryTag::KeyNext,
            _ => unreachable!("tag value 0b11 is never produced by this module"),
        }
    }
}

/// The value word of a [`EntryTag::Full`] entry, mirroring the
/// `v` union inside `dictEntry`: a typed value is usually stored behind
/// a pointer, but small integers and floats are common enough in a KV
/// store's workload to justify storing them inline instead.
#[derive(Clone)]
pub enum ValueCell<V> {
    Pointer(Box<V>),
    I64(i64),
    U64(u64),
    F64(f64),
}

impl<V> ValueCell<V> {
    #[inline]
    pub fn as_pointer(&self) -> Option<&V> {
        match self {
            ValueCell::Pointer(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_pointer_mut(&mut self) -> Option<&mut V> {
        match self {
            ValueCell::Pointer(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueCell::I64(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueCell::U64(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValueCell::F64(v) => Some(*v),
            _ => None,
        }
    }
}

pub(crate) struct FullNode<K, V> {
    pub key: K,
    pub value: ValueCell<V>,
    pub next: Option<EntrySlot<K, V>>,
}

pub(crate) struct KeyNextNode<K, V> {
    pub key: K,
    pub next: Option<EntrySlot<K, V>>,
    _marker: PhantomData<V>,
}

/// A tagged pointer to one of [`FullNode`], [`KeyNextNode`], or (for a
/// `no_value` dictionary whose keys are pointer-sized and self-tagged) a
/// bare key stored inline with no backing allocation at all.
///
/// # Safety invariants
/// - `tagged`'s low two bits always hold a valid [`EntryTag`].
/// - For [`EntryTag::Full`] and [`EntryTag::KeyNext`], those two bits are
///   masked off before use: the untagged address is always the result of
///   `Box::into_raw` on the node shape that tag names, so reconstructing
///   that exact `Box` type from it is sound.
/// - For [`EntryTag::BareKey`], `tagged` is *not* masked: its bits are
///   the key's own bit pattern (see [`EntrySlot::new_bare_key`]), not a
///   pointer to anything, so there is no allocation to reconstruct.
/// - An `EntrySlot` is exactly as owning as whatever it was built from
///   (a `Box`, or the key's own moved-in bytes): dropping one without
///   reconstituting and dropping that value leaks.
pub(crate) struct EntrySlot<K, V> {
    tagged: NonNull<u8>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> EntrySlot<K, V> {
    fn from_raw(ptr: *mut u8, tag: EntryTag) -> Self {
        let tagged = (ptr as usize) | (tag as usize);
        Self {
            // SAFETY: `ptr` came from `Box::into_raw`, which never returns
            // a null or misaligned-below-4-byte pointer for these node
            // types (all contain a pointer-sized field).
            tagged: unsafe { NonNull::new_unchecked(tagged as *mut u8) },
            _marker: PhantomData,
        }
    }

    pub fn new_full(node: FullNode<K, V>) -> Self {
        let ptr = Box::into_raw(Box::new(node)) as *mut u8;
        Self::from_raw(ptr, EntryTag::Full)
    }

    pub fn new_key_next(key: K, next: Option<EntrySlot<K, V>>) -> Self {
        let node = KeyNextNode {
            key,
            next,
            _marker: PhantomData,
        };
        let ptr = Box::into_raw(Box::new(node)) as *mut u8;
        Self::from_raw(ptr, EntryTag::KeyNext)
    }

    /// Stores `key` directly in the tagged slot, with no heap allocation
    /// at all: the `001` shape from the entry-tagging table. Sound only
    /// when the owning dictionary's `TypeDescriptor` reports
    /// `no_value() && keys_are_odd()` — `key` must be exactly
    /// pointer-sized and its own low two bits must already read `0b01`,
    /// so no tag needs to be OR'd in over a heap pointer's naturally
    /// zero low bits; there's no heap pointer here at all. Mirrors the
    /// `d->type->keys_are_odd && !d->ht_table[1][h]` branch in
    /// `dictRehash` (`dict.c:415`) and `dictAddRaw` (`dict.c:589-592`).
    pub fn new_bare_key(key: K) -> Self {
        debug_assert_eq!(
            std::mem::size_of::<K>(),
            std::mem::size_of::<usize>(),
            "keys_are_odd requires a pointer-sized key"
        );
        debug_assert!(
            std::mem::align_of::<K>() <= std::mem::align_of::<usize>(),
            "keys_are_odd requires a key no more strictly aligned than usize"
        );
        // SAFETY: size/alignment checked above; this moves `key`'s own
        // bytes into `bits` without running its destructor (`forget`
        // below prevents the original binding from running it too), so
        // exactly one logical owner of those bytes exists afterward.
        let bits: usize = unsafe { std::ptr::read(&key as *const K as *const usize) };
        std::mem::forget(key);
        debug_assert_eq!(
            bits & EntryTag::MASK,
            EntryTag::BareKey as usize,
            "keys_are_odd key did not have its low two bits set to 0b01"
        );
        Self {
            // SAFETY: an odd key is non-null by construction (bit 0 set).
            tagged: unsafe { NonNull::new_unchecked(bits as *mut u8) },
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn tag(&self) -> EntryTag {
        EntryTag::from_bits(self.tagged.as_ptr() as usize)
    }

    #[inline]
    fn untagged(&self) -> *mut u8 {
        ((self.tagged.as_ptr() as usize) & !EntryTag::MASK) as *mut u8
    }

    /// The raw tagged address of this entry, stable for as long as the
    /// entry stays allocated. Used by [`crate::dict::iter`] to capture a
    /// "visit this one next" pointer that survives the current entry
    /// being unlinked and freed out from under the walk.
    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self.tagged.as_ptr() as usize
    }

    /// Borrows the key living at a previously-captured [`EntrySlot::addr`]
    /// without reconstructing an owning `EntrySlot`.
    ///
    /// # Safety
    /// `addr` must have been produced by [`EntrySlot::addr`] on an entry
    /// that is still allocated (not freed) for the duration of `'a`.
    #[inline]
    pub(crate) unsafe fn key_at<'a>(addr: usize) -> &'a K {
        let untagged = (addr & !EntryTag::MASK) as *const ();
        match EntryTag::from_bits(addr) {
            EntryTag::Full => &(*(untagged as *const FullNode<K, V>)).key,
            EntryTag::KeyNext => &(*(untagged as *const KeyNextNode<K, V>)).key,
            EntryTag::BareKey => unreachable!(
                "a BareKey address carries no backing allocation to borrow from; \
                 Entry::from_addr resolves it through the InlineKey path instead"
            ),
        }
    }

    /// Borrows the value cell living at a previously-captured
    /// [`EntrySlot::addr`], or `None` if that shape carries no value.
    ///
    /// # Safety
    /// Same contract as [`EntrySlot::key_at`].
    #[inline]
    pub(crate) unsafe fn value_at<'a>(addr: usize) -> Option<&'a ValueCell<V>> {
        let untagged = (addr & !EntryTag::MASK) as *const ();
        match EntryTag::from_bits(addr) {
            EntryTag::Full => Some(&(*(untagged as *const FullNode<K, V>)).value),
            EntryTag::KeyNext | EntryTag::BareKey => None,
        }
    }

    /// Mutably borrows the value cell living at a previously-captured
    /// [`EntrySlot::addr`].
    ///
    /// # Safety
    /// Same contract as [`EntrySlot::key_at`]; additionally the caller
    /// must hold no other live reference into this entry.
    #[inline]
    pub(crate) unsafe fn value_at_mut<'a>(addr: usize) -> Option<&'a mut ValueCell<V>> {
        let untagged = (addr & !EntryTag::MASK) as *mut ();
        match EntryTag::from_bits(addr) {
            EntryTag::Full => Some(&mut (*(untagged as *mut FullNode<K, V>)).value),
            EntryTag::KeyNext | EntryTag::BareKey => None,
        }
    }

    /// The address of the entry chained after the one at `addr`, if any.
    ///
    /// # Safety
    /// Same contract as [`EntrySlot::key_at`].
    #[inline]
    pub(crate) unsafe fn next_addr_at(addr: usize) -> Option<usize> {
        let untagged = (addr & !EntryTag::MASK) as *const ();
        match EntryTag::from_bits(addr) {
            EntryTag::Full => (*(untagged as *const FullNode<K, V>)).next.as_ref().map(|n| n.addr()),
            EntryTag::KeyNext => (*(untagged as *const KeyNextNode<K, V>)).next.as_ref().map(|n| n.addr()),
            EntryTag::BareKey => None,
        }
    }

    /// Borrows this entry's key regardless of shape.
    pub fn key(&self) -> &K {
        // SAFETY: the tag names the node type the untagged address was
        // allocated as; each arm casts to that exact type. `BareKey` is
        // special: `self.tagged` holds the key's own bytes rather than a
        // pointer to them, so the field itself (not its pointee) is
        // reinterpreted as `K` — sound per the size/alignment checks in
        // `new_bare_key`, and valid for as long as `self` is, since the
        // bytes live inline in `self` rather than behind a masked
        // pointer.
        unsafe {
            match self.tag() {
                EntryTag::Full => &(*(self.untagged() as *const FullNode<K, V>)).key,
                EntryTag::KeyNext => &(*(self.untagged() as *const KeyNextNode<K, V>)).key,
                EntryTag::BareKey => &*(&self.tagged as *const NonNull<u8> as *const K),
            }
        }
    }

    /// Borrows this entry's value, if it has one.
    pub fn value(&self) -> Option<&ValueCell<V>> {
        match self.tag() {
            // SAFETY: see `key`.
            EntryTag::Full => Some(unsafe { &(*(self.untagged() as *const FullNode<K, V>)).value }),
            EntryTag::KeyNext | EntryTag::BareKey => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut ValueCell<V>> {
        match self.tag() {
            // SAFETY: see `key`.
            EntryTag::Full => Some(unsafe { &mut (*(self.untagged() as *mut FullNode<K, V>)).value }),
            EntryTag::KeyNext | EntryTag::BareKey => None,
        }
    }

    /// Borrows the next link in this entry's bucket chain, if any.
    pub fn next(&self) -> Option<&EntrySlot<K, V>> {
        // SAFETY: see `key`.
        unsafe {
            match self.tag() {
                EntryTag::Full => (*(self.untagged() as *const FullNode<K, V>)).next.as_ref(),
                EntryTag::KeyNext => (*(self.untagged() as *const KeyNextNode<K, V>)).next.as_ref(),
                EntryTag::BareKey => None,
            }
        }
    }

    pub fn next_mut(&mut self) -> Option<&mut EntrySlot<K, V>> {
        // SAFETY: see `key`.
        unsafe {
            match self.tag() {
                EntryTag::Full => (*(self.untagged() as *mut FullNode<K, V>)).next.as_mut(),
                EntryTag::KeyNext => (*(self.untagged() as *mut KeyNextNode<K, V>)).next.as_mut(),
                EntryTag::BareKey => None,
            }
        }
    }

    /// Takes ownership of the next link, leaving `None` behind. A
    /// `BareKey` entry has no link to take and always returns `None`.
    pub fn take_next(&mut self) -> Option<EntrySlot<K, V>> {
        // SAFETY: see `key`.
        unsafe {
            match self.tag() {
                EntryTag::Full => (*(self.untagged() as *mut FullNode<K, V>)).next.take(),
                EntryTag::KeyNext => (*(self.untagged() as *mut KeyNextNode<K, V>)).next.take(),
                EntryTag::BareKey => None,
            }
        }
    }

    /// Replaces the next link. Panics (debug-only) if called on a
    /// `BareKey` entry — callers must promote it to `KeyNext` first via
    /// [`EntrySlot::promote_bare_key`].
    pub fn set_next(&mut self, next: Option<EntrySlot<K, V>>) {
        // SAFETY: see `key`.
        unsafe {
            match self.tag() {
                EntryTag::Full => (*(self.untagged() as *mut FullNode<K, V>)).next = next,
                EntryTag::KeyNext => (*(self.untagged() as *mut KeyNextNode<K, V>)).next = next,
                EntryTag::BareKey => {
                    debug_assert!(next.is_none(), "cannot attach a chain to a bare-key entry");
                }
            }
        }
    }

    /// Re-links this entry as the new head of a chain whose previous
    /// head was `head`, promoting a `BareKey` entry to `KeyNext` first
    /// if the chain being prepended to is non-empty. Used by both
    /// insertion and rehashing, which both move entries to the front of
    /// a (possibly non-empty) destination bucket.
    pub fn prepend_to(self, head: Option<EntrySlot<K, V>>) -> Self {
        match head {
            None => self,
            Some(h) => {
                if self.tag() == EntryTag::BareKey {
                    self.promote_bare_key(Some(h))
                } else {
                    let mut s = self;
                    s.set_next(Some(h));
                    s
                }
            }
        }
    }

    /// Converts a `BareKey` entry into a `KeyNext` entry so a sibling can
    /// be appended after it. No-op (returns `self`) for any other shape.
    pub fn promote_bare_key(self, next: Option<EntrySlot<K, V>>) -> Self {
        if self.tag() != EntryTag::BareKey {
            debug_assert!(false, "promote_bare_key called on a non-bare-key entry");
            return self;
        }
        // SAFETY: `self.tagged` holds `key`'s own bytes (see `new_bare_key`);
        // reading them out moves `key` back into a real local before
        // `self`, which owns no separate allocation, is forgotten.
        let key: K = unsafe { std::ptr::read(&self.tagged as *const NonNull<u8> as *const K) };
        std::mem::forget(self);
        EntrySlot::new_key_next(key, next)
    }

    /// The reverse of [`EntrySlot::promote_bare_key`]: folds a standalone
    /// `KeyNext` entry (`next` already `None`) back into the cheaper
    /// inline `BareKey` shape, freeing its wrapper node. No-op for any
    /// other shape. Used when rehashing relocates an entry into a
    /// destination bucket that turns out to be empty, so a chain that was
    /// only ever `KeyNext`-shaped because its old bucket was crowded
    /// doesn't keep paying for a wrapper it no longer needs.
    pub fn demote_to_bare_key(self) -> Self {
        if self.tag() != EntryTag::KeyNext {
            return self;
        }
        let ptr = self.untagged() as *mut KeyNextNode<K, V>;
        std::mem::forget(self);
        // SAFETY: `ptr` came from `new_key_next`'s `Box::into_raw`, and
        // `self` was just forgotten rather than dropped, so this is the
        // one reconstruction of that box.
        let node = unsafe { Box::from_raw(ptr) };
        debug_assert!(node.next.is_none(), "demote_to_bare_key called with a next pointer still attached");
        let KeyNextNode { key, .. } = *node;
        EntrySlot::new_bare_key(key)
    }

    /// Drops this entry and, iteratively, its whole remaining chain —
    /// matching the C original's loop-based bucket teardown rather than
    /// relying on recursive destructors, which would blow the stack on a
    /// long chain.
    pub fn drop_chain(mut self) {
        loop {
            let next = self.take_next();
            self.drop_one();
            match next {
                Some(n) => self = n,
                None => break,
            }
        }
    }

    fn drop_one(self) {
        let tag = self.tag();
        if tag == EntryTag::BareKey {
            // SAFETY: see `key`/`promote_bare_key`: `self.tagged` holds
            // `key`'s own bytes, not a pointer to a separate allocation,
            // so there is nothing to `Box::from_raw` here — reading the
            // bytes out and dropping the reconstructed value is the
            // entirety of freeing this shape.
            let key: K = unsafe { std::ptr::read(&self.tagged as *const NonNull<u8> as *const K) };
            std::mem::forget(self);
            drop(key);
            return;
        }
        let ptr = self.untagged();
        std::mem::forget(self);
        // SAFETY: each arm reconstructs the exact `Box` type the tag
        // names, matching how it was allocated; the `Box`'s own Drop
        // then recursively drops `key`/`value` but not `next` (an
        // `EntrySlot` has no Drop impl of its own), so this does not
        // recurse down the chain.
        unsafe {
            match tag {
                EntryTag::Full => drop(Box::from_raw(ptr as *mut FullNode<K, V>)),
                EntryTag::KeyNext => drop(Box::from_raw(ptr as *mut KeyNextNode<K, V>)),
                EntryTag::BareKey => unreachable!("handled above"),
            }
        }
    }
}

enum EntrySource<'a, K, V> {
    Borrowed(&'a EntrySlot<K, V>),
    /// A raw tagged address captured by [`crate::dict::iter`]'s cursor
    /// walk, which cannot hold a live `&EntrySlot` across `next()` calls
    /// without pinning the whole dictionary behind one borrow for the
    /// iterator's lifetime (see module docs on `iter`).
    RawAddr(usize, PhantomData<&'a ()>),
    /// A `BareKey` entry reached through a raw captured address: such an
    /// entry has no backing allocation to borrow from (its bits *are*
    /// the key), so the key is copied out once at capture time instead.
    /// Wrapped in `ManuallyDrop` so this copy's destructor never runs —
    /// the entry still in the table remains the one live owner.
    InlineKey(std::mem::ManuallyDrop<K>),
}

/// A borrowed, shape-agnostic view over an entry, handed to callers of
/// scan and iteration APIs instead of the raw [`EntrySlot`].
pub struct Entry<'a, K, V> {
    src: EntrySource<'a, K, V>,
}

impl<'a, K, V> Entry<'a, K, V> {
    pub(crate) fn new(slot: &'a EntrySlot<K, V>) -> Self {
        Self {
            src: EntrySource::Borrowed(slot),
        }
    }

    /// # Safety
    /// See [`EntrySlot::key_at`]: `addr` must name an entry that outlives
    /// `'a` without being freed. If `addr` is `BareKey`-tagged, its bits
    /// must be exactly the key's own bit pattern, as produced by
    /// [`EntrySlot::addr`] on a `BareKey` entry.
    pub(crate) unsafe fn from_addr(addr: usize) -> Self {
        if EntryTag::from_bits(addr) == EntryTag::BareKey {
            let key: K = std::ptr::read(&addr as *const usize as *const K);
            return Self {
                src: EntrySource::InlineKey(std::mem::ManuallyDrop::new(key)),
            };
        }
        Self {
            src: EntrySource::RawAddr(addr, PhantomData),
        }
    }

    pub fn key(&self) -> &K {
        match &self.src {
            EntrySource::Borrowed(s) => s.key(),
            // SAFETY: contract upheld by `from_addr`'s caller.
            EntrySource::RawAddr(addr, _) => unsafe { EntrySlot::<K, V>::key_at(*addr) },
            EntrySource::InlineKey(key) => key,
        }
    }

    pub fn value(&self) -> Option<&ValueCell<V>> {
        match &self.src {
            EntrySource::Borrowed(s) => s.value(),
            // SAFETY: contract upheld by `from_addr`'s caller.
            EntrySource::RawAddr(addr, _) => unsafe { EntrySlot::<K, V>::value_at(*addr) },
            EntrySource::InlineKey(_) => None,
        }
    }
}

/// Length of the chain starting at `head`, walking `next` links.
pub(crate) fn chain_len<K, V>(mut head: Option<&EntrySlot<K, V>>) -> usize {
    let mut n = 0;
    while let Some(slot) = head {
        n += 1;
        head = slot.next();
    }
    n
}

/// Clones an entry's key (and value, for shapes that carry one) into a
/// freshly allocated node of the same shape, used by
/// [`crate::dict::Dict::scan_with_defrag`] to relocate storage.
pub(crate) fn clone_shape<K: Clone, V: Clone>(slot: &EntrySlot<K, V>) -> EntrySlot<K, V> {
    match slot.tag() {
        EntryTag::Full => EntrySlot::new_full(FullNode {
            key: slot.key().clone(),
            value: slot
                .value()
                .expect("Full-shape entry always carries a value")
                .clone(),
            next: None,
        }),
        EntryTag::KeyNext => EntrySlot::new_key_next(slot.key().clone(), None),
        EntryTag::BareKey => EntrySlot::new_bare_key(slot.key().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_entry_roundtrips_key_and_value() {
        let slot: EntrySlot<String, i32> = EntrySlot::new_full(FullNode {
            key: "a".to_string(),
            value: ValueCell::Pointer(Box::new(42)),
            next: None,
        });
        assert_eq!(slot.key(), "a");
        assert_eq!(slot.value().and_then(|v| v.as_pointer()), Some(&42));
        assert!(slot.next().is_none());
        slot.drop_chain();
    }

    #[test]
    fn bare_key_stores_inline_and_promotes_to_key_next() {
        // Low two bits `0b01` on both: a stand-in for a pointer-sized,
        // self-tagged "odd" key.
        let bare: EntrySlot<usize, ()> = EntrySlot::new_bare_key(0b0101);
        assert_eq!(bare.tag(), EntryTag::BareKey);
        assert_eq!(*bare.key(), 0b0101);
        let tail: EntrySlot<usize, ()> = EntrySlot::new_bare_key(0b1001);
        let promoted = bare.promote_bare_key(Some(tail));
        assert_eq!(promoted.tag(), EntryTag::KeyNext);
        assert_eq!(*promoted.key(), 0b0101);
        assert_eq!(*promoted.next().unwrap().key(), 0b1001);
        promoted.drop_chain();
    }

    #[test]
    fn key_next_demotes_back_to_bare_key_once_standalone() {
        let bare: EntrySlot<usize, ()> = EntrySlot::new_bare_key(0b0101);
        let promoted = bare.promote_bare_key(None);
        assert_eq!(promoted.tag(), EntryTag::KeyNext);

        let demoted = promoted.demote_to_bare_key();
        assert_eq!(demoted.tag(), EntryTag::BareKey);
        assert_eq!(*demoted.key(), 0b0101);
        demoted.drop_chain();
    }

    #[test]
    fn demote_to_bare_key_is_a_no_op_on_other_shapes() {
        let full: EntrySlot<String, i32> = EntrySlot::new_full(FullNode {
            key: "a".to_string(),
            value: ValueCell::Pointer(Box::new(1)),
            next: None,
        });
        let unchanged = full.demote_to_bare_key();
        assert_eq!(unchanged.tag(), EntryTag::Full);
        unchanged.drop_chain();
    }

    #[test]
    fn chain_of_three_drops_iteratively() {
        let c: EntrySlot<i32, i32> = EntrySlot::new_full(FullNode {
            key: 3,
            value: ValueCell::I64(3),
            next: None,
        });
        let b: EntrySlot<i32, i32> = EntrySlot::new_full(FullNode {
            key: 2,
            value: ValueCell::I64(2),
            next: Some(c),
        });
        let a: EntrySlot<i32, i32> = EntrySlot::new_full(FullNode {
            key: 1,
            value: ValueCell::I64(1),
            next: Some(b),
        });
        assert_eq!(*a.key(), 1);
        assert_eq!(*a.next().unwrap().key(), 2);
        assert_eq!(*a.next().unwrap().next().unwrap().key(), 3);
        a.drop_chain();
    }
}
