//! The per-dictionary behavior table, grounded in `dictType` from
//! `dict.h`: hashing, key comparison, and optional duplication hooks are
//! supplied by the caller rather than baked into the table.
//!
//! Where the C struct holds raw function pointers (`keyDestructor`,
//! `valDestructor`), Rust's `Drop` already runs when an owned `Key`/
//! `Value` goes out of scope, so no destructor hooks are modeled here.

use crate::dict::entry::Entry;

/// Behavior a [`Dict`](crate::dict::Dict) needs from its key/value types
/// and cannot derive structurally.
pub trait TypeDescriptor {
    type Key;
    type Value;

    /// Hashes a key. Must be stable for the lifetime of the dictionary;
    /// changing `hash_key`'s output for an already-stored key corrupts the
    /// table (this mirrors the contract of `dictType.hashFunction`).
    fn hash_key(&self, key: &Self::Key) -> u64;

    /// Key equality used during lookup and insertion. Defaults to
    /// `PartialEq` but is overridable for keys that need custom collation
    /// (case-insensitive strings, for example).
    fn keys_equal(&self, a: &Self::Key, b: &Self::Key) -> bool
    where
        Self::Key: PartialEq,
    {
        a == b
    }

    /// Duplicates a key on insert, analogous to `dictType.keyDup`. The
    /// default simply requires `Key: Clone`; a descriptor can override
    /// this to intern or refcount instead.
    fn key_dup(&self, key: &Self::Key) -> Self::Key
    where
        Self::Key: Clone,
    {
        key.clone()
    }

    /// Duplicates a value on insert, analogous to `dictType.valDup`.
    fn val_dup(&self, value: &Self::Value) -> Self::Value
    where
        Self::Value: Clone,
    {
        value.clone()
    }

    /// When true, entries in this dictionary carry no value at all (the
    /// dictionary is being used as a set), enabling the no-value entry
    /// shapes in [`crate::dict::entry`]. Mirrors `dictType.no_value`.
    fn no_value(&self) -> bool {
        false
    }

    /// When true (only meaningful alongside `no_value`), every key this
    /// descriptor ever hands to the dictionary is exactly pointer-sized
    /// and its own low two bits already read `0b01` — an "odd" value the
    /// caller guarantees never collides with a real heap pointer's low
    /// bits (which are zero coming out of an allocator). Lets a bucket
    /// whose destination is empty store the key's own bits directly as
    /// the tagged slot, with no entry wrapper allocated at all. Mirrors
    /// `dictType.keys_are_odd` (`dict.c:415`).
    fn keys_are_odd(&self) -> bool {
        false
    }

    /// Called by `_dictExpandIfNeeded`-equivalent logic before growing the
    /// table; returning `false` vetoes the expansion for this dictionary
    /// even though the load factor would otherwise justify it. Mirrors
    /// `dictType.expandAllowed`.
    fn expand_allowed(&self, _moving_to_bytes: usize, _fill_factor: f64) -> bool {
        true
    }

    /// Invoked after an entry is relocated during incremental defrag
    /// scanning (`dictDefragBucket`), in case the caller needs to update
    /// an external index pointing at the old address. Mirrors
    /// `dictType.afterReplaceEntry`.
    fn after_replace_entry(&self, _entry: &mut Entry<Self::Key, Self::Value>) {}
}
