//! An incrementally rehashing, separately-chained hash table, grounded
//! in `dict.c`/`dict.h`.
//!
//! Unlike a textbook hash table that stops the world to grow, a [`Dict`]
//! keeps two bucket arrays ([`TableSlot`]) once it decides to grow:
//! `table[0]`, the table being emptied, and `table[1]`, the table being
//! filled. Every mutating call moves a bounded number of buckets across
//! before doing its own work, so no single call pays for the whole
//! rehash; [`Dict::rehash_step`] and [`Dict::rehash_for_millis`] let a
//! caller (an idle-time cron job, for instance) push the process along
//! even when nothing else is touching the dictionary.

pub mod entry;
pub mod type_descriptor;

mod core_ops;
mod delete;
mod iter;
mod lookup;
mod mutate;
mod sample;
mod scan;
mod stats;
mod table;

pub use delete::UnlinkedEntry;
pub use entry::{Entry, ValueCell};
pub use iter::{SafeIter, UnsafeIter};
pub use mutate::{AddRawOutcome, FindPositionResult, InsertPosition};
pub use stats::TableStats;
pub use type_descriptor::TypeDescriptor;

use crate::config::DictConfig;
use crate::error::{DictError, Result};
use crate::prng::{DefaultPrng, Prng};
use table::TableSlot;

/// A dictionary over `T::Key -> T::Value`, with behavior (hashing,
/// comparison, duplication) supplied by `T`.
pub struct Dict<T: TypeDescriptor> {
    pub(crate) type_descriptor: T,
    pub(crate) config: DictConfig,
    pub(crate) table: [TableSlot<T::Key, T::Value>; 2],
    /// The next bucket index in `table[0]` awaiting rehash, or `None`
    /// when no rehash is in progress. Matches `rehashidx == -1`.
    pub(crate) rehash_idx: Option<usize>,
    pub(crate) pause_rehash: u16,
    pub(crate) pause_auto_resize: u16,
    pub(crate) hash_seed: [u8; 16],
    pub(crate) prng: Box<dyn Prng + Send>,
}

impl<T: TypeDescriptor + Default> Dict<T> {
    pub fn new() -> Self {
        Self::with_type_descriptor(T::default())
    }
}

impl<T: TypeDescriptor + Default> Default for Dict<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TypeDescriptor> Dict<T> {
    pub fn with_type_descriptor(type_descriptor: T) -> Self {
        Self::with_config(type_descriptor, DictConfig::default())
    }

    pub fn with_config(type_descriptor: T, config: DictConfig) -> Self {
        Self {
            type_descriptor,
            config,
            table: [TableSlot::empty(), TableSlot::empty()],
            rehash_idx: None,
            pause_rehash: 0,
            pause_auto_resize: 0,
            hash_seed: [0; 16],
            prng: Box::new(DefaultPrng::from_entropy()),
        }
    }

    #[inline]
    pub fn type_descriptor(&self) -> &T {
        &self.type_descriptor
    }

    #[inline]
    pub fn config(&self) -> &DictConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut DictConfig {
        &mut self.config
    }

    /// Total number of live entries across both tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.table[0].used() + self.table[1].used()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bucket capacity across both tables.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table[0].capacity() + self.table[1].capacity()
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx.is_some()
    }

    /// `used / capacity` of `table[0]`, the table new lookups check
    /// first. Returns `0.0` for an empty, unallocated dictionary.
    pub fn load_factor(&self) -> f64 {
        let cap = self.table[0].capacity();
        if cap == 0 {
            0.0
        } else {
            self.table[0].used() as f64 / cap as f64
        }
    }

    /// Prevents `rehash_step` from making progress until a matching
    /// number of [`Dict::resume_rehashing`] calls have been made.
    /// Matches `dictPauseRehashing`, used while an iterator walks the
    /// table unsafely (without per-call fingerprint checks).
    #[inline]
    pub fn pause_rehashing(&mut self) {
        self.pause_rehash += 1;
    }

    #[inline]
    pub fn resume_rehashing(&mut self) {
        debug_assert!(self.pause_rehash > 0, "resume_rehashing without a matching pause");
        self.pause_rehash = self.pause_rehash.saturating_sub(1);
    }

    /// Whether rehashing is currently paused (the pause counter is
    /// above zero). A caller inspecting a [`UnlinkedEntry`] obtained
    /// from [`Dict::two_phase_unlink_find`] can use this to confirm the
    /// pause/resume pairing, as spec'd by the testable property that the
    /// counter is zero at rest.
    #[inline]
    pub fn rehashing_paused(&self) -> bool {
        self.pause_rehash > 0
    }

    #[inline]
    pub fn pause_auto_resize(&mut self) {
        self.pause_auto_resize += 1;
    }

    #[inline]
    pub fn resume_auto_resize(&mut self) {
        self.pause_auto_resize = self.pause_auto_resize.saturating_sub(1);
    }

    #[inline]
    pub(crate) fn auto_resize_paused(&self) -> bool {
        self.pause_auto_resize > 0
    }

    /// A 16-byte seed stored alongside the dictionary purely as a
    /// conventional home for it, mirroring `dictSetHashFunctionSeed` /
    /// `dictGetHashFunctionSeed`. The original threads this seed into a
    /// process-global SipHash implementation; since this crate treats
    /// hashing as the caller-supplied [`TypeDescriptor::hash_key`], the
    /// dictionary itself never reads the seed back out of a hash it
    /// computes. A `TypeDescriptor` that wraps a seeded hash function
    /// has somewhere to stash and retrieve the seed it was constructed
    /// with; nothing else in `Dict` consults it.
    #[inline]
    pub fn get_hash_seed(&self) -> [u8; 16] {
        self.hash_seed
    }

    #[inline]
    pub fn set_hash_seed(&mut self, seed: [u8; 16]) {
        self.hash_seed = seed;
    }

    pub fn set_prng(&mut self, prng: Box<dyn Prng + Send>) {
        self.prng = prng;
    }

    #[inline]
    pub(crate) fn hash_of(&self, key: &T::Key) -> u64 {
        self.type_descriptor.hash_key(key)
    }
}
