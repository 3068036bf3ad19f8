//! Expansion, shrinking, and incremental rehashing, grounded in
//! `_dictExpand`, `dictRehash`, `_dictRehashStep`, and
//! `_dictExpandIfNeeded`/`dictShrinkIfNeeded`.

use crate::config::ResizeMode;
use crate::dict::table::{self, TableSlot};
use crate::dict::{Dict, TypeDescriptor};
use crate::error::{DictError, Result};
use crate::hint::unlikely;

/// Number of empty buckets `rehash_step` will skip past, per bucket it
/// is asked to migrate, before giving up on this call. A table can be
/// sparse enough after many deletes that a literal bucket budget would
/// stall on long empty runs; this bound keeps a single call's cost
/// proportional to `n`, matching `empty_visits` in `dictRehash`.
const EMPTY_VISITS_MULTIPLIER: usize = 10;

impl<T: TypeDescriptor> Dict<T> {
    /// Grows (or, the first time, allocates) `table[0]` to hold at least
    /// `size` entries, starting an incremental rehash if a table already
    /// exists. Fails if a rehash is already in progress, if `size` is
    /// smaller than the current element count, or if the computed
    /// capacity is unchanged from the current one.
    pub fn expand(&mut self, size: usize) -> Result<()> {
        self.try_expand(size)
    }

    pub fn try_expand(&mut self, size: usize) -> Result<()> {
        if self.is_rehashing() {
            return Err(DictError::InvalidArgument(
                "cannot expand while a rehash is already in progress",
            ));
        }
        if self.table[0].used() > size {
            return Err(DictError::InvalidArgument(
                "requested size is smaller than the current element count",
            ));
        }
        let new_exp = table::next_exp(size);
        if self.table[0].is_allocated() && self.table[0].size_exp() == Some(new_exp) {
            return Err(DictError::InvalidArgument(
                "requested capacity is already in effect",
            ));
        }

        let new_table = TableSlot::try_with_exp(new_exp).map_err(|_| DictError::OutOfMemory {
            requested: table::capacity_for_exp(new_exp),
        })?;

        if !self.table[0].is_allocated() {
            log::trace!("allocating table[0] at exponent {new_exp}");
            self.table[0] = new_table;
        } else {
            log::debug!(
                "starting rehash: {} -> {} buckets",
                self.table[0].capacity(),
                table::capacity_for_exp(new_exp)
            );
            self.table[1] = new_table;
            self.rehash_idx = Some(0);
        }
        Ok(())
    }

    /// Shrinks `table[0]` to the smallest capacity that holds its
    /// current element count, starting a rehash into that smaller
    /// table. A no-op if already at minimal capacity. Forbidden while a
    /// rehash is already in progress or unless resize is `ENABLE`, same
    /// as `dictResize`.
    pub fn resize_to_minimal(&mut self) -> Result<()> {
        if self.config.resize_mode() != ResizeMode::Enable {
            return Err(DictError::InvalidArgument(
                "resize_to_minimal requires ResizeMode::Enable",
            ));
        }
        let used = self.table[0].used().max(1);
        self.try_expand(used)
    }

    /// Called before every insertion. Allocates the first table lazily,
    /// and otherwise grows once the load factor crosses the threshold
    /// set by the configured [`ResizeMode`].
    pub(crate) fn expand_if_needed(&mut self) -> Result<()> {
        if self.is_rehashing() {
            return Ok(());
        }

        if !self.table[0].is_allocated() {
            return self.expand(1);
        }

        if self.config.resize_mode() == ResizeMode::Forbid || self.auto_resize_paused() {
            return Ok(());
        }

        let used = self.table[0].used();
        let cap = self.table[0].capacity();
        let should_grow = match self.config.resize_mode() {
            ResizeMode::Enable => used >= cap,
            // Under AVOID, growth still happens, just later: only once
            // the table is this many times over-full, trading memory
            // for not touching copy-on-write pages while a fork is
            // believed to be in flight.
            ResizeMode::Avoid => used / cap > self.config.force_resize_ratio(),
            ResizeMode::Forbid => false,
        };

        if !unlikely(should_grow) {
            return Ok(());
        }

        let moving_to_bytes = table::capacity_for_exp(table::next_exp(used + 1))
            * std::mem::size_of::<usize>();
        if !self
            .type_descriptor
            .expand_allowed(moving_to_bytes, (used + 1) as f64 / cap as f64)
        {
            return Ok(());
        }

        self.expand(used + 1)
    }

    /// Called after every deletion. Shrinks `table[0]` once its load
    /// factor drops far enough below 1:1, unless growth/shrink is
    /// disabled or a rehash is already in flight.
    ///
    /// The AVOID policy makes the *grow* trigger wait longer
    /// ([`DictConfig::force_resize_ratio`] above 1:1) while making the
    /// *shrink* trigger more eager to stay small (half the minimum fill
    /// ratio ENABLE uses) — both choices minimize pages touched during a
    /// believed-in-flight fork, but pull the two triggers in opposite
    /// directions, matching the original's asymmetric treatment of
    /// growth vs. rehash progress under `DICT_RESIZE_AVOID`.
    pub(crate) fn shrink_if_needed(&mut self) {
        if self.is_rehashing() || self.auto_resize_paused() {
            return;
        }
        if self.config.resize_mode() == ResizeMode::Forbid {
            return;
        }

        let used = self.table[0].used();
        let cap = self.table[0].capacity();
        if cap <= table::capacity_for_exp(crate::config::INITIAL_SIZE_EXP) {
            return;
        }

        let min_fill = match self.config.resize_mode() {
            ResizeMode::Enable => 0.125,
            ResizeMode::Avoid => 0.0625,
            ResizeMode::Forbid => return,
        };

        if (used as f64) < (cap as f64) * min_fill {
            let _ = self.try_expand(used.max(1));
        }
    }

    /// Migrates up to `n` non-empty buckets from `table[0]` into
    /// `table[1]`, returning whether a rehash is still in progress
    /// afterward. A no-op returning `false` when not rehashing or while
    /// rehashing is paused (an unsafe iterator is active).
    pub fn rehash_step(&mut self, n: usize) -> bool {
        if !self.is_rehashing() || self.rehashing_paused() {
            return self.is_rehashing();
        }

        let empty_visits_limit = n.saturating_mul(EMPTY_VISITS_MULTIPLIER).max(1);
        let mut empty_visits = 0usize;
        let mut buckets_done = 0usize;
        let old_cap = self.table[0].capacity();

        while buckets_done < n {
            if self.table[0].used() == 0 {
                self.finish_rehash();
                return false;
            }

            let idx = match self.rehash_idx {
                Some(idx) if idx < old_cap => idx,
                _ => {
                    self.finish_rehash();
                    return false;
                }
            };

            let head = self.table[0].bucket_mut(idx).take();
            let head = match head {
                Some(h) => h,
                None => {
                    self.rehash_idx = Some(idx + 1);
                    empty_visits += 1;
                    if empty_visits >= empty_visits_limit {
                        return true;
                    }
                    continue;
                }
            };

            let mut cursor = Some(head);
            while let Some(mut slot) = cursor {
                let rest = slot.take_next();
                let hash = self.type_descriptor.hash_key(slot.key());
                let new_idx = self.table[1].bucket_index(hash);
                let new_head = self.table[1].bucket_mut(new_idx).take();
                let slot = slot_relink(slot, new_head, self.type_descriptor.keys_are_odd());
                *self.table[1].bucket_mut(new_idx) = Some(slot);
                self.table[1].increment_used();
                self.table[0].decrement_used();
                cursor = rest;
            }

            self.rehash_idx = Some(idx + 1);
            buckets_done += 1;
        }

        true
    }

    /// Runs [`Dict::rehash_step`] repeatedly for up to `millis`
    /// milliseconds (checked every 100 buckets, same granularity as
    /// `dictRehashMilliseconds`), for a caller that wants to spread
    /// rehashing over its own idle time rather than a fixed step count.
    pub fn rehash_for_millis(&mut self, millis: u64) -> usize {
        use std::time::{Duration, Instant};

        if !self.is_rehashing() {
            return 0;
        }

        let deadline = Instant::now() + Duration::from_millis(millis);
        let mut rounds = 0usize;
        loop {
            if !self.rehash_step(100) {
                break;
            }
            rounds += 1;
            if Instant::now() >= deadline {
                break;
            }
        }
        rounds
    }

    fn finish_rehash(&mut self) {
        debug_assert_eq!(self.table[0].used(), 0);
        log::debug!("rehash complete: table now holds {} buckets", self.table[1].capacity());
        let finished = self.table[1].take();
        self.table[0] = finished;
        self.rehash_idx = None;
    }

    /// Nudges an in-progress rehash forward by one bucket, the way every
    /// lookup-or-mutate call does before touching the table itself.
    /// Matches the `_dictRehashStep` call tucked into `dictFind`/
    /// `dictAddRaw`/`dictGenericDelete` in the original.
    #[inline]
    pub(crate) fn piggyback_rehash(&mut self) {
        if self.is_rehashing() && !self.rehashing_paused() {
            self.rehash_step(1);
        }
    }

    /// Removes every entry, calling `on_batch` after each batch of
    /// `65536` buckets freed so a caller driving this from a
    /// single-threaded event loop can yield between batches. Mirrors
    /// `dictEmpty`.
    pub fn empty(&mut self, mut on_batch: impl FnMut()) {
        const YIELD_EVERY: usize = 65536;
        for table_idx in 0..2 {
            let cap = self.table[table_idx].capacity();
            for idx in 0..cap {
                if let Some(head) = self.table[table_idx].bucket_mut(idx).take() {
                    head.drop_chain();
                }
                if (idx + 1) % YIELD_EVERY == 0 {
                    on_batch();
                }
            }
            self.table[table_idx] = TableSlot::empty();
        }
        self.rehash_idx = None;
    }
}

/// Re-links `slot` into its destination bucket, taking the cheaper
/// inline `BareKey` shape when that bucket turns out empty and the
/// dictionary's keys are odd-tagged — the rehash-time counterpart of
/// `insert_new` already picking that shape up front for a fresh key.
/// `slot` has already had its own `next` taken by the caller, so it is
/// always a standalone node here, never the head of a longer chain.
fn slot_relink<K, V>(
    slot: crate::dict::entry::EntrySlot<K, V>,
    new_head: Option<crate::dict::entry::EntrySlot<K, V>>,
    keys_are_odd: bool,
) -> crate::dict::entry::EntrySlot<K, V> {
    match new_head {
        Some(h) => slot.prepend_to(Some(h)),
        None if keys_are_odd => slot.demote_to_bare_key(),
        None => slot,
    }
}
