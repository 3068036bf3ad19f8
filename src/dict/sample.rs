//! Random sampling, grounded in `dictGetRandomKey`, `dictGetSomeKeys`, and
//! `dictGetFairRandomKey`.

use crate::dict::entry::{self, Entry, EntrySlot};
use crate::dict::table::TableSlot;
use crate::dict::{Dict, TypeDescriptor};
use crate::prng::Prng;

/// Batch size [`Dict::fair_random_key`] draws from [`Dict::some_keys`]
/// before picking one uniformly. Matches `GETFAIR_NUM_ENTRIES` in the
/// original: `dictGetRandomKey`'s single pass is biased toward keys in
/// sparsely populated buckets, so a fair pick draws a biased sample and
/// then chooses among its members uniformly instead.
const FAIR_RANDOM_SAMPLE_SIZE: usize = 15;

impl<T: TypeDescriptor> Dict<T> {
    /// Returns one entry chosen (close to, but not exactly, see
    /// [`Dict::fair_random_key`]) uniformly at random. `None` on an empty
    /// dictionary.
    pub fn random_key(&mut self) -> Option<Entry<'_, T::Key, T::Value>> {
        if self.is_empty() {
            return None;
        }
        self.piggyback_rehash();

        let addr = if self.is_rehashing() {
            let rehash_idx = self.rehash_idx.unwrap_or(0) as u64;
            let s0 = self.table[0].capacity() as u64;
            let s1 = self.table[1].capacity() as u64;
            loop {
                let span = (s0 + s1).saturating_sub(rehash_idx).max(1);
                let i = rehash_idx + self.prng.gen_range_usize(span as usize) as u64;
                let head = if i >= s0 {
                    self.table[1].bucket((i - s0) as usize).as_ref()
                } else {
                    self.table[0].bucket(i as usize).as_ref()
                };
                if let Some(slot) = head {
                    break random_addr_in_chain(slot, &mut *self.prng);
                }
            }
        } else {
            let mask = cap_mask(&self.table[0]);
            loop {
                let idx = self.prng.gen_range_usize((mask + 1) as usize);
                if let Some(slot) = self.table[0].bucket(idx).as_ref() {
                    break random_addr_in_chain(slot, &mut *self.prng);
                }
            }
        };

        // SAFETY: `addr` was read just above from a bucket `self` still
        // owns; nothing has mutated the dictionary since.
        Some(unsafe { Entry::from_addr(addr) })
    }

    /// Returns up to `count` entries, cheaply but not uniformly (entries
    /// in sparse regions of the table are over-represented, and a
    /// dictionary with fewer than `count` entries returns all of them).
    /// Prefer [`Dict::fair_random_key`] when an unbiased single pick
    /// matters more than throughput. Mirrors `dictGetSomeKeys`.
    pub fn some_keys(&mut self, count: usize) -> Vec<Entry<'_, T::Key, T::Value>> {
        self.some_keys_addrs(count)
            .into_iter()
            // SAFETY: see `random_key`.
            .map(|addr| unsafe { Entry::from_addr(addr) })
            .collect()
    }

    /// Returns one entry chosen uniformly at random, at the cost of
    /// drawing and discarding a small batch first. Mirrors
    /// `dictGetFairRandomKey`.
    pub fn fair_random_key(&mut self) -> Option<Entry<'_, T::Key, T::Value>> {
        let sample = self.some_keys_addrs(FAIR_RANDOM_SAMPLE_SIZE);
        if sample.is_empty() {
            return None;
        }
        let winner = sample[self.prng.gen_range_usize(sample.len())];
        // SAFETY: see `random_key`.
        Some(unsafe { Entry::from_addr(winner) })
    }

    fn some_keys_addrs(&mut self, count: usize) -> Vec<usize> {
        let count = count.min(self.len());
        if count == 0 {
            return Vec::new();
        }

        for _ in 0..count {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step(1);
        }

        let tables = if self.is_rehashing() { 2 } else { 1 };
        let mut max_mask = cap_mask(&self.table[0]);
        if tables > 1 {
            max_mask = max_mask.max(cap_mask(&self.table[1]));
        }

        let mut out = Vec::with_capacity(count);
        let mut i = self.prng.gen_range_usize((max_mask + 1) as usize) as u64;
        let mut empty_run: u64 = 0;
        let max_steps = (count as u64).saturating_mul(10).max(1);
        let mut steps = 0u64;

        while out.len() < count && steps < max_steps {
            steps += 1;
            for table_idx in 0..tables {
                let cap = self.table[table_idx].capacity() as u64;
                if cap == 0 || i >= cap {
                    continue;
                }
                match self.table[table_idx].bucket(i as usize).as_ref() {
                    None => {
                        empty_run += 1;
                        if empty_run >= 5 && empty_run > count as u64 {
                            i = self.prng.gen_range_usize((max_mask + 1) as usize) as u64;
                            empty_run = 0;
                        }
                    }
                    Some(head) => {
                        empty_run = 0;
                        let mut cursor = Some(head);
                        while let Some(slot) = cursor {
                            out.push(slot.addr());
                            if out.len() == count {
                                return out;
                            }
                            cursor = slot.next();
                        }
                    }
                }
            }
            i = (i + 1) & max_mask;
        }

        out
    }
}

fn random_addr_in_chain<K, V>(head: &EntrySlot<K, V>, prng: &mut dyn Prng) -> usize {
    let len = entry::chain_len(Some(head));
    let pick = prng.gen_range_usize(len);
    let mut cursor = head;
    for _ in 0..pick {
        cursor = cursor.next().expect("pick is bounded by the chain's own length");
    }
    cursor.addr()
}

fn cap_mask<K, V>(table: &TableSlot<K, V>) -> u64 {
    let cap = table.capacity() as u64;
    cap.saturating_sub(1)
}
