//! Occupancy reporting, grounded in `_dictGetStatsHt` /
//! `dictGetStatsMsg`.

use std::fmt::{self, Write as _};

use crate::dict::entry;
use crate::dict::{Dict, TypeDescriptor};

/// Chain lengths at or above this many links are folded into the
/// histogram's last slot, matching `DICT_STATS_VECTLEN`.
const CHAIN_LEN_HISTOGRAM_SIZE: usize = 50;

/// A snapshot of one table's bucket occupancy, as produced by
/// [`Dict::table_stats`].
pub struct TableStats {
    pub table_idx: usize,
    pub buckets: usize,
    pub used: usize,
    pub max_chain_len: usize,
    pub total_chain_len: usize,
    /// `chain_len_histogram[n]` counts buckets whose chain holds exactly
    /// `n` entries, except the last slot, which also absorbs every chain
    /// of `CHAIN_LEN_HISTOGRAM_SIZE - 1` links or longer.
    pub chain_len_histogram: Vec<usize>,
}

impl TableStats {
    pub fn empty_buckets(&self) -> usize {
        self.chain_len_histogram.first().copied().unwrap_or(0)
    }

    pub fn occupied_buckets(&self) -> usize {
        self.buckets - self.empty_buckets()
    }
}

impl<T: TypeDescriptor> Dict<T> {
    /// Walks `table_idx`'s buckets and summarizes chain-length
    /// distribution. Mirrors `_dictGetStatsHt`.
    pub fn table_stats(&self, table_idx: usize) -> TableStats {
        let table = &self.table[table_idx];
        let mut histogram = vec![0usize; CHAIN_LEN_HISTOGRAM_SIZE];
        let mut max_chain_len = 0;
        let mut total_chain_len = 0;

        for idx in 0..table.capacity() {
            let len = entry::chain_len(table.bucket(idx).as_ref());
            histogram[len.min(CHAIN_LEN_HISTOGRAM_SIZE - 1)] += 1;
            max_chain_len = max_chain_len.max(len);
            total_chain_len += len;
        }

        TableStats {
            table_idx,
            buckets: table.capacity(),
            used: table.used(),
            max_chain_len,
            total_chain_len,
            chain_len_histogram: histogram,
        }
    }

    /// Writes a human-readable report to `sink`, one section per active
    /// table (both, while rehashing). `full` additionally includes the
    /// chain-length histogram. Mirrors `dictGetStatsMsg`.
    pub fn render_stats(&self, sink: &mut dyn fmt::Write, full: bool) -> fmt::Result {
        let table_count = if self.is_rehashing() { 2 } else { 1 };
        for table_idx in 0..table_count {
            write_table_stats(sink, &self.table_stats(table_idx), full)?;
        }
        Ok(())
    }
}

fn write_table_stats(sink: &mut dyn fmt::Write, stats: &TableStats, full: bool) -> fmt::Result {
    let occupied = stats.occupied_buckets();
    let avg_counted = if occupied == 0 {
        0.0
    } else {
        stats.total_chain_len as f64 / occupied as f64
    };
    let avg_computed = if stats.buckets == 0 {
        0.0
    } else {
        stats.used as f64 / stats.buckets as f64
    };

    writeln!(sink, "Hash table {} stats:", stats.table_idx)?;
    writeln!(sink, " number of buckets: {}", stats.buckets)?;
    writeln!(sink, " number of elements: {}", stats.used)?;
    writeln!(sink, " different slots: {}", occupied)?;
    writeln!(sink, " max chain length: {}", stats.max_chain_len)?;
    writeln!(sink, " avg chain length (counted): {avg_counted:.2}")?;
    writeln!(sink, " avg chain length (computed): {avg_computed:.2}")?;

    if full {
        for (len, count) in stats.chain_len_histogram.iter().enumerate() {
            if *count > 0 {
                writeln!(sink, " {count} buckets have {len} keys")?;
            }
        }
    }
    Ok(())
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
    fn table_stats_account_for_every_inserted_key() {
        let mut dict: Dict<IntSet> = Dict::new();
        for i in 0..40 {
            dict.add(i, ()).unwrap();
        }
        let stats = dict.table_stats(0);
        assert_eq!(stats.used, 40);
        let total: usize = stats.chain_len_histogram.iter().enumerate().map(|(len, count)| len * count).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn render_stats_produces_nonempty_output() {
        let mut dict: Dict<IntSet> = Dict::new();
        dict.add(1, ()).unwrap();
        let mut out = String::new();
        dict.render_stats(&mut out, true).unwrap();
        assert!(out.contains("number of elements: 1"));
    }
}
