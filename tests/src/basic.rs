//! End-to-end scenarios exercising `Dict` the way a caller embedding it
//! in a key/value server would: string keys and values, growth driven
//! purely by inserting enough of them, rehash observed mid-flight and
//! then drained to completion.

use std::alloc::{GlobalAlloc, Layout, System};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use rehash_dict::config::ResizeMode;
use rehash_dict::dict::{Dict, TypeDescriptor};
use rehash_dict::sds::SdsString;

/// Counts every allocation made through the global allocator, so the
/// `keys_are_odd` scenario below can assert that inserting into empty
/// buckets truly allocates nothing rather than just behaving as if it
/// didn't.
struct CountingAlloc;

static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

static LIVE_ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.fetch_add(1, Ordering::SeqCst);
        LIVE_ALLOC_COUNT.fetch_add(1, Ordering::SeqCst);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        LIVE_ALLOC_COUNT.fetch_sub(1, Ordering::SeqCst);
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[derive(Default)]
struct StringMap;

impl TypeDescriptor for StringMap {
    type Key = SdsString;
    type Value = SdsString;

    fn hash_key(&self, key: &SdsString) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.as_bytes().hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Default)]
struct StringSet;

impl TypeDescriptor for StringSet {
    type Key = SdsString;
    type Value = ();

    fn hash_key(&self, key: &SdsString) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.as_bytes().hash(&mut hasher);
        hasher.finish()
    }

    fn no_value(&self) -> bool {
        true
    }
}

#[test]
fn insert_fetch_and_miss_on_a_fresh_dictionary() {
    let mut dict: Dict<StringMap> = Dict::new();
    dict.add(SdsString::from("k1"), SdsString::from("v1")).unwrap();

    let v1 = dict.find(&SdsString::from("k1")).unwrap();
    assert_eq!(v1.value().and_then(|c| c.as_pointer()).and_then(|s| s.as_str()), Some("v1"));
    assert!(dict.find(&SdsString::from("missing")).is_none());
    assert_eq!(dict.len(), 1);
}

#[test]
fn five_thousand_inserts_grow_and_fully_drain_a_rehash() {
    let mut dict: Dict<StringMap> = Dict::new();
    let mut saw_rehash_in_progress = false;

    for i in 0..5000u32 {
        dict.add(SdsString::from(i.to_string().as_str()), SdsString::from(i.to_string().as_str()))
            .unwrap();
        if dict.is_rehashing() {
            saw_rehash_in_progress = true;
        }
    }

    assert_eq!(dict.len(), 5000);
    assert!(saw_rehash_in_progress, "5000 sequential inserts should trigger at least one rehash");

    // Drive any still-in-flight rehash to completion with an ample
    // millisecond budget.
    dict.rehash_for_millis(1000);
    assert!(!dict.is_rehashing());

    let stats = dict.table_stats(0);
    assert!(stats.buckets.is_power_of_two());
    assert!(stats.buckets >= 5000);

    for i in 0..5000u32 {
        assert!(dict.contains_key(&SdsString::from(i.to_string().as_str())));
    }
}

#[test]
fn safe_iterator_tolerates_deleting_every_other_key_during_the_walk() {
    let mut dict: Dict<StringMap> = Dict::new();
    for i in 0..100u32 {
        let key = SdsString::from(i.to_string().as_str());
        dict.add(key.clone(), key).unwrap();
    }

    let mut visited = 0u32;
    let mut deleted = HashSet::new();
    let mut iter = dict.iter_safe();
    loop {
        let key = match iter.next(&dict) {
            Some(entry) => entry.key().clone(),
            None => break,
        };
        visited += 1;
        if visited % 2 == 0 {
            dict.delete(&key);
            deleted.insert(key);
        }
    }
    iter.release(&mut dict);

    assert_eq!(visited, 100, "every inserted key should be visited exactly once");
    assert_eq!(dict.len(), 50);
    for i in 0..100u32 {
        let key = SdsString::from(i.to_string().as_str());
        assert_eq!(dict.contains_key(&key), !deleted.contains(&key));
        if !deleted.contains(&key) {
            assert!(dict.find(&key).is_some());
        }
    }
}

#[test]
fn no_value_dictionary_entries_carry_no_value_cell() {
    let mut dict: Dict<StringSet> = Dict::new();
    for i in 0..100u32 {
        assert!(dict.add_key(SdsString::from(i.to_string().as_str())).unwrap());
    }
    assert_eq!(dict.len(), 100);
    for i in 0..100u32 {
        let key = SdsString::from(i.to_string().as_str());
        let entry = dict.find(&key).expect("key was just inserted");
        assert!(entry.value().is_none(), "a no_value dictionary's entries must carry no value cell");
    }
}

#[derive(Default)]
struct OddPointerSet;

impl TypeDescriptor for OddPointerSet {
    type Key = usize;
    type Value = ();

    fn hash_key(&self, key: &usize) -> u64 {
        // Keys are built as `(i << 2) | 0b01`; shifting back out gives a
        // direct, collision-free bucket index for small `i`.
        (*key >> 2) as u64
    }

    fn no_value(&self) -> bool {
        true
    }

    fn keys_are_odd(&self) -> bool {
        true
    }
}

#[test]
fn keys_are_odd_inserts_into_empty_buckets_allocate_no_entry_wrapper() {
    let mut dict: Dict<OddPointerSet> = Dict::new();
    // Pre-size so none of these 100 inserts ever trigger table growth,
    // and forbid auto-resize outright so the allocation count below is
    // attributable only to entry construction.
    dict.try_expand(256).unwrap();
    dict.config_mut().set_resize_mode(ResizeMode::Forbid);

    let before = ALLOC_COUNT.load(Ordering::SeqCst);
    for i in 0..100usize {
        let key = (i << 2) | 0b01;
        assert!(dict.add_key(key).unwrap());
    }
    let after = ALLOC_COUNT.load(Ordering::SeqCst);

    assert_eq!(dict.len(), 100);
    assert_eq!(
        after, before,
        "inserting a keys_are_odd key into an empty bucket must not allocate an entry wrapper"
    );

    for i in 0..100usize {
        let key = (i << 2) | 0b01;
        assert!(dict.contains_key(&key));
    }
}

#[test]
fn rehashing_a_crowded_bucket_frees_key_next_wrappers_once_keys_spread_out() {
    let mut dict: Dict<OddPointerSet> = Dict::new();
    dict.try_expand(4).unwrap();
    dict.config_mut().set_resize_mode(ResizeMode::Forbid);

    // Hashes to 0..4 under a 4-bucket table, so every fourth key lands in
    // the same bucket: four crowded chains of four entries each, all but
    // each chain's tail forced into the heap-allocated `KeyNext` shape.
    for i in 0..16usize {
        let key = (i << 2) | 0b01;
        assert!(dict.add_key(key).unwrap());
    }
    let live_while_crowded = LIVE_ALLOC_COUNT.load(Ordering::SeqCst);
    assert!(
        live_while_crowded > 0,
        "a 4-bucket table holding 16 keys must have chained some of them into heap wrappers"
    );

    // Growing to one bucket per key disperses every chain; each entry
    // becomes the sole occupant of its destination bucket and should
    // demote back to its wrapper-free inline shape.
    dict.try_expand(64).unwrap();
    dict.rehash_for_millis(1000);
    assert!(!dict.is_rehashing());

    let live_after_spread = LIVE_ALLOC_COUNT.load(Ordering::SeqCst);
    assert_eq!(
        live_after_spread, 0,
        "once every key has its own bucket, no KeyNext wrapper should remain live"
    );

    assert_eq!(dict.len(), 16);
    for i in 0..16usize {
        let key = (i << 2) | 0b01;
        assert!(dict.contains_key(&key));
    }
}

#[test]
fn scan_collects_the_pre_growth_snapshot_even_after_growing_mid_scan() {
    let mut dict: Dict<StringSet> = Dict::new();
    for i in 0..32u32 {
        dict.add_key(SdsString::from(i.to_string().as_str())).unwrap();
    }
    let pre_growth: HashSet<SdsString> = (0..32u32).map(|i| SdsString::from(i.to_string().as_str())).collect();

    let mut collected = HashSet::new();
    let mut cursor = dict.scan(0, |entry| {
        collected.insert(entry.key().clone());
    });
    assert_ne!(cursor, 0, "a 32-bucket table should take more than one scan step");

    // Grow the table to twice its size mid-scan. `scan` itself never
    // advances the rehash it triggers, so the remaining scan steps walk
    // both tables until some other operation piggybacks the migration
    // to completion.
    let target = dict.capacity() * 2;
    dict.expand(target).unwrap();
    assert!(dict.is_rehashing());

    loop {
        cursor = dict.scan(cursor, |entry| {
            collected.insert(entry.key().clone());
        });
        if cursor == 0 {
            break;
        }
    }

    assert!(pre_growth.is_subset(&collected));
}

#[test]
fn two_phase_unlink_find_then_free_removes_exactly_one_key() {
    let mut dict: Dict<StringMap> = Dict::new();
    dict.add(SdsString::from("k"), SdsString::from("v")).unwrap();
    dict.add(SdsString::from("other"), SdsString::from("v2")).unwrap();

    let handle = dict.two_phase_unlink_find(&SdsString::from("k")).expect("key was present");
    assert_eq!(handle.value().and_then(|c| c.as_pointer()).and_then(|s| s.as_str()), Some("v"));
    assert!(dict.rehashing_paused());

    dict.two_phase_unlink_free(handle);
    assert!(!dict.rehashing_paused());
    assert!(!dict.contains_key(&SdsString::from("k")));
    assert!(dict.contains_key(&SdsString::from("other")));
}
