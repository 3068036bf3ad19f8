//! Insertion and value-cell mutation, grounded in `dictAddRaw`/`dictAdd`/
//! `dictReplace`/`dictAddOrFind` and the `dictSetSignedIntegerVal`/
//! `dictSetUnsignedIntegerVal`/`dictSetDoubleVal`/`dictIncrSignedInteger`
//! family of value accessors.

use crate::dict::entry::{Entry, EntrySlot, FullNode, ValueCell};
use crate::dict::{Dict, TypeDescriptor};
use crate::error::Result;

impl<T: TypeDescriptor> Dict<T> {
    /// Inserts `key -> value` if `key` is not already present. Returns
    /// `Ok(true)` if inserted, `Ok(false)` if `key` already existed (the
    /// dictionary is left unchanged) — the `OK`/`ERR` split of the
    /// original `dictAdd`, recast as a `bool` payload since a duplicate
    /// key is an expected outcome rather than a failure; only bucket
    /// allocation failure surfaces as `Err`.
    pub fn add(&mut self, key: T::Key, value: T::Value) -> Result<bool> {
        debug_assert!(
            !self.type_descriptor.no_value(),
            "add() called on a no_value dictionary; use add_key() instead"
        );
        self.piggyback_rehash();
        self.expand_if_needed()?;
        if self.search_slot(&key).is_some() {
            return Ok(false);
        }
        self.insert_new(key, Some(ValueCell::Pointer(Box::new(value))));
        Ok(true)
    }

    /// Inserts a bare key into a `no_value` dictionary (set semantics).
    /// Returns `Ok(true)` if inserted, `Ok(false)` if already present.
    pub fn add_key(&mut self, key: T::Key) -> Result<bool> {
        debug_assert!(
            self.type_descriptor.no_value(),
            "add_key() called on a dictionary that stores values; use add() instead"
        );
        self.piggyback_rehash();
        self.expand_if_needed()?;
        if self.search_slot(&key).is_some() {
            return Ok(false);
        }
        self.insert_new(key, None);
        Ok(true)
    }

    /// Inserts `key` with a lazily computed default value if absent, and
    /// returns a mutable handle to the (possibly just-created) value
    /// alongside whether it was newly inserted. Mirrors `dictAddOrFind`.
    pub fn add_or_find(
        &mut self,
        key: T::Key,
        make_default: impl FnOnce() -> T::Value,
    ) -> Result<(&mut T::Value, bool)> {
        debug_assert!(!self.type_descriptor.no_value());
        self.piggyback_rehash();
        self.expand_if_needed()?;

        let existing_addr = self.search_slot(&key).map(|slot| slot.addr());
        let (addr, inserted) = match existing_addr {
            Some(addr) => (addr, false),
            None => (
                self.insert_new(key, Some(ValueCell::Pointer(Box::new(make_default())))),
                true,
            ),
        };

        // SAFETY: `addr` was either just looked up or just inserted above
        // and nothing has touched the dictionary since.
        let cell = unsafe { EntrySlot::<T::Key, T::Value>::value_at_mut(addr) }
            .expect("add_or_find target has a value cell");
        let value = cell
            .as_pointer_mut()
            .expect("add_or_find value cell holds a pointer variant");
        Ok((value, inserted))
    }

    /// Inserts `key -> value`, overwriting any existing value for `key`.
    /// Returns `Ok(true)` if this was a fresh insertion, `Ok(false)` if
    /// an existing entry's value was replaced. Mirrors `dictReplace`: the
    /// new value is written before the old one is dropped, which matters
    /// when `T::Value` is itself reference-counted and `old == new`.
    pub fn replace(&mut self, key: T::Key, value: T::Value) -> Result<bool> {
        debug_assert!(!self.type_descriptor.no_value());
        self.piggyback_rehash();
        self.expand_if_needed()?;

        match self.search_slot_mut(&key) {
            Some(slot) => {
                let cell = slot
                    .value_mut()
                    .expect("replace() target has a value cell");
                *cell = ValueCell::Pointer(Box::new(value));
                Ok(false)
            }
            None => {
                self.insert_new(key, Some(ValueCell::Pointer(Box::new(value))));
                Ok(true)
            }
        }
    }

    pub fn get_pointer(&self, key: &T::Key) -> Option<&T::Value> {
        self.fetch_value(key).and_then(ValueCell::as_pointer)
    }

    pub fn get_pointer_mut(&mut self, key: &T::Key) -> Option<&mut T::Value> {
        self.search_slot_mut(key)
            .and_then(|slot| slot.value_mut())
            .and_then(ValueCell::as_pointer_mut)
    }

    pub fn set_pointer(&mut self, key: &T::Key, value: T::Value) -> bool {
        self.set_value(key, ValueCell::Pointer(Box::new(value)))
    }

    pub fn get_i64(&self, key: &T::Key) -> Option<i64> {
        self.fetch_value(key).and_then(ValueCell::as_i64)
    }

    pub fn set_i64(&mut self, key: &T::Key, value: i64) -> bool {
        self.set_value(key, ValueCell::I64(value))
    }

    pub fn get_u64(&self, key: &T::Key) -> Option<u64> {
        self.fetch_value(key).and_then(ValueCell::as_u64)
    }

    pub fn set_u64(&mut self, key: &T::Key, value: u64) -> bool {
        self.set_value(key, ValueCell::U64(value))
    }

    pub fn get_f64(&self, key: &T::Key) -> Option<f64> {
        self.fetch_value(key).and_then(ValueCell::as_f64)
    }

    pub fn set_f64(&mut self, key: &T::Key, value: f64) -> bool {
        self.set_value(key, ValueCell::F64(value))
    }

    /// Adds `delta` to the signed-integer value stored at `key` in
    /// place, returning the updated value. `None` if `key` is missing;
    /// asserts (debug-only) if the entry's value isn't the `I64` shape.
    pub fn increment_i64(&mut self, key: &T::Key, delta: i64) -> Option<i64> {
        let cell = self.search_slot_mut(key)?.value_mut()?;
        match cell {
            ValueCell::I64(v) => {
                *v = v.wrapping_add(delta);
                Some(*v)
            }
            _ => {
                debug_assert!(false, "increment_i64 on a non-I64 value cell");
                None
            }
        }
    }

    pub fn increment_u64(&mut self, key: &T::Key, delta: u64) -> Option<u64> {
        let cell = self.search_slot_mut(key)?.value_mut()?;
        match cell {
            ValueCell::U64(v) => {
                *v = v.wrapping_add(delta);
                Some(*v)
            }
            _ => {
                debug_assert!(false, "increment_u64 on a non-U64 value cell");
                None
            }
        }
    }

    pub fn increment_f64(&mut self, key: &T::Key, delta: f64) -> Option<f64> {
        let cell = self.search_slot_mut(key)?.value_mut()?;
        match cell {
            ValueCell::F64(v) => {
                *v += delta;
                Some(*v)
            }
            _ => {
                debug_assert!(false, "increment_f64 on a non-F64 value cell");
                None
            }
        }
    }

    fn set_value(&mut self, key: &T::Key, value: ValueCell<T::Value>) -> bool {
        match self.search_slot_mut(key).and_then(|slot| slot.value_mut()) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// `table[1]` while a rehash is in progress (so no duplicate can be
    /// created that the migration would later have to reconcile),
    /// `table[0]` otherwise.
    #[inline]
    fn destination_table_idx(&self) -> usize {
        if self.is_rehashing() {
            1
        } else {
            0
        }
    }

    /// Allocates a new entry for `key` (and `value`, for a
    /// value-carrying dictionary) and splices it at the head of its
    /// destination bucket, per the shape rules of §3: an inline bare key
    /// when `no_value` and `keys_are_odd` are both set, a `KeyNext` node
    /// for any other `no_value` key (either way, `prepend_to` promotes a
    /// bare key to `KeyNext` automatically if the bucket wasn't empty).
    /// Returns the new entry's address.
    fn insert_new(&mut self, key: T::Key, value: Option<ValueCell<T::Value>>) -> usize {
        let hash = self.hash_of(&key);
        let no_value = self.type_descriptor.no_value();
        let keys_are_odd = self.type_descriptor.keys_are_odd();
        let new_slot = match (no_value, value) {
            (true, None) if keys_are_odd => EntrySlot::new_bare_key(key),
            (true, None) => EntrySlot::new_key_next(key, None),
            (false, Some(v)) => EntrySlot::new_full(FullNode {
                key,
                value: v,
                next: None,
            }),
            (true, Some(_)) => {
                debug_assert!(false, "value supplied to a no_value dictionary");
                EntrySlot::new_key_next(key, None)
            }
            (false, None) => {
                debug_assert!(false, "no value supplied to a dictionary that stores values");
                unreachable!("unsupported by any public insertion path")
            }
        };
        let table_idx = self.destination_table_idx();
        let idx = self.table[table_idx].bucket_index(hash);
        self.splice_at(table_idx, idx, new_slot)
    }

    /// Splices an already-built entry at the head of `table[table_idx]`'s
    /// bucket `bucket_idx`, bumping that table's used count. Shared by
    /// [`Dict::insert_new`] and [`Dict::insert_at_position`], which
    /// differ only in how they come by `table_idx`/`bucket_idx`.
    fn splice_at(
        &mut self,
        table_idx: usize,
        bucket_idx: usize,
        new_slot: EntrySlot<T::Key, T::Value>,
    ) -> usize {
        let addr = new_slot.addr();
        let table = &mut self.table[table_idx];
        let bucket = table.bucket_mut(bucket_idx);
        let head = bucket.take();
        *bucket = Some(new_slot.prepend_to(head));
        table.increment_used();
        addr
    }

    /// Low-level insertion primitive mirroring `dictAddRaw`: creates an
    /// entry for `key` without requiring the caller to already have a
    /// value in hand, so the caller can fill it in afterward (the way
    /// `dictAdd` itself is built on top of `dictAddRaw` plus a
    /// `dictSetVal`). Since every [`crate::dict::entry::EntrySlot::Full`]
    /// node carries its value inline rather than leaving it
    /// uninitialized, a freshly inserted entry's value starts out as
    /// `T::Value::default()` for the caller to overwrite.
    ///
    /// Returns [`AddRawOutcome::Inserted`] with a handle to the new
    /// (default-valued) slot, or [`AddRawOutcome::Existing`] with a
    /// handle to the entry that was already there — mirroring the
    /// `existing` out-parameter of the original.
    pub fn add_raw(&mut self, key: T::Key) -> AddRawOutcome<'_, T::Key, T::Value>
    where
        T::Value: Default,
    {
        debug_assert!(!self.type_descriptor.no_value());
        self.piggyback_rehash();
        let _ = self.expand_if_needed();

        if let Some(addr) = self.search_slot(&key).map(|slot| slot.addr()) {
            // SAFETY: `addr` was just looked up in `self` and nothing has
            // mutated the dictionary since.
            let cell = unsafe { EntrySlot::<T::Key, T::Value>::value_at_mut(addr) }
                .expect("add_raw target has a value cell");
            return AddRawOutcome::Existing(cell);
        }

        let addr = self.insert_new(key, Some(ValueCell::Pointer(Box::new(T::Value::default()))));
        // SAFETY: `addr` was just returned by `insert_new` above.
        let cell = unsafe { EntrySlot::<T::Key, T::Value>::value_at_mut(addr) }
            .expect("add_raw target has a value cell");
        AddRawOutcome::Inserted(cell)
    }

    /// Looks up `key` without mutating the dictionary's contents,
    /// returning either the existing entry or a [`InsertPosition`]
    /// token naming where `key` would land. Mirrors
    /// `dictFindPositionForInsert`.
    ///
    /// The returned `InsertPosition` is only valid until the next
    /// dictionary operation: a subsequent insert, delete, or rehash step
    /// may relocate the bucket it names. Pass it to
    /// [`Dict::insert_at_position`] before doing anything else with
    /// `self`.
    pub fn find_position_for_insert(&mut self, key: &T::Key) -> FindPositionResult<'_, T::Key, T::Value> {
        self.piggyback_rehash();
        let _ = self.expand_if_needed();

        if let Some(slot) = self.search_slot(key) {
            return FindPositionResult::Occupied(Entry::new(slot));
        }

        let hash = self.hash_of(key);
        let table_idx = self.destination_table_idx();
        let bucket_idx = self.table[table_idx].bucket_index(hash);
        FindPositionResult::Vacant(InsertPosition { table_idx, bucket_idx })
    }

    /// Completes an insertion previously located by
    /// [`Dict::find_position_for_insert`], skipping a second lookup.
    /// Mirrors `dictInsertAtPosition`. The caller is responsible for not
    /// having mutated `self` between the two calls (see
    /// [`InsertPosition`]'s docs); in a debug build, a position naming a
    /// bucket index now out of range trips an assertion instead of
    /// silently writing to the wrong bucket.
    pub fn insert_at_position(&mut self, key: T::Key, value: T::Value, position: InsertPosition) {
        debug_assert!(
            position.bucket_idx < self.table[position.table_idx].capacity(),
            "insert_at_position called with a position invalidated by an intervening mutation"
        );
        let new_slot = EntrySlot::new_full(FullNode {
            key,
            value: ValueCell::Pointer(Box::new(value)),
            next: None,
        });
        self.splice_at(position.table_idx, position.bucket_idx, new_slot);
    }
}

/// Where [`Dict::find_position_for_insert`] determined a not-yet-present
/// key would be inserted: a (table, bucket) pair to hand to
/// [`Dict::insert_at_position`] without repeating the lookup.
pub struct InsertPosition {
    table_idx: usize,
    bucket_idx: usize,
}

/// The outcome of [`Dict::find_position_for_insert`].
pub enum FindPositionResult<'a, K, V> {
    /// `key` is not present; insert it at the carried [`InsertPosition`].
    Vacant(InsertPosition),
    /// `key` is already present; here is its entry.
    Occupied(crate::dict::entry::Entry<'a, K, V>),
}

/// The outcome of [`Dict::add_raw`].
pub enum AddRawOutcome<'a, K, V> {
    /// `key` was freshly inserted with a default value the caller should
    /// now overwrite.
    Inserted(&'a mut ValueCell<V>),
    /// `key` was already present; here is its value cell.
    Existing(&'a mut ValueCell<V>),
}

#[cfg(test)]
mod tests {
    use super::{AddRawOutcome, FindPositionResult};
    use crate::dict::{Dict, TypeDescriptor};

    #[derive(Default)]
    struct IntMap;

    impl TypeDescriptor for IntMap {
        type Key = i64;
        type Value = i64;

        fn hash_key(&self, key: &i64) -> u64 {
            *key as u64
        }
    }

    #[derive(Default)]
    struct IntSet;

    impl TypeDescriptor for IntSet {
        type Key = i64;
        type Value = ();

        fn hash_key(&self, key: &i64) -> u64 {
            *key as u64
        }

        fn no_value(&self) -> bool {
            true
        }
    }

    #[test]
    fn add_rejects_a_duplicate_key_without_touching_the_existing_value() {
        let mut dict: Dict<IntMap> = Dict::new();
        assert_eq!(dict.add(1, 100).unwrap(), true);
        assert_eq!(dict.add(1, 999).unwrap(), false);
        assert_eq!(dict.get_pointer(&1), Some(&100));
    }

    #[test]
    fn add_key_works_on_a_no_value_dictionary() {
        let mut dict: Dict<IntSet> = Dict::new();
        assert_eq!(dict.add_key(1).unwrap(), true);
        assert_eq!(dict.add_key(1).unwrap(), false);
        assert!(dict.contains_key(&1));
    }

    #[test]
    fn replace_overwrites_an_existing_value_and_reports_it_was_not_fresh() {
        let mut dict: Dict<IntMap> = Dict::new();
        assert_eq!(dict.replace(1, 1).unwrap(), true);
        assert_eq!(dict.replace(1, 2).unwrap(), false);
        assert_eq!(dict.get_pointer(&1), Some(&2));
    }

    #[test]
    fn add_or_find_creates_the_default_exactly_once() {
        let mut dict: Dict<IntMap> = Dict::new();
        {
            let (value, inserted) = dict.add_or_find(1, || 42).unwrap();
            assert!(inserted);
            *value += 1;
        }
        let (value, inserted) = dict.add_or_find(1, || panic!("default should not run again")).unwrap();
        assert!(!inserted);
        assert_eq!(*value, 43);
    }

    #[test]
    fn integer_value_cells_round_trip_through_get_and_set() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(1, 0).unwrap();
        assert!(dict.set_i64(&1, -5));
        assert_eq!(dict.get_i64(&1), Some(-5));
        assert!(dict.set_u64(&1, 5));
        assert_eq!(dict.get_u64(&1), Some(5));
        assert!(dict.set_f64(&1, 1.5));
        assert_eq!(dict.get_f64(&1), Some(1.5));
    }

    #[test]
    fn increment_i64_adds_in_place_and_wraps_on_overflow() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(1, 0).unwrap();
        dict.set_i64(&1, i64::MAX);
        assert_eq!(dict.increment_i64(&1, 1), Some(i64::MIN));
    }

    #[test]
    fn increment_on_a_missing_key_returns_none() {
        let mut dict: Dict<IntMap> = Dict::new();
        assert_eq!(dict.increment_i64(&1, 1), None);
    }

    #[test]
    fn add_raw_creates_a_default_valued_entry_then_lets_the_caller_fill_it_in() {
        let mut dict: Dict<IntMap> = Dict::new();
        match dict.add_raw(1) {
            AddRawOutcome::Inserted(cell) => *cell = crate::dict::entry::ValueCell::I64(42),
            AddRawOutcome::Existing(_) => panic!("key should not exist yet"),
        }
        assert_eq!(dict.get_i64(&1), Some(42));
    }

    #[test]
    fn add_raw_on_an_existing_key_returns_its_current_value_cell() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(1, 7).unwrap();
        match dict.add_raw(1) {
            AddRawOutcome::Existing(cell) => assert_eq!(cell.as_pointer(), Some(&7)),
            AddRawOutcome::Inserted(_) => panic!("key already existed"),
        }
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn find_position_for_insert_reports_occupied_for_a_present_key() {
        let mut dict: Dict<IntMap> = Dict::new();
        dict.add(1, 10).unwrap();
        match dict.find_position_for_insert(&1) {
            FindPositionResult::Occupied(entry) => {
                assert_eq!(entry.value().and_then(|v| v.as_pointer()), Some(&10))
            }
            FindPositionResult::Vacant(_) => panic!("key should be present"),
        }
    }

    #[test]
    fn insert_at_position_completes_a_vacant_find() {
        let mut dict: Dict<IntMap> = Dict::new();
        let position = match dict.find_position_for_insert(&5) {
            FindPositionResult::Vacant(pos) => pos,
            FindPositionResult::Occupied(_) => panic!("key should be absent"),
        };
        dict.insert_at_position(5, 50, position);
        assert_eq!(dict.get_pointer(&5), Some(&50));
        assert_eq!(dict.len(), 1);
    }
}
