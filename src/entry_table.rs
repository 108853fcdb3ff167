//! EntryTable: keyed storage with stable, generational entry ids.
//!
//! Values live in a `SlotMap`; a `hashbrown::HashTable` indexes them by the
//! precomputed hash of their key. `K: Hash` runs once per insert and once per
//! lookup, and never while the table is being restructured.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table::Entry as TableEntry;
use hashbrown::HashTable;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable id of a cache entry; stale ids never alias a newer entry.
    pub(crate) struct EntryId;
}

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    hash: u64,
}

#[derive(Debug)]
pub(crate) enum InsertError {
    DuplicateKey,
}

pub(crate) struct EntryTable<K, V, S> {
    hasher: S,
    index: HashTable<EntryId>,
    slots: SlotMap<EntryId, Slot<K, V>>,
}

impl<K, V, S> EntryTable<K, V, S> {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

impl<K, V, S> EntryTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hasher.hash_one(q);
        self.index
            .find(hash, |&id| {
                self.slots
                    .get(id)
                    .map(|s| s.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    /// Insert `key` with a value built from its new id. `make` only runs when
    /// the key is absent.
    pub(crate) fn insert_with<F>(&mut self, key: K, make: F) -> Result<EntryId, InsertError>
    where
        F: FnOnce(EntryId) -> V,
    {
        let hash = self.hasher.hash_one(&key);
        let slots = &mut self.slots;
        match self.index.entry(
            hash,
            |&id| slots.get(id).map(|s| s.key == key).unwrap_or(false),
            |&id| slots.get(id).map(|s| s.hash).unwrap_or(0),
        ) {
            TableEntry::Occupied(_) => Err(InsertError::DuplicateKey),
            TableEntry::Vacant(v) => {
                let id = slots.insert_with_key(|id| Slot {
                    key,
                    value: make(id),
                    hash,
                });
                v.insert(id);
                Ok(id)
            }
        }
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&V> {
        self.slots.get(id).map(|s| &s.value)
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.slots.get_mut(id).map(|s| &mut s.value)
    }

    /// Unlink an entry and hand back its key and value.
    pub(crate) fn remove(&mut self, id: EntryId) -> Option<(K, V)> {
        let slot = self.slots.remove(id)?;
        if let Ok(found) = self.index.find_entry(slot.hash, |&other| other == id) {
            found.remove();
        }
        Some((slot.key, slot.value))
    }

    /// Empty the table, returning everything it held.
    pub(crate) fn take_all(&mut self) -> Vec<(K, V)> {
        self.index.clear();
        self.slots.drain().map(|(_, s)| (s.key, s.value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;
    use std::collections::BTreeSet;

    fn table<V>() -> EntryTable<String, V, RandomState> {
        EntryTable::with_capacity_and_hasher(4, RandomState::new())
    }

    /// Duplicate keys are rejected and the value builder does not run.
    #[test]
    fn duplicate_insert_rejected_without_building() {
        let mut t = table::<i32>();
        let id = t.insert_with("dup".to_string(), |_| 1).unwrap();
        let mut ran = false;
        match t.insert_with("dup".to_string(), |_| {
            ran = true;
            2
        }) {
            Err(InsertError::DuplicateKey) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!ran);
        assert_eq!(t.get(id), Some(&1));
        assert_eq!(t.len(), 1);
    }

    /// The builder sees the id the entry ends up under.
    #[test]
    fn builder_receives_own_id() {
        let mut t = table::<Option<EntryId>>();
        let id = t.insert_with("a".to_string(), Some).unwrap();
        assert_eq!(t.get(id), Some(&Some(id)));
    }

    /// Borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut t = table::<i32>();
        let id = t.insert_with("hello".to_string(), |_| 1).unwrap();
        assert_eq!(t.find("hello"), Some(id));
        assert_eq!(t.find("world"), None);
    }

    /// Removing an entry invalidates its id, and a reinserted key gets a new one.
    #[test]
    fn remove_then_reinsert_does_not_alias() {
        let mut t = table::<i32>();
        let old = t.insert_with("k".to_string(), |_| 1).unwrap();
        assert_eq!(t.remove(old), Some(("k".to_string(), 1)));
        assert!(t.find("k").is_none());
        assert!(t.get(old).is_none());
        assert!(t.remove(old).is_none());

        let new = t.insert_with("k".to_string(), |_| 2).unwrap();
        assert_ne!(old, new);
        assert_eq!(t.find("k"), Some(new));
        if let Some(v) = t.get_mut(new) {
            *v += 1;
        }
        assert_eq!(t.get(new), Some(&3));
    }

    /// Lookups stay correct when every key collides.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl core::hash::Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut t: EntryTable<String, i32, ConstBuildHasher> =
            EntryTable::with_capacity_and_hasher(0, ConstBuildHasher);
        let a = t.insert_with("a".to_string(), |_| 1).unwrap();
        let b = t.insert_with("b".to_string(), |_| 2).unwrap();
        assert_eq!(t.find("a"), Some(a));
        assert_eq!(t.find("b"), Some(b));
        t.remove(a);
        assert_eq!(t.find("a"), None);
        assert_eq!(t.find("b"), Some(b));
    }

    #[test]
    fn take_all_empties_the_table() {
        let mut t = table::<i32>();
        for (i, k) in ["x", "y", "z"].into_iter().enumerate() {
            t.insert_with(k.to_string(), |_| i as i32).unwrap();
        }
        let keys: BTreeSet<String> = t.take_all().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["x", "y", "z"].iter().map(|s| s.to_string()).collect());
        assert_eq!(t.len(), 0);
        assert!(t.find("x").is_none());
    }
}
