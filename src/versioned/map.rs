//! Versioned key-value map.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::chain::ChainStats;
use crate::chain::Delta;
use crate::chain::Handle;
use crate::options::Options;

use super::Versioned;

/// An edit to a map.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEdit<K, V> {
    /// `key` now maps to `new`; `old` is what it mapped to before, if anything.
    Insert { key: K, old: Option<V>, new: V },
    /// `key` no longer maps to `old`.
    Remove { key: K, old: V },
    /// Several edits applied in order and reverted in reverse order.
    Batch(Vec<MapEdit<K, V>>),
}

impl<K: Eq + Hash + Clone, V: Clone> Delta<FxHashMap<K, V>> for MapEdit<K, V> {
    fn apply(&self, target: &mut FxHashMap<K, V>) {
        match self {
            MapEdit::Insert { key, new, .. } => {
                target.insert(key.clone(), new.clone());
            }
            MapEdit::Remove { key, .. } => {
                target.remove(key);
            }
            MapEdit::Batch(edits) => {
                for edit in edits {
                    edit.apply(target);
                }
            }
        }
    }

    fn revert(&self, target: &mut FxHashMap<K, V>) {
        match self {
            MapEdit::Insert { key, old: Some(old), .. } => {
                target.insert(key.clone(), old.clone());
            }
            MapEdit::Insert { key, old: None, .. } => {
                target.remove(key);
            }
            MapEdit::Remove { key, old } => {
                target.insert(key.clone(), old.clone());
            }
            MapEdit::Batch(edits) => {
                for edit in edits.iter().rev() {
                    edit.revert(target);
                }
            }
        }
    }
}

/// An immutable map version sharing storage with its whole lineage.
///
/// ```
/// use lineage::versioned::{Versioned, VersionedMap};
///
/// let empty = VersionedMap::new();
/// let one = empty.insert("width", 4);
/// assert!(one.insert("width", 4).same_version(&one));
/// assert_eq!(one.get(&"width"), Some(4));
/// assert_eq!(empty.get(&"width"), None);
/// ```
#[derive(Clone)]
pub struct VersionedMap<K, V> {
    handle: Handle<FxHashMap<K, V>, MapEdit<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> VersionedMap<K, V> {
    pub fn new() -> VersionedMap<K, V> {
        return VersionedMap { handle: Handle::root(FxHashMap::default()) };
    }

    pub fn with_options(options: Options) -> VersionedMap<K, V> {
        return VersionedMap { handle: Handle::root_with(FxHashMap::default(), options) };
    }

    fn derive(
        &self,
        build: impl FnOnce(&FxHashMap<K, V>) -> Option<MapEdit<K, V>>,
    ) -> VersionedMap<K, V> {
        return VersionedMap { handle: self.handle.derive_if(build) };
    }

    pub fn len(&self) -> usize {
        return self.handle.with(|map| map.len());
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// A copy of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        return self.handle.with(|map| map.get(key).cloned());
    }

    pub fn contains_key(&self, key: &K) -> bool {
        return self.handle.with(|map| map.contains_key(key));
    }

    /// Drop `key`. Absent keys return `self`.
    pub fn remove(&self, key: &K) -> VersionedMap<K, V> {
        return self.derive(|map| {
            let (key, old) = map.get_key_value(key)?;
            return Some(MapEdit::Remove { key: key.clone(), old: old.clone() });
        });
    }

    /// Copy out every key, in unspecified order.
    pub fn keys(&self) -> Vec<K> {
        return self.handle.with(|map| map.keys().cloned().collect());
    }

    /// Copy out every value, in unspecified order.
    pub fn values(&self) -> Vec<V> {
        return self.handle.with(|map| map.values().cloned().collect());
    }

    /// Copy out every entry, in unspecified order.
    pub fn entries(&self) -> Vec<(K, V)> {
        return self
            .handle
            .with(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    }

    /// Iterate over a snapshot of this version.
    pub fn iter(&self) -> std::vec::IntoIter<(K, V)> {
        return self.entries().into_iter();
    }

    /// A copy of the whole map.
    pub fn snapshot(&self) -> FxHashMap<K, V> {
        return self.handle.read();
    }
}

impl<K: Eq + Hash + Clone, V: Clone + PartialEq> VersionedMap<K, V> {
    /// Map `key` to `value`. Storing the value already there returns `self`.
    pub fn insert(&self, key: K, value: V) -> VersionedMap<K, V> {
        return self.derive(|map| {
            let old = map.get(&key);
            if old == Some(&value) {
                return None;
            }
            return Some(MapEdit::Insert { old: old.cloned(), key, new: value });
        });
    }

    /// Store every pair as one version; later pairs win over earlier ones
    /// with the same key. If nothing would change, returns `self`.
    pub fn extend(&self, pairs: impl IntoIterator<Item = (K, V)>) -> VersionedMap<K, V> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        return self.derive(|map| {
            let mut staged: FxHashMap<K, V> = FxHashMap::default();
            for (key, value) in pairs {
                staged.insert(key, value);
            }
            let edits: Vec<MapEdit<K, V>> = staged
                .into_iter()
                .filter_map(|(key, value)| {
                    let old = map.get(&key);
                    if old == Some(&value) {
                        return None;
                    }
                    return Some(MapEdit::Insert { old: old.cloned(), key, new: value });
                })
                .collect();
            if edits.is_empty() {
                return None;
            }
            return Some(MapEdit::Batch(edits));
        });
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Versioned for VersionedMap<K, V> {
    fn same_version(&self, other: &Self) -> bool {
        return self.handle.same_node(&other.handle);
    }

    fn stats(&self) -> ChainStats {
        return self.handle.stats();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for VersionedMap<K, V> {
    fn default() -> Self {
        return VersionedMap::new();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> FromIterator<(K, V)> for VersionedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        return VersionedMap { handle: Handle::root(iter.into_iter().collect()) };
    }
}

impl<K, V> fmt::Debug for VersionedMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_map().entries(self.entries()).finish();
    }
}
