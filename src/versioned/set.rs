//! Versioned hash set.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::chain::ChainStats;
use crate::chain::Delta;
use crate::chain::Handle;
use crate::options::Options;

use super::Versioned;

/// An edit to a set. Bulk variants hold only members whose presence
/// actually changed, so reverting them restores the exact previous set.
#[derive(Clone, Debug, PartialEq)]
pub enum SetEdit<T> {
    Insert(T),
    Remove(T),
    InsertAll(Vec<T>),
    RemoveAll(Vec<T>),
}

impl<T: Eq + Hash + Clone> Delta<FxHashSet<T>> for SetEdit<T> {
    fn apply(&self, target: &mut FxHashSet<T>) {
        match self {
            SetEdit::Insert(value) => {
                target.insert(value.clone());
            }
            SetEdit::Remove(value) => {
                target.remove(value);
            }
            SetEdit::InsertAll(values) => target.extend(values.iter().cloned()),
            SetEdit::RemoveAll(values) => {
                for value in values {
                    target.remove(value);
                }
            }
        }
    }

    fn revert(&self, target: &mut FxHashSet<T>) {
        match self {
            SetEdit::Insert(value) => {
                target.remove(value);
            }
            SetEdit::Remove(value) => {
                target.insert(value.clone());
            }
            SetEdit::InsertAll(values) => {
                for value in values {
                    target.remove(value);
                }
            }
            SetEdit::RemoveAll(values) => target.extend(values.iter().cloned()),
        }
    }
}

/// An immutable set version sharing storage with its whole lineage.
#[derive(Clone)]
pub struct VersionedSet<T> {
    handle: Handle<FxHashSet<T>, SetEdit<T>>,
}

impl<T: Eq + Hash + Clone> VersionedSet<T> {
    pub fn new() -> VersionedSet<T> {
        return VersionedSet { handle: Handle::root(FxHashSet::default()) };
    }

    pub fn with_options(options: Options) -> VersionedSet<T> {
        return VersionedSet { handle: Handle::root_with(FxHashSet::default(), options) };
    }

    fn derive(&self, build: impl FnOnce(&FxHashSet<T>) -> Option<SetEdit<T>>) -> VersionedSet<T> {
        return VersionedSet { handle: self.handle.derive_if(build) };
    }

    pub fn len(&self) -> usize {
        return self.handle.with(|set| set.len());
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    pub fn contains(&self, value: &T) -> bool {
        return self.handle.with(|set| set.contains(value));
    }

    /// Add `value`. Already present returns `self`.
    pub fn insert(&self, value: T) -> VersionedSet<T> {
        return self.derive(|set| {
            if set.contains(&value) {
                return None;
            }
            return Some(SetEdit::Insert(value));
        });
    }

    /// Remove `value`. Absent returns `self`.
    pub fn remove(&self, value: &T) -> VersionedSet<T> {
        return self.derive(|set| {
            let present = set.get(value)?;
            return Some(SetEdit::Remove(present.clone()));
        });
    }

    /// Add every value not already present, as one version.
    pub fn insert_all(&self, values: impl IntoIterator<Item = T>) -> VersionedSet<T> {
        let values: Vec<T> = values.into_iter().collect();
        return self.derive(|set| {
            let mut seen = FxHashSet::default();
            let added: Vec<T> = values
                .into_iter()
                .filter(|value| !set.contains(value) && seen.insert(value.clone()))
                .collect();
            if added.is_empty() {
                return None;
            }
            return Some(SetEdit::InsertAll(added));
        });
    }

    /// Remove every listed value that is present, as one version. An empty
    /// list, or one with no present members, returns `self`.
    pub fn remove_all<'a>(&self, values: impl IntoIterator<Item = &'a T>) -> VersionedSet<T>
    where
        T: 'a,
    {
        let values: Vec<&T> = values.into_iter().collect();
        return self.derive(|set| {
            let mut seen = FxHashSet::default();
            let removed: Vec<T> = values
                .into_iter()
                .filter_map(|value| set.get(value))
                .filter(|value| seen.insert(*value))
                .cloned()
                .collect();
            if removed.is_empty() {
                return None;
            }
            return Some(SetEdit::RemoveAll(removed));
        });
    }

    /// Copy out every member, in unspecified order.
    pub fn to_vec(&self) -> Vec<T> {
        return self.handle.with(|set| set.iter().cloned().collect());
    }

    /// Iterate over a snapshot of this version.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        return self.to_vec().into_iter();
    }

    /// A copy of the whole set.
    pub fn snapshot(&self) -> FxHashSet<T> {
        return self.handle.read();
    }
}

impl<T: Eq + Hash + Clone> Versioned for VersionedSet<T> {
    fn same_version(&self, other: &Self) -> bool {
        return self.handle.same_node(&other.handle);
    }

    fn stats(&self) -> ChainStats {
        return self.handle.stats();
    }
}

impl<T: Eq + Hash + Clone> Default for VersionedSet<T> {
    fn default() -> Self {
        return VersionedSet::new();
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for VersionedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return VersionedSet { handle: Handle::root(iter.into_iter().collect()) };
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Debug for VersionedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_set().entries(self.to_vec()).finish();
    }
}
