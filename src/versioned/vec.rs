//! Versioned dynamic array.

use std::fmt;

use crate::chain::ChainStats;
use crate::chain::Delta;
use crate::chain::Handle;
use crate::error::Result;
use crate::error::check_index;
use crate::error::check_insert_index;
use crate::options::Options;

use super::Versioned;

/// An edit to a `Vec<T>`, carrying what it needs to be undone.
#[derive(Clone, Debug, PartialEq)]
pub enum VecEdit<T> {
    /// `value` was inserted at `index`.
    Insert { index: usize, value: T },
    /// `value` was removed from `index`.
    Remove { index: usize, value: T },
    /// The element at `index` changed from `old` to `new`.
    Replace { index: usize, old: T, new: T },
    /// `values` were appended.
    Append { values: Vec<T> },
}

impl<T: Clone> Delta<Vec<T>> for VecEdit<T> {
    fn apply(&self, target: &mut Vec<T>) {
        match self {
            VecEdit::Insert { index, value } => target.insert(*index, value.clone()),
            VecEdit::Remove { index, .. } => {
                target.remove(*index);
            }
            VecEdit::Replace { index, new, .. } => target[*index] = new.clone(),
            VecEdit::Append { values } => target.extend_from_slice(values),
        }
    }

    fn revert(&self, target: &mut Vec<T>) {
        match self {
            VecEdit::Insert { index, .. } => {
                target.remove(*index);
            }
            VecEdit::Remove { index, value } => target.insert(*index, value.clone()),
            VecEdit::Replace { index, old, .. } => target[*index] = old.clone(),
            VecEdit::Append { values } => target.truncate(target.len() - values.len()),
        }
    }
}

/// An immutable list version sharing storage with its whole lineage.
///
/// ```
/// use lineage::versioned::VersionedVec;
///
/// let root = VersionedVec::from_vec(vec![1, 2, 3]);
/// let longer = root.push(4);
/// let shorter = longer.remove(1).unwrap();
/// assert_eq!(root.to_vec(), vec![1, 2, 3]);
/// assert_eq!(longer.to_vec(), vec![1, 2, 3, 4]);
/// assert_eq!(shorter.to_vec(), vec![1, 3, 4]);
/// ```
#[derive(Clone)]
pub struct VersionedVec<T> {
    handle: Handle<Vec<T>, VecEdit<T>>,
}

impl<T: Clone> VersionedVec<T> {
    /// An empty list.
    pub fn new() -> VersionedVec<T> {
        return VersionedVec::from_vec(Vec::new());
    }

    /// A list starting from `items`.
    pub fn from_vec(items: Vec<T>) -> VersionedVec<T> {
        return VersionedVec { handle: Handle::root(items) };
    }

    /// A list starting from `items`, with explicit lineage options.
    pub fn with_options(items: Vec<T>, options: Options) -> VersionedVec<T> {
        return VersionedVec { handle: Handle::root_with(items, options) };
    }

    fn derive(&self, build: impl FnOnce(&Vec<T>) -> Option<VecEdit<T>>) -> VersionedVec<T> {
        return VersionedVec { handle: self.handle.derive_if(build) };
    }

    fn try_derive(
        &self,
        build: impl FnOnce(&Vec<T>) -> Result<Option<VecEdit<T>>>,
    ) -> Result<VersionedVec<T>> {
        let handle = self.handle.derive_with(build)?;
        return Ok(VersionedVec { handle });
    }

    pub fn len(&self) -> usize {
        return self.handle.with(|items| items.len());
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// A copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        return self.handle.with(|items| items.get(index).cloned());
    }

    pub fn first(&self) -> Option<T> {
        return self.handle.with(|items| items.first().cloned());
    }

    pub fn last(&self) -> Option<T> {
        return self.handle.with(|items| items.last().cloned());
    }

    /// Copy out every element.
    pub fn to_vec(&self) -> Vec<T> {
        return self.handle.read();
    }

    /// Iterate over a snapshot of this version.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        return self.to_vec().into_iter();
    }

    /// Append one element.
    pub fn push(&self, value: T) -> VersionedVec<T> {
        return self.derive(|items| Some(VecEdit::Insert { index: items.len(), value }));
    }

    /// Drop the last element. An empty list is returned as is.
    pub fn pop(&self) -> VersionedVec<T> {
        return self.derive(|items| {
            let value = items.last()?.clone();
            return Some(VecEdit::Remove { index: items.len() - 1, value });
        });
    }

    /// Insert `value` before `index`; `index == len` appends.
    pub fn insert(&self, index: usize, value: T) -> Result<VersionedVec<T>> {
        return self.try_derive(|items| {
            check_insert_index(index, items.len())?;
            return Ok(Some(VecEdit::Insert { index, value }));
        });
    }

    /// Remove the element at `index`.
    pub fn remove(&self, index: usize) -> Result<VersionedVec<T>> {
        return self.try_derive(|items| {
            check_index(index, items.len())?;
            return Ok(Some(VecEdit::Remove { index, value: items[index].clone() }));
        });
    }

    /// Append every element of `values`. Nothing to append returns `self`.
    pub fn extend(&self, values: impl IntoIterator<Item = T>) -> VersionedVec<T> {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return self.clone();
        }
        return self.derive(|_| Some(VecEdit::Append { values }));
    }
}

impl<T: Clone + PartialEq> VersionedVec<T> {
    /// Overwrite the element at `index`. Writing the current value returns
    /// `self`.
    pub fn set(&self, index: usize, value: T) -> Result<VersionedVec<T>> {
        return self.try_derive(|items| {
            check_index(index, items.len())?;
            if items[index] == value {
                return Ok(None);
            }
            let old = items[index].clone();
            return Ok(Some(VecEdit::Replace { index, old, new: value }));
        });
    }

    /// Remove the first element equal to `value`, if any.
    pub fn remove_value(&self, value: &T) -> VersionedVec<T> {
        return self.derive(|items| {
            let index = items.iter().position(|item| item == value)?;
            return Some(VecEdit::Remove { index, value: items[index].clone() });
        });
    }

    pub fn contains(&self, value: &T) -> bool {
        return self.handle.with(|items| items.contains(value));
    }

    /// Position of the first element equal to `value`.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        return self.handle.with(|items| items.iter().position(|item| item == value));
    }
}

impl<T: Clone> Versioned for VersionedVec<T> {
    fn same_version(&self, other: &Self) -> bool {
        return self.handle.same_node(&other.handle);
    }

    fn stats(&self) -> ChainStats {
        return self.handle.stats();
    }
}

impl<T: Clone> Default for VersionedVec<T> {
    fn default() -> Self {
        return VersionedVec::new();
    }
}

impl<T: Clone> FromIterator<T> for VersionedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return VersionedVec::from_vec(iter.into_iter().collect());
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for VersionedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.to_vec()).finish();
    }
}
