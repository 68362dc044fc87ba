//! Copy-on-every-edit list, set and map.

use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

/// A list snapshot. Each edit copies the list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NaiveVec<T> {
    items: Arc<Vec<T>>,
}

impl<T: Clone> NaiveVec<T> {
    pub fn from_vec(items: Vec<T>) -> NaiveVec<T> {
        return NaiveVec { items: Arc::new(items) };
    }

    fn edit(&self, f: impl FnOnce(&mut Vec<T>)) -> NaiveVec<T> {
        let mut items = (*self.items).clone();
        f(&mut items);
        return NaiveVec::from_vec(items);
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn get(&self, index: usize) -> Option<T> {
        return self.items.get(index).cloned();
    }

    pub fn to_vec(&self) -> Vec<T> {
        return (*self.items).clone();
    }

    pub fn push(&self, value: T) -> NaiveVec<T> {
        return self.edit(|items| items.push(value));
    }

    pub fn pop(&self) -> NaiveVec<T> {
        return self.edit(|items| {
            items.pop();
        });
    }

    pub fn insert(&self, index: usize, value: T) -> Option<NaiveVec<T>> {
        if index > self.items.len() {
            return None;
        }
        return Some(self.edit(|items| items.insert(index, value)));
    }

    pub fn remove(&self, index: usize) -> Option<NaiveVec<T>> {
        if index >= self.items.len() {
            return None;
        }
        return Some(self.edit(|items| {
            items.remove(index);
        }));
    }

    pub fn set(&self, index: usize, value: T) -> Option<NaiveVec<T>> {
        if index >= self.items.len() {
            return None;
        }
        return Some(self.edit(|items| items[index] = value));
    }

    pub fn extend(&self, values: impl IntoIterator<Item = T>) -> NaiveVec<T> {
        return self.edit(|items| items.extend(values));
    }
}

impl<T: Clone + PartialEq> NaiveVec<T> {
    pub fn remove_value(&self, value: &T) -> NaiveVec<T> {
        return self.edit(|items| {
            if let Some(index) = items.iter().position(|item| item == value) {
                items.remove(index);
            }
        });
    }
}

/// A set snapshot. Each edit copies the set.
#[derive(Clone, Debug, Default)]
pub struct NaiveSet<T> {
    items: Arc<FxHashSet<T>>,
}

impl<T: Eq + Hash + Clone> NaiveSet<T> {
    pub fn new() -> NaiveSet<T> {
        return NaiveSet { items: Arc::new(FxHashSet::default()) };
    }

    fn edit(&self, f: impl FnOnce(&mut FxHashSet<T>)) -> NaiveSet<T> {
        let mut items = (*self.items).clone();
        f(&mut items);
        return NaiveSet { items: Arc::new(items) };
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn contains(&self, value: &T) -> bool {
        return self.items.contains(value);
    }

    pub fn insert(&self, value: T) -> NaiveSet<T> {
        return self.edit(|items| {
            items.insert(value);
        });
    }

    pub fn remove(&self, value: &T) -> NaiveSet<T> {
        return self.edit(|items| {
            items.remove(value);
        });
    }

    pub fn insert_all(&self, values: impl IntoIterator<Item = T>) -> NaiveSet<T> {
        return self.edit(|items| items.extend(values));
    }

    pub fn remove_all<'a>(&self, values: impl IntoIterator<Item = &'a T>) -> NaiveSet<T>
    where
        T: 'a,
    {
        return self.edit(|items| {
            for value in values {
                items.remove(value);
            }
        });
    }

    pub fn snapshot(&self) -> FxHashSet<T> {
        return (*self.items).clone();
    }
}

/// A map snapshot. Each edit copies the map.
#[derive(Clone, Debug, Default)]
pub struct NaiveMap<K, V> {
    items: Arc<FxHashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> NaiveMap<K, V> {
    pub fn new() -> NaiveMap<K, V> {
        return NaiveMap { items: Arc::new(FxHashMap::default()) };
    }

    fn edit(&self, f: impl FnOnce(&mut FxHashMap<K, V>)) -> NaiveMap<K, V> {
        let mut items = (*self.items).clone();
        f(&mut items);
        return NaiveMap { items: Arc::new(items) };
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn get(&self, key: &K) -> Option<V> {
        return self.items.get(key).cloned();
    }

    pub fn insert(&self, key: K, value: V) -> NaiveMap<K, V> {
        return self.edit(|items| {
            items.insert(key, value);
        });
    }

    pub fn remove(&self, key: &K) -> NaiveMap<K, V> {
        return self.edit(|items| {
            items.remove(key);
        });
    }

    pub fn extend(&self, pairs: impl IntoIterator<Item = (K, V)>) -> NaiveMap<K, V> {
        return self.edit(|items| items.extend(pairs));
    }

    pub fn snapshot(&self) -> FxHashMap<K, V> {
        return (*self.items).clone();
    }
}
