//! Generation-checked slot arena.
//!
//! Nodes and layers of a lineage live in one arena and refer to each other
//! by `Id`. Freed slots are reused, and each reuse bumps the slot's
//! generation so an id held past its slot's lifetime can be detected.

use std::ops::Index;
use std::ops::IndexMut;

/// Index of a slot plus the generation it was issued under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Id {
    index: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A vector of reusable slots.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    /// Create an arena with room for `capacity` values before reallocating.
    pub fn with_capacity(capacity: usize) -> Arena<T> {
        return Arena {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        };
    }

    /// Store a value and return its id.
    pub fn insert(&mut self, value: T) -> Id {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return Id { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        assert!(index < u32::MAX, "arena exhausted");
        self.slots.push(Slot { generation: 0, value: Some(value) });
        return Id { index, generation: 0 };
    }

    /// Remove a value, freeing its slot for reuse.
    pub fn remove(&mut self, id: Id) -> T {
        let slot = &mut self.slots[id.index as usize];
        assert_eq!(slot.generation, id.generation, "stale arena id {:?}", id);
        let Some(value) = slot.value.take() else {
            panic!("arena slot {:?} already free", id);
        };
        self.free.push(id.index);
        self.live -= 1;
        return value;
    }

    /// Get a value if `id` is still live.
    pub fn get(&self, id: Id) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        return slot.value.as_ref();
    }

    /// Get a value mutably if `id` is still live.
    pub fn get_mut(&mut self, id: Id) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        return slot.value.as_mut();
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        return self.live;
    }

    /// Number of slots waiting for reuse.
    pub fn free_slots(&self) -> usize {
        return self.free.len();
    }
}

impl<T> Index<Id> for Arena<T> {
    type Output = T;

    fn index(&self, id: Id) -> &T {
        match self.get(id) {
            Some(value) => return value,
            None => panic!("stale arena id {:?}", id),
        }
    }
}

impl<T> IndexMut<Id> for Arena<T> {
    fn index_mut(&mut self, id: Id) -> &mut T {
        match self.get_mut(id) {
            Some(value) => return value,
            None => panic!("stale arena id {:?}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut arena = Arena::with_capacity(2);
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena[a], "a");
        assert_eq!(arena[b], "b");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn reused_slot_rejects_old_id() {
        let mut arena = Arena::with_capacity(1);
        let old = arena.insert(1);
        assert_eq!(arena.remove(old), 1);
        assert_eq!(arena.free_slots(), 1);
        let new = arena.insert(2);
        assert_eq!(arena.free_slots(), 0);
        assert_ne!(old, new);
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.get(new), Some(&2));
    }

    #[test]
    #[should_panic(expected = "stale arena id")]
    fn indexing_with_stale_id_panics() {
        let mut arena = Arena::with_capacity(1);
        let id = arena.insert(1);
        arena.remove(id);
        arena.insert(2);
        let _ = arena[id];
    }
}
