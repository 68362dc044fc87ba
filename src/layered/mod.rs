//! Layered grids: persistent 2-D grids built from stacked sparse diffs.
//!
//! A lineage is a stack of layers sharing one default value. Each layer
//! records only the cells that differ from the layer directly below it, so
//! the effective value of a cell is the first entry found walking down from
//! a layer, or the default when no layer has one.
//!
//! [`LayeredGrid`] handles are immutable snapshots; `set` pushes a new layer.
//! [`LayeredGridMut`] owns a private top layer and writes into it in place;
//! that layer never has anything stacked on it, so in-place writes cannot
//! leak into a snapshot. Freezing hands the current layer to a snapshot and
//! moves the mutable handle onto a fresh empty layer.
//!
//! Layers nobody owns are kept only while something above still depends
//! on them. A layer with no owner and exactly one dependent is merged into
//! that dependent the next time the chain is read (see [`compact`]), which
//! keeps chain length proportional to the number of live handles rather
//! than to the number of edits ever made.
//!
//! ```
//! use lineage::layered::LayeredGrid;
//!
//! let blank = LayeredGrid::create(4, 4, 0u8).unwrap();
//! let marked = blank.set(1, 1, 9).unwrap();
//! assert!(marked.set(1, 1, 9).unwrap().same_version(&marked));
//! assert_eq!(blank.get(1, 1), Ok(0));
//! assert_eq!(marked.get(1, 1), Ok(9));
//! assert_eq!(marked.get(0, 0), Ok(0));
//! ```

pub mod compact;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::arena::Id;
use crate::error::Error;
use crate::error::Result;
use crate::error::check_cell;
use crate::error::check_dimensions;
use crate::options::Options;

/// One sparse diff in a stack.
struct Layer<T> {
    /// Cells that differ from the effective value below.
    diff: FxHashMap<u32, T>,
    below: Option<Id>,
    /// Layers whose `below` is this layer.
    dependents: SmallVec<[Id; 2]>,
    /// Live handles on this layer.
    owners: u32,
}

/// Counters describing one layered grid lineage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Layers currently allocated.
    pub live_layers: usize,
    /// Pass-through layers merged into their dependent.
    pub merges: u64,
    /// Times compaction stopped at an unowned layer with several dependents.
    pub splits_skipped: u64,
    /// Layers freed because nothing referred to them.
    pub reclaimed: u64,
}

struct Stack<T> {
    width: usize,
    height: usize,
    default: T,
    layers: Arena<Layer<T>>,
    options: Options,
    stats: GridStats,
}

impl<T> Stack<T> {
    /// Effective value of `cell` as seen from `layer`.
    fn lookup(&self, layer: Id, cell: u32) -> &T {
        return self.lookup_from(Some(layer), cell);
    }

    fn lookup_from(&self, mut layer: Option<Id>, cell: u32) -> &T {
        while let Some(id) = layer {
            let current = &self.layers[id];
            if let Some(value) = current.diff.get(&cell) {
                return value;
            }
            layer = current.below;
        }
        return &self.default;
    }

    /// Stack a new owned layer holding `diff` on top of `below`.
    fn push(&mut self, below: Option<Id>, diff: FxHashMap<u32, T>) -> Id {
        let id = self.layers.insert(Layer {
            diff,
            below,
            dependents: SmallVec::new(),
            owners: 1,
        });
        if let Some(below) = below {
            self.layers[below].dependents.push(id);
        }
        tracing::trace!(layer = ?id, below = ?below, "pushed layer");
        return id;
    }

    /// Drop one owner of `id` and free whatever that leaves unreachable.
    fn release(&mut self, id: Id) {
        self.layers[id].owners -= 1;
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            let layer = &self.layers[id];
            if layer.owners > 0 || !layer.dependents.is_empty() {
                return;
            }
            let layer = self.layers.remove(id);
            self.stats.reclaimed += 1;
            tracing::trace!(layer = ?id, "reclaimed layer");
            cursor = layer.below;
            if let Some(below) = cursor {
                self.layers[below].dependents.retain(|d| *d != id);
            }
        }
    }

    /// Compact first if the lineage is configured to do so on reads.
    fn prepare(&mut self, layer: Id) {
        if self.options.compact_on_read {
            self.compact(layer);
        }
    }

    /// Number of layers from `layer` down to the bottom, inclusive.
    fn depth(&self, layer: Id) -> usize {
        let mut depth = 0;
        let mut cursor = Some(layer);
        while let Some(id) = cursor {
            depth += 1;
            cursor = self.layers[id].below;
        }
        return depth;
    }

    fn stats(&self) -> GridStats {
        return GridStats { live_layers: self.layers.len(), ..self.stats };
    }
}

impl<T: Clone> Stack<T> {
    /// Every effective value seen from `layer`, row-major.
    fn materialize(&self, layer: Id) -> Vec<T> {
        let mut chain: SmallVec<[Id; 8]> = SmallVec::new();
        let mut cursor = Some(layer);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.layers[id].below;
        }
        let mut cells = vec![self.default.clone(); self.width * self.height];
        for id in chain.iter().rev() {
            for (cell, value) in &self.layers[*id].diff {
                cells[*cell as usize] = value.clone();
            }
        }
        return cells;
    }
}

type Shared<T> = Arc<Mutex<Stack<T>>>;

/// An immutable snapshot of a layered grid.
pub struct LayeredGrid<T> {
    stack: Shared<T>,
    layer: Id,
    width: usize,
    height: usize,
}

impl<T: Clone + PartialEq> LayeredGrid<T> {
    /// A `width` x `height` grid where every cell reads as `default`.
    pub fn create(width: usize, height: usize, default: T) -> Result<LayeredGrid<T>> {
        return LayeredGrid::with_options(width, height, default, Options::default());
    }

    pub fn with_options(
        width: usize,
        height: usize,
        default: T,
        options: Options,
    ) -> Result<LayeredGrid<T>> {
        check_dimensions(width, height)?;
        let mut stack = Stack {
            width,
            height,
            default,
            layers: Arena::with_capacity(options.arena_capacity),
            options,
            stats: GridStats::default(),
        };
        let layer = stack.push(None, FxHashMap::default());
        return Ok(LayeredGrid { stack: Arc::new(Mutex::new(stack)), layer, width, height });
    }

    fn cell(&self, x: usize, y: usize) -> Result<u32> {
        return Ok(check_cell(x, y, self.width, self.height)? as u32);
    }

    /// A new handle on `layer`, built while the stack is already locked.
    fn share(&self, stack: &mut Stack<T>, layer: Id) -> LayeredGrid<T> {
        stack.layers[layer].owners += 1;
        return LayeredGrid { stack: self.stack.clone(), layer, width: self.width, height: self.height };
    }

    pub fn get(&self, x: usize, y: usize) -> Result<T> {
        let cell = self.cell(x, y)?;
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        return Ok(stack.lookup(self.layer, cell).clone());
    }

    /// A snapshot with one cell changed. Writing the current value returns
    /// this very snapshot.
    pub fn set(&self, x: usize, y: usize, value: T) -> Result<LayeredGrid<T>> {
        let cell = self.cell(x, y)?;
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        if *stack.lookup(self.layer, cell) == value {
            return Ok(self.share(&mut stack, self.layer));
        }
        let mut diff = FxHashMap::default();
        diff.insert(cell, value);
        let layer = stack.push(Some(self.layer), diff);
        return Ok(LayeredGrid { stack: self.stack.clone(), layer, width: self.width, height: self.height });
    }

    /// A snapshot with every `(x, y, value)` write applied, as one layer.
    /// Later writes to the same cell win; if nothing changes, returns this
    /// very snapshot. Every coordinate is checked before anything changes.
    pub fn set_many(
        &self,
        writes: impl IntoIterator<Item = (usize, usize, T)>,
    ) -> Result<LayeredGrid<T>> {
        let mut cells = Vec::new();
        for (x, y, value) in writes {
            cells.push((self.cell(x, y)?, value));
        }
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        let mut diff = FxHashMap::default();
        for (cell, value) in cells {
            if *stack.lookup(self.layer, cell) == value {
                diff.remove(&cell);
            } else {
                diff.insert(cell, value);
            }
        }
        if diff.is_empty() {
            return Ok(self.share(&mut stack, self.layer));
        }
        let layer = stack.push(Some(self.layer), diff);
        return Ok(LayeredGrid { stack: self.stack.clone(), layer, width: self.width, height: self.height });
    }

    /// A mutable grid starting from this snapshot.
    pub fn to_mutable(&self) -> LayeredGridMut<T> {
        let mut stack = self.stack.lock();
        let layer = stack.push(Some(self.layer), FxHashMap::default());
        return LayeredGridMut { stack: self.stack.clone(), layer, width: self.width, height: self.height };
    }

    /// Copy out every cell in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        return stack.materialize(self.layer);
    }

    /// Copy out the grid one row at a time.
    pub fn rows(&self) -> Vec<Vec<T>> {
        return self.to_vec().chunks(self.width).map(|row| row.to_vec()).collect();
    }
}

impl<T> LayeredGrid<T> {
    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    /// Merge pass-through layers below this snapshot now.
    pub fn compact(&self) {
        self.stack.lock().compact(self.layer);
    }

    /// Number of layers a lookup may have to visit from this snapshot.
    pub fn depth(&self) -> usize {
        return self.stack.lock().depth(self.layer);
    }

    pub fn stats(&self) -> GridStats {
        return self.stack.lock().stats();
    }

    /// True if both handles are the very same snapshot, not merely equal.
    pub fn same_version(&self, other: &LayeredGrid<T>) -> bool {
        return Arc::ptr_eq(&self.stack, &other.stack) && self.layer == other.layer;
    }

    /// True if both handles share a lineage.
    pub fn same_lineage(&self, other: &LayeredGrid<T>) -> bool {
        return Arc::ptr_eq(&self.stack, &other.stack);
    }
}

impl<T> Clone for LayeredGrid<T> {
    fn clone(&self) -> Self {
        self.stack.lock().layers[self.layer].owners += 1;
        return LayeredGrid {
            stack: self.stack.clone(),
            layer: self.layer,
            width: self.width,
            height: self.height,
        };
    }
}

impl<T> Drop for LayeredGrid<T> {
    fn drop(&mut self) {
        self.stack.lock().release(self.layer);
    }
}

impl<T> fmt::Debug for LayeredGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("LayeredGrid")
            .field("layer", &self.layer)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish();
    }
}

/// A grid that is edited in place through its own private top layer.
pub struct LayeredGridMut<T> {
    stack: Shared<T>,
    layer: Id,
    width: usize,
    height: usize,
}

impl<T: Clone + PartialEq> LayeredGridMut<T> {
    fn cell(&self, x: usize, y: usize) -> Result<u32> {
        return Ok(check_cell(x, y, self.width, self.height)? as u32);
    }

    pub fn get(&self, x: usize, y: usize) -> Result<T> {
        let cell = self.cell(x, y)?;
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        return Ok(stack.lookup(self.layer, cell).clone());
    }

    /// Write one cell in place. Writing the value already visible below this
    /// layer drops the entry instead of storing it.
    pub fn modify(&mut self, x: usize, y: usize, value: T) -> Result<()> {
        let cell = self.cell(x, y)?;
        let mut stack = self.stack.lock();
        let below = stack.layers[self.layer].below;
        let redundant = *stack.lookup_from(below, cell) == value;
        let layer = &mut stack.layers[self.layer];
        debug_assert!(layer.dependents.is_empty());
        if redundant {
            layer.diff.remove(&cell);
        } else {
            layer.diff.insert(cell, value);
        }
        return Ok(());
    }

    /// Snapshot the current contents. Later writes through this handle go
    /// to a fresh layer and do not affect the snapshot.
    pub fn freeze(&mut self) -> LayeredGrid<T> {
        let mut stack = self.stack.lock();
        let frozen = self.layer;
        // The mutable handle's ownership passes to the snapshot.
        self.layer = stack.push(Some(frozen), FxHashMap::default());
        return LayeredGrid { stack: self.stack.clone(), layer: frozen, width: self.width, height: self.height };
    }

    /// Snapshot the current contents, giving up the mutable handle.
    pub fn into_frozen(self) -> LayeredGrid<T> {
        self.stack.lock().layers[self.layer].owners += 1;
        return LayeredGrid {
            stack: self.stack.clone(),
            layer: self.layer,
            width: self.width,
            height: self.height,
        };
    }

    /// Discard unfrozen writes and continue from `snapshot` instead.
    pub fn revert_to(&mut self, snapshot: &LayeredGrid<T>) -> Result<()> {
        if !Arc::ptr_eq(&self.stack, &snapshot.stack) {
            return Err(Error::ForeignHandle);
        }
        let mut stack = self.stack.lock();
        let fresh = stack.push(Some(snapshot.layer), FxHashMap::default());
        let old = std::mem::replace(&mut self.layer, fresh);
        stack.release(old);
        return Ok(());
    }

    /// Copy out every cell in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut stack = self.stack.lock();
        stack.prepare(self.layer);
        return stack.materialize(self.layer);
    }
}

impl<T> LayeredGridMut<T> {
    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    /// Number of entries written into the private layer.
    pub fn pending(&self) -> usize {
        return self.stack.lock().layers[self.layer].diff.len();
    }

    pub fn depth(&self) -> usize {
        return self.stack.lock().depth(self.layer);
    }

    pub fn stats(&self) -> GridStats {
        return self.stack.lock().stats();
    }
}

impl<T> Drop for LayeredGridMut<T> {
    fn drop(&mut self) {
        self.stack.lock().release(self.layer);
    }
}

impl<T> fmt::Debug for LayeredGridMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("LayeredGridMut")
            .field("layer", &self.layer)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: usize, height: usize) -> LayeredGrid<u8> {
        return LayeredGrid::create(width, height, 0).unwrap();
    }

    #[test]
    fn scenario_four_by_four() {
        let g = blank(4, 4);
        let g2 = g.set(1, 1, 9).unwrap();
        let again = g2.set(1, 1, 9).unwrap();
        assert!(again.same_version(&g2));
        assert_eq!(g2.stats().live_layers, 2);
        assert_eq!(g.get(1, 1), Ok(0));
        assert_eq!(g2.get(1, 1), Ok(9));
        assert_eq!(g2.get(0, 0), Ok(0));
    }

    #[test]
    fn invalid_dimensions_and_cells() {
        assert_eq!(
            LayeredGrid::create(0, 3, 0u8).unwrap_err(),
            Error::InvalidDimensions { width: 0, height: 3 }
        );
        let g = blank(2, 2);
        assert!(g.get(2, 0).is_err());
        assert!(g.set(0, 2, 1).is_err());
        assert_eq!(g.stats().live_layers, 1);
    }

    #[test]
    fn set_many_is_one_layer() {
        let g = blank(3, 1);
        let h = g.set_many(vec![(0, 0, 1), (1, 0, 2), (1, 0, 0), (2, 0, 3)]).unwrap();
        assert_eq!(h.to_vec(), vec![1, 0, 3]);
        assert_eq!(h.depth(), 2);
        assert!(g.set_many(vec![(0, 0, 0)]).unwrap().same_version(&g));
        assert!(g.set_many(vec![(0, 0, 1), (9, 0, 1)]).is_err());
    }

    #[test]
    fn dropped_leaf_layers_are_reclaimed() {
        let g = blank(2, 2);
        let h = g.set(0, 0, 1).unwrap();
        assert_eq!(g.stats().live_layers, 2);
        drop(h);
        assert_eq!(g.stats().live_layers, 1);
        assert_eq!(g.stats().reclaimed, 1);
    }

    #[test]
    fn mutable_writes_do_not_reach_snapshots() {
        let g = blank(2, 2);
        let mut m = g.to_mutable();
        m.modify(0, 0, 5).unwrap();
        let frozen = m.freeze();
        m.modify(0, 0, 6).unwrap();
        m.modify(1, 1, 7).unwrap();
        assert_eq!(g.to_vec(), vec![0, 0, 0, 0]);
        assert_eq!(frozen.to_vec(), vec![5, 0, 0, 0]);
        assert_eq!(m.to_vec(), vec![6, 0, 0, 7]);
        assert_eq!(m.get(1, 1), Ok(7));
    }

    #[test]
    fn modify_back_to_the_value_below_drops_the_entry() {
        let g = blank(2, 2).set(1, 0, 3).unwrap();
        let mut m = g.to_mutable();
        m.modify(1, 0, 4).unwrap();
        assert_eq!(m.pending(), 1);
        m.modify(1, 0, 3).unwrap();
        assert_eq!(m.pending(), 0);
        assert_eq!(m.get(1, 0), Ok(3));
    }

    #[test]
    fn into_frozen_keeps_contents() {
        let mut m = blank(2, 1).to_mutable();
        m.modify(1, 0, 2).unwrap();
        let frozen = m.into_frozen();
        assert_eq!(frozen.to_vec(), vec![0, 2]);
    }

    #[test]
    fn revert_to_discards_pending_writes() {
        let g = blank(2, 1);
        let mut m = g.to_mutable();
        m.modify(0, 0, 1).unwrap();
        let checkpoint = m.freeze();
        m.modify(1, 0, 1).unwrap();
        m.revert_to(&checkpoint).unwrap();
        assert_eq!(m.to_vec(), vec![1, 0]);
        m.revert_to(&g).unwrap();
        assert_eq!(m.to_vec(), vec![0, 0]);

        let other = blank(2, 1);
        assert_eq!(m.revert_to(&other), Err(Error::ForeignHandle));
    }

    #[test]
    fn rows_split_by_width() {
        let g = blank(2, 2).set(1, 1, 4).unwrap();
        assert_eq!(g.rows(), vec![vec![0, 0], vec![0, 4]]);
        assert_eq!((g.width(), g.height()), (2, 2));
    }
}
