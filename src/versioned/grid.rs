//! Versioned dense grid over a delta chain.
//!
//! Unlike [`LayeredGrid`](crate::layered::LayeredGrid) this keeps a full
//! row-major buffer as the shared payload, so reads are direct indexing once
//! the lineage has been rebased. It suits per-pixel maps where most cells
//! hold distinct values.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::chain::ChainStats;
use crate::chain::Delta;
use crate::chain::Handle;
use crate::error::Result;
use crate::error::check_cell;
use crate::error::check_dimensions;
use crate::options::Options;

use super::Versioned;

/// A plain row-major grid, the payload of a [`VersionedGrid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridBuf<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> GridBuf<T> {
    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        return self.cells.get(y * self.width + x);
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> &[T] {
        return &self.cells;
    }

    pub fn into_cells(self) -> Vec<T> {
        return self.cells;
    }
}

/// An edit to a grid; cells are row-major indices.
#[derive(Clone, Debug, PartialEq)]
pub enum GridEdit<T> {
    Set { cell: usize, old: T, new: T },
    /// `(cell, old, new)` writes to distinct cells.
    Batch(Vec<(usize, T, T)>),
}

impl<T: Clone> Delta<GridBuf<T>> for GridEdit<T> {
    fn apply(&self, target: &mut GridBuf<T>) {
        match self {
            GridEdit::Set { cell, new, .. } => target.cells[*cell] = new.clone(),
            GridEdit::Batch(writes) => {
                for (cell, _, new) in writes {
                    target.cells[*cell] = new.clone();
                }
            }
        }
    }

    fn revert(&self, target: &mut GridBuf<T>) {
        match self {
            GridEdit::Set { cell, old, .. } => target.cells[*cell] = old.clone(),
            GridEdit::Batch(writes) => {
                for (cell, old, _) in writes.iter().rev() {
                    target.cells[*cell] = old.clone();
                }
            }
        }
    }
}

/// An immutable dense grid version sharing storage with its lineage.
#[derive(Clone)]
pub struct VersionedGrid<T> {
    handle: Handle<GridBuf<T>, GridEdit<T>>,
    width: usize,
    height: usize,
}

impl<T: Clone + PartialEq> VersionedGrid<T> {
    /// A `width` x `height` grid with every cell set to `fill`.
    pub fn new(width: usize, height: usize, fill: T) -> Result<VersionedGrid<T>> {
        return VersionedGrid::with_options(width, height, fill, Options::default());
    }

    pub fn with_options(
        width: usize,
        height: usize,
        fill: T,
        options: Options,
    ) -> Result<VersionedGrid<T>> {
        check_dimensions(width, height)?;
        let buf = GridBuf { width, height, cells: vec![fill; width * height] };
        return Ok(VersionedGrid { handle: Handle::root_with(buf, options), width, height });
    }

    fn wrap(&self, handle: Handle<GridBuf<T>, GridEdit<T>>) -> VersionedGrid<T> {
        return VersionedGrid { handle, width: self.width, height: self.height };
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn get(&self, x: usize, y: usize) -> Result<T> {
        let cell = check_cell(x, y, self.width, self.height)?;
        return Ok(self.handle.with(|buf| buf.cells[cell].clone()));
    }

    /// Overwrite one cell. Writing the current value returns `self`.
    pub fn set(&self, x: usize, y: usize, value: T) -> Result<VersionedGrid<T>> {
        let cell = check_cell(x, y, self.width, self.height)?;
        let handle = self.handle.derive_if(|buf| {
            let old = &buf.cells[cell];
            if *old == value {
                return None;
            }
            return Some(GridEdit::Set { cell, old: old.clone(), new: value });
        });
        return Ok(self.wrap(handle));
    }

    /// Apply many `(x, y, value)` writes as one version. Later writes to the
    /// same cell win. Every coordinate is checked before anything changes.
    pub fn set_many(
        &self,
        writes: impl IntoIterator<Item = (usize, usize, T)>,
    ) -> Result<VersionedGrid<T>> {
        let mut staged: FxHashMap<usize, T> = FxHashMap::default();
        for (x, y, value) in writes {
            staged.insert(check_cell(x, y, self.width, self.height)?, value);
        }
        let handle = self.handle.derive_if(|buf| {
            let batch: Vec<(usize, T, T)> = staged
                .into_iter()
                .filter(|(cell, value)| buf.cells[*cell] != *value)
                .map(|(cell, value)| (cell, buf.cells[cell].clone(), value))
                .collect();
            if batch.is_empty() {
                return None;
            }
            return Some(GridEdit::Batch(batch));
        });
        return Ok(self.wrap(handle));
    }

    /// Set every cell to `value`.
    pub fn fill(&self, value: T) -> VersionedGrid<T> {
        let handle = self.handle.derive_if(|buf| {
            let batch: Vec<(usize, T, T)> = buf
                .cells
                .iter()
                .enumerate()
                .filter(|(_, old)| **old != value)
                .map(|(cell, old)| (cell, old.clone(), value.clone()))
                .collect();
            if batch.is_empty() {
                return None;
            }
            return Some(GridEdit::Batch(batch));
        });
        return self.wrap(handle);
    }

    /// Copy out every cell in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        return self.handle.with(|buf| buf.cells.clone());
    }

    /// Copy out the grid one row at a time.
    pub fn rows(&self) -> Vec<Vec<T>> {
        let width = self.width;
        return self.handle.with(|buf| buf.cells.chunks(width).map(|row| row.to_vec()).collect());
    }

    /// A copy of the whole buffer.
    pub fn snapshot(&self) -> GridBuf<T> {
        return self.handle.read();
    }
}

impl<T: Clone + PartialEq> Versioned for VersionedGrid<T> {
    fn same_version(&self, other: &Self) -> bool {
        return self.handle.same_node(&other.handle);
    }

    fn stats(&self) -> ChainStats {
        return self.handle.stats();
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for VersionedGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.rows()).finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn set_and_get() {
        let grid = VersionedGrid::new(3, 2, 0u8).unwrap();
        let marked = grid.set(2, 1, 7).unwrap();
        assert_eq!(marked.get(2, 1), Ok(7));
        assert_eq!(grid.get(2, 1), Ok(0));
        assert_eq!(marked.rows(), vec![vec![0, 0, 0], vec![0, 0, 7]]);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let grid = VersionedGrid::new(2, 2, 0u8).unwrap();
        assert_eq!(
            grid.set(2, 0, 1).unwrap_err(),
            Error::CellOutOfBounds { x: 2, y: 0, width: 2, height: 2 }
        );
        assert!(grid.get(0, 2).is_err());
        assert!(VersionedGrid::new(0, 2, 0u8).is_err());
    }

    #[test]
    fn no_op_writes_are_identity() {
        let grid = VersionedGrid::new(2, 2, 5u8).unwrap();
        assert!(grid.set(1, 1, 5).unwrap().same_version(&grid));
        assert!(grid.fill(5).same_version(&grid));
        assert!(grid.set_many(vec![(0, 0, 5), (1, 0, 5)]).unwrap().same_version(&grid));
    }

    #[test]
    fn set_many_rejects_before_writing() {
        let grid = VersionedGrid::new(2, 2, 0u8).unwrap();
        assert!(grid.set_many(vec![(0, 0, 1), (9, 9, 1)]).is_err());
        assert_eq!(grid.stats().live_nodes, 1);
        assert_eq!(grid.to_vec(), vec![0; 4]);
    }

    #[test]
    fn set_many_repeated_cell_reverts_cleanly() {
        let grid = VersionedGrid::new(2, 1, 0u8).unwrap();
        let batch = grid.set_many(vec![(0, 0, 1), (0, 0, 2), (1, 0, 3), (0, 0, 0)]).unwrap();
        assert_eq!(batch.to_vec(), vec![0, 3]);
        assert_eq!(grid.to_vec(), vec![0, 0]);
        assert_eq!(batch.to_vec(), vec![0, 3]);
        let undone = grid.set_many(vec![(1, 0, 5), (1, 0, 0)]).unwrap();
        assert!(undone.same_version(&grid));
    }

    #[test]
    fn fill_then_read_back() {
        let grid = VersionedGrid::new(2, 2, 0u8).unwrap().set(0, 0, 4).unwrap();
        let filled = grid.fill(9);
        assert_eq!(filled.to_vec(), vec![9; 4]);
        assert_eq!(grid.to_vec(), vec![4, 0, 0, 0]);
        let snapshot = grid.snapshot();
        assert_eq!(snapshot.get(0, 0), Some(&4));
        assert_eq!(snapshot.get(2, 0), None);
        assert_eq!((snapshot.width(), snapshot.height()), (2, 2));
        assert_eq!(snapshot.cells(), &[4, 0, 0, 0]);
        assert_eq!(filled.snapshot().into_cells(), vec![9; 4]);
    }

    #[test]
    fn debug_prints_rows() {
        let grid = VersionedGrid::new(2, 2, 0u8).unwrap().set(1, 0, 3).unwrap();
        assert_eq!(format!("{:?}", grid), "[[0, 3], [0, 0]]");
    }
}
