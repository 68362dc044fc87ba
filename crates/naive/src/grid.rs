//! Copy-on-every-edit dense grid.

use std::sync::Arc;

/// A dense row-major grid snapshot. Each write copies every cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NaiveGrid<T> {
    width: usize,
    height: usize,
    cells: Arc<Vec<T>>,
}

impl<T: Clone> NaiveGrid<T> {
    pub fn new(width: usize, height: usize, fill: T) -> NaiveGrid<T> {
        return NaiveGrid { width, height, cells: Arc::new(vec![fill; width * height]) };
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        return Some(self.cells[y * self.width + x].clone());
    }

    pub fn set(&self, x: usize, y: usize, value: T) -> Option<NaiveGrid<T>> {
        return self.set_many([(x, y, value)]);
    }

    /// Apply writes in order; `None` if any coordinate is outside the grid.
    pub fn set_many(&self, writes: impl IntoIterator<Item = (usize, usize, T)>) -> Option<NaiveGrid<T>> {
        let mut cells = (*self.cells).clone();
        for (x, y, value) in writes {
            if x >= self.width || y >= self.height {
                return None;
            }
            cells[y * self.width + x] = value;
        }
        return Some(NaiveGrid { width: self.width, height: self.height, cells: Arc::new(cells) });
    }

    pub fn fill(&self, value: T) -> NaiveGrid<T> {
        return NaiveGrid::new(self.width, self.height, value);
    }

    pub fn to_vec(&self) -> Vec<T> {
        return (*self.cells).clone();
    }
}
