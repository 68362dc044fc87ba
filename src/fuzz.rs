//! Differential fuzzing against full-copy containers.
//!
//! Input bytes decode into a stream of [`FuzzOp`]s that are replayed on a
//! pool of [`VersionedVec`] versions, a pool of [`LayeredGrid`] snapshots
//! and one [`LayeredGridMut`], while the same operations run on the
//! containers in `naive`. Any divergence panics, which is what the fuzzer
//! looks for.
//!
//! Shared by the `fuzz_chain` and `repro_crash` binaries.

use naive::NaiveGrid;
use naive::NaiveVec;

use crate::layered::LayeredGrid;
use crate::layered::LayeredGridMut;
use crate::options::Options;
use crate::versioned::Versioned;
use crate::versioned::VersionedVec;

pub const GRID_WIDTH: usize = 5;
pub const GRID_HEIGHT: usize = 4;

/// One fuzzer step. `pick` bytes select a pool member modulo the pool size.
#[derive(Debug, Clone, Copy)]
pub enum FuzzOp {
    Push { pick: u8, value: u8 },
    Insert { pick: u8, index: u8, value: u8 },
    Remove { pick: u8, index: u8 },
    Set { pick: u8, index: u8, value: u8 },
    DropVersion { pick: u8 },
    ReadVersion { pick: u8 },
    GridSet { pick: u8, x: u8, y: u8, value: u8 },
    GridModify { x: u8, y: u8, value: u8 },
    GridFreeze,
    GridRevert { pick: u8 },
    GridDrop { pick: u8 },
    GridCompact { pick: u8 },
}

impl FuzzOp {
    pub fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        let (&tag, rest) = bytes.split_first()?;
        let (op, used) = match tag % 12 {
            0 if rest.len() >= 2 => (FuzzOp::Push { pick: rest[0], value: rest[1] }, 2),
            1 if rest.len() >= 3 => {
                (FuzzOp::Insert { pick: rest[0], index: rest[1], value: rest[2] }, 3)
            }
            2 if rest.len() >= 2 => (FuzzOp::Remove { pick: rest[0], index: rest[1] }, 2),
            3 if rest.len() >= 3 => {
                (FuzzOp::Set { pick: rest[0], index: rest[1], value: rest[2] % 4 }, 3)
            }
            4 if !rest.is_empty() => (FuzzOp::DropVersion { pick: rest[0] }, 1),
            5 if !rest.is_empty() => (FuzzOp::ReadVersion { pick: rest[0] }, 1),
            6 if rest.len() >= 4 => {
                let op = FuzzOp::GridSet { pick: rest[0], x: rest[1], y: rest[2], value: rest[3] % 4 };
                (op, 4)
            }
            7 if rest.len() >= 3 => {
                (FuzzOp::GridModify { x: rest[0], y: rest[1], value: rest[2] % 4 }, 3)
            }
            8 => (FuzzOp::GridFreeze, 0),
            9 if !rest.is_empty() => (FuzzOp::GridRevert { pick: rest[0] }, 1),
            10 if !rest.is_empty() => (FuzzOp::GridDrop { pick: rest[0] }, 1),
            11 if !rest.is_empty() => (FuzzOp::GridCompact { pick: rest[0] }, 1),
            _ => return None,
        };
        return Some((op, &rest[used..]));
    }
}

/// Everything one replay keeps alive, next to its full-copy twin.
pub struct Replay {
    versions: Vec<(VersionedVec<u8>, NaiveVec<u8>)>,
    grids: Vec<(LayeredGrid<u8>, NaiveGrid<u8>)>,
    editor: LayeredGridMut<u8>,
    draft: NaiveGrid<u8>,
}

fn slot(pick: u8, len: usize) -> usize {
    return pick as usize % len;
}

impl Replay {
    pub fn new(compact_on_read: bool) -> Replay {
        let options = Options { compact_on_read, long_rebase: 8, ..Options::default() };
        let root = LayeredGrid::with_options(GRID_WIDTH, GRID_HEIGHT, 0u8, options.clone())
            .unwrap_or_else(|e| panic!("fixed grid dimensions rejected: {e}"));
        let editor = root.to_mutable();
        let blank = NaiveGrid::new(GRID_WIDTH, GRID_HEIGHT, 0u8);
        return Replay {
            versions: vec![(VersionedVec::with_options(Vec::new(), options), NaiveVec::default())],
            grids: vec![(root, blank.clone())],
            editor,
            draft: blank,
        };
    }

    pub fn apply(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::Push { pick, value } => {
                let (base, copy) = &self.versions[slot(pick, self.versions.len())];
                let pair = (base.push(value), copy.push(value));
                self.versions.push(pair);
            }
            FuzzOp::Insert { pick, index, value } => {
                let (base, copy) = &self.versions[slot(pick, self.versions.len())];
                let index = index as usize % (copy.len() + 2);
                let result = base.insert(index, value);
                let expected = copy.insert(index, value);
                assert_eq!(result.is_ok(), expected.is_some(), "insert at {index} disagrees");
                if let (Ok(next), Some(expected)) = (result, expected) {
                    self.versions.push((next, expected));
                }
            }
            FuzzOp::Remove { pick, index } => {
                let (base, copy) = &self.versions[slot(pick, self.versions.len())];
                let index = index as usize % (copy.len() + 1);
                let result = base.remove(index);
                let expected = copy.remove(index);
                assert_eq!(result.is_ok(), expected.is_some(), "remove at {index} disagrees");
                if let (Ok(next), Some(expected)) = (result, expected) {
                    self.versions.push((next, expected));
                }
            }
            FuzzOp::Set { pick, index, value } => {
                let (base, copy) = &self.versions[slot(pick, self.versions.len())];
                let index = index as usize % (copy.len() + 1);
                let result = base.set(index, value);
                let expected = copy.set(index, value);
                assert_eq!(result.is_ok(), expected.is_some(), "set at {index} disagrees");
                if let (Ok(next), Some(expected)) = (result, expected) {
                    assert_eq!(next.same_version(base), expected == *copy, "no-op identity");
                    self.versions.push((next, expected));
                }
            }
            FuzzOp::DropVersion { pick } => {
                if self.versions.len() > 1 {
                    let index = slot(pick, self.versions.len());
                    self.versions.swap_remove(index);
                }
            }
            FuzzOp::ReadVersion { pick } => {
                let (version, copy) = &self.versions[slot(pick, self.versions.len())];
                assert_eq!(version.to_vec(), copy.to_vec());
            }
            FuzzOp::GridSet { pick, x, y, value } => {
                let (base, copy) = &self.grids[slot(pick, self.grids.len())];
                let (x, y) = (x as usize % (GRID_WIDTH + 1), y as usize % GRID_HEIGHT);
                let result = base.set(x, y, value);
                let expected = copy.set(x, y, value);
                assert_eq!(result.is_ok(), expected.is_some(), "grid set at ({x}, {y}) disagrees");
                if let (Ok(next), Some(expected)) = (result, expected) {
                    self.grids.push((next, expected));
                }
            }
            FuzzOp::GridModify { x, y, value } => {
                let (x, y) = (x as usize % GRID_WIDTH, y as usize % GRID_HEIGHT);
                if self.editor.modify(x, y, value).is_ok() {
                    if let Some(next) = self.draft.set(x, y, value) {
                        self.draft = next;
                    }
                }
            }
            FuzzOp::GridFreeze => {
                let frozen = self.editor.freeze();
                self.grids.push((frozen, self.draft.clone()));
            }
            FuzzOp::GridRevert { pick } => {
                let (snapshot, copy) = &self.grids[slot(pick, self.grids.len())];
                if self.editor.revert_to(snapshot).is_ok() {
                    self.draft = copy.clone();
                }
            }
            FuzzOp::GridDrop { pick } => {
                if self.grids.len() > 1 {
                    let index = slot(pick, self.grids.len());
                    self.grids.swap_remove(index);
                }
            }
            FuzzOp::GridCompact { pick } => {
                let (grid, copy) = &self.grids[slot(pick, self.grids.len())];
                grid.compact();
                assert_eq!(grid.to_vec(), copy.to_vec());
            }
        }
    }

    /// Compare every live version and snapshot with its copy.
    pub fn check(&self) {
        for (i, (version, copy)) in self.versions.iter().enumerate() {
            assert_eq!(version.to_vec(), copy.to_vec(), "version {i} diverged");
        }
        for (i, (grid, copy)) in self.grids.iter().enumerate() {
            assert_eq!(grid.to_vec(), copy.to_vec(), "grid snapshot {i} diverged");
        }
        assert_eq!(self.editor.to_vec(), self.draft.to_vec(), "mutable grid diverged");
    }

    pub fn versions(&self) -> usize {
        return self.versions.len();
    }

    pub fn snapshots(&self) -> usize {
        return self.grids.len();
    }
}

/// Decode and replay `data`, calling `observe` before each step. The low
/// bit of the first byte chooses whether reads compact.
pub fn run(data: &[u8], mut observe: impl FnMut(usize, &FuzzOp)) {
    let Some((&mode, mut remaining)) = data.split_first() else {
        return;
    };
    let mut replay = Replay::new(mode & 1 == 0);
    let mut step = 0;
    while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
        remaining = rest;
        observe(step, &op);
        replay.apply(op);
        step += 1;
    }
    replay.check();
}
