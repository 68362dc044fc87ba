//! Collection-shaped wrappers over delta chains.
//!
//! Each wrapper holds one [`Handle`](crate::chain::Handle) and translates
//! collection operations into typed edits whose `apply`/`revert` halves are
//! exact inverses. Every operation returns a new wrapper value and leaves
//! the receiver unchanged. When an operation would not change anything the
//! receiver's own version is returned and no node is created, which keeps
//! chains short under repeated idempotent calls.
//!
//! Reads that expose elements (`to_vec`, `iter`, `entries`, ...) copy them
//! out first, so later edits on the lineage can never show through an
//! iteration already in progress.

pub mod grid;
pub mod map;
pub mod set;
pub mod vec;

pub use grid::GridBuf;
pub use grid::GridEdit;
pub use grid::VersionedGrid;
pub use map::MapEdit;
pub use map::VersionedMap;
pub use set::SetEdit;
pub use set::VersionedSet;
pub use vec::VecEdit;
pub use vec::VersionedVec;

use crate::chain::ChainStats;

/// Behavior shared by every versioned container.
pub trait Versioned {
    /// True if both values are the very same version, not merely equal.
    fn same_version(&self, other: &Self) -> bool;

    /// Counters for the lineage this version belongs to.
    fn stats(&self) -> ChainStats;
}
