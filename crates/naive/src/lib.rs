//! Full-copy persistent containers.
//!
//! Every edit here clones the whole collection into a fresh `Arc`. That is
//! the obvious way to get immutable snapshots, and the cost `lineage` exists
//! to avoid. The crate is used two ways:
//!
//! - As an oracle: property tests and the fuzz harness replay the same
//!   operations against both crates and compare every snapshot.
//! - As a baseline: benchmarks report `lineage` timings next to these.
//!
//! | Type | Mirrors |
//! |------|---------|
//! | `NaiveVec` | `lineage::versioned::VersionedVec` |
//! | `NaiveSet` | `lineage::versioned::VersionedSet` |
//! | `NaiveMap` | `lineage::versioned::VersionedMap` |
//! | `NaiveGrid` | `lineage::versioned::VersionedGrid`, `lineage::layered::LayeredGrid` |
//!
//! Out-of-range arguments return `None` instead of an error type.
//!
//! # Example
//!
//! ```
//! use naive::NaiveVec;
//!
//! let root = NaiveVec::from_vec(vec![1, 2, 3]);
//! let next = root.push(4);
//! assert_eq!(root.to_vec(), vec![1, 2, 3]);
//! assert_eq!(next.to_vec(), vec![1, 2, 3, 4]);
//! ```

pub mod collections;
pub mod grid;

pub use collections::NaiveMap;
pub use collections::NaiveSet;
pub use collections::NaiveVec;
pub use grid::NaiveGrid;
