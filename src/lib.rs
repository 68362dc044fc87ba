//! Lineage - persistent versioned containers with shared storage.
//!
//! Every container here is a *handle* on one immutable version. Editing a
//! handle returns a new handle and leaves the old one observing exactly what
//! it observed before, while all versions of a lineage share storage instead
//! of copying it.
//!
//! Two engines do the work:
//!
//! - [`chain`] keeps one live payload and a tree of reversible edits. Reads
//!   move the payload to the version being read, so access near recent
//!   versions is cheap. [`versioned`] wraps it as a list, set, map and dense
//!   grid.
//! - [`layered`] stacks sparse diff layers over a default value, merging
//!   layers nobody can observe any more.
//!
//! # Quick Start
//!
//! ```
//! use lineage::versioned::VersionedVec;
//! use lineage::layered::LayeredGrid;
//!
//! let root = VersionedVec::from_vec(vec![1, 2, 3]);
//! let next = root.push(4);
//! assert_eq!(root.to_vec(), vec![1, 2, 3]);
//! assert_eq!(next.to_vec(), vec![1, 2, 3, 4]);
//!
//! let blank = LayeredGrid::create(8, 8, 0u8).unwrap();
//! let dot = blank.set(3, 4, 255).unwrap();
//! assert_eq!(dot.get(3, 4), Ok(255));
//! assert_eq!(blank.get(3, 4), Ok(0));
//! ```
//!
//! All handles are `Send + Sync` when their contents are `Send`; each lineage
//! is guarded by its own lock, and separate lineages never contend.

mod arena;
pub mod chain;
pub mod error;
#[cfg(feature = "oracle")]
pub mod fuzz;
pub mod layered;
pub mod options;
pub mod versioned;

pub use error::Error;
pub use error::Result;
pub use options::Options;
