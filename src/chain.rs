//! Delta chains: many snapshots over one mutable payload.
//!
//! A lineage stores a single live payload `M` and a tree of nodes. Exactly
//! one node, the owner, is the node whose value the payload currently holds.
//! Every other node is linked to a successor by an edit `D: Delta<M>` and a
//! direction saying which half of the edit turns this node's value into the
//! successor's. Following links always ends at the owner.
//!
//! Reading a node rebases the lineage: the path from the node to the owner
//! is walked backwards, each link's inverse is applied to the payload, and
//! each link is flipped to point at the node being read. Ownership moves to
//! the reader, so repeated reads near the same version cost nothing.
//!
//! # Edit contract
//!
//! `apply` and `revert` must be exact inverses, total, and must not panic.
//! Nothing checks this at runtime. A broken pair does not fail the call that
//! introduced it; it silently corrupts the values seen through sibling
//! handles once a rebase walks across it.
//!
//! # Example
//!
//! ```
//! use lineage::chain::{FnDelta, Handle};
//!
//! let root: Handle<Vec<i32>, _> = Handle::root(vec![1, 2, 3]);
//! let pushed = root.derive(FnDelta::new(|v: &mut Vec<i32>| v.push(4), |v: &mut Vec<i32>| {
//!     v.pop();
//! }));
//! assert_eq!(pushed.read(), vec![1, 2, 3, 4]);
//! assert_eq!(root.read(), vec![1, 2, 3]);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::arena::Id;
use crate::options::Options;

/// A reversible in-place edit.
pub trait Delta<M> {
    /// Turn the value before the edit into the value after it.
    fn apply(&self, target: &mut M);

    /// Turn the value after the edit back into the value before it.
    fn revert(&self, target: &mut M);
}

impl<M, D: Delta<M> + ?Sized> Delta<M> for Box<D> {
    fn apply(&self, target: &mut M) {
        (**self).apply(target);
    }

    fn revert(&self, target: &mut M) {
        (**self).revert(target);
    }
}

impl<M, D: Delta<M> + ?Sized> Delta<M> for Arc<D> {
    fn apply(&self, target: &mut M) {
        (**self).apply(target);
    }

    fn revert(&self, target: &mut M) {
        (**self).revert(target);
    }
}

/// An edit built from a pair of closures.
#[derive(Clone)]
pub struct FnDelta<A, R> {
    apply: A,
    revert: R,
}

impl<A, R> FnDelta<A, R> {
    /// Pair a forward edit with its inverse.
    pub fn new(apply: A, revert: R) -> FnDelta<A, R> {
        return FnDelta { apply, revert };
    }

    /// The same edit pointing the other way.
    pub fn inverse(self) -> FnDelta<R, A> {
        return FnDelta { apply: self.revert, revert: self.apply };
    }
}

impl<M, A: Fn(&mut M), R: Fn(&mut M)> Delta<M> for FnDelta<A, R> {
    fn apply(&self, target: &mut M) {
        (self.apply)(target);
    }

    fn revert(&self, target: &mut M) {
        (self.revert)(target);
    }
}

/// Which half of a link's edit produces the successor's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    /// `value(next) = apply(value(self))`
    Forward,
    /// `value(next) = revert(value(self))`
    Backward,
}

impl Direction {
    fn flip(self) -> Direction {
        match self {
            Direction::Forward => return Direction::Backward,
            Direction::Backward => return Direction::Forward,
        }
    }
}

struct Link<D> {
    next: Id,
    delta: D,
    direction: Direction,
}

struct Node<D> {
    /// `None` exactly when this node is the owner.
    link: Option<Link<D>>,
    /// External handles pointing here.
    handles: u32,
    /// Nodes whose link points here.
    dependents: u32,
}

/// Counters describing one lineage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Nodes currently allocated.
    pub live_nodes: usize,
    /// Arena slots freed and awaiting reuse.
    pub free_slots: usize,
    /// Rebases that moved ownership.
    pub rebases: u64,
    /// Links walked by all rebases.
    pub steps_walked: u64,
    /// Nodes reclaimed so far.
    pub reclaimed: u64,
}

struct Lineage<M, D> {
    payload: M,
    owner: Id,
    nodes: Arena<Node<D>>,
    options: Options,
    stats: ChainStats,
}

impl<M, D: Delta<M>> Lineage<M, D> {
    /// Move ownership of the payload to `target`.
    fn rebase(&mut self, target: Id) {
        if target == self.owner {
            return;
        }

        let mut path: SmallVec<[Id; 8]> = SmallVec::new();
        let mut cursor = target;
        loop {
            path.push(cursor);
            match &self.nodes[cursor].link {
                Some(link) => cursor = link.next,
                None => break,
            }
        }
        debug_assert_eq!(cursor, self.owner);

        // Walk back from the owner, undoing one link per step and pointing
        // that link at the node we came from.
        let steps = path.len() - 1;
        for i in (0..steps).rev() {
            let from = path[i];
            let to = path[i + 1];
            let Some(link) = self.nodes[from].link.take() else {
                unreachable!("rebase path broken at {:?}", from);
            };
            match link.direction {
                Direction::Forward => link.delta.revert(&mut self.payload),
                Direction::Backward => link.delta.apply(&mut self.payload),
            }
            self.nodes[to].link = Some(Link {
                next: from,
                delta: link.delta,
                direction: link.direction.flip(),
            });
        }

        // Reversing the path only changes dependent counts at its ends.
        let old_owner = self.owner;
        self.nodes[target].dependents += 1;
        self.nodes[old_owner].dependents -= 1;
        self.owner = target;

        self.stats.rebases += 1;
        self.stats.steps_walked += steps as u64;
        if steps > self.options.long_rebase {
            tracing::debug!(steps, "long rebase");
        }

        self.release(old_owner);
    }

    /// Apply `delta` on top of `source` and return the new owner.
    fn push(&mut self, source: Id, delta: D) -> Id {
        self.rebase(source);
        delta.apply(&mut self.payload);
        let next = self.nodes.insert(Node { link: None, handles: 1, dependents: 1 });
        self.nodes[source].link = Some(Link { next, delta, direction: Direction::Forward });
        self.owner = next;
        tracing::trace!(from = ?source, to = ?next, "derived");
        return next;
    }

    fn stats(&self) -> ChainStats {
        return ChainStats {
            live_nodes: self.nodes.len(),
            free_slots: self.nodes.free_slots(),
            ..self.stats
        };
    }
}

/// A reference to one immutable version in a delta chain.
///
/// Handles are cheap to clone and may be sent between threads. All handles
/// of a lineage share one lock.
pub struct Handle<M, D> {
    lineage: Arc<Mutex<Lineage<M, D>>>,
    id: Id,
}

impl<M, D: Delta<M>> Handle<M, D> {
    /// Start a new lineage holding `value`.
    pub fn root(value: M) -> Handle<M, D> {
        return Handle::root_with(value, Options::default());
    }

    /// Start a new lineage with explicit options.
    pub fn root_with(value: M, options: Options) -> Handle<M, D> {
        let mut nodes = Arena::with_capacity(options.arena_capacity);
        let id = nodes.insert(Node { link: None, handles: 1, dependents: 0 });
        let lineage = Lineage {
            payload: value,
            owner: id,
            nodes,
            options,
            stats: ChainStats::default(),
        };
        return Handle { lineage: Arc::new(Mutex::new(lineage)), id };
    }

    /// Create a successor version by applying `delta` to this one.
    ///
    /// `delta` must be an exact inverse pair (see the module docs).
    pub fn derive(&self, delta: D) -> Handle<M, D> {
        let mut lineage = self.lineage.lock();
        let id = lineage.push(self.id, delta);
        drop(lineage);
        return Handle { lineage: self.lineage.clone(), id };
    }

    /// Compute an edit from this version's value and derive from it, all
    /// under one lock acquisition.
    ///
    /// `build` returns `Ok(None)` when the edit would change nothing; this
    /// handle is then returned as is and no node is created. An error from
    /// `build` is returned before anything is modified.
    pub fn derive_with<E>(
        &self,
        build: impl FnOnce(&M) -> Result<Option<D>, E>,
    ) -> Result<Handle<M, D>, E> {
        let mut lineage = self.lineage.lock();
        lineage.rebase(self.id);
        let id = match build(&lineage.payload)? {
            Some(delta) => lineage.push(self.id, delta),
            None => {
                lineage.nodes[self.id].handles += 1;
                self.id
            }
        };
        drop(lineage);
        return Ok(Handle { lineage: self.lineage.clone(), id });
    }

    /// Like [`derive_with`](Handle::derive_with) for edits that cannot be
    /// rejected.
    pub fn derive_if(&self, build: impl FnOnce(&M) -> Option<D>) -> Handle<M, D> {
        let Ok(handle) = self.derive_with(|value| Ok::<_, Infallible>(build(value)));
        return handle;
    }

    /// Run `f` against this version's value.
    ///
    /// The lineage stays locked while `f` runs. `f` must not touch other
    /// handles of the same lineage.
    pub fn with<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        let mut lineage = self.lineage.lock();
        lineage.rebase(self.id);
        return f(&lineage.payload);
    }

    /// Number of links between this version and the current owner.
    pub fn distance_to_owner(&self) -> usize {
        let lineage = self.lineage.lock();
        let mut steps = 0;
        let mut cursor = self.id;
        while let Some(link) = &lineage.nodes[cursor].link {
            cursor = link.next;
            steps += 1;
        }
        return steps;
    }

    /// Counters for the whole lineage.
    pub fn stats(&self) -> ChainStats {
        return self.lineage.lock().stats();
    }
}

impl<M: Clone, D: Delta<M>> Handle<M, D> {
    /// A copy of this version's value.
    pub fn read(&self) -> M {
        return self.with(M::clone);
    }
}

impl<M, D> Handle<M, D> {
    /// True if both handles name the very same version.
    pub fn same_node(&self, other: &Handle<M, D>) -> bool {
        return Arc::ptr_eq(&self.lineage, &other.lineage) && self.id == other.id;
    }

    /// True if both handles belong to the same lineage.
    pub fn same_lineage(&self, other: &Handle<M, D>) -> bool {
        return Arc::ptr_eq(&self.lineage, &other.lineage);
    }
}

impl<M, D> Clone for Handle<M, D> {
    fn clone(&self) -> Self {
        self.lineage.lock().nodes[self.id].handles += 1;
        return Handle { lineage: self.lineage.clone(), id: self.id };
    }
}

impl<M, D> Drop for Handle<M, D> {
    fn drop(&mut self) {
        let mut lineage = self.lineage.lock();
        lineage.nodes[self.id].handles -= 1;
        lineage.release(self.id);
    }
}

impl<M, D> Lineage<M, D> {
    /// Free `id` and everything only it kept alive.
    fn release(&mut self, mut id: Id) {
        loop {
            let node = &self.nodes[id];
            if node.handles > 0 || node.dependents > 0 || id == self.owner {
                return;
            }
            let node = self.nodes.remove(id);
            let Some(link) = node.link else {
                unreachable!("non-owner node {:?} has no link", id);
            };
            self.stats.reclaimed += 1;
            tracing::trace!(node = ?id, "reclaimed");
            id = link.next;
            self.nodes[id].dependents -= 1;
        }
    }
}

impl<M, D> fmt::Debug for Handle<M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_struct("Handle").field("id", &self.id).finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds a constant to an integer.
    struct Add(i64);

    impl Delta<i64> for Add {
        fn apply(&self, target: &mut i64) {
            *target += self.0;
        }

        fn revert(&self, target: &mut i64) {
            *target -= self.0;
        }
    }

    /// Pushes onto a vector.
    struct Push(i32);

    impl Delta<Vec<i32>> for Push {
        fn apply(&self, target: &mut Vec<i32>) {
            target.push(self.0);
        }

        fn revert(&self, target: &mut Vec<i32>) {
            target.pop();
        }
    }

    #[test]
    fn root_reads_its_value() {
        let root: Handle<i64, Add> = Handle::root(7);
        assert_eq!(root.read(), 7);
        assert_eq!(root.stats().live_nodes, 1);
    }

    #[test]
    fn derive_leaves_source_unchanged() {
        let root: Handle<i64, Add> = Handle::root(0);
        let one = root.derive(Add(1));
        let three = one.derive(Add(2));
        assert_eq!(three.read(), 3);
        assert_eq!(one.read(), 1);
        assert_eq!(root.read(), 0);
        assert_eq!(three.read(), 3);
    }

    #[test]
    fn reading_moves_ownership() {
        let root: Handle<i64, Add> = Handle::root(0);
        let a = root.derive(Add(1));
        let b = a.derive(Add(1));
        assert_eq!(root.distance_to_owner(), 2);
        assert_eq!(b.distance_to_owner(), 0);
        root.read();
        assert_eq!(root.distance_to_owner(), 0);
        assert_eq!(b.distance_to_owner(), 2);
        assert_eq!(a.distance_to_owner(), 1);
    }

    #[test]
    fn repeated_reads_do_not_walk() {
        let root: Handle<i64, Add> = Handle::root(0);
        let mut last = root.clone();
        for _ in 0..10 {
            last = last.derive(Add(1));
        }
        root.read();
        let walked = root.stats().steps_walked;
        for _ in 0..5 {
            assert_eq!(root.read(), 0);
        }
        assert_eq!(root.stats().steps_walked, walked);
    }

    #[test]
    fn branches_see_their_own_edits() {
        let root: Handle<Vec<i32>, Push> = Handle::root(vec![1]);
        let left = root.derive(Push(2));
        let right = root.derive(Push(3));
        let left_deeper = left.derive(Push(4));
        assert_eq!(right.read(), vec![1, 3]);
        assert_eq!(left_deeper.read(), vec![1, 2, 4]);
        assert_eq!(left.read(), vec![1, 2]);
        assert_eq!(root.read(), vec![1]);
        assert_eq!(right.read(), vec![1, 3]);
    }

    #[test]
    fn round_trip_returns_to_source_value() {
        let root: Handle<Vec<i32>, FnDelta<fn(&mut Vec<i32>), fn(&mut Vec<i32>)>> =
            Handle::root(vec![5]);
        let forward = FnDelta::new(
            (|v: &mut Vec<i32>| v.insert(0, 9)) as fn(&mut Vec<i32>),
            (|v: &mut Vec<i32>| {
                v.remove(0);
            }) as fn(&mut Vec<i32>),
        );
        let there = root.derive(forward.clone());
        let back = there.derive(forward.inverse());
        assert_eq!(there.read(), vec![9, 5]);
        assert_eq!(back.read(), root.read());
    }

    #[test]
    fn derive_with_none_returns_same_node() {
        let root: Handle<i64, Add> = Handle::root(4);
        let same = root
            .derive_with(|_| Ok::<_, ()>(None))
            .unwrap();
        assert!(same.same_node(&root));
        assert_eq!(root.stats().live_nodes, 1);
    }

    #[test]
    fn derive_with_error_changes_nothing() {
        let root: Handle<i64, Add> = Handle::root(4);
        let result = root.derive_with(|value| if *value > 0 { Err("positive") } else { Ok(None) });
        assert_eq!(result.unwrap_err(), "positive");
        assert_eq!(root.stats().live_nodes, 1);
        assert_eq!(root.read(), 4);
    }

    #[test]
    fn dropping_a_leaf_reclaims_it() {
        let root: Handle<i64, Add> = Handle::root(0);
        let child = root.derive(Add(1));
        assert_eq!(root.stats().live_nodes, 2);
        // The child owns the payload, so it stays until ownership moves.
        drop(child);
        assert_eq!(root.stats().live_nodes, 2);
        assert_eq!(root.read(), 0);
        assert_eq!(root.stats().live_nodes, 1);
        assert_eq!(root.stats().reclaimed, 1);
    }

    #[test]
    fn dropping_an_interior_node_keeps_the_path() {
        let root: Handle<i64, Add> = Handle::root(0);
        let middle = root.derive(Add(1));
        let tip = middle.derive(Add(1));
        drop(middle);
        // Still needed: root links through it to the owner.
        assert_eq!(root.stats().live_nodes, 3);
        assert_eq!(root.read(), 0);
        assert_eq!(tip.read(), 2);
        drop(root);
        // Once root is gone nothing depends on the middle node any more.
        assert_eq!(tip.stats().live_nodes, 1);
        assert_eq!(tip.read(), 2);
    }

    #[test]
    fn dead_history_is_reclaimed_in_one_cascade() {
        let root: Handle<i64, Add> = Handle::root(0);
        let mut tip = root.clone();
        for _ in 0..20 {
            tip = tip.derive(Add(1));
        }
        assert_eq!(tip.stats().live_nodes, 21);
        drop(root);
        assert_eq!(tip.stats().live_nodes, 1);
        assert_eq!(tip.read(), 20);
    }

    #[test]
    fn clones_share_a_node() {
        let root: Handle<i64, Add> = Handle::root(0);
        let copy = root.clone();
        assert!(copy.same_node(&root));
        let child = root.derive(Add(2));
        assert!(child.same_lineage(&root));
        assert!(!child.same_node(&root));
        drop(root);
        assert_eq!(copy.read(), 0);
        assert_eq!(child.read(), 2);
    }

    #[test]
    fn long_rebase_threshold_is_respected() {
        let options = Options { long_rebase: 1, ..Options::default() };
        let root: Handle<i64, Add> = Handle::root_with(0, options);
        let mut tip = root.clone();
        for _ in 0..4 {
            tip = tip.derive(Add(1));
        }
        assert_eq!(root.read(), 0);
        assert_eq!(root.stats().steps_walked, 4);
        assert_eq!(tip.read(), 4);
    }

    #[test]
    fn boxed_deltas_mix_edit_kinds() {
        let root: Handle<i64, Box<dyn Delta<i64> + Send>> = Handle::root(1);
        let added = root.derive(Box::new(Add(4)));
        let doubled = added.derive(Box::new(FnDelta::new(
            |v: &mut i64| *v *= 2,
            |v: &mut i64| *v /= 2,
        )));
        assert_eq!(doubled.read(), 10);
        assert_eq!(added.read(), 5);
        assert_eq!(root.read(), 1);
    }
}
