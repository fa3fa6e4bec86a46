//! Joint-ownership reachability resolver.
//!
//! Computes which keys are strongly held, starting from one known-strong root.
//! An edge propagates strength to its child only once *every* member of its
//! owner set is strong (AND); a child becomes strong through *any* satisfied
//! edge (OR). The result is the least fixpoint, computed in one FIFO pass
//! that tolerates cycles.
//!
//! The tracker knows nothing about objects, maps or weak references. It is
//! generic over the key type `K` and the edge id type `E`, and reports every
//! satisfied edge through a caller-supplied callback.
//!
//! ## Algorithm
//!
//! 1. Seed the queue with the root and mark it resolved
//! 2. Pop a key; for each strong edge it co-owns that has not fired yet,
//!    check whether all owners are resolved
//!    - If so: fire the edge (callback), resolve and enqueue the child if new
//!    - If not: leave it pending; another owner will re-check it later
//! 3. Repeat until the queue is empty
//!
//! Each key enters the queue at most once and each edge is examined at most
//! once per owner, so the pass is `O(E * k)` for owner sets of size `k`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Misuse of the tracker outside its define-then-resolve protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// An edge was defined after resolution ran.
    #[error("cannot define edges after resolution")]
    DefinitionAfterResolution,
    /// Resolution was requested twice.
    #[error("resolution already ran")]
    AlreadyResolved,
    /// An edge was defined with no owners.
    #[error("edge has an empty owner set")]
    EmptyOwnerSet,
}

/// One edge as reported to the resolution callback.
#[derive(Debug)]
pub struct SatisfiedEdge<'a, K, E> {
    /// Child made (or confirmed) strong by this edge.
    pub child: &'a K,
    /// The owner set, all members resolved.
    pub owners: &'a [K],
    /// Caller's edge id.
    pub edge: &'a E,
    /// True the first time `child` becomes strong.
    pub newly_resolved: bool,
}

#[derive(Debug, Clone)]
struct TrackedEdge<K, E> {
    child: K,
    owners: Vec<K>,
    edge: E,
    fired: bool,
}

/// Summary of a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Keys resolved, root included.
    pub resolved_keys: usize,
    /// Edges whose owner sets were satisfied.
    pub satisfied_edges: usize,
    /// Strong edges that never fired.
    pub pending_edges: usize,
}

/// Strong-ownership tracker over keys `K` and edge ids `E`.
#[derive(Debug, Clone)]
pub struct OwnershipTracker<K, E> {
    edges: Vec<TrackedEdge<K, E>>,
    /// Owner key -> indexes into `edges`.
    by_owner: HashMap<K, Vec<usize>>,
    resolved: HashSet<K>,
    weak_edges: usize,
    ran: bool,
}

impl<K: Clone + Eq + Hash, E> Default for OwnershipTracker<K, E> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            by_owner: HashMap::new(),
            resolved: HashSet::new(),
            weak_edges: 0,
            ran: false,
        }
    }
}

impl<K: Clone + Eq + Hash, E> OwnershipTracker<K, E> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge.
    ///
    /// Weak edges are counted but never indexed: they can not propagate
    /// strength. Duplicate owners are collapsed.
    pub fn define_edge(
        &mut self,
        child: K,
        owners: impl IntoIterator<Item = K>,
        edge: E,
        is_strong_reference: bool,
    ) -> Result<(), OwnershipError> {
        if self.ran {
            return Err(OwnershipError::DefinitionAfterResolution);
        }

        let mut unique: Vec<K> = Vec::new();
        for owner in owners {
            if !unique.contains(&owner) {
                unique.push(owner);
            }
        }
        if unique.is_empty() {
            return Err(OwnershipError::EmptyOwnerSet);
        }

        if !is_strong_reference {
            self.weak_edges += 1;
            return Ok(());
        }

        let index = self.edges.len();
        for owner in &unique {
            self.by_owner.entry(owner.clone()).or_default().push(index);
        }
        self.edges.push(TrackedEdge {
            child,
            owners: unique,
            edge,
            fired: false,
        });
        Ok(())
    }

    /// Run the fixpoint from `root`, reporting each satisfied edge.
    ///
    /// `on_enqueue` sees every key as it enters the work queue, root first.
    pub fn resolve<F, Q>(
        &mut self,
        root: K,
        mut on_satisfied: F,
        mut on_enqueue: Q,
    ) -> Result<ResolutionStats, OwnershipError>
    where
        F: FnMut(SatisfiedEdge<'_, K, E>),
        Q: FnMut(&K),
    {
        if self.ran {
            return Err(OwnershipError::AlreadyResolved);
        }
        self.ran = true;

        let mut satisfied = 0usize;
        let mut queue: VecDeque<K> = VecDeque::new();
        on_enqueue(&root);
        self.resolved.insert(root.clone());
        queue.push_back(root);

        while let Some(key) = queue.pop_front() {
            let Some(indexes) = self.by_owner.get(&key) else {
                continue;
            };
            for &index in indexes {
                let tracked = &mut self.edges[index];
                if tracked.fired {
                    continue;
                }
                if !tracked.owners.iter().all(|o| self.resolved.contains(o)) {
                    continue;
                }
                tracked.fired = true;
                satisfied += 1;

                let newly_resolved = self.resolved.insert(tracked.child.clone());
                on_satisfied(SatisfiedEdge {
                    child: &tracked.child,
                    owners: &tracked.owners,
                    edge: &tracked.edge,
                    newly_resolved,
                });
                if newly_resolved {
                    on_enqueue(&tracked.child);
                    queue.push_back(tracked.child.clone());
                }
            }
        }

        Ok(ResolutionStats {
            resolved_keys: self.resolved.len(),
            satisfied_edges: satisfied,
            pending_edges: self.edges.len() - satisfied,
        })
    }

    /// Whether `key` was resolved strong. False before resolution.
    pub fn is_resolved(&self, key: &K) -> bool {
        self.resolved.contains(key)
    }

    /// Whether resolution has run.
    pub fn has_run(&self) -> bool {
        self.ran
    }

    /// Number of strong edges registered.
    pub fn strong_edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of weak edges registered.
    pub fn weak_edge_count(&self) -> usize {
        self.weak_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolve_all(tracker: &mut OwnershipTracker<&'static str, u32>, root: &'static str) -> Vec<u32> {
        let mut fired = Vec::new();
        tracker
            .resolve(root, |e| fired.push(*e.edge), |_| {})
            .unwrap();
        fired
    }

    #[test]
    fn test_single_owner_chain() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("a", ["root"], 1, true).unwrap();
        tracker.define_edge("b", ["a"], 2, true).unwrap();

        let fired = resolve_all(&mut tracker, "root");
        assert_eq!(fired, vec![1, 2]);
        assert!(tracker.is_resolved(&"a"));
        assert!(tracker.is_resolved(&"b"));
    }

    #[test]
    fn test_weak_edge_does_not_propagate() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("a", ["root"], 1, false).unwrap();

        let fired = resolve_all(&mut tracker, "root");
        assert!(fired.is_empty());
        assert!(!tracker.is_resolved(&"a"));
        assert_eq!(tracker.weak_edge_count(), 1);
    }

    #[test]
    fn test_joint_owners_require_all() {
        // value is held only if both map and key are strong
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("map", ["root"], 1, true).unwrap();
        tracker.define_edge("value", ["map", "key"], 2, true).unwrap();

        resolve_all(&mut tracker, "root");
        assert!(tracker.is_resolved(&"map"));
        assert!(!tracker.is_resolved(&"key"));
        assert!(!tracker.is_resolved(&"value"));
    }

    #[test]
    fn test_joint_owner_resolved_later() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("value", ["map", "key"], 3, true).unwrap();
        tracker.define_edge("map", ["root"], 1, true).unwrap();
        tracker.define_edge("mid", ["root"], 4, true).unwrap();
        tracker.define_edge("key", ["mid"], 2, true).unwrap();

        let fired = resolve_all(&mut tracker, "root");
        assert!(tracker.is_resolved(&"value"));
        assert_eq!(fired.iter().filter(|&&e| e == 3).count(), 1);
    }

    #[test]
    fn test_every_satisfied_edge_is_reported() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("a", ["root"], 1, true).unwrap();
        tracker.define_edge("b", ["root"], 2, true).unwrap();
        tracker.define_edge("c", ["a"], 3, true).unwrap();
        tracker.define_edge("c", ["b"], 4, true).unwrap();

        let mut reports = Vec::new();
        tracker
            .resolve("root", |e| reports.push((*e.edge, e.newly_resolved)), |_| {})
            .unwrap();

        assert!(reports.contains(&(3, true)));
        assert!(reports.contains(&(4, false)));
    }

    #[test]
    fn test_edge_fires_once_when_owners_resolve_together() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("a", ["root"], 1, true).unwrap();
        tracker.define_edge("b", ["root"], 2, true).unwrap();
        tracker.define_edge("c", ["a", "b"], 3, true).unwrap();

        let fired = resolve_all(&mut tracker, "root");
        assert_eq!(fired.iter().filter(|&&e| e == 3).count(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut tracker = OwnershipTracker::new();
        tracker.define_edge("a", ["root"], 1, true).unwrap();
        tracker.define_edge("b", ["a"], 2, true).unwrap();
        tracker.define_edge("a", ["b"], 3, true).unwrap();
        tracker.define_edge("root", ["b"], 4, true).unwrap();

        let mut enqueued = Vec::new();
        let stats = tracker
            .resolve("root", |_| {}, |k| enqueued.push(*k))
            .unwrap();
        assert_eq!(enqueued, vec!["root", "a", "b"]);
        assert_eq!(stats.resolved_keys, 3);
        assert_eq!(stats.satisfied_edges, 4);
        assert_eq!(stats.pending_edges, 0);
    }

    #[test]
    fn test_unreachable_cycle_stays_pending() {
        let mut tracker: OwnershipTracker<&str, u32> = OwnershipTracker::new();
        tracker.define_edge("a", ["b"], 1, true).unwrap();
        tracker.define_edge("b", ["a"], 2, true).unwrap();

        let stats = tracker.resolve("root", |_| {}, |_| {}).unwrap();
        assert!(!tracker.is_resolved(&"a"));
        assert_eq!(stats.pending_edges, 2);
    }

    #[test]
    fn test_protocol_misuse() {
        let mut tracker: OwnershipTracker<&str, u32> = OwnershipTracker::new();
        assert_eq!(
            tracker.define_edge("a", [], 1, true),
            Err(OwnershipError::EmptyOwnerSet)
        );
        tracker.resolve("root", |_| {}, |_| {}).unwrap();
        assert!(tracker.has_run());
        assert_eq!(
            tracker.define_edge("a", ["root"], 1, true),
            Err(OwnershipError::DefinitionAfterResolution)
        );
        assert_eq!(
            tracker.resolve("root", |_| {}, |_| {}).unwrap_err(),
            OwnershipError::AlreadyResolved
        );
    }

    /// Naive oracle: iterate every edge until nothing changes.
    fn naive_fixpoint(edges: &[(usize, Vec<usize>, bool)]) -> HashSet<usize> {
        let mut strong: HashSet<usize> = HashSet::from([0]);
        loop {
            let mut changed = false;
            for (child, owners, is_strong) in edges {
                if *is_strong && owners.iter().all(|o| strong.contains(o)) && strong.insert(*child) {
                    changed = true;
                }
            }
            if !changed {
                return strong;
            }
        }
    }

    fn edge_strategy() -> impl Strategy<Value = Vec<(usize, Vec<usize>, bool)>> {
        prop::collection::vec(
            (0usize..12, prop::collection::vec(0usize..12, 1..=2), any::<bool>()),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn prop_matches_naive_fixpoint(edges in edge_strategy()) {
            let mut tracker = OwnershipTracker::new();
            for (i, (child, owners, strong)) in edges.iter().enumerate() {
                tracker.define_edge(*child, owners.iter().copied(), i, *strong).unwrap();
            }
            tracker.resolve(0, |_| {}, |_| {}).unwrap();

            let expected = naive_fixpoint(&edges);
            for key in 0..12usize {
                prop_assert_eq!(tracker.is_resolved(&key), expected.contains(&key));
            }
        }

        #[test]
        fn prop_adding_strong_edges_is_monotone(edges in edge_strategy(), extra in edge_strategy()) {
            let mut base = OwnershipTracker::new();
            let mut grown = OwnershipTracker::new();
            for (i, (child, owners, strong)) in edges.iter().enumerate() {
                base.define_edge(*child, owners.iter().copied(), i, *strong).unwrap();
                grown.define_edge(*child, owners.iter().copied(), i, *strong).unwrap();
            }
            for (i, (child, owners, strong)) in extra.iter().enumerate() {
                grown.define_edge(*child, owners.iter().copied(), edges.len() + i, *strong).unwrap();
            }
            base.resolve(0, |_| {}, |_| {}).unwrap();
            grown.resolve(0, |_| {}, |_| {}).unwrap();

            for key in 0..12usize {
                if base.is_resolved(&key) {
                    prop_assert!(grown.is_resolved(&key));
                }
            }
        }
    }
}
