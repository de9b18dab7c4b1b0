//! Append-only Poseidon Merkle accumulator for payment commitments.
//!
//! Fixed-depth binary tree, leaves appended in insertion order. Internal
//! nodes are computed lazily and cached in a `(level, index)` map; an
//! insertion invalidates only the cached ancestors of the new leaf.
//! Subtrees entirely beyond the populated range resolve to precomputed
//! zero-subtree hashes, so empty regions are never materialized.
//!
//! The root is a pure function of the ordered leaf sequence and the depth:
//! rebuilding the tree from an exported state always reproduces the same
//! root, which is what lets roots be compared across process boundaries.
//!
//! The accumulator itself is not synchronized. Mutation and reads go
//! through `&mut self` (the lazy cache fills on read); callers wrap the
//! whole structure in a single mutex, which is the concurrency discipline
//! the issuer and verifier use.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;

use super::field::{field_to_string, parse_field_str};
use super::poseidon::PoseidonHasher;

/// Default tree depth (2^20 = ~1 million leaves).
pub const TREE_DEPTH: usize = 20;

/// Largest depth the accumulator accepts at construction.
pub const MAX_DEPTH: usize = 32;

#[derive(Error, Debug)]
pub enum MerkleError {
    #[error("tree is full: capacity of {0} leaves exhausted")]
    TreeFull(u64),
    #[error("invalid leaf index: {index} (leaf count {count})")]
    InvalidLeafIndex { index: u64, count: u64 },
    #[error("invalid tree depth: {0} (must be 1..={MAX_DEPTH})")]
    InvalidDepth(usize),
    #[error("invalid accumulator state: {0}")]
    InvalidState(String),
}

/// Authentication path for a leaf: sibling hashes from leaf level to the
/// root, with direction bits (`false` = current node is the left child).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub siblings: Vec<Fr>,
    pub indices: Vec<bool>,
    pub leaf_index: u64,
}

impl MerklePath {
    /// Recompute the root from `leaf` and compare to `expected_root`.
    ///
    /// Pure function over its inputs; usable without a live tree.
    pub fn verify(&self, hasher: &PoseidonHasher, leaf: &Fr, expected_root: &Fr) -> bool {
        if self.siblings.len() != self.indices.len() || self.siblings.is_empty() {
            return false;
        }

        let mut current = *leaf;

        for (sibling, &is_right) in self.siblings.iter().zip(self.indices.iter()) {
            current = if is_right {
                hasher.hash2(sibling, &current)
            } else {
                hasher.hash2(&current, sibling)
            };
        }

        current == *expected_root
    }
}

/// Standalone path check, equivalent to [`MerklePath::verify`].
pub fn verify_merkle_path(
    hasher: &PoseidonHasher,
    leaf: &Fr,
    path: &MerklePath,
    root: &Fr,
) -> bool {
    path.verify(hasher, leaf, root)
}

/// Exported accumulator state, the only serialization format the core
/// defines for its own persistence boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatorState {
    pub depth: usize,
    /// Ordered `(index, decimal leaf value)` pairs.
    pub leaves: Vec<(u64, String)>,
    pub next_index: u64,
}

/// Append-only Merkle accumulator with a lazy node cache.
pub struct MerkleAccumulator {
    depth: usize,
    leaves: Vec<Fr>,
    /// Cache of materialized internal nodes, keyed by `(level, index)`
    /// with level 1 just above the leaves and level `depth` the root.
    nodes: HashMap<(usize, u64), Fr>,
    /// zeros[k] is the hash of an all-empty subtree of height k.
    zeros: Vec<Fr>,
    /// Most recent roots, newest last; length bounded by `root_window`.
    root_log: VecDeque<Fr>,
    root_window: usize,
    hasher: Arc<PoseidonHasher>,
}

impl MerkleAccumulator {
    /// Create an empty accumulator of the default depth with the strict
    /// single-root freshness window.
    pub fn new(hasher: Arc<PoseidonHasher>) -> Self {
        // TREE_DEPTH is within 1..=MAX_DEPTH, so this cannot fail.
        Self::with_depth(hasher, TREE_DEPTH).unwrap_or_else(|_| unreachable!())
    }

    /// Create an empty accumulator of the given depth.
    pub fn with_depth(hasher: Arc<PoseidonHasher>, depth: usize) -> Result<Self, MerkleError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(MerkleError::InvalidDepth(depth));
        }

        // zeros[0] = 0 (the empty leaf), zeros[k+1] = hash2(zeros[k], zeros[k])
        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(Fr::from(0u64));
        for k in 0..depth {
            let z = hasher.hash2(&zeros[k], &zeros[k]);
            zeros.push(z);
        }

        let mut root_log = VecDeque::new();
        root_log.push_back(zeros[depth]);

        Ok(Self {
            depth,
            leaves: Vec::new(),
            nodes: HashMap::new(),
            zeros,
            root_log,
            root_window: 1,
            hasher,
        })
    }

    /// Widen the set of roots `is_known_root` accepts to the last `window`
    /// roots (minimum 1). The default of 1 means only the current root
    /// verifies.
    pub fn with_root_window(mut self, window: usize) -> Self {
        self.root_window = window.max(1);
        while self.root_log.len() > self.root_window {
            self.root_log.pop_front();
        }
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root_window(&self) -> usize {
        self.root_window
    }

    /// Maximum number of leaves (2^depth).
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Number of inserted leaves, which is also the next free index.
    pub fn leaf_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.leaves.get(index as usize).copied()
    }

    /// Zero-subtree hash at the given height.
    pub fn zero_hash(&self, level: usize) -> Option<Fr> {
        self.zeros.get(level).copied()
    }

    /// Append a leaf, returning its index.
    ///
    /// Invalidates exactly the cached ancestor chain of the new leaf; all
    /// other cached nodes stay valid. A full tree is a fatal capacity
    /// error for this instance.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, MerkleError> {
        if self.leaf_count() >= self.capacity() {
            return Err(MerkleError::TreeFull(self.capacity()));
        }

        let leaf_index = self.leaf_count();
        self.leaves.push(leaf);

        let mut index = leaf_index;
        for level in 1..=self.depth {
            index >>= 1;
            self.nodes.remove(&(level, index));
        }

        let root = self.root();
        self.root_log.push_back(root);
        while self.root_log.len() > self.root_window {
            self.root_log.pop_front();
        }

        Ok(leaf_index)
    }

    /// Current root. Recomputes only nodes whose cache entries were
    /// invalidated since the last call.
    pub fn root(&mut self) -> Fr {
        self.node(self.depth, 0)
    }

    /// Whether `root` is acceptable under the freshness policy: the
    /// current root, or one of the last `root_window` roots.
    pub fn is_known_root(&mut self, root: &Fr) -> bool {
        if *root == self.root() {
            return true;
        }
        self.root_log.iter().any(|r| r == root)
    }

    /// Authentication path for the leaf at `index`.
    pub fn proof(&mut self, index: u64) -> Result<MerklePath, MerkleError> {
        if index >= self.leaf_count() {
            return Err(MerkleError::InvalidLeafIndex {
                index,
                count: self.leaf_count(),
            });
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut indices = Vec::with_capacity(self.depth);

        let mut current = index;
        for level in 0..self.depth {
            let sibling = current ^ 1;
            siblings.push(self.node(level, sibling));
            indices.push(current & 1 == 1);
            current >>= 1;
        }

        Ok(MerklePath {
            siblings,
            indices,
            leaf_index: index,
        })
    }

    /// Resolve the node at `(level, index)`, filling the cache on the way.
    fn node(&mut self, level: usize, index: u64) -> Fr {
        if level == 0 {
            return self
                .leaves
                .get(index as usize)
                .copied()
                .unwrap_or(self.zeros[0]);
        }

        if let Some(value) = self.nodes.get(&(level, index)) {
            return *value;
        }

        // A subtree whose first leaf lies beyond the populated range is
        // all-empty and collapses to the zero hash for its height.
        let first_leaf = index << level;
        if first_leaf >= self.leaf_count() {
            return self.zeros[level];
        }

        let left = self.node(level - 1, index << 1);
        let right = self.node(level - 1, (index << 1) | 1);
        let value = self.hasher.hash2(&left, &right);
        self.nodes.insert((level, index), value);
        value
    }

    /// Snapshot of `{depth, ordered leaves, next_index}`.
    pub fn export_state(&self) -> AccumulatorState {
        AccumulatorState {
            depth: self.depth,
            leaves: self
                .leaves
                .iter()
                .enumerate()
                .map(|(i, leaf)| (i as u64, field_to_string(leaf)))
                .collect(),
            next_index: self.leaf_count(),
        }
    }

    /// Reconstruct an accumulator from an exported state.
    ///
    /// The leaf list must be contiguous from index 0 and consistent with
    /// `next_index`; every leaf must parse as an in-range field element.
    pub fn import_state(
        hasher: Arc<PoseidonHasher>,
        state: &AccumulatorState,
    ) -> Result<Self, MerkleError> {
        let mut tree = Self::with_depth(hasher, state.depth)?;

        if state.next_index != state.leaves.len() as u64 {
            return Err(MerkleError::InvalidState(format!(
                "next_index {} does not match leaf count {}",
                state.next_index,
                state.leaves.len()
            )));
        }
        if state.next_index > tree.capacity() {
            return Err(MerkleError::InvalidState(format!(
                "{} leaves exceed capacity {} at depth {}",
                state.next_index,
                tree.capacity(),
                state.depth
            )));
        }

        for (position, (index, encoded)) in state.leaves.iter().enumerate() {
            if *index != position as u64 {
                return Err(MerkleError::InvalidState(format!(
                    "leaf indices not contiguous: expected {position}, found {index}"
                )));
            }
            let leaf = parse_field_str(encoded).map_err(|e| {
                MerkleError::InvalidState(format!("leaf {index}: {e}"))
            })?;
            tree.leaves.push(leaf);
        }

        let root = tree.root();
        tree.root_log.clear();
        tree.root_log.push_back(root);

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use rand::rngs::OsRng;

    fn hasher() -> Arc<PoseidonHasher> {
        Arc::new(PoseidonHasher::new())
    }

    fn small_tree(depth: usize) -> MerkleAccumulator {
        MerkleAccumulator::with_depth(hasher(), depth).unwrap()
    }

    #[test]
    fn test_empty_tree_root_is_zero_hash() {
        let mut tree = small_tree(4);
        let expected = tree.zero_hash(4).unwrap();
        assert_eq!(tree.root(), expected);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_invalid_depth_rejected() {
        assert!(MerkleAccumulator::with_depth(hasher(), 0).is_err());
        assert!(MerkleAccumulator::with_depth(hasher(), MAX_DEPTH + 1).is_err());
    }

    #[test]
    fn test_insert_monotonic_indices() {
        let mut tree = small_tree(4);
        for expected in 0..5u64 {
            let index = tree.insert(Fr::from(expected + 100)).unwrap();
            assert_eq!(index, expected);
            assert_eq!(tree.leaf_count(), expected + 1);
        }
    }

    #[test]
    fn test_deterministic_root_across_instances() {
        let mut tree1 = small_tree(4);
        let mut tree2 = small_tree(4);

        for leaf in [1u64, 2, 3] {
            tree1.insert(Fr::from(leaf)).unwrap();
            tree2.insert(Fr::from(leaf)).unwrap();
        }

        assert_eq!(tree1.root(), tree2.root());
        // Recomputation is stable too.
        assert_eq!(tree1.root(), tree1.root());
    }

    #[test]
    fn test_different_leaves_different_roots() {
        let mut tree1 = small_tree(4);
        let mut tree2 = small_tree(4);

        tree1.insert(Fr::from(1u64)).unwrap();
        tree2.insert(Fr::from(2u64)).unwrap();

        assert_ne!(tree1.root(), tree2.root());
    }

    #[test]
    fn test_proof_round_trip_all_indices() {
        let h = hasher();
        let mut tree = MerkleAccumulator::with_depth(h.clone(), 5).unwrap();

        for i in 0..12u64 {
            tree.insert(Fr::from(i * 31 + 7)).unwrap();
        }

        let root = tree.root();
        for i in 0..12u64 {
            let path = tree.proof(i).unwrap();
            let leaf = tree.leaf(i).unwrap();
            assert!(path.verify(&h, &leaf, &root), "index {i}");
            assert_eq!(path.leaf_index, i);
            assert_eq!(path.siblings.len(), 5);
        }
    }

    #[test]
    fn test_proofs_stay_valid_as_tree_grows() {
        // An earlier leaf must still prove against the root taken after
        // later appends, with a freshly generated path.
        let h = hasher();
        let mut tree = MerkleAccumulator::with_depth(h.clone(), 6).unwrap();

        tree.insert(Fr::from(41u64)).unwrap();
        for i in 0..9u64 {
            tree.insert(Fr::from(1000 + i)).unwrap();
        }

        let root = tree.root();
        let path = tree.proof(0).unwrap();
        assert!(path.verify(&h, &Fr::from(41u64), &root));
    }

    #[test]
    fn test_tamper_sensitivity() {
        let h = hasher();
        let mut tree = MerkleAccumulator::with_depth(h.clone(), 5).unwrap();
        for i in 0..8u64 {
            tree.insert(Fr::from(i + 1)).unwrap();
        }

        let root = tree.root();
        let leaf = tree.leaf(3).unwrap();
        let path = tree.proof(3).unwrap();
        assert!(path.verify(&h, &leaf, &root));

        // Wrong leaf
        assert!(!path.verify(&h, &Fr::from(999u64), &root));

        // Wrong root
        assert!(!path.verify(&h, &leaf, &Fr::rand(&mut OsRng)));

        // Any mutated sibling
        for i in 0..path.siblings.len() {
            let mut bad = path.clone();
            bad.siblings[i] += Fr::from(1u64);
            assert!(!bad.verify(&h, &leaf, &root), "sibling {i}");
        }

        // Any flipped direction bit
        for i in 0..path.indices.len() {
            let mut bad = path.clone();
            bad.indices[i] = !bad.indices[i];
            assert!(!bad.verify(&h, &leaf, &root), "index bit {i}");
        }
    }

    #[test]
    fn test_path_shape_mismatch_rejected() {
        let h = hasher();
        let mut tree = MerkleAccumulator::with_depth(h.clone(), 4).unwrap();
        tree.insert(Fr::from(5u64)).unwrap();

        let root = tree.root();
        let leaf = tree.leaf(0).unwrap();
        let mut path = tree.proof(0).unwrap();
        path.siblings.pop();
        assert!(!path.verify(&h, &leaf, &root));
    }

    #[test]
    fn test_proof_out_of_range() {
        let mut tree = small_tree(4);
        tree.insert(Fr::from(1u64)).unwrap();
        assert!(matches!(
            tree.proof(1),
            Err(MerkleError::InvalidLeafIndex { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_capacity_exhaustion_is_distinct() {
        let mut tree = small_tree(2); // capacity 4
        for i in 0..4u64 {
            tree.insert(Fr::from(i)).unwrap();
        }
        assert!(matches!(tree.insert(Fr::from(9u64)), Err(MerkleError::TreeFull(4))));
        // No mutation on failure
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_cache_invalidation_yields_fresh_roots() {
        // Read the root between inserts so the cache is populated, then
        // make sure later inserts actually change it.
        let mut tree = small_tree(6);
        let mut roots = Vec::new();
        for i in 0..10u64 {
            tree.insert(Fr::from(i + 1)).unwrap();
            roots.push(tree.root());
        }
        for pair in roots.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_root_window_policy() {
        let mut tree = small_tree(4).with_root_window(3);

        tree.insert(Fr::from(1u64)).unwrap();
        let root_a = tree.root();
        tree.insert(Fr::from(2u64)).unwrap();
        let root_b = tree.root();

        assert!(tree.is_known_root(&root_b));
        assert!(tree.is_known_root(&root_a)); // still inside the window

        // Strict default: only the current root is known.
        let mut strict = small_tree(4);
        strict.insert(Fr::from(1u64)).unwrap();
        let old = strict.root();
        strict.insert(Fr::from(2u64)).unwrap();
        assert!(!strict.is_known_root(&old));
        let current = strict.root();
        assert!(strict.is_known_root(&current));
    }

    #[test]
    fn test_export_import_round_trip() {
        let h = hasher();
        let mut tree = MerkleAccumulator::with_depth(h.clone(), 6).unwrap();
        for i in 0..7u64 {
            tree.insert(Fr::from(i * 17 + 3)).unwrap();
        }
        let root = tree.root();

        let state = tree.export_state();
        assert_eq!(state.depth, 6);
        assert_eq!(state.next_index, 7);

        let mut restored = MerkleAccumulator::import_state(h, &state).unwrap();
        assert_eq!(restored.root(), root);
        assert_eq!(restored.leaf_count(), 7);
    }

    #[test]
    fn test_import_rejects_inconsistent_state() {
        let h = hasher();

        let mut gap = AccumulatorState {
            depth: 4,
            leaves: vec![(0, "1".to_string()), (2, "2".to_string())],
            next_index: 2,
        };
        assert!(MerkleAccumulator::import_state(h.clone(), &gap).is_err());

        gap.leaves = vec![(0, "1".to_string())];
        assert!(MerkleAccumulator::import_state(h.clone(), &gap).is_err());

        let bad_leaf = AccumulatorState {
            depth: 4,
            leaves: vec![(0, "not-a-number".to_string())],
            next_index: 1,
        };
        assert!(MerkleAccumulator::import_state(h, &bad_leaf).is_err());
    }

    #[test]
    fn test_export_state_serializes() {
        let mut tree = small_tree(4);
        tree.insert(Fr::from(11u64)).unwrap();

        let json = serde_json::to_string(&tree.export_state()).unwrap();
        assert!(json.contains("\"nextIndex\":1"));
        let back: AccumulatorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.next_index, 1);
    }
}
