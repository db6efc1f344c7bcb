//! B-tree over record ids
//!
//! Classic minimum-degree B-tree:
//! - every node except the root holds `t-1 ..= 2t-1` keys
//! - an internal node with `k` keys has exactly `k + 1` children
//! - all leaves sit at the same depth
//!
//! ```text
//!                 [ 4 | 8 ]
//!               /     |     \
//!         [1|2|3]  [5|6|7]  [9|10]
//! ```

use std::mem;

use crate::record::RecordId;

#[derive(Debug, Default)]
struct Node {
    keys: Vec<RecordId>,
    children: Vec<Node>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Existence index keyed on record id
#[derive(Debug)]
pub struct BTreeIndex {
    /// Minimum degree
    degree: usize,
    root: Node,
    len: usize,
}

impl BTreeIndex {
    /// Create an empty tree of minimum degree `degree` (clamped to at least 2)
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(2),
            root: Node::default(),
            len: 0,
        }
    }

    /// Build a tree by replaying `ids` in order
    pub fn rebuild<I>(degree: usize, ids: I) -> Self
    where
        I: IntoIterator<Item = RecordId>,
    {
        let mut tree = Self::new(degree);
        for id in ids {
            tree.insert(id);
        }
        tree
    }

    /// Whether `key` was ever inserted
    pub fn search(&self, key: RecordId) -> bool {
        let mut node = &self.root;
        loop {
            let i = node.keys.partition_point(|k| *k < key);
            if i < node.keys.len() && node.keys[i] == key {
                return true;
            }
            if node.is_leaf() {
                return false;
            }
            node = &node.children[i];
        }
    }

    /// Insert `key`; returns false if it was already present
    pub fn insert(&mut self, key: RecordId) -> bool {
        if self.search(key) {
            return false;
        }

        let max_keys = 2 * self.degree - 1;
        if self.root.keys.len() == max_keys {
            // Grow upward: the old root becomes the only child of a new root
            let old_root = mem::take(&mut self.root);
            self.root.children.push(old_root);
            Self::split_child(&mut self.root, 0, self.degree);
        }

        Self::insert_non_full(&mut self.root, key, self.degree);
        self.len += 1;
        true
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Levels from root to leaf (1 for a lone root)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<RecordId> {
        let mut out = Vec::with_capacity(self.len);
        Self::collect(&self.root, &mut out);
        out
    }

    /// Check every structural invariant of the tree
    pub fn is_well_formed(&self) -> bool {
        let mut leaf_depth = None;
        Self::check_node(&self.root, self.degree, true, None, None, 1, &mut leaf_depth)
            && self.keys().len() == self.len
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Split the full child `parent.children[i]` around its median
    ///
    /// The median moves up into `parent` at position `i`; the upper half of
    /// the child's keys (and children) becomes a new sibling at `i + 1`.
    fn split_child(parent: &mut Node, i: usize, t: usize) {
        let child = &mut parent.children[i];
        debug_assert_eq!(child.keys.len(), 2 * t - 1);

        let right_keys = child.keys.split_off(t);
        let median = child.keys.remove(t - 1);
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(t)
        };

        parent.keys.insert(i, median);
        parent.children.insert(
            i + 1,
            Node {
                keys: right_keys,
                children: right_children,
            },
        );
    }

    fn insert_non_full(node: &mut Node, key: RecordId, t: usize) {
        let mut i = node.keys.partition_point(|k| *k < key);

        if node.is_leaf() {
            node.keys.insert(i, key);
            return;
        }

        if node.children[i].keys.len() == 2 * t - 1 {
            Self::split_child(node, i, t);
            if key > node.keys[i] {
                i += 1;
            }
        }
        Self::insert_non_full(&mut node.children[i], key, t);
    }

    fn collect(node: &Node, out: &mut Vec<RecordId>) {
        if node.is_leaf() {
            out.extend_from_slice(&node.keys);
            return;
        }
        for (i, child) in node.children.iter().enumerate() {
            Self::collect(child, out);
            if let Some(key) = node.keys.get(i) {
                out.push(*key);
            }
        }
    }

    fn check_node(
        node: &Node,
        t: usize,
        is_root: bool,
        lower: Option<RecordId>,
        upper: Option<RecordId>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> bool {
        let n = node.keys.len();
        if n > 2 * t - 1 || (!is_root && n < t - 1) {
            return false;
        }
        if !node.keys.windows(2).all(|w| w[0] < w[1]) {
            return false;
        }
        if node.keys.iter().any(|k| {
            lower.map_or(false, |lo| *k <= lo) || upper.map_or(false, |hi| *k >= hi)
        }) {
            return false;
        }

        if node.is_leaf() {
            return match leaf_depth {
                Some(d) => *d == depth,
                None => {
                    *leaf_depth = Some(depth);
                    true
                }
            };
        }

        if node.children.len() != n + 1 {
            return false;
        }
        node.children.iter().enumerate().all(|(i, child)| {
            let lo = if i == 0 { lower } else { Some(node.keys[i - 1]) };
            let hi = if i == n { upper } else { Some(node.keys[i]) };
            Self::check_node(child, t, false, lo, hi, depth + 1, leaf_depth)
        })
    }
}
