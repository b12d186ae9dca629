//! Weak-classifier trees.
//!
//! A [`Tree`] is the immutable form a tree takes once the trainer has grown
//! it: a flat node vector with index-based children. Prediction descends
//! from the root applying each node's [`SplitTest`] to the sample's feature
//! value until it reaches a leaf.

// ============================================================================
// SplitTest
// ============================================================================

/// Decision applied at an internal node.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitTest {
    /// Ordered feature: go left when `value <= threshold`.
    Ordered { threshold: f32 },
    /// Categorical feature: go left when the category's bit is set in the
    /// subset.
    Categorical { subset: Vec<u32> },
}

impl SplitTest {
    /// Which way a feature value sends a sample.
    #[inline]
    pub fn goes_left(&self, value: f32) -> bool {
        match self {
            SplitTest::Ordered { threshold } => value <= *threshold,
            SplitTest::Categorical { subset } => {
                let cat = value as i64;
                if cat < 0 {
                    return false;
                }
                let cat = cat as usize;
                subset
                    .get(cat >> 5)
                    .is_some_and(|word| (word >> (cat & 31)) & 1 == 1)
            }
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

/// One node of a [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Internal node with two children.
    Split {
        var: u32,
        test: SplitTest,
        left: u32,
        right: u32,
    },
    /// Leaf carrying the weak-classifier output.
    Leaf { value: f64 },
}

/// An immutable decision tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) root: u32,
}

impl Tree {
    /// Build a tree from its node vector and root index.
    ///
    /// # Panics
    ///
    /// Panics if `root` is out of range.
    pub(crate) fn new(nodes: Vec<TreeNode>, root: u32) -> Self {
        assert!((root as usize) < nodes.len(), "root index out of range");
        Self { nodes, root }
    }

    /// Number of nodes, internal and leaf.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Root node index.
    pub(crate) fn root(&self) -> u32 {
        self.root
    }

    /// Node accessor for the serializer.
    pub(crate) fn node(&self, id: u32) -> &TreeNode {
        &self.nodes[id as usize]
    }

    /// Descend the tree, resolving feature values through `value_of`, and
    /// return the leaf value reached.
    pub fn predict<F>(&self, mut value_of: F) -> f64
    where
        F: FnMut(u32) -> f32,
    {
        let mut id = self.root;
        loop {
            match &self.nodes[id as usize] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    var, test, left, right,
                } => {
                    id = if test.goes_left(value_of(*var)) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Scale every leaf value by `factor` (Discrete AdaBoost rescales the
    /// vote of a tree by the log-odds of its weighted error).
    pub(crate) fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf { value } = node {
                *value *= factor;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
