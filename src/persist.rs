//! Stage document persistence.
//!
//! A trained stage serializes to a named-node document:
//!
//! ```text
//! boost: {
//!   weakCount: int
//!   stageThreshold: float
//!   weakClassifiers: [ { internalNodes: [...], leafValues: [...] }, ... ]
//! }
//! ```
//!
//! `internalNodes` is a flat stream, one record per internal node in BFS
//! order: left ref, right ref, feature index, then the split payload (one
//! threshold for ordered stages, `ceil(max_cat_count / 32)` subset words
//! for categorical stages). A positive ref is a 1-based index into the
//! internal-node stream; a non-positive ref is the negated 0-based index
//! into `leafValues`, which lists leaves in the order the BFS emits them.
//!
//! Schema types are kept separate from the runtime types so the document
//! format can evolve independently; conversions live here as well.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::params::CascadeParams;
use crate::training::booster::CascadeBoost;
use crate::tree::{SplitTest, Tree, TreeNode};

// ============================================================================
// Schema types
// ============================================================================

/// One word of the flat `internalNodes` stream: refs, feature indices and
/// subset words are integers, ordered thresholds are floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeWord {
    Int(i64),
    Float(f64),
}

impl NodeWord {
    fn as_int(&self) -> Result<i64, PersistError> {
        match self {
            NodeWord::Int(v) => Ok(*v),
            NodeWord::Float(_) => Err(PersistError::MalformedTree(
                "expected an integer word in the node stream",
            )),
        }
    }

    fn as_float(&self) -> f64 {
        match self {
            NodeWord::Int(v) => *v as f64,
            NodeWord::Float(v) => *v,
        }
    }
}

/// One weak classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakClassifierSchema {
    pub internal_nodes: Vec<NodeWord>,
    pub leaf_values: Vec<f32>,
}

/// The stage ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSchema {
    pub weak_count: u32,
    pub stage_threshold: f32,
    pub weak_classifiers: Vec<WeakClassifierSchema>,
}

/// Top-level document with its named root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDocument {
    pub boost: StageSchema,
}

// ============================================================================
// Tree <-> schema
// ============================================================================

/// Emit a tree as the flat BFS streams.
pub(crate) fn tree_to_schema(tree: &Tree) -> WeakClassifierSchema {
    let mut internal_nodes = Vec::new();
    let mut leaf_values: Vec<f32> = Vec::new();
    let mut queue: VecDeque<u32> = VecDeque::new();
    queue.push_back(tree.root());
    let mut next_internal = 1i64;

    while let Some(id) = queue.pop_front() {
        let TreeNode::Split {
            var, test, left, right,
        } = tree.node(id)
        else {
            unreachable!("only internal nodes are queued");
        };

        for child in [*left, *right] {
            match tree.node(child) {
                TreeNode::Leaf { value } => {
                    internal_nodes.push(NodeWord::Int(-(leaf_values.len() as i64)));
                    leaf_values.push(*value as f32);
                }
                TreeNode::Split { .. } => {
                    queue.push_back(child);
                    internal_nodes.push(NodeWord::Int(next_internal));
                    next_internal += 1;
                }
            }
        }

        internal_nodes.push(NodeWord::Int(*var as i64));
        match test {
            SplitTest::Ordered { threshold } => {
                internal_nodes.push(NodeWord::Float(*threshold as f64));
            }
            SplitTest::Categorical { subset } => {
                for word in subset {
                    internal_nodes.push(NodeWord::Int(*word as i64));
                }
            }
        }
    }

    WeakClassifierSchema {
        internal_nodes,
        leaf_values,
    }
}

/// Rebuild a tree from its flat streams.
///
/// Walks the records tail-to-head: a record's internal children were
/// emitted after it, so by the time a record is processed its subtrees are
/// finished and waiting in FIFO order.
pub(crate) fn tree_from_schema(
    schema: &WeakClassifierSchema,
    categorical: bool,
    subset_words: usize,
) -> Result<Tree, PersistError> {
    let step = 3 + if categorical { subset_words } else { 1 };
    let words = &schema.internal_nodes;
    if words.is_empty() || words.len() % step != 0 {
        return Err(PersistError::MalformedTree(
            "internal-node stream length is not a whole number of records",
        ));
    }

    let mut nodes: Vec<TreeNode> = Vec::new();
    let mut finished: VecDeque<u32> = VecDeque::new();

    let resolve = |r: i64,
                   nodes: &mut Vec<TreeNode>,
                   finished: &mut VecDeque<u32>|
     -> Result<u32, PersistError> {
        if r <= 0 {
            let index = r
                .checked_neg()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or(PersistError::MalformedTree("leaf reference out of range"))?;
            let value = *schema
                .leaf_values
                .get(index)
                .ok_or(PersistError::MalformedTree("leaf reference out of range"))?;
            nodes.push(TreeNode::Leaf {
                value: value as f64,
            });
            Ok(nodes.len() as u32 - 1)
        } else {
            finished
                .pop_front()
                .ok_or(PersistError::MalformedTree("dangling internal reference"))
        }
    };

    for record in (0..words.len() / step).rev() {
        let base = record * step;
        let left_ref = words[base].as_int()?;
        let right_ref = words[base + 1].as_int()?;
        let var = words[base + 2].as_int()?;
        if !(0..=i64::from(u32::MAX)).contains(&var) {
            return Err(PersistError::MalformedTree("feature index out of range"));
        }

        let test = if categorical {
            let mut subset = Vec::with_capacity(subset_words);
            for w in &words[base + 3..base + step] {
                let word = w.as_int()?;
                if !(0..=i64::from(u32::MAX)).contains(&word) {
                    return Err(PersistError::MalformedTree("subset word out of range"));
                }
                subset.push(word as u32);
            }
            SplitTest::Categorical { subset }
        } else {
            SplitTest::Ordered {
                threshold: words[base + 3].as_float() as f32,
            }
        };

        let right = resolve(right_ref, &mut nodes, &mut finished)?;
        let left = resolve(left_ref, &mut nodes, &mut finished)?;
        nodes.push(TreeNode::Split {
            var: var as u32,
            test,
            left,
            right,
        });
        finished.push_back(nodes.len() as u32 - 1);
    }

    let root = finished
        .pop_front()
        .ok_or(PersistError::MalformedTree("empty tree"))?;
    if !finished.is_empty() {
        return Err(PersistError::MalformedTree("unreferenced subtrees"));
    }
    Ok(Tree::new(nodes, root))
}

// ============================================================================
// Stage document I/O
// ============================================================================

impl CascadeBoost {
    /// The stage as its document schema.
    pub fn to_document(&self) -> StageDocument {
        StageDocument {
            boost: StageSchema {
                weak_count: self.weak_count() as u32,
                stage_threshold: self.threshold(),
                weak_classifiers: self.trees().iter().map(tree_to_schema).collect(),
            },
        }
    }

    /// Rebuild a stage from its document. `params` supplies the split mode
    /// (ordered vs categorical) and travels with the stage afterwards.
    pub fn from_document(
        doc: &StageDocument,
        params: &CascadeParams,
    ) -> Result<Self, PersistError> {
        let categorical = params.max_cat_count > 0;
        let subset_words = params.subset_words();
        let trees = doc
            .boost
            .weak_classifiers
            .iter()
            .map(|w| tree_from_schema(w, categorical, subset_words))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_parts(
            params.clone(),
            trees,
            doc.boost.stage_threshold,
        ))
    }

    /// Write the stage document as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), PersistError> {
        serde_json::to_writer_pretty(writer, &self.to_document())?;
        Ok(())
    }

    /// Read a stage document from JSON.
    pub fn read_json<R: Read>(reader: R, params: &CascadeParams) -> Result<Self, PersistError> {
        let doc: StageDocument = serde_json::from_reader(reader)?;
        Self::from_document(&doc, params)
    }

    /// Write the stage document to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        self.write_json(BufWriter::new(File::create(path)?))
    }

    /// Read a stage document from a file.
    pub fn load<P: AsRef<Path>>(path: P, params: &CascadeParams) -> Result<Self, PersistError> {
        Self::read_json(BufReader::new(File::open(path)?), params)
    }
}

// ============================================================================
// Tests
// ============================================================================
