//! Per-stage training data: node arena, caches and buffer plumbing.
//!
//! [`TrainData`] ties together the response caches built by the precompute
//! engine, the double-slot working buffer and the node arena. Tree growth
//! reads nodes' sample partitions and sorted feature slices through the
//! accessors here; the splitter writes child partitions back through the
//! buffer.
//!
//! # Node addressing
//!
//! Nodes are index-based handles into a flat arena. A node addresses its
//! data as a column range of one buffer slot: `sample_count` columns
//! starting at `offset`, in slot `buf_slot`. Children tile their parent's
//! column range inside the split workspace slot, left at the parent's
//! offset and right immediately after the left child's columns.

use ndarray::Array2;

use crate::error::{IndexArrayError, TrainError};
use crate::params::CascadeParams;
use crate::precalc::{precalculate, PrecalcLayout};
use crate::storage::DataSource;
use crate::training::buffer::{SampleIdx, WorkBuffer};
use crate::tree::SplitTest;

// ============================================================================
// Node arena
// ============================================================================

pub(crate) type NodeId = u32;

/// Slot every split writes its children into. Slot 0 holds the data
/// root's pristine pool-wide sort, so it is never a split target; splits
/// of slot-1 parents relocate in place through a scratch copy.
pub(crate) const SPLIT_SLOT: usize = 1;

/// Split chosen for an internal node.
#[derive(Debug, Clone)]
pub(crate) struct NodeSplit {
    pub var: u32,
    pub test: SplitTest,
}

/// One node of the tree under construction.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub sample_count: usize,
    pub depth: u32,
    /// Buffer slot this node's rows live in.
    pub buf_slot: usize,
    /// First column of this node's range within the slot.
    pub offset: usize,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub split: Option<NodeSplit>,
    /// Leaf output; meaningful only when `left`/`right` are `None`.
    pub value: f64,
}

/// Bump arena of tree nodes.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new_node(
        &mut self,
        parent: Option<NodeId>,
        sample_count: usize,
        buf_slot: usize,
        offset: usize,
    ) -> NodeId {
        let depth = parent.map_or(0, |p| self.nodes[p as usize].depth + 1);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            sample_count,
            depth,
            buf_slot,
            offset,
            parent,
            left: None,
            right: None,
            split: None,
            value: 0.0,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node after `keep`, reclaiming the arena between trees.
    pub fn truncate(&mut self, keep: usize) {
        self.nodes.truncate(keep);
    }
}

// ============================================================================
// Subsample index preprocessing
// ============================================================================

/// Sample selection handed to [`TrainData::subsample`]: either a pool-wide
/// mask or an explicit index list.
#[derive(Debug, Clone, Copy)]
pub(crate) enum IndexArray<'a> {
    Mask(&'a [bool]),
    Indices(&'a [u32]),
}

/// Normalise a selection into a sorted pool-index list.
///
/// Masks must cover the whole pool; index lists are sorted and range
/// checked. Duplicate indices are allowed unless `check_duplicates` is set
/// (a duplicated index repeats the sample in the subset).
pub(crate) fn preprocess_index_array(
    sample_count: usize,
    selection: IndexArray<'_>,
    check_duplicates: bool,
) -> Result<Vec<u32>, IndexArrayError> {
    match selection {
        IndexArray::Mask(mask) => {
            if mask.len() != sample_count {
                return Err(IndexArrayError::MaskLenMismatch {
                    got: mask.len(),
                    expected: sample_count,
                });
            }
            let indices: Vec<u32> = mask
                .iter()
                .enumerate()
                .filter_map(|(i, &on)| on.then_some(i as u32))
                .collect();
            if indices.is_empty() {
                return Err(IndexArrayError::EmptySelection);
            }
            Ok(indices)
        }
        IndexArray::Indices(list) => {
            if list.len() > sample_count {
                return Err(IndexArrayError::TooManyIndices {
                    got: list.len(),
                    expected: sample_count,
                });
            }
            if list.is_empty() {
                return Err(IndexArrayError::EmptySelection);
            }
            let mut indices = list.to_vec();
            indices.sort_unstable();
            if let Some(&last) = indices.last() {
                if last as usize >= sample_count {
                    return Err(IndexArrayError::OutOfRange {
                        index: last as usize,
                        size: sample_count,
                    });
                }
            }
            if check_duplicates {
                for pair in indices.windows(2) {
                    if pair[0] == pair[1] {
                        return Err(IndexArrayError::Duplicate {
                            index: pair[0] as usize,
                        });
                    }
                }
            }
            Ok(indices)
        }
    }
}

// ============================================================================
// TrainData
// ============================================================================

/// All per-stage training state shared by the tree trainer and the
/// boosting loop.
pub(crate) struct TrainData<'a, I: SampleIdx> {
    source: &'a dyn DataSource,
    pub(crate) sample_count: usize,
    pub(crate) var_count: usize,
    pub(crate) max_cat_count: u32,
    pub(crate) max_depth: u32,
    pub(crate) min_sample_count: usize,
    layout: PrecalcLayout,
    val_cache: Array2<f32>,
    pub(crate) buf: WorkBuffer<I>,
    pub(crate) arena: NodeArena,
    /// Regression target side channel, pool indexed (LogitBoost/Gentle).
    pub(crate) targets: Vec<f32>,
}

impl<'a, I: SampleIdx> TrainData<'a, I> {
    /// Build the training data for one stage: derive the cache layout from
    /// the byte budgets, run precompute and install the data root covering
    /// the whole pool.
    pub fn new(source: &'a dyn DataSource, params: &CascadeParams) -> Result<Self, TrainError> {
        let sample_count = source.num_samples();
        let var_count = source.num_features();
        let layout = PrecalcLayout::derive(
            var_count,
            sample_count,
            params.precalc_val_mib,
            params.precalc_idx_mib,
            std::mem::size_of::<I>(),
            params.max_cat_count > 0,
        );

        let mut buf = WorkBuffer::new(layout.num_precalc_idx, sample_count)?;
        let mut val_cache = Array2::zeros((layout.num_precalc_val, sample_count));
        precalculate(source, layout, &mut val_cache, &mut buf);

        // Identity cv-label and sample-index rows for the data root.
        for row in [buf.cv_row(), buf.sample_row()] {
            for (i, v) in buf.row_mut(0, row).iter_mut().enumerate() {
                *v = I::from_usize(i);
            }
        }

        let mut arena = NodeArena::default();
        let data_root = arena.new_node(None, sample_count, 0, 0);
        debug_assert_eq!(data_root, 0);

        Ok(Self {
            source,
            sample_count,
            var_count,
            max_cat_count: params.max_cat_count,
            max_depth: params.max_depth,
            min_sample_count: params.min_sample_count as usize,
            layout,
            val_cache,
            buf,
            arena,
            targets: vec![0.0; sample_count],
        })
    }

    /// The node covering the full pool, id 0, alive across all trees.
    #[inline]
    pub fn data_root(&self) -> NodeId {
        0
    }

    /// Reclaim the arena down to the data root before growing a tree.
    pub fn reset_arena(&mut self) {
        self.arena.truncate(1);
    }

    /// Number of features with a pre-sorted index row.
    #[inline]
    pub fn num_precalc_idx(&self) -> usize {
        self.layout.num_precalc_idx
    }

    /// Label of a pool sample, 0.0 or 1.0.
    #[inline]
    pub fn label(&self, sample: usize) -> f32 {
        self.source.label(sample)
    }

    /// Response of `var` on a pool sample: value-cache hit or
    /// representation fallback.
    #[inline]
    pub fn var_value(&self, var: usize, sample: usize) -> f32 {
        if var < self.layout.num_precalc_val {
            self.val_cache[(var, sample)]
        } else {
            self.source.response(var, sample)
        }
    }

    /// Pool indices of a node's samples, one per node-local position.
    pub fn sample_indices(&self, node: NodeId) -> &[I] {
        let n = self.arena.get(node);
        self.buf
            .segment(n.buf_slot, self.buf.sample_row(), n.offset, n.sample_count)
    }

    /// The cv-label row of a node: the weight/target lookup channel, one
    /// pool index per node-local position.
    pub fn cv_labels(&self, node: NodeId) -> &[I] {
        let n = self.arena.get(node);
        self.buf
            .segment(n.buf_slot, self.buf.cv_row(), n.offset, n.sample_count)
    }

    /// Class labels of a node's samples in node-local order.
    pub fn class_labels(&self, node: NodeId, out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            self.sample_indices(node)
                .iter()
                .map(|&si| self.source.label(si.index()) as u8),
        );
    }

    /// Ordered-variable data of a node: `values` ascending, `indices` the
    /// matching node-local positions.
    ///
    /// For a feature with a pre-sorted row this reads the node's slice of
    /// the global sort; otherwise responses are gathered and argsorted on
    /// the fly.
    pub fn ord_var_data(
        &self,
        node: NodeId,
        var: usize,
        values: &mut Vec<f32>,
        indices: &mut Vec<u32>,
    ) {
        let n = self.arena.get(node);
        let count = n.sample_count;
        let samples = self.sample_indices(node);

        values.clear();
        indices.clear();

        if var < self.layout.num_precalc_idx {
            let sorted = self.buf.segment(n.buf_slot, var, n.offset, count);
            indices.extend(sorted.iter().map(|&i| i.index() as u32));
            values.extend(
                sorted
                    .iter()
                    .map(|&i| self.var_value(var, samples[i.index()].index())),
            );
        } else {
            indices.extend(0..count as u32);
            values.extend(
                samples
                    .iter()
                    .map(|&si| self.var_value(var, si.index())),
            );
            indices.sort_unstable_by(|&a, &b| {
                values[a as usize]
                    .partial_cmp(&values[b as usize])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.cmp(&b))
            });
            let sorted_values: Vec<f32> =
                indices.iter().map(|&i| values[i as usize]).collect();
            *values = sorted_values;
        }
    }

    /// Categorical-variable data of a node: one category per node-local
    /// position, unsorted.
    pub fn cat_var_data(&self, node: NodeId, var: usize, out: &mut Vec<i32>) {
        out.clear();
        out.extend(
            self.sample_indices(node)
                .iter()
                .map(|&si| self.var_value(var, si.index()) as i32),
        );
    }

    /// Install a fresh root over a subset of the pool.
    ///
    /// A selection equal to the full pool in order aliases the data root's
    /// rows. Any other selection is compacted into buffer slot 1 through a
    /// count/offset table, expanding duplicated indices and preserving the
    /// sort invariant of every pre-sorted feature row.
    pub fn subsample(&mut self, selection: IndexArray<'_>) -> Result<NodeId, IndexArrayError> {
        let sidx = preprocess_index_array(self.sample_count, selection, false)?;
        let count = sidx.len();

        let identity = count == self.sample_count
            && sidx.iter().enumerate().all(|(i, &s)| s as usize == i);
        if identity {
            let data_root = self.arena.get(self.data_root()).clone();
            let root = self.arena.new_node(
                None,
                data_root.sample_count,
                data_root.buf_slot,
                data_root.offset,
            );
            return Ok(root);
        }

        let root = self.arena.new_node(None, count, SPLIT_SLOT, 0);

        // Count/offset table over pool indices: how many times each sample
        // occurs in the subset and where its compacted run starts.
        let mut co = vec![(0u32, 0u32); self.sample_count];
        for &s in &sidx {
            co[s as usize].0 += 1;
        }
        let mut cur_ofs = 0u32;
        for entry in co.iter_mut() {
            if entry.0 > 0 {
                entry.1 = cur_ofs;
                cur_ofs += entry.0;
            }
        }

        // Compact each pre-sorted feature row of the data root in its
        // original sorted order; repeats expand to contiguous runs.
        for vi in 0..self.layout.num_precalc_idx {
            let src: Vec<u32> = self
                .buf
                .segment(0, vi, 0, self.sample_count)
                .iter()
                .map(|&i| i.index() as u32)
                .collect();
            let dst = self.buf.segment_mut(SPLIT_SLOT, vi, 0, count);
            let mut j = 0;
            for idx in src {
                let (run, start) = co[idx as usize];
                for k in 0..run {
                    dst[j] = I::from_usize((start + k) as usize);
                    j += 1;
                }
            }
            debug_assert_eq!(j, count);
        }

        // cv-label and sample-index rows: gather through the selection.
        // Both root rows are the identity, so the gathered value is the
        // pool index itself.
        for row in [self.buf.cv_row(), self.buf.sample_row()] {
            let dst = self.buf.segment_mut(SPLIT_SLOT, row, 0, count);
            for (d, &s) in dst.iter_mut().zip(&sidx) {
                *d = I::from_usize(s as usize);
            }
        }

        Ok(root)
    }
}

// ============================================================================
// Tests
// ============================================================================
