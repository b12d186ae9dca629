//! Single-tree trainer.
//!
//! Grows one shallow decision tree over weighted samples. Split search
//! walks each candidate feature's node slice in sorted order (ordered
//! features) or partitions categories by their weighted response ratio
//! (categorical features); features are searched in parallel and the
//! winner is reduced deterministically. Node splitting relocates every
//! cached sorted row into the children without re-sorting.
//!
//! The split objective follows the boost flavour: weighted Gini for
//! classification targets (Discrete/Real), weighted variance reduction for
//! regression targets (Gentle/LogitBoost).

use rayon::prelude::*;

use crate::error::IndexArrayError;
use crate::training::buffer::SampleIdx;
use crate::training::data::{IndexArray, NodeId, NodeSplit, TrainData, SPLIT_SLOT};
use crate::tree::{SplitTest, Tree, TreeNode};

/// Two adjacent sorted values closer than this are treated as equal; no
/// split threshold is placed between them.
pub(crate) const THRESHOLD_EPS: f32 = 1e-5;

/// Clamped log-odds, `log(v / (1 - v))` with `v` held inside
/// `[1e-5, 1 - 1e-5]`.
pub(crate) fn log_ratio(v: f64) -> f64 {
    let v = v.clamp(1e-5, 1.0 - 1e-5);
    (v / (1.0 - v)).ln()
}

/// What the tree predicts and how leaves are valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeTarget {
    /// Discrete AdaBoost: Gini splits, leaves vote the weighted majority
    /// class in {-1, +1}.
    ClassMajority,
    /// Real AdaBoost: Gini splits, leaves carry half-log-odds of the
    /// positive class.
    ClassLogOdds,
    /// Gentle/LogitBoost: variance splits on the target channel, leaves
    /// carry the weighted mean target.
    Regression,
}

// ============================================================================
// Entry point
// ============================================================================

/// Train one tree over the selected samples.
///
/// `weights` and the regression target channel are pool indexed. Each
/// trained sample's leaf value is recorded into `evals`.
///
/// Returns `None` when the root cannot be split: a constant tree carries
/// no information and signals the boosting loop to stop.
pub(crate) fn train_tree<I: SampleIdx>(
    data: &mut TrainData<'_, I>,
    selection: IndexArray<'_>,
    weights: &[f64],
    target: TreeTarget,
    evals: &mut [f64],
) -> Result<Option<Tree>, IndexArrayError> {
    data.reset_arena();
    let root = data.subsample(selection)?;
    grow_node(data, root, weights, target, evals);

    if data.arena.get(root).left.is_none() {
        return Ok(None);
    }
    Ok(Some(freeze(data, root)))
}

fn grow_node<I: SampleIdx>(
    data: &mut TrainData<'_, I>,
    node: NodeId,
    weights: &[f64],
    target: TreeTarget,
    evals: &mut [f64],
) {
    let can_split = {
        let n = data.arena.get(node);
        n.depth < data.max_depth && n.sample_count > data.min_sample_count
    } && !(matches!(target, TreeTarget::ClassMajority | TreeTarget::ClassLogOdds)
        && is_pure(data, node));

    let split = if can_split {
        find_best_split(data, node, weights, target)
    } else {
        None
    };

    match split {
        Some(split) => {
            data.arena.get_mut(node).split = Some(split);
            let (left, right) = split_node_data(data, node);
            grow_node(data, left, weights, target, evals);
            grow_node(data, right, weights, target, evals);
        }
        // No usable split: the node becomes a leaf.
        None => make_leaf(data, node, weights, target, evals),
    }
}

/// A single-class node cannot improve a classification objective.
fn is_pure<I: SampleIdx>(data: &TrainData<'_, I>, node: NodeId) -> bool {
    let mut labels = Vec::new();
    data.class_labels(node, &mut labels);
    labels.windows(2).all(|pair| pair[0] == pair[1])
}

// ============================================================================
// Best-split search
// ============================================================================

#[derive(Debug, Clone)]
struct SplitCandidate {
    quality: f64,
    var: u32,
    test: Option<SplitTest>,
}

impl SplitCandidate {
    fn none() -> Self {
        Self {
            quality: f64::NEG_INFINITY,
            var: u32::MAX,
            test: None,
        }
    }
}

/// Deterministic reduction: higher quality wins, ties go to the smaller
/// feature index, so parallel and sequential searches agree.
fn pick(a: SplitCandidate, b: SplitCandidate) -> SplitCandidate {
    if b.test.is_none() {
        return a;
    }
    if a.test.is_none() {
        return b;
    }
    if b.quality > a.quality || (b.quality == a.quality && b.var < a.var) {
        b
    } else {
        a
    }
}

#[derive(Default)]
struct Scratch {
    values: Vec<f32>,
    order: Vec<u32>,
    cats: Vec<i32>,
}

fn find_best_split<I: SampleIdx>(
    data: &TrainData<'_, I>,
    node: NodeId,
    weights: &[f64],
    target: TreeTarget,
) -> Option<NodeSplit> {
    let categorical = data.max_cat_count > 0;
    let best = (0..data.var_count as u32)
        .into_par_iter()
        .map_init(Scratch::default, |scratch, var| {
            if categorical {
                best_categorical_split(data, node, var, weights, target, scratch)
            } else {
                best_ordered_split(data, node, var, weights, target, scratch)
            }
        })
        .reduce(SplitCandidate::none, pick);

    best.test.map(|test| NodeSplit {
        var: best.var,
        test,
    })
}

/// Per-sample statistic folded by the split objective: weighted class
/// masses for Gini, weighted target sums for variance reduction.
#[derive(Clone, Copy, Default)]
struct SideStats {
    w: f64,
    a: f64,
    b: f64,
}

impl SideStats {
    #[inline]
    fn add(&mut self, w: f64, positive: bool, z: f64, target: TreeTarget) {
        self.w += w;
        match target {
            TreeTarget::Regression => self.a += w * z,
            _ => {
                if positive {
                    self.b += w;
                } else {
                    self.a += w;
                }
            }
        }
    }

    #[inline]
    fn minus(&self, other: &SideStats) -> SideStats {
        SideStats {
            w: self.w - other.w,
            a: self.a - other.a,
            b: self.b - other.b,
        }
    }

    /// Contribution of one side to the split objective.
    #[inline]
    fn score(&self, target: TreeTarget) -> f64 {
        match target {
            TreeTarget::Regression => self.a * self.a / self.w,
            _ => (self.a * self.a + self.b * self.b) / self.w,
        }
    }
}

fn best_ordered_split<I: SampleIdx>(
    data: &TrainData<'_, I>,
    node: NodeId,
    var: u32,
    weights: &[f64],
    target: TreeTarget,
    scratch: &mut Scratch,
) -> SplitCandidate {
    data.ord_var_data(node, var as usize, &mut scratch.values, &mut scratch.order);
    let values = &scratch.values;
    let order = &scratch.order;
    let n = values.len();

    let mut best = SplitCandidate::none();
    if n < 2 {
        return best;
    }

    let cv = data.cv_labels(node);
    let stats_of = |local: u32| {
        let pool = cv[local as usize].index();
        (
            weights[pool],
            data.label(pool) > 0.5,
            data.targets[pool] as f64,
        )
    };

    let mut total = SideStats::default();
    for &local in order.iter() {
        let (w, pos, z) = stats_of(local);
        total.add(w, pos, z, target);
    }

    let mut left = SideStats::default();
    for i in 0..n - 1 {
        let (w, pos, z) = stats_of(order[i]);
        left.add(w, pos, z, target);

        if values[i + 1] - values[i] <= THRESHOLD_EPS {
            continue;
        }
        // The midpoint must strictly separate the two values; at extreme
        // magnitudes it can round onto the upper value, which would route
        // every sample of that value left of itself.
        let threshold = (values[i] + values[i + 1]) * 0.5;
        if threshold >= values[i + 1] {
            continue;
        }
        let right = total.minus(&left);
        if left.w <= f64::EPSILON || right.w <= f64::EPSILON {
            continue;
        }
        let quality = left.score(target) + right.score(target);
        if quality > best.quality {
            best = SplitCandidate {
                quality,
                var,
                test: Some(SplitTest::Ordered { threshold }),
            };
        }
    }
    best
}

fn best_categorical_split<I: SampleIdx>(
    data: &TrainData<'_, I>,
    node: NodeId,
    var: u32,
    weights: &[f64],
    target: TreeTarget,
    scratch: &mut Scratch,
) -> SplitCandidate {
    data.cat_var_data(node, var as usize, &mut scratch.cats);
    let cv = data.cv_labels(node);
    let num_cats = data.max_cat_count as usize;

    let mut per_cat = vec![SideStats::default(); num_cats];
    for (i, &cat) in scratch.cats.iter().enumerate() {
        assert!(
            cat >= 0 && (cat as usize) < num_cats,
            "category {cat} of feature {var} out of range [0, {num_cats})"
        );
        let pool = cv[i].index();
        per_cat[cat as usize].add(
            weights[pool],
            data.label(pool) > 0.5,
            data.targets[pool] as f64,
            target,
        );
    }

    // Categories with any weight, ordered by their weighted response so a
    // prefix scan over this order visits every useful binary partition.
    let mut present: Vec<(u32, SideStats)> = per_cat
        .into_iter()
        .enumerate()
        .filter(|(_, s)| s.w > 0.0)
        .map(|(c, s)| (c as u32, s))
        .collect();
    let mut best = SplitCandidate::none();
    if present.len() < 2 {
        return best;
    }
    present.sort_unstable_by(|(ca, a), (cb, b)| {
        let ka = match target {
            TreeTarget::Regression => a.a / a.w,
            _ => a.b / a.w,
        };
        let kb = match target {
            TreeTarget::Regression => b.a / b.w,
            _ => b.b / b.w,
        };
        ka.partial_cmp(&kb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ca.cmp(cb))
    });

    let mut total = SideStats::default();
    for (_, s) in &present {
        total.w += s.w;
        total.a += s.a;
        total.b += s.b;
    }

    let mut left = SideStats::default();
    let mut best_prefix = None;
    for (i, (_, s)) in present.iter().enumerate().take(present.len() - 1) {
        left.w += s.w;
        left.a += s.a;
        left.b += s.b;
        let right = total.minus(&left);
        if left.w <= f64::EPSILON || right.w <= f64::EPSILON {
            continue;
        }
        let quality = left.score(target) + right.score(target);
        if quality > best.quality {
            best.quality = quality;
            best.var = var;
            best_prefix = Some(i);
        }
    }

    if let Some(prefix) = best_prefix {
        let mut subset = vec![0u32; num_cats.div_ceil(32)];
        for (cat, _) in &present[..=prefix] {
            subset[(*cat as usize) >> 5] |= 1 << (*cat & 31);
        }
        best.test = Some(SplitTest::Categorical { subset });
    }
    best
}

// ============================================================================
// Node splitting
// ============================================================================

/// Apply a node's chosen split: route every sample left or right, allocate
/// the children and relocate the node's buffer rows so each child's cached
/// sorted rows stay sorted.
fn split_node_data<I: SampleIdx>(data: &mut TrainData<'_, I>, node: NodeId) -> (NodeId, NodeId) {
    let (count, offset, depth, parent_slot) = {
        let n = data.arena.get(node);
        (n.sample_count, n.offset, n.depth, n.buf_slot)
    };
    let split = data
        .arena
        .get(node)
        .split
        .clone()
        .expect("split_node_data on a node without a split");

    // Direction bit per node-local position: 0 = left, 1 = right.
    let dir: Vec<u8> = data
        .sample_indices(node)
        .iter()
        .map(|&si| {
            let value = data.var_value(split.var as usize, si.index());
            u8::from(!split.test.goes_left(value))
        })
        .collect();

    // Relocation table: each sample's position inside its destination
    // child, contiguous per side.
    let mut new_idx = vec![0u32; count];
    let (mut nl, mut nr) = (0usize, 0usize);
    for (i, &d) in dir.iter().enumerate() {
        if d == 0 {
            new_idx[i] = nl as u32;
            nl += 1;
        } else {
            new_idx[i] = nr as u32;
            nr += 1;
        }
    }
    debug_assert!(nl > 0 && nr > 0, "split produced an empty child");

    let left = data.arena.new_node(Some(node), nl, SPLIT_SLOT, offset);
    let right = data.arena.new_node(Some(node), nr, SPLIT_SLOT, offset + nl);
    debug_assert_eq!(data.arena.get(left).parent, Some(node));
    {
        let n = data.arena.get_mut(node);
        n.left = Some(left);
        n.right = Some(right);
    }

    // Sorted rows are only needed if a child may split again.
    let split_input = depth + 1 < data.max_depth
        && (nl > data.min_sample_count || nr > data.min_sample_count);

    if split_input {
        for vi in 0..data.num_precalc_idx() {
            // Walk the parent's sorted order once; remapped positions land
            // in each child already sorted. The scratch copy makes the
            // in-place relocation within the split slot safe.
            let src: Vec<u32> = data
                .buf
                .segment(parent_slot, vi, offset, count)
                .iter()
                .map(|&i| i.index() as u32)
                .collect();
            let dst = data.buf.segment_mut(SPLIT_SLOT, vi, offset, count);
            let (dst_left, dst_right) = dst.split_at_mut(nl);
            let (mut l, mut r) = (0, 0);
            for idx in src {
                let ni = new_idx[idx as usize] as usize;
                if dir[idx as usize] == 0 {
                    dst_left[l] = I::from_usize(ni);
                    l += 1;
                } else {
                    dst_right[r] = I::from_usize(ni);
                    r += 1;
                }
            }
        }
    }

    // cv-label and sample-index rows always split: leaves still need their
    // pool mapping for leaf values and eval recording.
    for row in [data.buf.cv_row(), data.buf.sample_row()] {
        let src: Vec<I> = data.buf.segment(parent_slot, row, offset, count).to_vec();
        let dst = data.buf.segment_mut(SPLIT_SLOT, row, offset, count);
        let (dst_left, dst_right) = dst.split_at_mut(nl);
        let (mut l, mut r) = (0, 0);
        for (i, v) in src.into_iter().enumerate() {
            if dir[i] == 0 {
                dst_left[l] = v;
                l += 1;
            } else {
                dst_right[r] = v;
                r += 1;
            }
        }
    }

    (left, right)
}

// ============================================================================
// Leaves
// ============================================================================

fn make_leaf<I: SampleIdx>(
    data: &mut TrainData<'_, I>,
    node: NodeId,
    weights: &[f64],
    target: TreeTarget,
    evals: &mut [f64],
) {
    let cv = data.cv_labels(node);
    let mut stats = SideStats::default();
    for &si in cv.iter() {
        let pool = si.index();
        stats.add(
            weights[pool],
            data.label(pool) > 0.5,
            data.targets[pool] as f64,
            target,
        );
    }

    let value = match target {
        TreeTarget::Regression => {
            if stats.w > f64::EPSILON {
                stats.a / stats.w
            } else {
                0.0
            }
        }
        TreeTarget::ClassMajority => {
            if stats.b > stats.a {
                1.0
            } else {
                -1.0
            }
        }
        TreeTarget::ClassLogOdds => {
            let p = if stats.w > f64::EPSILON {
                stats.b / stats.w
            } else {
                0.5
            };
            0.5 * log_ratio(p)
        }
    };

    data.arena.get_mut(node).value = value;
    for &si in data.sample_indices(node).iter() {
        evals[si.index()] = value;
    }
}

// ============================================================================
// Arena -> Tree
// ============================================================================

fn freeze<I: SampleIdx>(data: &TrainData<'_, I>, root: NodeId) -> Tree {
    let mut nodes = Vec::with_capacity(data.arena.len());
    let root_id = emit(data, root, &mut nodes);
    Tree::new(nodes, root_id)
}

fn emit<I: SampleIdx>(data: &TrainData<'_, I>, id: NodeId, out: &mut Vec<TreeNode>) -> u32 {
    let node = data.arena.get(id);
    match (node.left, node.right) {
        (Some(left), Some(right)) => {
            let split = node.split.clone().expect("internal node without a split");
            let slot = out.len() as u32;
            out.push(TreeNode::Leaf { value: 0.0 });
            let left_id = emit(data, left, out);
            let right_id = emit(data, right, out);
            out[slot as usize] = TreeNode::Split {
                var: split.var,
                test: split.test,
                left: left_id,
                right: right_id,
            };
            slot
        }
        _ => {
            let slot = out.len() as u32;
            out.push(TreeNode::Leaf { value: node.value });
            slot
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CascadeParams;
    use crate::storage::DataSource;
    use approx::assert_abs_diff_eq;

    struct Grid {
        responses: Vec<Vec<f32>>,
        labels: Vec<f32>,
    }

    impl DataSource for Grid {
        fn num_features(&self) -> usize {
            self.responses.len()
        }
        fn num_samples(&self) -> usize {
            self.labels.len()
        }
        fn response(&self, feature: usize, sample: usize) -> f32 {
            self.responses[feature][sample]
        }
        fn label(&self, sample: usize) -> f32 {
            self.labels[sample]
        }
    }

    fn params(max_depth: u32) -> CascadeParams {
        CascadeParams {
            max_depth,
            min_sample_count: 1,
            ..Default::default()
        }
    }

    fn uniform_weights(n: usize) -> Vec<f64> {
        vec![1.0 / n as f64; n]
    }

    fn full_selection(n: usize) -> Vec<u32> {
        (0..n as u32).collect()
    }

    #[test]
    fn separable_feature_yields_midpoint_stump() {
        let source = Grid {
            responses: vec![vec![0.0, 0.0, 1.0, 1.0]],
            labels: vec![0.0, 0.0, 1.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(1)).unwrap();
        // Gentle-style targets: -1 for negatives, +1 for positives.
        data.targets = vec![-1.0, -1.0, 1.0, 1.0];

        let weights = uniform_weights(4);
        let mut evals = vec![0.0; 4];
        let sel = full_selection(4);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::Regression,
            &mut evals,
        )
        .unwrap()
        .expect("separable data must split");

        assert_eq!(tree.num_nodes(), 3);
        assert_abs_diff_eq!(tree.predict(|_| 0.0), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tree.predict(|_| 1.0), 1.0, epsilon = 1e-12);
        // Threshold sits mid-gap.
        assert_abs_diff_eq!(tree.predict(|_| 0.49), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tree.predict(|_| 0.51), 1.0, epsilon = 1e-12);
        assert_eq!(evals, vec![-1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn constant_feature_fails_to_fit() {
        let source = Grid {
            responses: vec![vec![3.0; 6]],
            labels: vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(2)).unwrap();
        let weights = uniform_weights(6);
        let mut evals = vec![0.0; 6];
        let sel = full_selection(6);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::ClassMajority,
            &mut evals,
        )
        .unwrap();
        assert!(tree.is_none());
    }

    #[test]
    fn near_equal_values_are_one_plateau() {
        // Gap below THRESHOLD_EPS: no threshold may be placed inside it.
        let source = Grid {
            responses: vec![vec![1.0, 1.0 + 5e-6, 1.0 + 8e-6, 1.0 + 9e-6]],
            labels: vec![0.0, 1.0, 0.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(1)).unwrap();
        let weights = uniform_weights(4);
        let mut evals = vec![0.0; 4];
        let sel = full_selection(4);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::ClassMajority,
            &mut evals,
        )
        .unwrap();
        assert!(tree.is_none());
    }

    #[test]
    fn children_of_split_keep_sorted_rows() {
        // Depth-2 growth exercises split propagation: the second level's
        // search reads the relocated sorted rows.
        let source = Grid {
            responses: vec![
                vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
                vec![7.0, 3.0, 5.0, 1.0, 6.0, 2.0, 4.0, 0.0],
            ],
            labels: vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(2)).unwrap();
        data.targets = source
            .labels
            .iter()
            .map(|&y| 2.0 * y - 1.0)
            .collect();

        let weights = uniform_weights(8);
        let mut evals = vec![0.0; 8];
        let sel = full_selection(8);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::Regression,
            &mut evals,
        )
        .unwrap()
        .expect("splittable data");

        // Every sample must descend to a leaf agreeing with its recorded
        // eval, and sibling partitions must tile the parent.
        for s in 0..8 {
            let predicted = tree.predict(|var| source.response(var as usize, s));
            assert_abs_diff_eq!(predicted, evals[s], epsilon = 1e-12);
        }
    }

    #[test]
    fn discrete_target_votes_majority_class() {
        let source = Grid {
            responses: vec![vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]],
            labels: vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(1)).unwrap();
        let weights = uniform_weights(6);
        let mut evals = vec![0.0; 6];
        let sel = full_selection(6);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::ClassMajority,
            &mut evals,
        )
        .unwrap()
        .expect("splittable data");

        // Left side is two negatives and one positive; right is all
        // positive.
        assert_eq!(tree.predict(|_| 0.0), -1.0);
        assert_eq!(tree.predict(|_| 1.0), 1.0);
    }

    #[test]
    fn log_odds_target_is_clamped() {
        let source = Grid {
            responses: vec![vec![0.0, 0.0, 1.0, 1.0]],
            labels: vec![0.0, 0.0, 1.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(1)).unwrap();
        let weights = uniform_weights(4);
        let mut evals = vec![0.0; 4];
        let sel = full_selection(4);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::ClassLogOdds,
            &mut evals,
        )
        .unwrap()
        .expect("splittable data");

        // Pure leaves hit the log-ratio clamp at p = 1e-5 / 1 - 1e-5.
        let clamp = 0.5 * log_ratio(1.0);
        assert_abs_diff_eq!(tree.predict(|_| 1.0), clamp, epsilon = 1e-12);
        assert_abs_diff_eq!(tree.predict(|_| 0.0), -clamp, epsilon = 1e-12);
    }

    #[test]
    fn categorical_split_partitions_by_subset() {
        // Three categories; category 1 is mostly positive.
        let source = Grid {
            responses: vec![vec![0.0, 1.0, 2.0, 1.0, 0.0, 2.0, 1.0, 0.0]],
            labels: vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        };
        let mut params = params(1);
        params.max_cat_count = 3;
        let mut data = TrainData::<'_, u16>::new(&source, &params).unwrap();
        let weights = uniform_weights(8);
        let mut evals = vec![0.0; 8];
        let sel = full_selection(8);
        let tree = train_tree(
            &mut data,
            IndexArray::Indices(&sel),
            &weights,
            TreeTarget::ClassMajority,
            &mut evals,
        )
        .unwrap()
        .expect("categorical data must split");

        // Category 1 (all positives) separates from categories 0 and 2.
        assert_eq!(tree.predict(|_| 1.0), 1.0);
        assert_eq!(tree.predict(|_| 0.0), -1.0);
        assert_eq!(tree.predict(|_| 2.0), -1.0);
    }

    #[test]
    fn tie_break_prefers_smaller_feature_index() {
        // Two identical features: the split must land on feature 0.
        let source = Grid {
            responses: vec![
                vec![0.0, 0.0, 1.0, 1.0],
                vec![0.0, 0.0, 1.0, 1.0],
            ],
            labels: vec![0.0, 0.0, 1.0, 1.0],
        };
        let mut data = TrainData::<'_, u16>::new(&source, &params(1)).unwrap();
        let weights = uniform_weights(4);

        let sel = full_selection(4);
        let root = data.subsample(IndexArray::Indices(&sel)).unwrap();
        let split = find_best_split(&data, root, &weights, TreeTarget::ClassMajority)
            .expect("split exists");
        assert_eq!(split.var, 0);
    }
}
