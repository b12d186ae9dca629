//! Cascade-stage boosting loop.
//!
//! [`CascadeBoost`] trains one rejection-cascade stage: an ensemble of
//! shallow trees grown over a fixed sample pool until the stage meets its
//! true-accept target at an acceptable false-accept rate.
//!
//! Each round is strictly sequential: the next tree sees the weights
//! updated from the previous one. Four reweighting rules share the loop
//! skeleton (Discrete/Real AdaBoost, LogitBoost, Gentle AdaBoost); after
//! every added tree the stage threshold is re-selected from the positive
//! score distribution and training stops as soon as the false-accept rate
//! drops to the target, the weak-count budget runs out, or a tree fails
//! to fit.

use crate::error::{PredictError, TrainError};
use crate::logger::TrainingLogger;
use crate::params::{BoostType, CascadeParams};
use crate::storage::DataSource;
use crate::training::buffer::SampleIdx;
use crate::training::data::{IndexArray, TrainData};
use crate::training::dtree::{log_ratio, train_tree, TreeTarget};
use crate::tree::Tree;

/// LogitBoost weight floor.
const LB_WEIGHT_THRESH: f64 = f32::EPSILON as f64;

/// LogitBoost target clamp.
const LB_Z_MAX: f64 = 10.0;

// ============================================================================
// CascadeBoost
// ============================================================================

/// A trained cascade stage: the tree ensemble and its stage threshold.
#[derive(Debug, Clone)]
pub struct CascadeBoost {
    params: CascadeParams,
    trees: Vec<Tree>,
    threshold: f32,
}

impl CascadeBoost {
    /// Train a stage over `source` with default logging.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError`] on invalid parameters, a single-class pool,
    /// or when not even one tree could be fitted.
    pub fn train(source: &dyn DataSource, params: CascadeParams) -> Result<Self, TrainError> {
        Self::train_with_logger(source, params, &TrainingLogger::default())
    }

    /// Train a stage, reporting progress through `logger`.
    pub fn train_with_logger(
        source: &dyn DataSource,
        params: CascadeParams,
        logger: &TrainingLogger,
    ) -> Result<Self, TrainError> {
        params.validate()?;

        let n = source.num_samples();
        let num_pos = (0..n).filter(|&i| source.label(i) == 1.0).count();
        if num_pos == 0 {
            return Err(TrainError::MissingClass("positive"));
        }
        if num_pos == n {
            return Err(TrainError::MissingClass("negative"));
        }

        // Index width is fixed once for the whole run.
        if n <= <u16 as SampleIdx>::MAX_SAMPLES {
            Self::train_impl::<u16>(source, params, logger)
        } else {
            Self::train_impl::<u32>(source, params, logger)
        }
    }

    fn train_impl<I: SampleIdx>(
        source: &dyn DataSource,
        params: CascadeParams,
        logger: &TrainingLogger,
    ) -> Result<Self, TrainError> {
        let mut data = TrainData::<I>::new(source, &params)?;
        let n = data.sample_count;
        let target = tree_target(params.boost_type);

        let mut state = BoostState::new(n);
        state.init(&mut data, params.boost_type);

        logger.info(&format!(
            "training stage: {} samples, {} features, {:?} boosting",
            n, data.var_count, params.boost_type
        ));
        logger.stage_header();

        let mut trees: Vec<Tree> = Vec::new();
        let mut threshold = 0.0f32;

        loop {
            let tree = train_tree(
                &mut data,
                IndexArray::Mask(&state.active),
                &state.weights,
                target,
                &mut state.weak_eval,
            )?;
            let Some(tree) = tree else {
                break;
            };
            trees.push(tree);

            state.update_weights(
                trees.last_mut().expect("just pushed"),
                &mut data,
                params.boost_type,
            );
            state.trim_weights(params.weight_trim_rate);
            if state.active_count() == 0 {
                break;
            }

            let eval = stage_threshold(&data, &trees, params.min_tar);
            threshold = eval.threshold;
            logger.stage_round(trees.len(), eval.tar, eval.far);

            if eval.far <= params.max_far {
                break;
            }
            if trees.len() >= params.weak_count as usize {
                break;
            }
        }

        if trees.is_empty() {
            return Err(TrainError::EmptyEnsemble);
        }
        logger.info(&format!(
            "stage complete: {} weak classifiers, threshold {threshold}",
            trees.len()
        ));

        Ok(Self {
            params,
            trees,
            threshold,
        })
    }

    /// Rebuild a stage from deserialized parts.
    pub(crate) fn from_parts(params: CascadeParams, trees: Vec<Tree>, threshold: f32) -> Self {
        Self {
            params,
            trees,
            threshold,
        }
    }

    /// Parameters the stage was trained with.
    pub fn params(&self) -> &CascadeParams {
        &self.params
    }

    /// Number of weak classifiers.
    pub fn weak_count(&self) -> usize {
        self.trees.len()
    }

    /// The selected stage threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The trees of the ensemble, for serialization.
    pub(crate) fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Raw or thresholded stage score of a pool sample.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::NotTrained`] when the ensemble is empty.
    pub fn predict(
        &self,
        source: &dyn DataSource,
        sample: usize,
        apply_threshold: bool,
    ) -> Result<f32, PredictError> {
        if self.trees.is_empty() {
            return Err(PredictError::NotTrained);
        }
        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.predict(|var| source.response(var as usize, sample)))
            .sum();
        Ok(if apply_threshold {
            sum as f32 - self.threshold
        } else {
            sum as f32
        })
    }
}

fn tree_target(boost_type: BoostType) -> TreeTarget {
    match boost_type {
        BoostType::Discrete => TreeTarget::ClassMajority,
        BoostType::Real => TreeTarget::ClassLogOdds,
        BoostType::Logit | BoostType::Gentle => TreeTarget::Regression,
    }
}

// ============================================================================
// Boosting state
// ============================================================================

/// Per-sample boosting state, pool indexed.
struct BoostState {
    /// Sample weights, renormalised to sum 1 after every update.
    weights: Vec<f64>,
    /// Labels mapped to {-1, +1}.
    orig_response: Vec<f64>,
    /// Latest tree's output per sample.
    weak_eval: Vec<f64>,
    /// Cumulative ensemble response (LogitBoost only).
    sum_response: Vec<f64>,
    /// Samples participating in the next tree.
    active: Vec<bool>,
}

impl BoostState {
    fn new(n: usize) -> Self {
        Self {
            weights: vec![0.0; n],
            orig_response: vec![0.0; n],
            weak_eval: vec![0.0; n],
            sum_response: vec![0.0; n],
            active: vec![true; n],
        }
    }

    /// Initialise weights and the regression target channel before the
    /// first tree.
    fn init<I: SampleIdx>(&mut self, data: &mut TrainData<'_, I>, boost_type: BoostType) {
        let n = self.weights.len();
        let w0 = 1.0 / n as f64;
        for i in 0..n {
            self.weights[i] = w0;
            self.orig_response[i] = 2.0 * data.label(i) as f64 - 1.0;
            self.active[i] = true;
        }
        match boost_type {
            BoostType::Logit => {
                // Regression targets start at +-2; refreshed every round.
                self.sum_response.fill(0.0);
                for i in 0..n {
                    data.targets[i] = if self.orig_response[i] > 0.0 { 2.0 } else { -2.0 };
                }
            }
            BoostType::Gentle => {
                for i in 0..n {
                    data.targets[i] = self.orig_response[i] as f32;
                }
            }
            BoostType::Discrete | BoostType::Real => {}
        }
    }

    /// Apply one round's reweighting rule after `tree` was added.
    fn update_weights<I: SampleIdx>(
        &mut self,
        tree: &mut Tree,
        data: &mut TrainData<'_, I>,
        boost_type: BoostType,
    ) {
        let n = self.weights.len();

        // The tree trainer recorded leaf values for the samples it trained
        // on; fill in the rest by prediction (second phase of the scan).
        for i in 0..n {
            if !self.active[i] {
                self.weak_eval[i] = tree.predict(|var| data.var_value(var as usize, i));
            }
        }

        let mut sum_w = 0.0f64;
        match boost_type {
            BoostType::Discrete => {
                // err = sum(w_i * [f_i != y_i]) / sum(w_i)
                // C = log((1 - err) / err), misclassified scaled by exp(C)
                let mut total = 0.0;
                let mut err = 0.0;
                for i in 0..n {
                    total += self.weights[i];
                    if self.weak_eval[i] != self.orig_response[i] {
                        err += self.weights[i];
                    }
                }
                if total != 0.0 {
                    err /= total;
                }
                let c = -log_ratio(err);
                let scale_wrong = c.exp();
                for i in 0..n {
                    if self.weak_eval[i] != self.orig_response[i] {
                        self.weights[i] *= scale_wrong;
                    }
                    sum_w += self.weights[i];
                }
                tree.scale(c);
            }
            BoostType::Real | BoostType::Gentle => {
                // w_i <- w_i * exp(-y_i * f_i)
                for i in 0..n {
                    self.weights[i] *= (-self.orig_response[i] * self.weak_eval[i]).exp();
                    sum_w += self.weights[i];
                }
            }
            BoostType::Logit => {
                // F_i += 0.5 f_i; p = 1 / (1 + exp(-2 F_i));
                // w_i = max(p (1 - p), eps); z_i = +-1/p clamped to |z| <= 10
                let targets = &mut data.targets;
                for i in 0..n {
                    let s = self.sum_response[i] + 0.5 * self.weak_eval[i];
                    self.sum_response[i] = s;
                    let p = 1.0 / (1.0 + (-2.0 * s).exp());
                    let w = (p * (1.0 - p)).max(LB_WEIGHT_THRESH);
                    self.weights[i] = w;
                    sum_w += w;
                    targets[i] = if self.orig_response[i] > 0.0 {
                        (1.0 / p).min(LB_Z_MAX) as f32
                    } else {
                        -((1.0 / (1.0 - p)).min(LB_Z_MAX)) as f32
                    };
                }
            }
        }

        // Renormalise to sum 1.
        if sum_w > f32::EPSILON as f64 {
            let inv = 1.0 / sum_w;
            for w in &mut self.weights {
                *w *= inv;
            }
        }
    }

    /// Deactivate the lightest samples: the ascending-weight prefix whose
    /// mass fits in `1 - rate`. Weights are kept, so later rounds can
    /// reactivate a sample whose weight grows back. Rates outside (0, 1)
    /// disable trimming.
    fn trim_weights(&mut self, rate: f64) {
        if rate <= 0.0 || rate >= 1.0 {
            self.active.fill(true);
            return;
        }
        let mut sorted = self.weights.clone();
        sorted.sort_unstable_by(f64::total_cmp);

        let mut budget = 1.0 - rate;
        let mut i = 0;
        while i < sorted.len() {
            if budget <= 0.0 {
                break;
            }
            budget -= sorted[i];
            i += 1;
        }
        let threshold = if i < sorted.len() { sorted[i] } else { f64::MAX };

        for (a, &w) in self.active.iter_mut().zip(&self.weights) {
            *a = w >= threshold;
        }
    }

    fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }
}

// ============================================================================
// Stage threshold selection
// ============================================================================

struct StageEval {
    threshold: f32,
    tar: f32,
    far: f32,
}

/// Select the stage threshold from the current ensemble's scores.
///
/// The threshold is the `floor((1 - min_tar) * P)`-th smallest positive
/// score, which accepts at least `min_tar` of the positives by
/// construction; positives tied with the threshold from below are counted
/// as accepted. The false-accept rate is measured over the negatives with
/// the same epsilon on the thresholded score.
fn stage_threshold<I: SampleIdx>(
    data: &TrainData<'_, I>,
    trees: &[Tree],
    min_tar: f32,
) -> StageEval {
    let n = data.sample_count;
    let raw_score = |sample: usize| -> f32 {
        trees
            .iter()
            .map(|t| t.predict(|var| data.var_value(var as usize, sample)))
            .sum::<f64>() as f32
    };

    let mut pos_scores: Vec<f32> = (0..n)
        .filter(|&i| data.label(i) == 1.0)
        .map(raw_score)
        .collect();
    pos_scores.sort_unstable_by(f32::total_cmp);

    let num_pos = pos_scores.len();
    let num_neg = n - num_pos;
    debug_assert!(num_pos > 0 && num_neg > 0);

    let k = ((1.0 - min_tar) * num_pos as f32) as usize;
    let threshold = pos_scores[k];

    let mut num_true_accepts = num_pos - k;
    for i in (0..k).rev() {
        if pos_scores[i] - threshold > -f32::EPSILON {
            num_true_accepts += 1;
        }
    }
    let tar = num_true_accepts as f32 / num_pos as f32;

    let num_false_accepts = (0..n)
        .filter(|&i| data.label(i) == 0.0)
        .filter(|&i| raw_score(i) - threshold > -f32::EPSILON)
        .count();
    let far = num_false_accepts as f32 / num_neg as f32;

    StageEval {
        threshold,
        tar,
        far,
    }
}

// ============================================================================
// Tests
// ============================================================================
