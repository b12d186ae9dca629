//! cascade-boost: one stage of a rejection cascade, trained by boosting.
//!
//! This crate trains a single cascade stage for binary classification: a
//! boosted ensemble of shallow decision trees over a fixed sample pool,
//! grown until the stage keeps at least `min_tar` of the positives while
//! its false-accept rate drops to `max_far`, then serialized as a
//! named-node document.
//!
//! # Key Types
//!
//! - [`CascadeBoost`] - train a stage, predict, save/load
//! - [`CascadeParams`] / [`BoostType`] - stage configuration
//! - [`SampleStorage`] / [`Representation`] - the sample pool and the
//!   feature representation it evaluates
//! - [`TrainingLogger`] / [`Verbosity`] - progress reporting
//!
//! # Example
//!
//! ```ignore
//! use cascade_boost::{CascadeBoost, CascadeParams, SampleStorage};
//!
//! let mut pool = SampleStorage::new(rep, num_samples);
//! for (i, (image, label)) in images.iter().enumerate() {
//!     pool.set_image(image.view(), *label, i);
//! }
//!
//! let params = CascadeParams {
//!     min_tar: 0.995,
//!     max_far: 0.5,
//!     max_depth: 1,
//!     weak_count: 100,
//!     ..Default::default()
//! };
//! let stage = CascadeBoost::train(&pool, params)?;
//! stage.save("stage.json")?;
//! ```
//!
//! # How training works
//!
//! Feature responses are precomputed into budgeted caches, including a
//! per-feature argsort that split search reuses for every node: splitting
//! a node relocates the sorted order into its children instead of
//! re-sorting. The boosting loop (Discrete, Real, Gentle AdaBoost or
//! LogitBoost) reweights samples after every tree, trims the lightest
//! samples out of the next round, and re-selects the stage threshold from
//! the positive score distribution until the stage targets are met.

pub mod error;
pub mod logger;
pub mod params;
pub mod persist;
pub mod storage;
pub mod training;
pub mod tree;

pub(crate) mod precalc;

pub use error::{
    BufferError, IndexArrayError, ParamError, PersistError, PredictError, TrainError,
};
pub use logger::{TrainingLogger, Verbosity};
pub use params::{BoostType, CascadeParams};
pub use persist::{NodeWord, StageDocument, StageSchema, WeakClassifierSchema};
pub use storage::{DataSource, Representation, SampleStorage};
pub use training::CascadeBoost;
pub use tree::{SplitTest, Tree, TreeNode};
