//! Sample pool storage.
//!
//! [`SampleStorage`] owns the preprocessed sample matrix and the label
//! vector for one stage training run. It evaluates features lazily through
//! a [`Representation`] and is consumed by the precompute engine and the
//! training loop through the [`DataSource`] seam.
//!
//! Responses are required to be stable: `response(f, s)` must return the
//! same value on every call, since precompute sorts by it once and split
//! propagation relies on the order staying valid.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

// ============================================================================
// Representation
// ============================================================================

/// Feature representation consumed by the stage trainer.
///
/// The representation defines a preprocessing step that maps a raw image to
/// a flat float window, and evaluates an indexed feature on such a window.
pub trait Representation: Send + Sync {
    /// Length of one preprocessed sample window.
    fn window_len(&self) -> usize;

    /// Number of features the representation can evaluate.
    fn num_features(&self) -> usize;

    /// Preprocess a raw image into a flat window of [`window_len`] floats.
    ///
    /// [`window_len`]: Representation::window_len
    fn preprocess(&self, image: ArrayView2<'_, f32>) -> Array1<f32>;

    /// Evaluate one feature on a preprocessed window.
    fn evaluate(&self, window: ArrayView1<'_, f32>, feature: usize) -> f32;
}

// ============================================================================
// DataSource
// ============================================================================

/// Read seam between storage and training.
///
/// Everything the precompute engine and the tree trainer need from the
/// pool: its shape, per-(feature, sample) responses and per-sample labels.
pub trait DataSource: Sync {
    /// Number of features.
    fn num_features(&self) -> usize;

    /// Number of samples in the pool.
    fn num_samples(&self) -> usize;

    /// Response of `feature` on `sample`. Stable across calls.
    fn response(&self, feature: usize, sample: usize) -> f32;

    /// Label of `sample`, 0.0 or 1.0.
    fn label(&self, sample: usize) -> f32;
}

// ============================================================================
// SampleStorage
// ============================================================================

/// Owns the sample matrix (`num_samples x window_len`) and the labels.
pub struct SampleStorage<R> {
    rep: R,
    data: Array2<f32>,
    labels: Array1<f32>,
}

impl<R: Representation> SampleStorage<R> {
    /// Allocate a pool of `num_samples` windows for `rep`.
    pub fn new(rep: R, num_samples: usize) -> Self {
        let window_len = rep.window_len();
        Self {
            rep,
            data: Array2::zeros((num_samples, window_len)),
            labels: Array1::zeros(num_samples),
        }
    }

    /// The representation this pool evaluates features with.
    pub fn representation(&self) -> &R {
        &self.rep
    }

    /// Preprocess `image` and install it at pool slot `index` with `label`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the preprocessed window does not
    /// match the representation's window length.
    pub fn set_image(&mut self, image: ArrayView2<'_, f32>, label: f32, index: usize) {
        assert!(
            index < self.data.nrows(),
            "invalid index {index} into pool of size {}",
            self.data.nrows()
        );
        let window = self.rep.preprocess(image);
        assert_eq!(
            window.len(),
            self.data.ncols(),
            "preprocessed window length does not match the representation"
        );
        self.data.row_mut(index).assign(&window);
        self.labels[index] = label;
    }

    /// Install an already-preprocessed window at pool slot `index`.
    pub fn set_window(&mut self, window: ArrayView1<'_, f32>, label: f32, index: usize) {
        assert!(
            index < self.data.nrows(),
            "invalid index {index} into pool of size {}",
            self.data.nrows()
        );
        self.data.row_mut(index).assign(&window);
        self.labels[index] = label;
    }

    /// Shrink the payload to a single placeholder window for inference-only
    /// use. Labels are reduced alongside; responses become meaningless.
    pub fn free_train_data(&mut self) {
        self.data = Array2::zeros((1, self.rep.window_len()));
        self.labels = Array1::zeros(1);
    }
}

impl<R: Representation> DataSource for SampleStorage<R> {
    fn num_features(&self) -> usize {
        self.rep.num_features()
    }

    fn num_samples(&self) -> usize {
        self.data.nrows()
    }

    fn response(&self, feature: usize, sample: usize) -> f32 {
        self.rep.evaluate(self.data.row(sample), feature)
    }

    fn label(&self, sample: usize) -> f32 {
        self.labels[sample]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Identity representation: each feature reads one window component.
    struct PassThrough {
        len: usize,
    }

    impl Representation for PassThrough {
        fn window_len(&self) -> usize {
            self.len
        }

        fn num_features(&self) -> usize {
            self.len
        }

        fn preprocess(&self, image: ArrayView2<'_, f32>) -> Array1<f32> {
            image.iter().copied().collect()
        }

        fn evaluate(&self, window: ArrayView1<'_, f32>, feature: usize) -> f32 {
            window[feature]
        }
    }

    #[test]
    fn responses_read_installed_windows() {
        let mut storage = SampleStorage::new(PassThrough { len: 3 }, 2);
        storage.set_image(array![[1.0, 2.0, 3.0]].view(), 1.0, 0);
        storage.set_image(array![[4.0, 5.0, 6.0]].view(), 0.0, 1);

        assert_eq!(storage.num_samples(), 2);
        assert_eq!(storage.num_features(), 3);
        assert_eq!(storage.response(1, 0), 2.0);
        assert_eq!(storage.response(2, 1), 6.0);
        assert_eq!(storage.label(0), 1.0);
        assert_eq!(storage.label(1), 0.0);

        // Stability: repeated queries agree.
        assert_eq!(storage.response(1, 0), storage.response(1, 0));
    }

    #[test]
    fn free_train_data_leaves_placeholder() {
        let mut storage = SampleStorage::new(PassThrough { len: 4 }, 8);
        storage.free_train_data();
        assert_eq!(storage.num_samples(), 1);
    }

    #[test]
    #[should_panic(expected = "invalid index")]
    fn set_image_rejects_out_of_range() {
        let mut storage = SampleStorage::new(PassThrough { len: 2 }, 1);
        storage.set_image(array![[1.0, 2.0]].view(), 0.0, 5);
    }
}
