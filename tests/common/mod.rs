//! Shared fixtures for the integration tests.

use cascade_boost::{Representation, SampleStorage};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Representation whose features read the window components directly:
/// feature `f` of a sample is component `f` of its preprocessed window.
pub struct ComponentRep {
    pub features: usize,
}

impl Representation for ComponentRep {
    fn window_len(&self) -> usize {
        self.features
    }

    fn num_features(&self) -> usize {
        self.features
    }

    fn preprocess(&self, image: ArrayView2<'_, f32>) -> Array1<f32> {
        image.iter().copied().collect()
    }

    fn evaluate(&self, window: ArrayView1<'_, f32>, feature: usize) -> f32 {
        window[feature]
    }
}

/// Build a pool from per-sample feature rows.
pub fn pool_from_rows(rows: &[Vec<f32>], labels: &[f32]) -> SampleStorage<ComponentRep> {
    assert_eq!(rows.len(), labels.len());
    let features = rows[0].len();
    let mut pool = SampleStorage::new(ComponentRep { features }, rows.len());
    for (i, (row, &label)) in rows.iter().zip(labels).enumerate() {
        let window = Array1::from(row.clone());
        pool.set_window(window.view(), label, i);
    }
    pool
}

/// Small deterministic generator for test noise; keeps runs reproducible
/// without seeding machinery.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1 << 24) as f32
    }

    /// Uniform in [-amplitude, amplitude].
    pub fn noise(&mut self, amplitude: f32) -> f32 {
        (self.next_f32() * 2.0 - 1.0) * amplitude
    }
}
