//! Persistence integration tests: stage document and parameter stream.

mod common;

use cascade_boost::{BoostType, CascadeBoost, CascadeParams, SampleStorage};

use common::{pool_from_rows, ComponentRep, Lcg};

/// Heavily overlapped pool: the stage target stays out of reach, so the
/// loop spends its whole weak-count budget.
fn overlapped_pool(n: usize, features: usize, seed: u64) -> SampleStorage<ComponentRep> {
    let mut rng = Lcg::new(seed);
    let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
    let rows: Vec<Vec<f32>> = labels
        .iter()
        .map(|&y| (0..features).map(|_| y + rng.noise(1.2)).collect())
        .collect();
    pool_from_rows(&rows, &labels)
}

/// Units in the last place between two finite floats of the same sign.
fn ulp_distance(a: f32, b: f32) -> u32 {
    if a == b {
        return 0;
    }
    let (a, b) = (a.to_bits() as i64, b.to_bits() as i64);
    (a - b).unsigned_abs().min(u32::MAX as u64) as u32
}

#[test]
fn five_tree_stage_survives_a_file_round_trip() {
    let pool = overlapped_pool(200, 2, 99);
    let params = CascadeParams {
        boost_type: BoostType::Gentle,
        min_tar: 0.995,
        max_far: 0.01,
        max_depth: 2,
        min_sample_count: 5,
        weak_count: 5,
        ..Default::default()
    };
    let stage = CascadeBoost::train(&pool, params.clone()).unwrap();
    assert_eq!(stage.weak_count(), 5, "overlapped pool must use the full budget");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.json");
    stage.save(&path).unwrap();
    let loaded = CascadeBoost::load(&path, &params).unwrap();

    assert_eq!(loaded.weak_count(), stage.weak_count());
    assert_eq!(loaded.threshold(), stage.threshold());
    for i in 0..200 {
        let a = stage.predict(&pool, i, false).unwrap();
        let b = loaded.predict(&pool, i, false).unwrap();
        // Scores near zero may sit many ulps apart while agreeing to the
        // leaf-value rounding; bound both measures.
        assert!(
            ulp_distance(a, b) <= 1 || (a - b).abs() <= 1e-6,
            "sample {i}: {a} vs {b} differ by more than 1 ulp"
        );
    }
}

#[test]
fn reloaded_document_is_stable() {
    // Writing the loaded stage again must reproduce the document exactly.
    let pool = overlapped_pool(120, 2, 3);
    let params = CascadeParams {
        min_tar: 0.99,
        max_far: 0.01,
        max_depth: 2,
        min_sample_count: 5,
        weak_count: 3,
        ..Default::default()
    };
    let stage = CascadeBoost::train(&pool, params.clone()).unwrap();

    let mut first = Vec::new();
    stage.write_json(&mut first).unwrap();
    let loaded = CascadeBoost::read_json(first.as_slice(), &params).unwrap();
    let mut second = Vec::new();
    loaded.write_json(&mut second).unwrap();

    assert_eq!(first, second);
}

#[test]
fn params_stream_file_round_trip() {
    let written = CascadeParams {
        boost_type: BoostType::Real,
        min_tar: 0.97,
        max_far: 0.4,
        weight_trim_rate: 0.9,
        max_depth: 2,
        weak_count: 17,
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.params");
    written
        .write_to(std::fs::File::create(&path).unwrap())
        .unwrap();

    let mut read = CascadeParams::default();
    read.read_from(std::fs::File::open(&path).unwrap()).unwrap();

    assert_eq!(read.boost_type, BoostType::Real);
    assert_eq!(read.min_tar, 0.97);
    assert_eq!(read.max_far, 0.4);
    assert_eq!(read.weight_trim_rate, 0.9);
    assert_eq!(read.max_depth, 2);
    assert_eq!(read.weak_count, 17);
}
