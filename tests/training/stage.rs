//! Stage-training integration tests.
//!
//! End-to-end behaviour of the boosting loop against the stage targets:
//! separability, per-round improvement, trimming, cache equivalence,
//! threshold tie handling and determinism.

use cascade_boost::{BoostType, CascadeBoost, CascadeParams, DataSource, SampleStorage};

use crate::common::{pool_from_rows, ComponentRep, Lcg};

/// TAR/FAR of a trained stage measured over its own pool.
fn measure(stage: &CascadeBoost, pool: &SampleStorage<ComponentRep>) -> (f32, f32) {
    let n = pool.num_samples();
    let (mut pos, mut pos_acc, mut neg, mut neg_acc) = (0u32, 0u32, 0u32, 0u32);
    for i in 0..n {
        let accepted = stage.predict(pool, i, true).unwrap() > -f32::EPSILON;
        if pool.label(i) == 1.0 {
            pos += 1;
            pos_acc += u32::from(accepted);
        } else {
            neg += 1;
            neg_acc += u32::from(accepted);
        }
    }
    (pos_acc as f32 / pos as f32, neg_acc as f32 / neg as f32)
}

/// Pool with `features` noisy copies of the label signal.
fn noisy_pool(
    n: usize,
    features: usize,
    amplitude: f32,
    seed: u64,
) -> SampleStorage<ComponentRep> {
    let mut rng = Lcg::new(seed);
    let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
    let rows: Vec<Vec<f32>> = labels
        .iter()
        .map(|&y| (0..features).map(|_| y + rng.noise(amplitude)).collect())
        .collect();
    pool_from_rows(&rows, &labels)
}

#[test]
fn trivially_separable_pool_needs_one_stump() {
    let pool = pool_from_rows(
        &[vec![0.0], vec![0.0], vec![1.0], vec![1.0]],
        &[0.0, 0.0, 1.0, 1.0],
    );
    let params = CascadeParams {
        boost_type: BoostType::Gentle,
        min_tar: 0.99,
        max_far: 0.01,
        max_depth: 1,
        min_sample_count: 1,
        weak_count: 100,
        ..Default::default()
    };

    let stage = CascadeBoost::train(&pool, params).unwrap();

    assert_eq!(stage.weak_count(), 1);
    let (tar, far) = measure(&stage, &pool);
    assert_eq!(tar, 1.0);
    assert_eq!(far, 0.0);
}

#[test]
fn logit_far_does_not_regress_across_rounds() {
    // Overlapping classes keep the stage target out of reach, so each run
    // spends its full weak-count budget; the run with k+1 trees extends
    // the run with k, giving the per-round FAR sequence.
    let pool = noisy_pool(100, 2, 0.6, 7);
    let far_by_round: Vec<f32> = (1..=5)
        .map(|weak_count| {
            let params = CascadeParams {
                boost_type: BoostType::Logit,
                min_tar: 0.98,
                max_far: 1e-4,
                max_depth: 1,
                min_sample_count: 2,
                weak_count,
                ..Default::default()
            };
            let stage = CascadeBoost::train(&pool, params).unwrap();
            let (tar, far) = measure(&stage, &pool);
            assert!(tar >= 0.98, "round {weak_count}: TAR {tar} under target");
            far
        })
        .collect();

    for pair in far_by_round.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-6,
            "FAR regressed between rounds: {far_by_round:?}"
        );
    }
}

#[test]
fn trim_rate_zero_equals_trimming_disabled() {
    let pool = noisy_pool(60, 2, 0.5, 11);
    let base = CascadeParams {
        boost_type: BoostType::Gentle,
        min_tar: 0.95,
        max_far: 0.05,
        max_depth: 2,
        min_sample_count: 2,
        weak_count: 6,
        ..Default::default()
    };

    let zero = CascadeBoost::train(
        &pool,
        CascadeParams {
            weight_trim_rate: 0.0,
            ..base.clone()
        },
    )
    .unwrap();
    // Rates outside (0, 1) disable trimming outright.
    let disabled = CascadeBoost::train(
        &pool,
        CascadeParams {
            weight_trim_rate: 2.0,
            ..base
        },
    )
    .unwrap();

    assert_eq!(zero.to_document(), disabled.to_document());
    assert_eq!(zero.threshold(), disabled.threshold());
}

#[test]
fn uncached_training_matches_fully_cached() {
    let pool = noisy_pool(80, 3, 0.5, 23);
    let base = CascadeParams {
        boost_type: BoostType::Gentle,
        min_tar: 0.97,
        max_far: 0.02,
        max_depth: 2,
        min_sample_count: 2,
        weak_count: 8,
        ..Default::default()
    };

    let cached = CascadeBoost::train(
        &pool,
        CascadeParams {
            precalc_val_mib: 256,
            precalc_idx_mib: 256,
            ..base.clone()
        },
    )
    .unwrap();
    let uncached = CascadeBoost::train(
        &pool,
        CascadeParams {
            precalc_val_mib: 0,
            precalc_idx_mib: 0,
            ..base
        },
    )
    .unwrap();

    assert_eq!(cached.to_document(), uncached.to_document());
    assert_eq!(cached.threshold(), uncached.threshold());
}

#[test]
fn tied_positive_scores_all_accepted_at_threshold() {
    // Every positive carries the same response, so every positive lands on
    // the stage threshold; the tie rule must accept all of them.
    let rows = vec![
        vec![0.1],
        vec![0.2],
        vec![0.3],
        vec![0.9],
        vec![0.9],
        vec![0.9],
        vec![0.9],
        vec![0.9],
    ];
    let labels = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
    let pool = pool_from_rows(&rows, &labels);

    let params = CascadeParams {
        boost_type: BoostType::Gentle,
        min_tar: 0.6,
        max_far: 0.01,
        max_depth: 1,
        min_sample_count: 1,
        weak_count: 4,
        ..Default::default()
    };
    let stage = CascadeBoost::train(&pool, params).unwrap();

    let (tar, _) = measure(&stage, &pool);
    assert_eq!(tar, 1.0, "positives tied at the threshold must be accepted");
}

#[test]
fn training_is_deterministic() {
    let params = CascadeParams {
        boost_type: BoostType::Real,
        min_tar: 0.97,
        max_far: 0.05,
        max_depth: 2,
        min_sample_count: 2,
        weak_count: 6,
        ..Default::default()
    };

    let pool_a = noisy_pool(90, 2, 0.5, 41);
    let pool_b = noisy_pool(90, 2, 0.5, 41);
    let a = CascadeBoost::train(&pool_a, params.clone()).unwrap();
    let b = CascadeBoost::train(&pool_b, params).unwrap();

    assert_eq!(a.to_document(), b.to_document());
    assert_eq!(a.threshold(), b.threshold());
}

#[test]
fn all_boost_types_reach_the_targets_on_separable_data() {
    let pool = noisy_pool(64, 2, 0.2, 5);
    for boost_type in [
        BoostType::Discrete,
        BoostType::Real,
        BoostType::Logit,
        BoostType::Gentle,
    ] {
        let params = CascadeParams {
            boost_type,
            min_tar: 0.95,
            max_far: 0.05,
            max_depth: 1,
            min_sample_count: 2,
            weak_count: 20,
            ..Default::default()
        };
        let stage = CascadeBoost::train(&pool, params).unwrap();
        let (tar, far) = measure(&stage, &pool);
        assert!(
            tar >= 0.95 && far <= 0.05,
            "{boost_type:?}: TAR {tar}, FAR {far}"
        );
    }
}

#[test]
fn caller_boost_type_is_respected() {
    // The configured reweighting rule must drive training; Discrete leaves
    // scaled class votes in the trees, so the document differs from a
    // Gentle run on the same pool.
    let pool = noisy_pool(64, 2, 0.6, 13);
    let base = CascadeParams {
        min_tar: 0.95,
        max_far: 1e-4,
        max_depth: 1,
        min_sample_count: 2,
        weak_count: 3,
        ..Default::default()
    };

    let discrete = CascadeBoost::train(
        &pool,
        CascadeParams {
            boost_type: BoostType::Discrete,
            ..base.clone()
        },
    )
    .unwrap();
    let gentle = CascadeBoost::train(
        &pool,
        CascadeParams {
            boost_type: BoostType::Gentle,
            ..base
        },
    )
    .unwrap();

    assert_eq!(discrete.params().boost_type, BoostType::Discrete);
    assert_ne!(discrete.to_document(), gentle.to_document());
}
