//! Benchmarks for concurrent feature evaluation.
//!
//! Measures evaluation throughput when several threads share one engine,
//! covering rule-less and rollout features, mixed workloads, and contention
//! from evaluator registrations racing with evaluations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flagwise::evaluators::PercentageRuleEvaluator;
use flagwise::model::{Feature, FeatureContext, FeatureRule};
use flagwise::FeatureEngine;
use std::sync::Arc;
use std::thread;

fn plain() -> Feature {
    Feature::new("plain", true)
}

fn rollout() -> Feature {
    Feature::new("rollout", true).with_rule(FeatureRule::new("Percentage").with_param("value", 50))
}

fn targeted() -> Feature {
    Feature::new("targeted", true).with_rule(
        FeatureRule::new("Targeting")
            .with_param("users", vec!["alice", "bob"])
            .with_param("defaultRolloutPercentage", 25),
    )
}

/// Runs `threads` threads, each evaluating `feature` for its own user.
fn evaluate_on_threads(engine: &Arc<FeatureEngine>, feature: &Arc<Feature>, threads: usize) {
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let engine = Arc::clone(engine);
            let feature = Arc::clone(feature);
            thread::spawn(move || {
                let ctx = FeatureContext::new().with_user_id(format!("user-{}", i));
                engine.evaluate_feature(black_box(&feature), black_box(&ctx))
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }
}

// ---------------------------------------------------------------------------
// C1: Single-threaded baseline
// ---------------------------------------------------------------------------

/// C1: Single-threaded evaluation baseline for comparison with concurrent benchmarks.
fn concurrent_rollout_1t(c: &mut Criterion) {
    let engine = FeatureEngine::with_builtin_evaluators();
    let feature = rollout();
    let ctx = FeatureContext::new().with_user_id("user-0");

    c.bench_function("concurrent_rollout_1t", |b| {
        b.iter(|| engine.evaluate_feature(black_box(&feature), black_box(&ctx)))
    });
}

// ---------------------------------------------------------------------------
// C2-C4: Threads sharing one engine
// ---------------------------------------------------------------------------

/// C2: 4 threads evaluating a rule-less feature.
fn concurrent_plain_4t(c: &mut Criterion) {
    let engine = Arc::new(FeatureEngine::with_builtin_evaluators());
    let feature = Arc::new(plain());

    c.bench_function("concurrent_plain_4t", |b| {
        b.iter(|| evaluate_on_threads(&engine, &feature, 4))
    });
}

/// C3: 4 threads evaluating a percentage rollout.
fn concurrent_rollout_4t(c: &mut Criterion) {
    let engine = Arc::new(FeatureEngine::with_builtin_evaluators());
    let feature = Arc::new(rollout());

    c.bench_function("concurrent_rollout_4t", |b| {
        b.iter(|| evaluate_on_threads(&engine, &feature, 4))
    });
}

/// C4: 8 threads evaluating a percentage rollout.
fn concurrent_rollout_8t(c: &mut Criterion) {
    let engine = Arc::new(FeatureEngine::with_builtin_evaluators());
    let feature = Arc::new(rollout());

    c.bench_function("concurrent_rollout_8t", |b| {
        b.iter(|| evaluate_on_threads(&engine, &feature, 8))
    });
}

// ---------------------------------------------------------------------------
// C5: Mixed workload
// ---------------------------------------------------------------------------

/// C5: 4 threads with a mixed workload (plain, rollout and targeting).
fn concurrent_mixed_4t(c: &mut Criterion) {
    let engine = Arc::new(FeatureEngine::with_builtin_evaluators());
    let features = Arc::new(vec![plain(), rollout(), targeted(), rollout()]);

    c.bench_function("concurrent_mixed_4t", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let engine = Arc::clone(&engine);
                    let features = Arc::clone(&features);
                    thread::spawn(move || {
                        let ctx = FeatureContext::new().with_user_id(format!("user-{}", i));
                        engine.evaluate_feature(black_box(&features[i]), black_box(&ctx))
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
        })
    });
}

// ---------------------------------------------------------------------------
// C6: Registration racing with evaluation
// ---------------------------------------------------------------------------

/// C6: 3 evaluating threads plus 1 thread re-registering an evaluator.
fn concurrent_register_contention(c: &mut Criterion) {
    let engine = Arc::new(FeatureEngine::with_builtin_evaluators());
    let feature = Arc::new(rollout());

    c.bench_function("concurrent_register_contention", |b| {
        b.iter(|| {
            let writer = {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.register(Arc::new(PercentageRuleEvaluator)))
            };
            evaluate_on_threads(&engine, &feature, 3);
            writer.join().unwrap();
        })
    });
}

criterion_group!(
    benches,
    concurrent_rollout_1t,
    concurrent_plain_4t,
    concurrent_rollout_4t,
    concurrent_rollout_8t,
    concurrent_mixed_4t,
    concurrent_register_contention,
);
criterion_main!(benches);
