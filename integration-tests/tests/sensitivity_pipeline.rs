//! End-to-end sensitivity run on the two-parameter decay model.

use approx::assert_abs_diff_eq;
use integration_tests::{decay_dataset, decay_model};
use varisens_core::{KineticModel, Pairing};
use varisens_solve::{compare, Environment, SolveOptions, Variance};
use varisens_sobol::{estimate, DesignSet, Evaluator, LowDiscrepancy, Mapping};

#[test]
fn nominal_parameters_reproduce_the_data() {
    let model = decay_model();
    let mut env = Environment::setup(model.clone(), 1e-8, 1e-10, 201).unwrap();

    let solution = env
        .solve(10.0, &[0.25, 100.0], &SolveOptions::default())
        .unwrap();
    let objective = compare(
        &decay_dataset(),
        &solution.combined,
        &[Pairing::new(1, 0)],
        Variance::default(),
    )
    .unwrap();

    // The dataset is the nominal analytic decay, so the raw objective is
    // numerically zero.
    assert_abs_diff_eq!(objective[0], 0.0, epsilon = 1e-6);
}

#[test]
fn full_pipeline_produces_finite_indices() {
    let model = decay_model();
    let env = Environment::setup(model.clone(), 1e-6, 1e-8, 201).unwrap();

    let dataset = decay_dataset();
    let pairings = [Pairing::new(1, 0)];

    let mut seq = LowDiscrepancy::new(2 * model.parameters().len());
    let mapping = Mapping::log_uniform(1.0);
    let design = DesignSet::generate(&mut seq, &mapping, model.parameters(), 8).unwrap();

    let evaluation = Evaluator::new(&env, &dataset, &pairings, 10.0)
        .run(&design)
        .unwrap();

    assert_eq!(evaluation.y_a.shape(), &[8, 1]);
    assert_eq!(evaluation.y_b.shape(), &[8, 1]);
    assert_eq!(evaluation.y_c.shape(), &[2, 8, 1]);
    assert!(evaluation.failures.is_empty(), "{:?}", evaluation.failures);

    let indices = estimate(&evaluation).unwrap();
    assert_eq!(indices.first_order.shape(), &[2, 1]);
    assert_eq!(indices.total_effect.shape(), &[2, 1]);
    for value in indices.first_order.iter().chain(indices.total_effect.iter()) {
        assert!(value.is_finite());
    }
}

#[test]
fn unnormalized_run_scores_the_raw_trajectories() {
    let model = decay_model();
    let env = Environment::setup(model.clone(), 1e-6, 1e-8, 201).unwrap();

    let dataset = decay_dataset();
    let pairings = [Pairing::new(1, 0)];

    let mut seq = LowDiscrepancy::new(4);
    let mapping = Mapping::linear_cv(0.25);
    let design = DesignSet::generate(&mut seq, &mapping, model.parameters(), 4).unwrap();

    let normalized = Evaluator::new(&env, &dataset, &pairings, 10.0)
        .run(&design)
        .unwrap();
    let raw = Evaluator::new(&env, &dataset, &pairings, 10.0)
        .normalized(false)
        .run(&design)
        .unwrap();

    // The raw objective sees absolute concentrations (order 100), the
    // normalized one sees the unit interval; the two runs must differ.
    assert_ne!(normalized.y_a, raw.y_a);
    assert!(raw.failures.is_empty());
}

#[test]
fn subset_run_sweeps_only_the_chosen_parameter() {
    let model = decay_model();
    let env = Environment::setup(model.clone(), 1e-6, 1e-8, 201).unwrap();

    let dataset = decay_dataset();
    let pairings = [Pairing::new(1, 0)];

    // Sweep the decay rate only: design matrices are one column wide.
    let subset = [0usize];
    let swept = [model.parameters()[0].clone()];

    let mut seq = LowDiscrepancy::new(2);
    let design =
        DesignSet::generate(&mut seq, &Mapping::log_uniform(1.0), &swept, 6).unwrap();

    let evaluation = Evaluator::new(&env, &dataset, &pairings, 10.0)
        .subset(&subset)
        .run(&design)
        .unwrap();

    assert_eq!(evaluation.y_a.shape(), &[6, 1]);
    assert_eq!(evaluation.y_c.shape(), &[1, 6, 1]);
    assert!(evaluation.failures.is_empty());
}
