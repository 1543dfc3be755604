//! Shared fixtures for the varisens end-to-end tests.

use std::sync::Arc;

use ndarray::Array2;
use varisens_core::{Dataset, Expr, ExprModel, Initial, Observable, Parameter};

/// Exponential decay, dy/dt = -k * y, with a parameter-seeded start.
pub fn decay_model() -> Arc<ExprModel> {
    Arc::new(
        ExprModel::new(
            vec![
                Parameter::new("k_deg", 0.25),
                Parameter::new("y_0", 100.0),
            ],
            vec![Initial {
                species: 0,
                parameter: 1,
            }],
            vec![Observable::new("y", vec![0], vec![1.0])],
            vec![Expr::param(0).mul(Expr::state(0)).neg()],
        )
        .expect("decay model is well-formed"),
    )
}

/// Synthetic measurements of the nominal decay, on an irregular time grid.
pub fn decay_dataset() -> Dataset {
    let times: [f64; 8] = [0.0, 0.7, 1.5, 2.2, 3.6, 5.0, 7.5, 10.0];
    let mut rows = Array2::zeros((2, times.len()));
    for (j, &t) in times.iter().enumerate() {
        rows[[0, j]] = t;
        rows[[1, j]] = 100.0 * (-0.25 * t).exp();
    }
    Dataset::new(rows).expect("dataset is well-formed")
}
