use ndarray::{s, Array2, Array3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use varisens_core::{ConfigError, Dataset, KineticModel, Pairing};
use varisens_solve::{compare, Environment, SolveOptions, Variance};

use crate::DesignSet;

/// Which design matrix a simulation task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixId {
    A,
    B,
    C,
}

/// A simulation task that failed without aborting the batch.
///
/// The corresponding output slot is NaN-filled;
/// [`Evaluation::prune_failures`] removes affected sample rows before
/// estimation.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub matrix: MatrixId,
    pub row: usize,
    /// C-matrix parameter index; `None` for A and B tasks.
    pub param: Option<usize>,
    pub message: String,
}

/// The assembled sensitivity outputs.
///
/// `y_a`/`y_b` have one row per sample and one column per pairing; `y_c`
/// stacks one such matrix per parameter.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub y_a: Array2<f64>,
    pub y_b: Array2<f64>,
    pub y_c: Array3<f64>,
    pub failures: Vec<TaskFailure>,
}

impl Evaluation {
    pub fn n_samples(&self) -> usize {
        self.y_a.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.y_c.shape()[0]
    }

    pub fn n_outputs(&self) -> usize {
        self.y_a.ncols()
    }

    /// Drops every sample row touched by a failed task, consistently across
    /// A, B, and all C slabs, so the estimator sees complete rows only.
    pub fn prune_failures(&self) -> Evaluation {
        let keep: Vec<usize> = (0..self.n_samples())
            .filter(|&row| {
                self.y_a.row(row).iter().all(|v| v.is_finite())
                    && self.y_b.row(row).iter().all(|v| v.is_finite())
                    && (0..self.n_params()).all(|k| {
                        self.y_c
                            .slice(s![k, row, ..])
                            .iter()
                            .all(|v| v.is_finite())
                    })
            })
            .collect();

        let n_outputs = self.n_outputs();
        let n_params = self.n_params();

        let mut y_a = Array2::zeros((keep.len(), n_outputs));
        let mut y_b = Array2::zeros((keep.len(), n_outputs));
        let mut y_c = Array3::zeros((n_params, keep.len(), n_outputs));
        for (new_row, &old_row) in keep.iter().enumerate() {
            y_a.row_mut(new_row).assign(&self.y_a.row(old_row));
            y_b.row_mut(new_row).assign(&self.y_b.row(old_row));
            for k in 0..n_params {
                y_c.slice_mut(s![k, new_row, ..])
                    .assign(&self.y_c.slice(s![k, old_row, ..]));
            }
        }

        Evaluation {
            y_a,
            y_b,
            y_c,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    A { row: usize },
    B { row: usize },
    C { param: usize, row: usize },
}

/// Drives one ODE solve plus comparison per design row and assembles
/// yA, yB, and yC.
///
/// The `2n + d·n` tasks are independent, so they run on the rayon pool with
/// one cloned [`Environment`] per worker; every task writes its own output
/// slot. Integrator failures are recorded per task, never fatal to the
/// batch.
pub struct Evaluator<'a, M: KineticModel> {
    environment: &'a Environment<M>,
    dataset: &'a Dataset,
    pairings: &'a [Pairing],
    t_final: f64,
    variance: Variance,
    normalize: bool,
    subset: Option<&'a [usize]>,
}

impl<'a, M: KineticModel> Evaluator<'a, M> {
    /// An evaluator with min-max normalization on and the default variance
    /// policy.
    pub fn new(
        environment: &'a Environment<M>,
        dataset: &'a Dataset,
        pairings: &'a [Pairing],
        t_final: f64,
    ) -> Self {
        Self {
            environment,
            dataset,
            pairings,
            t_final,
            variance: Variance::default(),
            normalize: true,
            subset: None,
        }
    }

    /// Sets the variance policy used by the comparator.
    pub fn variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    /// Turns per-observable min-max normalization on or off.
    ///
    /// Normalization rescales each simulated observable to [0, 1] across
    /// its own time series before comparison; the time axis is never
    /// rescaled, and constant series are left alone.
    pub fn normalized(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Restricts design columns to a subset of model parameter indices.
    ///
    /// With a subset of length `s`, design matrices must have `s` columns
    /// and only those parameters are overridden per solve; all others hold
    /// their nominal values.
    pub fn subset(mut self, subset: &'a [usize]) -> Self {
        self.subset = Some(subset);
        self
    }

    /// Runs every design row and assembles the output arrays.
    ///
    /// # Errors
    ///
    /// Configuration problems (design width vs. parameter count or subset,
    /// malformed pairings, out-of-range subset indices) are detected before
    /// any simulation and abort the run. Integrator failures do not: they
    /// are recorded in [`Evaluation::failures`].
    pub fn run(&self, design: &DesignSet) -> Result<Evaluation, ConfigError> {
        let model = self.environment.model();
        let n_model_params = model.parameters().len();

        let expected_cols = match self.subset {
            Some(subset) => {
                for &index in subset {
                    if index >= n_model_params {
                        return Err(ConfigError::ParameterIndex {
                            index,
                            count: n_model_params,
                        });
                    }
                }
                subset.len()
            }
            None => n_model_params,
        };
        if design.n_params() != expected_cols {
            return Err(ConfigError::DesignShape {
                expected: expected_cols,
                got: design.n_params(),
            });
        }

        Pairing::validate(
            self.pairings,
            self.dataset,
            model.observables().len(),
            matches!(self.variance, Variance::FromData),
        )?;

        let n = design.n_samples();
        let d = design.n_params();
        let n_outputs = self.pairings.len();

        let mut tasks = Vec::with_capacity(2 * n + d * n);
        tasks.extend((0..n).map(|row| Task::A { row }));
        tasks.extend((0..n).map(|row| Task::B { row }));
        for param in 0..d {
            tasks.extend((0..n).map(move |row| Task::C { param, row }));
        }

        info!(
            n_samples = n,
            n_params = d,
            simulations = tasks.len(),
            "running sensitivity evaluation"
        );

        let results: Vec<Result<Vec<f64>, String>> = tasks
            .par_iter()
            .map_init(
                || self.environment.clone(),
                |env, task| {
                    let row = match *task {
                        Task::A { row } => design.a.row(row),
                        Task::B { row } => design.b.row(row),
                        Task::C { param, row } => design.c.slice(s![param, row, ..]),
                    };
                    self.simulate_row(env, &row.to_vec())
                },
            )
            .collect();

        let mut y_a = Array2::zeros((n, n_outputs));
        let mut y_b = Array2::zeros((n, n_outputs));
        let mut y_c = Array3::zeros((d, n, n_outputs));
        let mut failures = Vec::new();

        for (task, result) in tasks.iter().zip(results) {
            let (mut slot, matrix, row, param) = match *task {
                Task::A { row } => (y_a.row_mut(row), MatrixId::A, row, None),
                Task::B { row } => (y_b.row_mut(row), MatrixId::B, row, None),
                Task::C { param, row } => (
                    y_c.slice_mut(s![param, row, ..]),
                    MatrixId::C,
                    row,
                    Some(param),
                ),
            };
            match result {
                Ok(objectives) => {
                    for (out, value) in slot.iter_mut().zip(objectives) {
                        *out = value;
                    }
                }
                Err(message) => {
                    warn!(?matrix, row, ?param, %message, "simulation task failed");
                    slot.fill(f64::NAN);
                    failures.push(TaskFailure {
                        matrix,
                        row,
                        param,
                        message,
                    });
                }
            }
        }

        if !failures.is_empty() {
            info!(
                failed = failures.len(),
                "evaluation finished with recorded task failures"
            );
        }

        Ok(Evaluation {
            y_a,
            y_b,
            y_c,
            failures,
        })
    }

    fn simulate_row(
        &self,
        env: &mut Environment<M>,
        row: &[f64],
    ) -> Result<Vec<f64>, String> {
        let opts = SolveOptions {
            subset: self.subset,
            ..SolveOptions::default()
        };
        let solution = env
            .solve(self.t_final, row, &opts)
            .map_err(|e| e.to_string())?;

        let mut trajectory = solution.combined;
        if self.normalize {
            trajectory.normalize_observables();
        }

        compare(self.dataset, &trajectory, self.pairings, self.variance)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn evaluation_with_bad_row() -> Evaluation {
        let mut y_a = Array2::zeros((3, 1));
        let y_b = Array2::zeros((3, 1));
        let mut y_c = Array3::zeros((2, 3, 1));
        y_a[[1, 0]] = f64::NAN;
        y_c[[0, 2, 0]] = f64::NAN;
        for row in 0..3 {
            y_c[[1, row, 0]] = row as f64;
        }
        Evaluation {
            y_a,
            y_b,
            y_c,
            failures: vec![TaskFailure {
                matrix: MatrixId::A,
                row: 1,
                param: None,
                message: "stiff".into(),
            }],
        }
    }

    #[test]
    fn prune_drops_rows_failed_anywhere() {
        let pruned = evaluation_with_bad_row().prune_failures();

        // Rows 1 (yA failure) and 2 (yC failure) are gone everywhere.
        assert_eq!(pruned.n_samples(), 1);
        assert_eq!(pruned.y_c.shape(), &[2, 1, 1]);
        assert!(pruned.failures.is_empty());
        assert_eq!(pruned.y_c[[1, 0, 0]], 0.0);
    }

    #[test]
    fn shape_accessors_match_arrays() {
        let eval = Evaluation {
            y_a: array![[0.0, 0.0], [0.0, 0.0]],
            y_b: array![[0.0, 0.0], [0.0, 0.0]],
            y_c: Array3::zeros((3, 2, 2)),
            failures: Vec::new(),
        };
        assert_eq!(eval.n_samples(), 2);
        assert_eq!(eval.n_params(), 3);
        assert_eq!(eval.n_outputs(), 2);
    }
}
