use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// An immutable experimental dataset.
///
/// Row 0 is the experimental time axis; each following row is a measured
/// series, optionally followed by its variance series (the comparator reads
/// variances from the row immediately after a measurement row when measured
/// variances are in use).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    rows: Array2<f64>,
}

impl Dataset {
    /// Wraps a `(k+1) × m` matrix whose first row is the time axis.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DatasetShape`] unless the matrix has a time
    /// row, at least one measurement row, and at least one time point.
    pub fn new(rows: Array2<f64>) -> Result<Self, ConfigError> {
        if rows.nrows() < 2 || rows.ncols() == 0 {
            return Err(ConfigError::DatasetShape);
        }
        Ok(Self { rows })
    }

    /// The experimental time axis.
    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.rows.row(0)
    }

    /// A data row by index (row 0 is the time axis).
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.rows.row(index)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.nrows()
    }

    pub fn n_points(&self) -> usize {
        self.rows.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }
}

/// Pairs one experimental data row with one simulated observable.
///
/// The pairing list's order defines the column order of every objective
/// vector the comparator and evaluator produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Dataset row holding the measured series (row 0 is the time axis).
    pub data_row: usize,
    /// Index of the simulated observable to score against it.
    pub sim_obs: usize,
}

impl Pairing {
    pub fn new(data_row: usize, sim_obs: usize) -> Self {
        Self { data_row, sim_obs }
    }

    /// Validates a pairing list against a dataset and an observable count.
    ///
    /// With `needs_variance_row` set, every paired measurement row must be
    /// followed by a variance row.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found; callers run this before any
    /// simulation so a malformed pairing never costs an integration.
    pub fn validate(
        pairings: &[Pairing],
        dataset: &Dataset,
        n_obs: usize,
        needs_variance_row: bool,
    ) -> Result<(), ConfigError> {
        for pairing in pairings {
            if pairing.data_row == 0
                || pairing.data_row >= dataset.n_rows()
                || pairing.sim_obs >= n_obs
            {
                return Err(ConfigError::PairingRange {
                    data_row: pairing.data_row,
                    sim_obs: pairing.sim_obs,
                    data_rows: dataset.n_rows(),
                    n_obs,
                });
            }
            if needs_variance_row && pairing.data_row + 1 >= dataset.n_rows() {
                return Err(ConfigError::MissingVarianceRow {
                    data_row: pairing.data_row,
                    variance_row: pairing.data_row + 1,
                    data_rows: dataset.n_rows(),
                });
            }
        }
        Ok(())
    }
}

/// A simulated trajectory: time axis plus one row per observable.
///
/// Shape is `(n_observables + 1) × n_timepoints` with the time axis in
/// row 0. Each solve produces a fresh trajectory owned by its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    combined: Array2<f64>,
}

impl Trajectory {
    /// Stacks a time axis on top of per-observable rows.
    ///
    /// # Panics
    ///
    /// Panics if `observables` columns disagree with the time length; both
    /// come from the same solve, so a mismatch is a solver bug rather than a
    /// user configuration error.
    pub fn new(time: Array1<f64>, observables: Array2<f64>) -> Self {
        assert_eq!(time.len(), observables.ncols());
        let mut combined = Array2::zeros((observables.nrows() + 1, time.len()));
        combined.row_mut(0).assign(&time);
        for (i, row) in observables.axis_iter(Axis(0)).enumerate() {
            combined.row_mut(i + 1).assign(&row);
        }
        Self { combined }
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.combined.row(0)
    }

    /// An observable row by observable index (not counting the time row).
    pub fn observable(&self, index: usize) -> ArrayView1<'_, f64> {
        self.combined.row(index + 1)
    }

    pub fn n_observables(&self) -> usize {
        self.combined.nrows() - 1
    }

    pub fn n_points(&self) -> usize {
        self.combined.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.combined.view()
    }

    /// Min-max normalizes each observable row in place to [0, 1].
    ///
    /// The time row is never touched. A constant row (min == max) carries no
    /// shape information and is left as-is rather than divided by zero.
    pub fn normalize_observables(&mut self) {
        for mut row in self.combined.axis_iter_mut(Axis(0)).skip(1) {
            let min = row.iter().copied().fold(f64::INFINITY, f64::min);
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max > min {
                row.mapv_inplace(|v| (v - min) / (max - min));
            }
        }
    }
}
