use serde::{Deserialize, Serialize};
use varisens_core::{Dataset, Pairing, Trajectory};

use crate::{CubicSpline, SolveError};

/// Replacement value for objective terms whose variance denominator is zero
/// or otherwise produces a non-finite result. Masking these terms (instead
/// of propagating inf/NaN or raising) is a deliberate policy: near-zero
/// measured variances are common in normalized data and must not poison a
/// whole objective vector.
pub const OBJECTIVE_CLAMP: f64 = 1e-100;

/// Where the comparator gets measurement variances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Variance {
    /// Read variances from the dataset row immediately after each paired
    /// measurement row.
    FromData,
    /// Assume a relative error: variance = `(fraction * measurement)^2`.
    Relative(f64),
}

impl Default for Variance {
    /// The 10% relative-error assumption.
    fn default() -> Self {
        Variance::Relative(0.1)
    }
}

impl Variance {
    pub(crate) fn needs_variance_row(self) -> bool {
        matches!(self, Variance::FromData)
    }
}

/// Scores a simulated trajectory against experimental data.
///
/// For each pairing, the simulated observable is fit with a cubic spline
/// over the simulation time grid and resampled at the experimental
/// timestamps; the objective is
///
/// ```text
/// sum_t (sim(t) - exp(t))^2 / (2 * sigma(t)^2)
/// ```
///
/// Output order is pairing order, and identical inputs give bit-identical
/// output.
///
/// # Errors
///
/// Malformed pairings surface as [`SolveError::Config`] before any
/// resampling work; a degenerate simulation time grid fails the spline fit.
pub fn compare(
    dataset: &Dataset,
    trajectory: &Trajectory,
    pairings: &[Pairing],
    variance: Variance,
) -> Result<Vec<f64>, SolveError> {
    Pairing::validate(
        pairings,
        dataset,
        trajectory.n_observables(),
        variance.needs_variance_row(),
    )?;

    let sim_time = trajectory.time().to_vec();
    let exp_time = dataset.time().to_vec();

    let mut objectives = Vec::with_capacity(pairings.len());
    for pairing in pairings {
        let sim = trajectory.observable(pairing.sim_obs).to_vec();
        let spline = CubicSpline::fit(&sim_time, &sim)?;
        let resampled = spline.eval_many(&exp_time);

        let measured = dataset.row(pairing.data_row);
        let mut total = 0.0;
        for (k, (&sim_value, &exp_value)) in resampled.iter().zip(measured.iter()).enumerate() {
            let two_sigma_sq = match variance {
                Variance::FromData => 2.0 * dataset.row(pairing.data_row + 1)[k],
                Variance::Relative(fraction) => {
                    let sigma = fraction * exp_value;
                    2.0 * sigma * sigma
                }
            };
            let diff = sim_value - exp_value;
            let mut term = diff * diff / two_sigma_sq;
            if !term.is_finite() {
                term = OBJECTIVE_CLAMP;
            }
            total += term;
        }
        objectives.push(total);
    }

    Ok(objectives)
}
