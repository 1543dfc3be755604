//! Final-timepoint observable screening.
//!
//! Where the sensitivity pipeline scores whole trajectories against data,
//! screening asks a cheaper question: where do the observables end up at
//! the final time point when parameters are jittered around their nominal
//! values? Two flavors: jitter only the initial-condition parameters, or
//! jitter everything and knock a few parameters out entirely per sample.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::seq::index::sample as sample_indices;
use rand::SeedableRng;
use thiserror::Error;
use tracing::info;
use varisens_core::{ConfigError, KineticModel};
use varisens_solve::{Environment, SolveError, SolveOptions};

use crate::quantile::gaussian_quantile;
use crate::LowDiscrepancy;

/// Error from a screening run.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Settings for [`knockout_survey`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyConfig {
    pub n_samples: usize,
    /// Parameters zeroed per sample.
    pub knockouts: usize,
    /// Relative standard deviation of the Gaussian jitter.
    pub sd: f64,
    pub t_final: f64,
    /// Seed for knockout selection.
    pub seed: u64,
}

/// Samples initial conditions and collects final observable values.
///
/// Each draw jitters the model's initial-condition parameters with a
/// Gaussian of relative standard deviation `sd` about their nominal values
/// (rate parameters stay nominal), integrates to `t_final`, and records
/// every observable's final-timepoint value. Returns an
/// `n_samples × n_observables` matrix.
///
/// # Errors
///
/// The stream must have one dimension per initial-condition entry;
/// integration failures abort the screen (unlike the sensitivity batch,
/// there is no partial result worth keeping here).
pub fn final_observables<M: KineticModel>(
    environment: &Environment<M>,
    seq: &mut LowDiscrepancy,
    sd: f64,
    n_samples: usize,
    t_final: f64,
) -> Result<Array2<f64>, ScreenError> {
    let model = environment.model();
    let ic_params: Vec<usize> = model.initials().iter().map(|init| init.parameter).collect();
    if seq.dims() != ic_params.len() {
        return Err(ConfigError::SequenceDimensions {
            expected: ic_params.len(),
            got: seq.dims(),
        }
        .into());
    }

    let nominal = environment.nominal_params();
    let n_obs = model.observables().len();
    let mut worker = environment.clone();
    let mut out = Array2::zeros((n_samples, n_obs));

    info!(n_samples, n_obs, "screening initial conditions");

    for i in 0..n_samples {
        let point = seq.next_point();
        let updates: Vec<(usize, f64)> = ic_params
            .iter()
            .zip(&point)
            .map(|(&index, &u)| (index, nominal[index] * gaussian_quantile(u, 1.0, sd)))
            .collect();
        worker.set_initial_params(&updates)?;

        let solution = worker.solve(t_final, &nominal, &SolveOptions::default())?;
        let last = solution.observables.ncols() - 1;
        for obs in 0..n_obs {
            out[[i, obs]] = solution.observables[[obs, last]];
        }
    }

    Ok(out)
}

/// Samples every parameter, knocks a few out per draw, and writes
/// `params.csv` and `observations.csv` under `out_dir`.
///
/// Each sample jitters all parameters with the Gaussian mapping, then zeroes
/// `knockouts` randomly chosen parameters (seeded, reproducible). Sampled
/// initial-condition parameters are re-seeded into the environment, so
/// knockouts and jitter reach the starting state as well as the rates.
///
/// # Errors
///
/// The stream must have one dimension per model parameter; file and
/// integration failures abort the survey.
pub fn knockout_survey<M: KineticModel>(
    environment: &Environment<M>,
    seq: &mut LowDiscrepancy,
    config: &SurveyConfig,
    out_dir: &Path,
) -> Result<(), ScreenError> {
    let model = environment.model();
    let d = model.parameters().len();
    if seq.dims() != d {
        return Err(ConfigError::SequenceDimensions {
            expected: d,
            got: seq.dims(),
        }
        .into());
    }

    let param_names: Vec<&str> = model.parameters().iter().map(|p| p.name.as_str()).collect();
    let obs_names: Vec<&str> = model.observables().iter().map(|o| o.name.as_str()).collect();

    let mut params_file = BufWriter::new(File::create(out_dir.join("params.csv"))?);
    let mut obs_file = BufWriter::new(File::create(out_dir.join("observations.csv"))?);
    writeln!(params_file, "{}", param_names.join(","))?;
    writeln!(obs_file, "{}", obs_names.join(","))?;

    let nominal = environment.nominal_params();
    let mut worker = environment.clone();
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let knockouts = config.knockouts.min(d);

    info!(
        n_samples = config.n_samples,
        knockouts, "running knockout survey"
    );

    for _ in 0..config.n_samples {
        let point = seq.next_point();
        let mut values: Vec<f64> = nominal
            .iter()
            .zip(&point)
            .map(|(&p, &u)| p * gaussian_quantile(u, 1.0, config.sd))
            .collect();
        for index in sample_indices(&mut rng, d, knockouts) {
            values[index] = 0.0;
        }

        let ic_updates: Vec<(usize, f64)> = model
            .initials()
            .iter()
            .map(|init| (init.parameter, values[init.parameter]))
            .collect();
        worker.set_initial_params(&ic_updates)?;

        let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        writeln!(params_file, "{}", line.join(","))?;

        let solution = worker.solve(config.t_final, &values, &SolveOptions::default())?;
        let last = solution.observables.ncols() - 1;
        let line: Vec<String> = (0..obs_names.len())
            .map(|obs| solution.observables[[obs, last]].to_string())
            .collect();
        writeln!(obs_file, "{}", line.join(","))?;
    }

    params_file.flush()?;
    obs_file.flush()?;
    Ok(())
}
