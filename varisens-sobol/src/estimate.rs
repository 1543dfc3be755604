use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use varisens_core::ConfigError;

use crate::Evaluation;

/// First-order and total-effect sensitivity indices, one row per parameter
/// and one column per output (pairing).
///
/// Values are not clamped to [0, 1]: finite-sample noise can push an index
/// slightly outside the interval, and that is estimator noise, not an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub struct Indices {
    pub first_order: Array2<f64>,
    pub total_effect: Array2<f64>,
}

/// Reduces yA/yB/yC to Sobol sensitivity indices with Saltelli's estimator.
///
/// Per parameter `k` and output column:
///
/// ```text
/// S_k  =     ( sum(yA·yC_k)/(n-1) - mean(yA·yB)  ) / var(yA)
/// ST_k = 1 - ( sum(yB·yC_k)/(n-1) - mean(yB)^2   ) / var(yB)
/// ```
///
/// Both variances use Bessel's correction; S divides by the variance of yA
/// and ST by the variance of yB. The asymmetry is the estimator's
/// convention, not an accident: yA and yB are both unbiased estimates of
/// the same total variance.
///
/// # Errors
///
/// Returns [`ConfigError::SampleCount`] for fewer than two samples.
pub fn estimate(evaluation: &Evaluation) -> Result<Indices, ConfigError> {
    let n = evaluation.n_samples();
    if n < 2 {
        return Err(ConfigError::SampleCount(n));
    }
    let n_params = evaluation.n_params();
    let scale = (n - 1) as f64;

    let y_a = &evaluation.y_a;
    let y_b = &evaluation.y_b;

    let var_a = sample_variance(y_a.view());
    let var_b = sample_variance(y_b.view());

    let e_s = (y_a * y_b)
        .mean_axis(Axis(0))
        .ok_or(ConfigError::SampleCount(n))?;
    let mean_b = y_b
        .mean_axis(Axis(0))
        .ok_or(ConfigError::SampleCount(n))?;
    let e_st = &mean_b * &mean_b;

    let mut first_order = Array2::zeros((n_params, evaluation.n_outputs()));
    let mut total_effect = Array2::zeros((n_params, evaluation.n_outputs()));

    for k in 0..n_params {
        let c_k = evaluation.y_c.index_axis(Axis(0), k);

        let u_s = (y_a * &c_k).sum_axis(Axis(0)) / scale;
        let u_t = (y_b * &c_k).sum_axis(Axis(0)) / scale;

        first_order
            .slice_mut(s![k, ..])
            .assign(&((&u_s - &e_s) / &var_a));
        total_effect
            .slice_mut(s![k, ..])
            .assign(&((&u_t - &e_st) / &var_b).mapv(|v| 1.0 - v));
    }

    Ok(Indices {
        first_order,
        total_effect,
    })
}

/// Per-column sample variance with Bessel's correction.
fn sample_variance(y: ArrayView2<'_, f64>) -> Array1<f64> {
    let n = y.nrows() as f64;
    let mean = y.sum_axis(Axis(0)) / n;
    let mut acc = Array1::zeros(y.ncols());
    for row in y.rows() {
        let dev = &row - &mean;
        acc = acc + &dev * &dev;
    }
    acc / (n - 1.0)
}
