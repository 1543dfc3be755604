use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use varisens_core::{ConfigError, Parameter};

use crate::quantile::gaussian_quantile;

/// Default coefficient of variation for [`Mapping::LinearCv`].
pub const DEFAULT_CV: f64 = 0.25;

/// Default relative standard deviation for [`Mapping::Gaussian`].
pub const DEFAULT_GAUSSIAN_SD: f64 = 0.125;

/// Maps raw `[0, 1)` samples into parameter space.
///
/// Exactly one policy applies per run. Each policy is centered on the
/// nominal parameter value, so the same design matrices serve any model by
/// way of its parameter list. The log-uniform and linear policies accept a
/// "featured" subset of parameter indices with their own spread, mirroring
/// runs that sweep a few parameters harder than the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mapping {
    /// `lb * (ub/lb)^u` with `ub = p * 10^omag` and `lb = p / 10^omag`:
    /// log-uniform over `omag` orders of magnitude either side of nominal.
    /// Undefined for a zero-valued nominal parameter; validation rejects
    /// those up front.
    LogUniform {
        omag: f64,
        featured: Vec<usize>,
        featured_omag: f64,
    },

    /// Linear over `[p - p*cv, p + p*cv]`.
    LinearCv {
        cv: f64,
        featured: Vec<usize>,
        featured_cv: f64,
    },

    /// `p * quantile(u; mean = 1, sd)`: Gaussian about the nominal value
    /// with a relative standard deviation. Can produce negative values in
    /// the far tail; they are passed through untouched.
    Gaussian { sd: f64 },
}

impl Mapping {
    pub fn log_uniform(omag: f64) -> Self {
        Mapping::LogUniform {
            omag,
            featured: Vec::new(),
            featured_omag: omag,
        }
    }

    pub fn linear_cv(cv: f64) -> Self {
        Mapping::LinearCv {
            cv,
            featured: Vec::new(),
            featured_cv: cv,
        }
    }

    pub fn gaussian(sd: f64) -> Self {
        Mapping::Gaussian { sd }
    }

    /// Gives the listed parameter indices their own spread (order of
    /// magnitude for log-uniform, CV for linear). No effect on the Gaussian
    /// policy, which has a single shared spread.
    pub fn with_featured(self, indices: Vec<usize>, spread: f64) -> Self {
        match self {
            Mapping::LogUniform { omag, .. } => Mapping::LogUniform {
                omag,
                featured: indices,
                featured_omag: spread,
            },
            Mapping::LinearCv { cv, .. } => Mapping::LinearCv {
                cv,
                featured: indices,
                featured_cv: spread,
            },
            Mapping::Gaussian { sd } => Mapping::Gaussian { sd },
        }
    }

    /// Checks the policy against a parameter list.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a featured index past the parameter
    /// list, or a zero-valued parameter under the log-uniform policy.
    pub fn validate(&self, params: &[Parameter]) -> Result<(), ConfigError> {
        let featured = match self {
            Mapping::LogUniform { featured, .. } | Mapping::LinearCv { featured, .. } => {
                featured.as_slice()
            }
            Mapping::Gaussian { .. } => &[],
        };
        for &index in featured {
            if index >= params.len() {
                return Err(ConfigError::ParameterIndex {
                    index,
                    count: params.len(),
                });
            }
        }
        if matches!(self, Mapping::LogUniform { .. }) {
            if let Some(zero) = params.iter().find(|p| p.value == 0.0) {
                return Err(ConfigError::ZeroParameterInLogMapping {
                    name: zero.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Maps a raw `n × d` matrix into parameter space, column `j` against
    /// parameter `j`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for anything [`Mapping::validate`] rejects
    /// or a column count that disagrees with the parameter list.
    pub fn apply(
        &self,
        raw: ArrayView2<'_, f64>,
        params: &[Parameter],
    ) -> Result<Array2<f64>, ConfigError> {
        if raw.ncols() != params.len() {
            return Err(ConfigError::DesignShape {
                expected: params.len(),
                got: raw.ncols(),
            });
        }
        self.validate(params)?;

        let mut out = raw.to_owned();
        for (j, param) in params.iter().enumerate() {
            for value in out.column_mut(j) {
                *value = self.map_one(*value, param.value, j);
            }
        }
        Ok(out)
    }

    fn map_one(&self, u: f64, nominal: f64, index: usize) -> f64 {
        match self {
            Mapping::LogUniform {
                omag,
                featured,
                featured_omag,
            } => {
                let mag = if featured.contains(&index) {
                    *featured_omag
                } else {
                    *omag
                };
                let ub = nominal * 10f64.powf(mag);
                let lb = nominal / 10f64.powf(mag);
                lb * (ub / lb).powf(u)
            }
            Mapping::LinearCv {
                cv,
                featured,
                featured_cv,
            } => {
                let cv = if featured.contains(&index) {
                    *featured_cv
                } else {
                    *cv
                };
                let lb = nominal - nominal * cv;
                let ub = nominal + nominal * cv;
                u * (ub - lb) + lb
            }
            Mapping::Gaussian { sd } => nominal * gaussian_quantile(u, 1.0, *sd),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn params() -> Vec<Parameter> {
        vec![Parameter::new("kf", 1e-3), Parameter::new("kr", 1e-1)]
    }

    #[test]
    fn log_uniform_spans_the_magnitude_window() {
        let mapping = Mapping::log_uniform(1.0);
        let raw = array![[0.0, 0.5], [1.0, 0.5]];
        let mapped = mapping.apply(raw.view(), &params()).unwrap();

        // u = 0 lands on the lower bound, u = 1 on the upper bound,
        // u = 0.5 back on the nominal value.
        assert_relative_eq!(mapped[[0, 0]], 1e-4, max_relative = 1e-10);
        assert_relative_eq!(mapped[[1, 0]], 1e-2, max_relative = 1e-10);
        assert_relative_eq!(mapped[[0, 1]], 1e-1, max_relative = 1e-10);
    }

    #[test]
    fn log_uniform_featured_subset_gets_its_own_window() {
        let mapping = Mapping::log_uniform(1.0).with_featured(vec![1], 2.0);
        let raw = array![[1.0, 1.0]];
        let mapped = mapping.apply(raw.view(), &params()).unwrap();
        assert_relative_eq!(mapped[[0, 0]], 1e-2, max_relative = 1e-10);
        assert_relative_eq!(mapped[[0, 1]], 1e1, max_relative = 1e-10);
    }

    #[test]
    fn log_uniform_rejects_zero_parameters() {
        let zero = vec![Parameter::new("dead", 0.0)];
        let err = Mapping::log_uniform(1.0)
            .apply(array![[0.5]].view(), &zero)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroParameterInLogMapping { .. }));
    }

    #[test]
    fn linear_cv_interpolates_the_band() {
        let mapping = Mapping::linear_cv(DEFAULT_CV);
        let raw = array![[0.0, 1.0], [0.5, 0.5]];
        let p = vec![Parameter::new("a", 4.0), Parameter::new("b", 8.0)];
        let mapped = mapping.apply(raw.view(), &p).unwrap();

        assert_relative_eq!(mapped[[0, 0]], 3.0); // 4 - 4*0.25
        assert_relative_eq!(mapped[[0, 1]], 10.0); // 8 + 8*0.25
        assert_relative_eq!(mapped[[1, 0]], 4.0);
        assert_relative_eq!(mapped[[1, 1]], 8.0);
    }

    #[test]
    fn gaussian_centers_on_the_nominal_value() {
        let mapping = Mapping::gaussian(DEFAULT_GAUSSIAN_SD);
        let raw = array![[0.5, 0.5]];
        let mapped = mapping.apply(raw.view(), &params()).unwrap();
        assert_relative_eq!(mapped[[0, 0]], 1e-3, max_relative = 1e-9);
        assert_relative_eq!(mapped[[0, 1]], 1e-1, max_relative = 1e-9);
    }

    #[test]
    fn rejects_featured_index_out_of_range() {
        let mapping = Mapping::linear_cv(0.25).with_featured(vec![5], 0.5);
        let err = mapping.validate(&params()).unwrap_err();
        assert_eq!(err, ConfigError::ParameterIndex { index: 5, count: 2 });
    }

    #[test]
    fn rejects_column_mismatch() {
        let err = Mapping::gaussian(0.125)
            .apply(array![[0.5]].view(), &params())
            .unwrap_err();
        assert!(matches!(err, ConfigError::DesignShape { .. }));
    }
}
