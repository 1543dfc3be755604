use crate::{ConfigError, Expr};

/// A named model parameter with its nominal value.
///
/// A parameter's position in the model's parameter list is its identity
/// throughout the pipeline: design-matrix columns, override vectors, and
/// sensitivity indices all use this ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Seeds one species concentration from one parameter.
///
/// Initial conditions are parameter-valued so that they can be re-seeded
/// externally without touching the rate constants being swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initial {
    pub species: usize,
    pub parameter: usize,
}

/// A derived quantity: a coefficient-weighted sum of species concentrations.
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    pub name: String,
    pub species: Vec<usize>,
    pub coefficients: Vec<f64>,
}

impl Observable {
    pub fn new(name: impl Into<String>, species: Vec<usize>, coefficients: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            species,
            coefficients,
        }
    }

    /// Evaluates the observable against one state vector.
    pub fn value(&self, y: &[f64]) -> f64 {
        self.species
            .iter()
            .zip(&self.coefficients)
            .map(|(&s, &c)| c * y[s])
            .sum()
    }
}

/// The model contract consumed by the sensitivity pipeline.
///
/// Implementations must keep the parameter list in a stable order and must
/// compute derivatives from the supplied parameter buffer `p`, never from
/// internal state, so that one immutable model instance can serve many
/// concurrently sampled parameter sets.
pub trait KineticModel: Send + Sync {
    /// Tunable parameters in stable order.
    fn parameters(&self) -> &[Parameter];

    /// Parameter-seeded initial conditions.
    fn initials(&self) -> &[Initial];

    /// Named observables computed from state trajectories.
    fn observables(&self) -> &[Observable];

    /// Number of state variables in the ODE system.
    fn n_species(&self) -> usize;

    /// Writes dy/dt for state `y` under parameters `p` into `dydt`.
    fn rhs(&self, t: f64, y: &[f64], p: &[f64], dydt: &mut [f64]);

    /// Position of a parameter by name, if the model has it.
    fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters().iter().position(|p| p.name == name)
    }
}

/// A [`KineticModel`] assembled from one rate [`Expr`] per species.
///
/// All index references are validated once at construction; evaluation is a
/// plain tree walk per species per integrator step.
#[derive(Debug, Clone)]
pub struct ExprModel {
    parameters: Vec<Parameter>,
    initials: Vec<Initial>,
    observables: Vec<Observable>,
    rates: Vec<Expr>,
}

impl ExprModel {
    /// Builds a model from per-species rate expressions and its tables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any expression, initial condition, or
    /// observable refers to a species or parameter that does not exist, or
    /// if an observable's species/coefficient lists disagree in length.
    pub fn new(
        parameters: Vec<Parameter>,
        initials: Vec<Initial>,
        observables: Vec<Observable>,
        rates: Vec<Expr>,
    ) -> Result<Self, ConfigError> {
        let n_species = rates.len();
        let n_params = parameters.len();

        for rate in &rates {
            if let Some(i) = rate.max_state_index() {
                if i >= n_species {
                    return Err(ConfigError::SpeciesIndex {
                        index: i,
                        count: n_species,
                    });
                }
            }
            if let Some(j) = rate.max_param_index() {
                if j >= n_params {
                    return Err(ConfigError::ParameterIndex {
                        index: j,
                        count: n_params,
                    });
                }
            }
        }

        for init in &initials {
            if init.species >= n_species {
                return Err(ConfigError::SpeciesIndex {
                    index: init.species,
                    count: n_species,
                });
            }
            if init.parameter >= n_params {
                return Err(ConfigError::ParameterIndex {
                    index: init.parameter,
                    count: n_params,
                });
            }
        }

        for obs in &observables {
            if obs.species.len() != obs.coefficients.len() {
                return Err(ConfigError::ObservableShape {
                    name: obs.name.clone(),
                    species: obs.species.len(),
                    coefficients: obs.coefficients.len(),
                });
            }
            if let Some(&i) = obs.species.iter().max() {
                if i >= n_species {
                    return Err(ConfigError::SpeciesIndex {
                        index: i,
                        count: n_species,
                    });
                }
            }
        }

        Ok(Self {
            parameters,
            initials,
            observables,
            rates,
        })
    }
}

impl KineticModel for ExprModel {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn initials(&self) -> &[Initial] {
        &self.initials
    }

    fn observables(&self) -> &[Observable] {
        &self.observables
    }

    fn n_species(&self) -> usize {
        self.rates.len()
    }

    fn rhs(&self, _t: f64, y: &[f64], p: &[f64], dydt: &mut [f64]) {
        for (slot, rate) in dydt.iter_mut().zip(&self.rates) {
            *slot = rate.eval(y, p);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// A <-> B with forward rate kf and reverse rate kr.
    fn reversible_binding() -> ExprModel {
        let kf = || Expr::param(0);
        let kr = || Expr::param(1);
        let a = || Expr::state(0);
        let b = || Expr::state(1);

        let da = kr().mul(b()).sub(kf().mul(a()));
        let db = kf().mul(a()).sub(kr().mul(b()));

        ExprModel::new(
            vec![
                Parameter::new("kf", 2.0),
                Parameter::new("kr", 1.0),
                Parameter::new("A_0", 10.0),
            ],
            vec![Initial {
                species: 0,
                parameter: 2,
            }],
            vec![Observable::new("A_total", vec![0, 1], vec![1.0, 1.0])],
            vec![da, db],
        )
        .expect("valid model")
    }

    #[test]
    fn rhs_uses_supplied_parameter_buffer() {
        let model = reversible_binding();
        let mut dydt = [0.0; 2];

        model.rhs(0.0, &[10.0, 0.0], &[2.0, 1.0], &mut dydt);
        assert_relative_eq!(dydt[0], -20.0);
        assert_relative_eq!(dydt[1], 20.0);

        // Same model, different parameter buffer, no internal state.
        model.rhs(0.0, &[10.0, 0.0], &[0.5, 1.0], &mut dydt);
        assert_relative_eq!(dydt[0], -5.0);
    }

    #[test]
    fn observable_sums_weighted_species() {
        let model = reversible_binding();
        assert_relative_eq!(model.observables()[0].value(&[4.0, 6.0]), 10.0);
    }

    #[test]
    fn rejects_out_of_range_rate_reference() {
        let err = ExprModel::new(
            vec![Parameter::new("k", 1.0)],
            vec![],
            vec![],
            vec![Expr::state(1).neg()],
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::SpeciesIndex { index: 1, count: 1 });
    }

    #[test]
    fn rejects_mismatched_observable() {
        let err = ExprModel::new(
            vec![Parameter::new("k", 1.0)],
            vec![],
            vec![Observable::new("bad", vec![0], vec![1.0, 2.0])],
            vec![Expr::state(0).neg()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ObservableShape { .. }));
    }

    #[test]
    fn parameter_lookup_by_name() {
        let model = reversible_binding();
        assert_eq!(model.parameter_index("kr"), Some(1));
        assert_eq!(model.parameter_index("missing"), None);
    }
}
