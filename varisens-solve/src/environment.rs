use std::sync::Arc;

use ndarray::{Array1, Array2};
use ode_solvers::{DVector, Dop853, Dopri5, Rk4, System};
use varisens_core::{ConfigError, KineticModel, Trajectory};

use crate::{Method, SolveError};

/// Options for a single [`Environment::solve`] call.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions<'a> {
    /// Parameter indices the override vector applies to.
    ///
    /// `None` means the override vector covers every model parameter
    /// positionally. With a subset, only the listed indices are written and
    /// every other parameter keeps its last-set value, so callers issuing
    /// repeated partial updates own the cumulative state.
    pub subset: Option<&'a [usize]>,

    /// Rebuild initial conditions from the stored initial-condition
    /// parameter values before integrating.
    ///
    /// Initial conditions are deliberately decoupled from the override
    /// vector: sweeping a rate parameter never moves a starting
    /// concentration unless [`Environment::set_initial_params`] re-seeds it.
    pub reinit_ics: bool,

    /// Start of the integration interval.
    pub t_init: f64,
}

impl Default for SolveOptions<'_> {
    fn default() -> Self {
        Self {
            subset: None,
            reinit_ics: true,
            t_init: 0.0,
        }
    }
}

/// Result of one solve: the combined trajectory plus its raw pieces.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Time axis stacked on observable rows, ready for the comparator.
    pub combined: Trajectory,
    /// The output time grid.
    pub time: Array1<f64>,
    /// Raw state trajectory, one row per output time point.
    pub states: Array2<f64>,
    /// Observable trajectories, one row per observable.
    pub observables: Array2<f64>,
}

/// A reusable ODE evaluation environment for one model.
///
/// The environment owns the mutable parameter buffer reused across solves
/// and the initial-condition values derived from the model's nominal
/// parameters. It is cheap to clone (the model itself is shared), and a
/// concurrent driver must give each worker its own clone: one instance
/// must never be shared across simultaneous solves.
pub struct Environment<M> {
    model: Arc<M>,
    method: Method,
    n_steps: usize,
    params: Vec<f64>,
    initial_values: Vec<f64>,
    y0: Vec<f64>,
}

impl<M> Clone for Environment<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            method: self.method,
            n_steps: self.n_steps,
            params: self.params.clone(),
            initial_values: self.initial_values.clone(),
            y0: self.y0.clone(),
        }
    }
}

impl<M: KineticModel> Environment<M> {
    /// Prepares an environment for repeated solves of `model`.
    ///
    /// The parameter buffer starts at the model's nominal values, initial
    /// conditions are read from the model's initial-condition parameters,
    /// and integration defaults to [`Method::Dopri5`] with the given
    /// tolerances over an `n_steps`-point output grid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TimeGrid`] if `n_steps < 2`, or an
    /// index-range error if the model's initial conditions refer to
    /// parameters or species it does not have.
    pub fn setup(
        model: Arc<M>,
        reltol: f64,
        abstol: f64,
        n_steps: usize,
    ) -> Result<Self, ConfigError> {
        if n_steps < 2 {
            return Err(ConfigError::TimeGrid(n_steps));
        }
        for init in model.initials() {
            if init.parameter >= model.parameters().len() {
                return Err(ConfigError::ParameterIndex {
                    index: init.parameter,
                    count: model.parameters().len(),
                });
            }
            if init.species >= model.n_species() {
                return Err(ConfigError::SpeciesIndex {
                    index: init.species,
                    count: model.n_species(),
                });
            }
        }
        let params: Vec<f64> = model.parameters().iter().map(|p| p.value).collect();
        let initial_values: Vec<f64> = model
            .initials()
            .iter()
            .map(|init| model.parameters()[init.parameter].value)
            .collect();
        let mut env = Self {
            model,
            method: Method::Dopri5 {
                abs_tol: abstol,
                rel_tol: reltol,
            },
            n_steps,
            params,
            initial_values,
            y0: Vec::new(),
        };
        env.y0 = env.build_initial_state();
        Ok(env)
    }

    /// Replaces the integration method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// The parameter buffer as of the last solve or setup.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// The model's nominal parameter values, in parameter order.
    pub fn nominal_params(&self) -> Vec<f64> {
        self.model.parameters().iter().map(|p| p.value).collect()
    }

    /// Re-seeds stored initial-condition values for the given parameters.
    ///
    /// Each `(parameter_index, value)` pair updates every initial condition
    /// seeded from that parameter; pairs naming parameters that seed no
    /// initial condition are ignored. Takes effect at the next solve with
    /// `reinit_ics` set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParameterIndex`] for an out-of-range index.
    pub fn set_initial_params(&mut self, updates: &[(usize, f64)]) -> Result<(), ConfigError> {
        let n_params = self.model.parameters().len();
        for &(index, value) in updates {
            if index >= n_params {
                return Err(ConfigError::ParameterIndex {
                    index,
                    count: n_params,
                });
            }
            for (slot, init) in self.initial_values.iter_mut().zip(self.model.initials()) {
                if init.parameter == index {
                    *slot = value;
                }
            }
        }
        Ok(())
    }

    /// Integrates the model from `t_init` to `t_final`.
    ///
    /// Output lands on a fixed grid of `n_steps` points linearly spaced over
    /// the interval; adaptive methods still take whatever internal steps
    /// their tolerances require.
    ///
    /// # Errors
    ///
    /// Configuration problems (override length, subset indices, degenerate
    /// time span) surface as [`SolveError::Config`]; integrator
    /// non-convergence as [`SolveError::Integration`]. Either way the
    /// parameter buffer keeps the overrides that were applied.
    pub fn solve(
        &mut self,
        t_final: f64,
        overrides: &[f64],
        opts: &SolveOptions<'_>,
    ) -> Result<Solution, SolveError> {
        self.apply_overrides(overrides, opts.subset)?;
        if t_final <= opts.t_init {
            return Err(ConfigError::TimeSpan {
                t_init: opts.t_init,
                t_final,
            }
            .into());
        }

        if opts.reinit_ics {
            self.y0 = self.build_initial_state();
        }

        let step = (t_final - opts.t_init) / (self.n_steps - 1) as f64;
        let y0 = DVector::from_vec(self.y0.clone());
        let rhs = Rhs {
            model: self.model.as_ref(),
            params: &self.params,
        };

        let (time, states) = match self.method {
            Method::Rk4 => {
                let mut stepper = Rk4::new(rhs, opts.t_init, y0, t_final, step);
                stepper.integrate()?;
                (stepper.x_out().clone(), stepper.y_out().clone())
            }
            Method::Dopri5 { abs_tol, rel_tol } => {
                let mut stepper =
                    Dopri5::new(rhs, opts.t_init, t_final, step, y0, rel_tol, abs_tol);
                stepper.integrate()?;
                (stepper.x_out().clone(), stepper.y_out().clone())
            }
            Method::Dop853 { abs_tol, rel_tol } => {
                let mut stepper =
                    Dop853::new(rhs, opts.t_init, t_final, step, y0, rel_tol, abs_tol);
                stepper.integrate()?;
                (stepper.x_out().clone(), stepper.y_out().clone())
            }
        };

        if time.is_empty() {
            return Err(SolveError::EmptyTrajectory);
        }

        self.assemble(&time, &states)
    }

    fn apply_overrides(
        &mut self,
        overrides: &[f64],
        subset: Option<&[usize]>,
    ) -> Result<(), ConfigError> {
        match subset {
            None => {
                if overrides.len() != self.params.len() {
                    return Err(ConfigError::ParameterCount {
                        expected: self.params.len(),
                        got: overrides.len(),
                    });
                }
                self.params.copy_from_slice(overrides);
            }
            Some(indices) => {
                if overrides.len() != indices.len() {
                    return Err(ConfigError::ParameterCount {
                        expected: indices.len(),
                        got: overrides.len(),
                    });
                }
                for (&index, &value) in indices.iter().zip(overrides) {
                    if index >= self.params.len() {
                        return Err(ConfigError::ParameterIndex {
                            index,
                            count: self.params.len(),
                        });
                    }
                    self.params[index] = value;
                }
            }
        }
        Ok(())
    }

    fn build_initial_state(&self) -> Vec<f64> {
        let mut y0 = vec![0.0; self.model.n_species()];
        for (init, &value) in self.model.initials().iter().zip(&self.initial_values) {
            y0[init.species] = value;
        }
        y0
    }

    fn assemble(&self, time: &[f64], states: &[DVector<f64>]) -> Result<Solution, SolveError> {
        let n_points = time.len();
        let n_species = self.model.n_species();
        let observables = self.model.observables();

        let mut state_matrix = Array2::zeros((n_points, n_species));
        for (mut row, y) in state_matrix.rows_mut().into_iter().zip(states) {
            for (slot, &value) in row.iter_mut().zip(y.iter()) {
                *slot = value;
            }
        }

        let mut obs_matrix = Array2::zeros((observables.len(), n_points));
        for (i, obs) in observables.iter().enumerate() {
            for (t, y) in states.iter().enumerate() {
                obs_matrix[[i, t]] = obs.value(y.as_slice());
            }
        }

        let time = Array1::from_vec(time.to_vec());
        let combined = Trajectory::new(time.clone(), obs_matrix.clone());

        Ok(Solution {
            combined,
            time,
            states: state_matrix,
            observables: obs_matrix,
        })
    }
}

/// Adapts a [`KineticModel`] plus a parameter buffer to the stepper's
/// system interface.
struct Rhs<'a, M> {
    model: &'a M,
    params: &'a [f64],
}

impl<M: KineticModel> System<f64, DVector<f64>> for Rhs<'_, M> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        self.model.rhs(t, y.as_slice(), self.params, dy.as_mut_slice());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use varisens_core::{Expr, ExprModel, Initial, Observable, Parameter};

    use super::*;

    /// dy/dt = -k * y with parameter-seeded initial concentration.
    fn decay_model() -> Arc<ExprModel> {
        Arc::new(
            ExprModel::new(
                vec![Parameter::new("k_deg", 0.5), Parameter::new("y_0", 10.0)],
                vec![Initial {
                    species: 0,
                    parameter: 1,
                }],
                vec![Observable::new("y", vec![0], vec![1.0])],
                vec![Expr::param(0).mul(Expr::state(0)).neg()],
            )
            .unwrap(),
        )
    }

    fn final_observable(solution: &Solution) -> f64 {
        let n = solution.observables.ncols();
        solution.observables[[0, n - 1]]
    }

    #[test]
    fn matches_analytic_decay() {
        let mut env = Environment::setup(decay_model(), 1e-8, 1e-10, 101).unwrap();
        let solution = env
            .solve(2.0, &[0.5, 10.0], &SolveOptions::default())
            .unwrap();

        assert_relative_eq!(
            final_observable(&solution),
            10.0 * (-1.0_f64).exp(),
            max_relative = 1e-6
        );
        assert_relative_eq!(*solution.time.last().unwrap(), 2.0, max_relative = 1e-9);
    }

    #[test]
    fn rk4_agrees_with_adaptive() {
        let model = decay_model();
        let mut adaptive = Environment::setup(model.clone(), 1e-8, 1e-10, 201).unwrap();
        let mut fixed = Environment::setup(model, 1e-8, 1e-10, 201)
            .unwrap()
            .with_method(Method::Rk4);

        let a = adaptive
            .solve(2.0, &[0.5, 10.0], &SolveOptions::default())
            .unwrap();
        let b = fixed
            .solve(2.0, &[0.5, 10.0], &SolveOptions::default())
            .unwrap();
        assert_relative_eq!(
            final_observable(&a),
            final_observable(&b),
            max_relative = 1e-5
        );
    }

    #[test]
    fn subset_overrides_leave_other_parameters_alone() {
        let mut env = Environment::setup(decay_model(), 1e-8, 1e-10, 101).unwrap();
        env.solve(
            1.0,
            &[2.0],
            &SolveOptions {
                subset: Some(&[0]),
                ..SolveOptions::default()
            },
        )
        .unwrap();

        // k was overwritten, y_0's buffer slot kept its nominal value.
        assert_relative_eq!(env.params()[0], 2.0);
        assert_relative_eq!(env.params()[1], 10.0);
    }

    #[test]
    fn initial_conditions_ignore_parameter_overrides() {
        let mut env = Environment::setup(decay_model(), 1e-8, 1e-10, 101).unwrap();

        // Overriding the y_0 parameter does not move the starting state.
        let swept = env
            .solve(1.0, &[0.5, 999.0], &SolveOptions::default())
            .unwrap();
        assert_relative_eq!(swept.states[[0, 0]], 10.0);

        // Only an explicit re-seed does.
        env.set_initial_params(&[(1, 20.0)]).unwrap();
        let reseeded = env
            .solve(1.0, &[0.5, 10.0], &SolveOptions::default())
            .unwrap();
        assert_relative_eq!(reseeded.states[[0, 0]], 20.0);
        assert_relative_eq!(
            final_observable(&reseeded),
            20.0 * (-0.5_f64).exp(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn rejects_wrong_override_length() {
        let mut env = Environment::setup(decay_model(), 1e-8, 1e-10, 101).unwrap();
        let err = env
            .solve(1.0, &[0.5], &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SolveError::Config(ConfigError::ParameterCount {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn rejects_degenerate_grid_and_span() {
        assert!(matches!(
            Environment::setup(decay_model(), 1e-8, 1e-10, 1),
            Err(ConfigError::TimeGrid(1))
        ));

        let mut env = Environment::setup(decay_model(), 1e-8, 1e-10, 10).unwrap();
        let err = env
            .solve(0.0, &[0.5, 10.0], &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SolveError::Config(ConfigError::TimeSpan { .. })
        ));
    }
}
