use ode_solvers::dop_shared::IntegrationError;
use thiserror::Error;
use varisens_core::ConfigError;

/// Error returned by the evaluation environment and comparator.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The integrator failed to converge or exhausted its step limit.
    ///
    /// This is a per-solve failure: batch drivers record it against the
    /// task that produced it instead of aborting the whole run.
    #[error(transparent)]
    Integration(#[from] IntegrationError),

    /// The solve or comparison was misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Spline fitting needs at least two strictly increasing knots.
    #[error("spline fit needs at least two strictly increasing knots, got {got}")]
    SplineKnots { got: usize },

    /// The integrator produced no output points.
    #[error("integration produced an empty trajectory")]
    EmptyTrajectory,
}
