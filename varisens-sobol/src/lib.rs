//! Variance-based global sensitivity analysis for kinetic models.
//!
//! The pieces, in pipeline order:
//!
//! - [`LowDiscrepancy`] — quasi-random points in `[0, 1)^d`
//! - [`Mapping`] — maps raw points into parameter space (log-uniform,
//!   linear-CV, or Gaussian about the nominal value)
//! - [`DesignSet`] — the Saltelli design matrices A, B, and the
//!   column-swapped C family
//! - [`Evaluator`] — runs one ODE solve + objective comparison per design
//!   row, in parallel, collecting yA/yB/yC and per-task failures
//! - [`estimate`] — reduces yA/yB/yC to first-order and total-effect
//!   sensitivity indices
//! - [`report`] — simulation-record and CSV writers
//! - [`screen`] — final-timepoint observable screening with optional
//!   parameter knockouts

mod design;
mod estimate;
mod evaluate;
mod lowdisc;
mod map;
mod quantile;
pub mod report;
pub mod screen;

pub use design::DesignSet;
pub use estimate::{estimate, Indices};
pub use evaluate::{Evaluation, Evaluator, MatrixId, TaskFailure};
pub use lowdisc::LowDiscrepancy;
pub use map::{Mapping, DEFAULT_CV, DEFAULT_GAUSSIAN_SD};
pub use quantile::{gaussian_quantile, norm_quantile};
pub use screen::{final_observables, knockout_survey, ScreenError, SurveyConfig};
