//! ODE evaluation environment and data comparator for varisens.
//!
//! This crate turns a [`KineticModel`](varisens_core::KineticModel) into
//! something the sensitivity pipeline can drive repeatedly:
//!
//! - [`Environment`] — owns the mutable parameter buffer and initial
//!   conditions, integrates the ODE system over a fixed output grid
//! - [`Method`] — the integration method (fixed-step RK4 or adaptive
//!   Dormand–Prince)
//! - [`CubicSpline`] — natural cubic spline used to re-grid simulated
//!   series onto experimental timestamps
//! - [`compare`] — the objective function: spline-resampled residuals
//!   weighted by measurement variance

mod compare;
mod environment;
mod error;
mod method;
mod spline;

pub use compare::{compare, Variance, OBJECTIVE_CLAMP};
pub use environment::{Environment, Solution, SolveOptions};
pub use error::SolveError;
pub use method::Method;
pub use spline::CubicSpline;
