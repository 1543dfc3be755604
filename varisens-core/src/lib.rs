//! Core traits and types for the varisens pipeline.
//!
//! This crate defines the narrow contract between a kinetic model and the
//! sensitivity-analysis machinery that samples it:
//!
//! - [`KineticModel`] — a reaction network exposed as an ordered parameter
//!   list, initial conditions, named observables, and an ODE right-hand side
//! - [`Expr`] and [`ExprModel`] — expression-tree right-hand sides evaluated
//!   by direct tree walking
//! - [`Dataset`], [`Pairing`], [`Trajectory`] — experimental time series and
//!   the simulated trajectories they are scored against
//! - [`ConfigError`] — configuration failures, all raised before any
//!   simulation work starts

mod data;
mod error;
mod expr;
mod model;

pub use data::{Dataset, Pairing, Trajectory};
pub use error::ConfigError;
pub use expr::Expr;
pub use model::{ExprModel, Initial, KineticModel, Observable, Parameter};
