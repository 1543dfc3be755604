/// Numerical integration method used by the evaluation environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    /// Classic fixed-step 4th-order Runge–Kutta.
    ///
    /// Steps exactly on the output grid with no error control. Useful when
    /// the step size is chosen externally or when comparing against a
    /// reference run; inefficient for stiff or fast-transient systems.
    Rk4,

    /// Adaptive Dormand–Prince 5(4).
    ///
    /// Embedded 5th/4th-order pair; the internal step size adapts to keep
    /// local error within `abs_tol`/`rel_tol` while output is produced on
    /// the fixed grid. The default for sensitivity runs.
    Dopri5 { abs_tol: f64, rel_tol: f64 },

    /// Adaptive Dormand–Prince 8(5,3).
    ///
    /// Higher order per step than [`Method::Dopri5`]; pays off on long
    /// horizons or very tight tolerances.
    Dop853 { abs_tol: f64, rel_tol: f64 },
}
