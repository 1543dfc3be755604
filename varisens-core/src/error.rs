use thiserror::Error;

/// Configuration errors detected before any simulation runs.
///
/// Every variant here is fatal to the run that produced it: the pipeline
/// validates its inputs up front so that no integration work is spent on a
/// miswired configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A full parameter override must supply one value per model parameter.
    #[error("expected {expected} parameter values, got {got}")]
    ParameterCount { expected: usize, got: usize },

    /// A parameter index referred to a position past the model's parameter list.
    #[error("parameter index {index} is out of range for {count} parameters")]
    ParameterIndex { index: usize, count: usize },

    /// A species index referred to a state variable the model does not have.
    #[error("species index {index} is out of range for {count} species")]
    SpeciesIndex { index: usize, count: usize },

    /// An observable's species and coefficient lists must have equal length.
    #[error("observable `{name}` pairs {species} species with {coefficients} coefficients")]
    ObservableShape {
        name: String,
        species: usize,
        coefficients: usize,
    },

    /// A pairing referred to a dataset row or simulated observable that does not exist.
    #[error("pairing ({data_row}, {sim_obs}) is out of range ({data_rows} data rows, {n_obs} observables)")]
    PairingRange {
        data_row: usize,
        sim_obs: usize,
        data_rows: usize,
        n_obs: usize,
    },

    /// Measured variances were requested but the dataset has no row after the measurement row.
    #[error("pairing for data row {data_row} needs a variance row at {variance_row}, dataset has {data_rows} rows")]
    MissingVarianceRow {
        data_row: usize,
        variance_row: usize,
        data_rows: usize,
    },

    /// Log-uniform sampling bounds are undefined for a zero-valued parameter.
    #[error("parameter `{name}` is zero; log-uniform sampling bounds are undefined")]
    ZeroParameterInLogMapping { name: String },

    /// A dataset needs a time row plus at least one measurement row.
    #[error("dataset must have a time row and at least one measurement row")]
    DatasetShape,

    /// The sensitivity estimator needs at least two samples for its variance terms.
    #[error("need at least 2 samples, got {0}")]
    SampleCount(usize),

    /// The output time grid needs at least two points.
    #[error("output time grid needs at least two points, got {0}")]
    TimeGrid(usize),

    /// Integration must move forward in time.
    #[error("integration span must be positive: t_init {t_init}, t_final {t_final}")]
    TimeSpan { t_init: f64, t_final: f64 },

    /// A quasi-random stream's dimension must match what the consumer expects.
    #[error("sequence has {got} dimensions, expected {expected}")]
    SequenceDimensions { expected: usize, got: usize },

    /// Design matrices and the model disagree on the number of parameters.
    #[error("design matrix has {got} columns, model has {expected} parameters")]
    DesignShape { expected: usize, got: usize },
}
