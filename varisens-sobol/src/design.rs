use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use varisens_core::{ConfigError, Parameter};

use crate::{LowDiscrepancy, Mapping};

/// The Saltelli design matrices.
///
/// `a` and `b` are independent `n × d` sample matrices; `c` has shape
/// `(d, n, d)` where `c[k]` equals `b` except that column `k` is replaced
/// by column `k` of `a`. Columns correspond to parameter positions.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignSet {
    pub a: Array2<f64>,
    pub b: Array2<f64>,
    pub c: Array3<f64>,
}

impl DesignSet {
    /// Draws and maps a full design for the given parameters.
    ///
    /// A and B must be independent, so one `2d`-dimensional stream is drawn
    /// and split down the middle: the first `d` columns feed A, the rest
    /// feed B. Taking consecutive blocks of a single `d`-dimensional stream
    /// instead would correlate the two matrices and bias the estimator.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the stream is not `2d`-dimensional,
    /// fewer than two samples are requested, or the mapping rejects the
    /// parameter list.
    pub fn generate(
        seq: &mut LowDiscrepancy,
        mapping: &Mapping,
        params: &[Parameter],
        n_samples: usize,
    ) -> Result<Self, ConfigError> {
        let d = params.len();
        if seq.dims() != 2 * d {
            return Err(ConfigError::SequenceDimensions {
                expected: 2 * d,
                got: seq.dims(),
            });
        }
        if n_samples < 2 {
            return Err(ConfigError::SampleCount(n_samples));
        }

        let raw = seq.matrix(n_samples);
        let raw_a = raw.slice(s![.., ..d]);
        let raw_b = raw.slice(s![.., d..]);
        Self::from_raw(raw_a, raw_b, mapping, params)
    }

    /// Maps pre-drawn raw matrices and derives C.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either matrix disagrees with the
    /// parameter list or the mapping rejects it.
    pub fn from_raw(
        raw_a: ArrayView2<'_, f64>,
        raw_b: ArrayView2<'_, f64>,
        mapping: &Mapping,
        params: &[Parameter],
    ) -> Result<Self, ConfigError> {
        let a = mapping.apply(raw_a, params)?;
        let b = mapping.apply(raw_b, params)?;
        let c = Self::c_matrix(a.view(), b.view());
        Ok(Self { a, b, c })
    }

    /// Builds the column-swapped C family: `d` copies of B, the k-th with
    /// its k-th column taken from A.
    ///
    /// # Panics
    ///
    /// Panics if `a` and `b` have different shapes; both always come from
    /// the same draw.
    pub fn c_matrix(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array3<f64> {
        assert_eq!(a.shape(), b.shape());
        let (n, d) = (b.nrows(), b.ncols());

        let mut c = Array3::zeros((d, n, d));
        for k in 0..d {
            let mut slab = c.index_axis_mut(Axis(0), k);
            slab.assign(&b);
            slab.column_mut(k).assign(&a.column(k));
        }
        c
    }

    pub fn n_samples(&self) -> usize {
        self.a.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.a.ncols()
    }
}
