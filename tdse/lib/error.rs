//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow]. Every
//! failure that can reach a caller of the [`api`][crate::api] functions is
//! wrapped in a [`SolveError`], which can be classified into a coarse
//! [`ErrorKind`] for reporting.
//!
//! [anyhow]: https://crates.io/crates/anyhow

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Returned when some input quantity exceeds a configured ceiling in
/// [`Limits`][crate::limits::Limits].
#[derive(Debug, Error)]
#[error("{what} exceeds the configured limit; got {value}, limit is {limit}")]
pub struct LimitError {
    pub what: &'static str,
    pub value: usize,
    pub limit: usize,
}

impl LimitError {
    pub(crate) fn check(what: &'static str, value: usize, limit: usize)
        -> Result<(), Self>
    {
        (value <= limit).then_some(()).ok_or(Self { what, value, limit })
    }
}

/// Returned when a physical parameter is not positive and finite.
#[derive(Debug, Error)]
#[error("{0} must be positive and finite; got {1}")]
pub struct ParamError(pub &'static str, pub f64);

impl ParamError {
    pub(crate) fn check(name: &'static str, value: f64) -> Result<(), Self> {
        (value.is_finite() && value > 0.0).then_some(())
            .ok_or(Self(name, value))
    }
}

/// Returned from grid construction and validation.
#[derive(Debug, Error)]
pub enum GridError {
    /// Fewer than two points were requested along an axis.
    #[error("axis '{axis}' needs at least 2 points; got {n}")]
    TooFewPoints { axis: &'static str, n: usize },

    /// An axis bound is NaN or infinite.
    #[error("axis '{axis}' bounds must be finite; got [{min}, {max}]")]
    NonFiniteBounds { axis: &'static str, min: f64, max: f64 },

    /// The upper bound is not strictly greater than the lower bound.
    #[error("axis '{axis}' upper bound must exceed lower bound; got [{min}, {max}]")]
    EmptyRange { axis: &'static str, min: f64, max: f64 },

    /// The derived spacing is zero, subnormal, or infinite.
    #[error("axis '{axis}' spacing must be positive and finite; got {d}")]
    BadSpacing { axis: &'static str, d: f64 },

    /// A caller-supplied coordinate array is not uniformly spaced.
    #[error("coordinates for axis '{axis}' are not uniformly spaced at index {index}")]
    NonUniform { axis: &'static str, index: usize },

    /// Caller-supplied arrays have incompatible shapes.
    #[error("incompatible array shapes; got {0:?} and {1:?}")]
    Shape(Vec<usize>, Vec<usize>),
}

/// Returned from formula parsing and evaluation.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Malformed syntax.
    #[error("parse error at position {pos}: {msg} (near '{near}')")]
    Parse { pos: usize, near: String, msg: String },

    /// A construct outside the allow-list.
    #[error("unsafe expression at position {pos}: {msg} (near '{near}')")]
    Unsafe { pos: usize, near: String, msg: String },

    /// A real-valued result was required but an element had a non-zero
    /// imaginary part.
    #[error("expression must be real-valued; got imaginary part {imag:e} at index {index}")]
    NotReal { index: usize, imag: f64 },

    /// An element evaluated to NaN or infinity.
    #[error("expression produced a non-finite value at index {index}")]
    NonFinite { index: usize },

    /// The number of bound arrays does not match the formula's scope.
    #[error("expected {expected} bound variables; got {got}")]
    Binding { expected: usize, got: usize },

    /// A bound array does not have the evaluation shape.
    #[error("bound variable has shape {0:?} but evaluation shape is {1:?}")]
    Shape(Vec<usize>, Vec<usize>),

    /// [`LimitError`]
    #[error("{0}")]
    Limit(#[from] LimitError),
}

impl ExprError {
    pub(crate) fn parse(src: &str, pos: usize, len: usize, msg: impl Into<String>)
        -> Self
    {
        Self::Parse { pos, near: snippet(src, pos, len), msg: msg.into() }
    }

    pub(crate) fn unsafe_at(
        src: &str,
        pos: usize,
        len: usize,
        msg: impl Into<String>,
    ) -> Self
    {
        Self::Unsafe { pos, near: snippet(src, pos, len), msg: msg.into() }
    }
}

// offending substring, padded with a little context and cut on char
// boundaries
fn snippet(src: &str, pos: usize, len: usize) -> String {
    let start = pos.min(src.len());
    let end = (pos + len.max(1) + 8).min(src.len());
    let start = (0..=start).rev().find(|k| src.is_char_boundary(*k)).unwrap_or(0);
    let end = (end..=src.len()).find(|k| src.is_char_boundary(*k))
        .unwrap_or(src.len());
    if start >= end { String::from("<end of input>") } else {
        src[start..end].to_string()
    }
}

/// Returned from Hamiltonian assembly.
#[derive(Debug, Error)]
pub enum HamiltonianError {
    /// The potential array has a different dimensionality or shape than the
    /// grid it is paired with.
    #[error("potential has shape {0:?} but the grid has shape {1:?}")]
    Shape(Vec<usize>, Vec<usize>),

    /// [`ParamError`]
    #[error("{0}")]
    Param(#[from] ParamError),

    /// [`LinalgError`].
    #[error("linalg error: {0}")]
    Linalg(#[from] LinalgError),
}

/// Returned from time-dependent propagation.
#[derive(Debug, Error)]
pub enum TError {
    /// A requested time is NaN or infinite.
    #[error("requested time at position {index} is not finite; got {value}")]
    BadTime { index: usize, value: f64 },

    /// The propagated state contains NaN or infinite entries.
    #[error("propagation produced non-finite values at t = {0}")]
    NonFinite(f64),

    /// The initial state has a different shape than the potential.
    #[error("initial state has shape {0:?} but the potential has shape {1:?}")]
    Shape(Vec<usize>, Vec<usize>),

    /// No snapshot was computed for a requested time.
    #[error("no snapshot was computed for t = {0}")]
    MissingSnapshot(f64),

    /// [`LimitError`]
    #[error("{0}")]
    Limit(#[from] LimitError),

    /// [`HamiltonianError`]
    #[error("hamiltonian error: {0}")]
    Hamiltonian(#[from] HamiltonianError),
}

/// Returned from time-independent (eigenstate) solvers.
#[derive(Debug, Error)]
pub enum XError {
    /// A non-positive or too-large number of requested states.
    #[error("number of eigenstates must be between 1 and {max}; got {got}")]
    BadNumEigen { got: usize, max: usize },

    /// Imaginary-time relaxation did not reach the energy tolerance.
    #[error("imaginary-time relaxation of state {0} did not converge within the step limit")]
    NotConverged(usize),

    /// [`LimitError`]
    #[error("{0}")]
    Limit(#[from] LimitError),

    /// [`HamiltonianError`]
    #[error("hamiltonian error: {0}")]
    Hamiltonian(#[from] HamiltonianError),
}

/// Top-level error for a single solve request.
#[derive(Debug, Error)]
pub enum SolveError {
    /// [`GridError`]
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    /// [`ExprError`] with the name of the offending request field.
    #[error("{field}: {source}")]
    Expr { field: &'static str, source: ExprError },

    /// [`ParamError`]
    #[error("invalid parameter: {0}")]
    Param(#[from] ParamError),

    /// A wavefunction is zero everywhere on the grid or too large to
    /// normalize; holds the name of the offending request field.
    #[error("{0}: state is identically zero or cannot be normalized on the grid")]
    ZeroState(&'static str),

    /// Observable input arrays are missing or inconsistent.
    #[error("invalid observable input: {0}")]
    Observable(String),

    /// [`LimitError`]
    #[error("{0}")]
    Limit(#[from] LimitError),

    /// [`HamiltonianError`]
    #[error("{0}")]
    Hamiltonian(#[from] HamiltonianError),

    /// [`TError`]
    #[error("{0}")]
    Propagate(#[from] TError),

    /// [`XError`]
    #[error("{0}")]
    Eigen(#[from] XError),
}

impl SolveError {
    pub(crate) fn expr(field: &'static str) -> impl FnOnce(ExprError) -> Self {
        move |source| Self::Expr { field, source }
    }

    /// Classify `self`.
    pub fn kind(&self) -> ErrorKind {
        use ErrorKind::*;
        match self {
            Self::Grid(_) => InvalidGrid,
            Self::Expr { source, .. } => match source {
                ExprError::Parse { .. } => Parse,
                ExprError::Unsafe { .. } => UnsafeExpression,
                ExprError::NotReal { .. } | ExprError::NonFinite { .. }
                    => TypeMismatch,
                ExprError::Binding { .. } | ExprError::Shape(..) => Internal,
                ExprError::Limit(_) => ResourceLimit,
            },
            Self::Param(_) | Self::ZeroState(_) | Self::Observable(_)
                => InvalidParameter,
            Self::Limit(_) => ResourceLimit,
            Self::Hamiltonian(err) => hamiltonian_kind(err),
            Self::Propagate(err) => match err {
                TError::BadTime { .. } => InvalidParameter,
                TError::NonFinite(_) => NumericalInstability,
                TError::Shape(..) | TError::MissingSnapshot(_) => Internal,
                TError::Limit(_) => ResourceLimit,
                TError::Hamiltonian(err) => hamiltonian_kind(err),
            },
            Self::Eigen(err) => match err {
                XError::BadNumEigen { .. } => InvalidParameter,
                XError::NotConverged(_) | XError::Limit(_) => ResourceLimit,
                XError::Hamiltonian(err) => hamiltonian_kind(err),
            },
        }
    }
}

fn hamiltonian_kind(err: &HamiltonianError) -> ErrorKind {
    match err {
        HamiltonianError::Param(_) => ErrorKind::InvalidParameter,
        HamiltonianError::Shape(..) | HamiltonianError::Linalg(_)
            => ErrorKind::Internal,
    }
}

/// Coarse classification of a [`SolveError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad bounds or point counts.
    InvalidGrid,
    /// Bad physical parameter, time value, or degenerate initial state.
    InvalidParameter,
    /// Malformed expression syntax.
    Parse,
    /// Expression references disallowed names or operations.
    UnsafeExpression,
    /// Wrong numeric domain, e.g. a complex or non-finite potential.
    TypeMismatch,
    /// Grid, expression, or propagation exceeds a configured ceiling.
    ResourceLimit,
    /// Propagation produced non-finite values.
    NumericalInstability,
    /// Anything else; not caused by the request.
    Internal,
}

impl ErrorKind {
    /// Return `true` if the error was caused by the request contents.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::NumericalInstability | Self::Internal)
    }
}
