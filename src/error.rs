//! Error types, one enum per concern.
//!
//! Argument and invariant violations surface as typed errors from the call
//! that received them. Algorithmic infeasibility (a node that cannot be
//! split, a stage that cannot reach its targets within the weak-count
//! budget) is never an error: it is reported through return values of the
//! training loop.

use thiserror::Error;

/// Parameter validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// min_tar must be in (0, 1).
    #[error("min_tar must be in (0, 1), got {0}")]
    InvalidMinTar(f32),

    /// max_far must be in (0, 1).
    #[error("max_far must be in (0, 1), got {0}")]
    InvalidMaxFar(f32),

    /// max_depth must be >= 1.
    #[error("max_depth must be >= 1, got {0}")]
    InvalidMaxDepth(u32),

    /// weak_count must be >= 1.
    #[error("weak_count must be >= 1, got {0}")]
    InvalidWeakCount(u32),
}

/// Subsample index array validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexArrayError {
    /// A mask must have one entry per pool sample.
    #[error("mask length {got} does not match sample count {expected}")]
    MaskLenMismatch { got: usize, expected: usize },

    /// A mask selected no samples at all.
    #[error("mask selects no samples")]
    EmptySelection,

    /// An index list may not exceed the pool size.
    #[error("index list of length {got} exceeds sample count {expected}")]
    TooManyIndices { got: usize, expected: usize },

    /// Index out of range of the pool.
    #[error("sample index {index} out of range (pool size {size})")]
    OutOfRange { index: usize, size: usize },

    /// Duplicate index where uniqueness is required.
    #[error("duplicate sample index {index}")]
    Duplicate { index: usize },
}

/// Working-buffer allocation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    /// Requested buffer dimensions overflow the addressable range.
    #[error("working buffer of {rows} rows x {cols} cols x 2 slots overflows the addressable range")]
    DimensionOverflow { rows: usize, cols: usize },
}

/// Training failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Index(#[from] IndexArrayError),

    /// The pool must contain both positive and negative samples.
    #[error("sample pool contains no {0} samples")]
    MissingClass(&'static str),

    /// Not a single weak classifier could be fitted.
    #[error("training produced an empty ensemble (the first tree failed to split)")]
    EmptyEnsemble,
}

/// Prediction failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// The ensemble holds no trees.
    #[error("ensemble has not been trained")]
    NotTrained,
}

/// Persistence failure for the stage document and the parameter stream.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stage document: {0}")]
    Json(#[from] serde_json::Error),

    /// The parameter stream does not start with the expected magic bytes.
    #[error("bad magic bytes (expected {expected:?}, got {got:?})")]
    BadMagic { expected: [u8; 4], got: [u8; 4] },

    /// The parameter stream was written by an unsupported format version.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// An enum tag in the stream has no known mapping.
    #[error("unknown boost type tag {0}")]
    UnknownBoostType(i32),

    /// The node stream of a weak classifier is truncated or ill-typed.
    #[error("malformed weak classifier: {0}")]
    MalformedTree(&'static str),
}
