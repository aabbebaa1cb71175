// geoadjust_core/src/error.rs

use thiserror::Error;

/// Every way an adjustment run can be rejected.
///
/// A singular normal matrix is not an error (the inversion cascade absorbs
/// it), and neither is running out of iterations (see `ConvergenceState`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdjustError {
    // --- Preconditions ---
    #[error("under-determined system: {observations} observation(s) for {unknowns} unknown(s)")]
    UnderDetermined { observations: usize, unknowns: usize },

    #[error("{context}: expected {expected} element(s), got {actual}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("`{actual}` point(s) are not enough for {operation}, need at least {required}")]
    InsufficientPoints {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("station index {0} does not exist in this network")]
    UnknownStation(usize),

    #[error("observation '{observation}' has an invalid weight basis {value}")]
    InvalidWeight { observation: String, value: f64 },

    #[error("setting `{setting}` must be finite and positive, got {value}")]
    InvalidSetting { setting: &'static str, value: f64 },

    #[error("the network has no control station to start from")]
    NoControlStation,

    // --- Structural violations ---
    #[error("self loop detected: observation '{observation}' starts and ends at '{station}'")]
    SelfLoopDetected { observation: String, station: String },

    #[error("station '{station}' cannot be reached from any control station")]
    UnreachableStation { station: String },
}

pub type Result<T> = std::result::Result<T, AdjustError>;
