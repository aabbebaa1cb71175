// geoadjust_core/src/types.rs

use nalgebra::{DMatrix, DVector};

// --- Core Type Aliases ---
pub type Matrix = DMatrix<f64>;
pub type Vector = DVector<f64>;

// --- Core Identifiers ---
/// Dense index of a station inside a `Network` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(pub usize);

/// Dense index of an observation inside a `Network` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationId(pub usize);

/// Outcome of an iterative solve. A run that runs out of iterations is not an
/// error; it keeps its last estimate and is labelled `NotConverged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceState {
    Converged,
    NotConverged,
}

impl ConvergenceState {
    pub fn is_converged(self) -> bool {
        matches!(self, ConvergenceState::Converged)
    }
}
