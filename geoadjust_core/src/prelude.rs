// geoadjust_core/src/prelude.rs

// --- Core Abstractions (the seams callers plug into) ---
pub use crate::linalg::{InverseSolver, InverseStage};
pub use crate::photogrammetry::IterativeModel;

// --- Core Data Structures ---
pub use crate::error::{AdjustError, Result};
pub use crate::network::{Network, Observation, Station};
pub use crate::photogrammetry::{Exterior, ImageView, Interior};
pub use crate::types::{ConvergenceState, Matrix, ObservationId, StationId, Vector};

// --- Configuration ---
pub use crate::config::{AdjustmentConfig, LevelingSettings, NetworkSettings, RefinementSettings};
pub use crate::photogrammetry::CollinearityLinearization;

// --- Adjustment Algorithms ---
pub use crate::leveling::{attached_leveling, closed_leveling, LevelingAdjustment};
pub use crate::linalg::{robust_inverse, weighted_ols, InverseCascade};
pub use crate::network::{adjust_network, adjust_network_with, NetworkAdjustment};
pub use crate::photogrammetry::{
    forward_intersection, project_points, space_intersection, space_resection, SpaceIntersection,
    SpaceResection,
};
