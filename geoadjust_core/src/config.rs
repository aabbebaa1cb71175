// geoadjust_core/src/config.rs

use serde::{Deserialize, Serialize};

use crate::photogrammetry::CollinearityLinearization;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # AdjustmentConfig
/// Every tunable of the adjustment engine in one place. Each section falls
/// back to its defaults when missing, so an empty document is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the document has fields not in our struct
pub struct AdjustmentConfig {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub refinement: RefinementSettings,

    #[serde(default)]
    pub leveling: LevelingSettings,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NetworkSettings {
    /// Numerator of every observation weight, `P[i][i] = unit_weight / weight_basis[i]`.
    pub unit_weight: f64,
    /// Factor applied to misclosures before solving (1000 turns metres into millimetres).
    pub working_scale: f64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            unit_weight: 1.0,
            working_scale: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RefinementSettings {
    /// Upper bound on linearize-and-solve rounds.
    pub max_iterations: usize,
    /// Corrections below this magnitude count as converged.
    pub threshold: f64,
    /// Which collinearity Jacobian to use.
    pub linearization: CollinearityLinearization,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            threshold: 1e-6,
            linearization: CollinearityLinearization::SimplifyNone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LevelingSettings {
    /// Number of decimals (in metres) corrections are rounded to.
    pub correction_precision: u32,
    /// `c` in the allowed misclosure `±c·√L` mm, with `L` in km.
    pub tolerance_coefficient_mm: f64,
}

impl Default for LevelingSettings {
    fn default() -> Self {
        Self {
            correction_precision: 3,
            tolerance_coefficient_mm: 40.0,
        }
    }
}

impl LevelingSettings {
    /// Allowed misclosure in metres for a line of `total_distance_km`.
    pub fn tolerance(&self, total_distance_km: f64) -> f64 {
        self.tolerance_coefficient_mm * total_distance_km.sqrt() / 1000.0
    }
}
