// geoadjust_core/src/leveling.rs

//! Closure distribution along single leveling lines.
//!
//! Unlike a network adjustment these are not least-squares solves: the
//! misclosure is spread in proportion to section length, rounded to a fixed
//! number of decimals, and the rounding leftovers are pushed one unit at a
//! time onto the largest (or smallest) correction.

use crate::config::LevelingSettings;
use crate::error::{AdjustError, Result};

/// One section between consecutive stations of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelingSection {
    /// Length in km.
    pub distance: f64,
    /// Measured elevation difference in m.
    pub difference: f64,
    pub correction: f64,
    pub corrected_difference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelingSummary {
    pub distance_sum: f64,
    pub difference_sum: f64,
    pub correction_sum: f64,
    pub corrected_difference_sum: f64,
    /// Misclosure `f` in m.
    pub closure: f64,
    /// Allowed misclosure in m.
    pub tolerance: f64,
    /// Correction per km.
    pub mean_correction: f64,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelingAdjustment {
    pub sections: Vec<LevelingSection>,
    /// Station elevations, starting with the first benchmark; one more than
    /// there are sections.
    pub elevations: Vec<f64>,
    pub summary: LevelingSummary,
}

/// Adjusts a line that starts and ends on the same benchmark.
pub fn closed_leveling(
    distances: &[f64],
    differences: &[f64],
    start: f64,
    settings: &LevelingSettings,
) -> Result<LevelingAdjustment> {
    adjust_line(distances, differences, start, 0.0, settings)
}

/// Adjusts a line run between two benchmarks of known elevation.
pub fn attached_leveling(
    distances: &[f64],
    differences: &[f64],
    start: f64,
    end: f64,
    settings: &LevelingSettings,
) -> Result<LevelingAdjustment> {
    adjust_line(distances, differences, start, end - start, settings)
}

fn adjust_line(
    distances: &[f64],
    differences: &[f64],
    start: f64,
    expected_rise: f64,
    settings: &LevelingSettings,
) -> Result<LevelingAdjustment> {
    if distances.len() != differences.len() {
        return Err(AdjustError::SizeMismatch {
            context: "leveling differences",
            expected: distances.len(),
            actual: differences.len(),
        });
    }
    if distances.is_empty() {
        return Err(AdjustError::InsufficientPoints {
            operation: "leveling line",
            required: 1,
            actual: 0,
        });
    }
    let distance_sum: f64 = distances.iter().sum();
    if !(distance_sum.is_finite() && distance_sum > 0.0) {
        return Err(AdjustError::InvalidWeight {
            observation: "leveling line".into(),
            value: distance_sum,
        });
    }

    let precision = settings.correction_precision;
    let difference_sum: f64 = differences.iter().sum();
    let closure = difference_sum - expected_rise;
    let tolerance = settings.tolerance(distance_sum);

    let correction_sum = round_to_precision(-closure, precision);
    let mean_correction = round_to_precision(correction_sum / distance_sum, precision);
    let mut corrections: Vec<f64> = distances
        .iter()
        .map(|d| round_to_precision(d * mean_correction, precision))
        .collect();
    distribute_to_target(&mut corrections, correction_sum, precision);

    let mut elevations = Vec::with_capacity(distances.len() + 1);
    elevations.push(start);
    let sections: Vec<LevelingSection> = distances
        .iter()
        .zip(differences)
        .zip(&corrections)
        .map(|((&distance, &difference), &correction)| {
            let corrected_difference = difference + correction;
            let last = elevations[elevations.len() - 1];
            elevations.push(last + corrected_difference);
            LevelingSection {
                distance,
                difference,
                correction,
                corrected_difference,
            }
        })
        .collect();

    let within_tolerance = closure.abs() <= tolerance;
    if within_tolerance {
        tracing::info!(
            "leveling line closed: f = {:.4} m within ±{:.4} m over {:.3} km",
            closure,
            tolerance,
            distance_sum
        );
    } else {
        tracing::warn!(
            "leveling misclosure {:.4} m exceeds the allowed ±{:.4} m",
            closure,
            tolerance
        );
    }

    Ok(LevelingAdjustment {
        summary: LevelingSummary {
            distance_sum,
            difference_sum,
            correction_sum,
            corrected_difference_sum: sections.iter().map(|s| s.corrected_difference).sum(),
            closure,
            tolerance,
            mean_correction,
            within_tolerance,
        },
        sections,
        elevations,
    })
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to_precision(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Nudges `values` one precision unit at a time until they sum to `target`.
///
/// A positive excess is taken off the largest entry, a deficit is added to
/// the smallest; ties go to the first occurrence.
pub fn distribute_to_target(values: &mut [f64], target: f64, decimals: u32) {
    let unit = 10f64.powi(-(decimals as i32));
    let excess = round_to_precision(values.iter().sum::<f64>() - target, decimals);
    let steps = (excess.abs() / unit).round() as usize;
    if steps == 0 || values.is_empty() {
        return;
    }
    tracing::debug!("distributing {} rounding units of {}", steps, unit);

    for _ in 0..steps {
        let (idx, delta) = if excess > 0.0 {
            (extreme_index(values, |a, b| a > b), -unit)
        } else {
            (extreme_index(values, |a, b| a < b), unit)
        };
        values[idx] = round_to_precision(values[idx] + delta, decimals);
    }
}

/// First index whose value beats every other under `better`.
fn extreme_index(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to_precision(0.0125, 2), 0.01);
        assert_eq!(round_to_precision(2.5, 0), 3.0);
        assert_eq!(round_to_precision(-2.5, 0), -3.0);
        assert_eq!(round_to_precision(-0.0064, 3), -0.006);
    }

    #[test]
    fn distribution_prefers_first_extreme() {
        let mut values = vec![-0.013, -0.017, -0.014, -0.016];
        distribute_to_target(&mut values, -0.057, 3);
        assert_eq!(values, vec![-0.013, -0.015, -0.014, -0.015]);

        let mut values = vec![0.004, 0.006, 0.006];
        distribute_to_target(&mut values, 0.015, 3);
        assert_eq!(values, vec![0.004, 0.005, 0.006]);
    }

    #[test]
    fn closed_line_returns_to_its_start() {
        let result = closed_leveling(
            &[0.8, 0.5, 1.2, 0.5, 1.0],
            &[0.23, 0.26, -0.55, -0.45, 0.49],
            12.0,
            &LevelingSettings::default(),
        )
        .unwrap();

        let corrections: Vec<f64> = result.sections.iter().map(|s| s.correction).collect();
        assert_eq!(corrections, vec![0.004, 0.003, 0.005, 0.003, 0.005]);
        assert_abs_diff_eq!(result.summary.closure, -0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(result.summary.correction_sum, 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(result.summary.mean_correction, 0.005, epsilon = 1e-12);
        assert_abs_diff_eq!(result.summary.tolerance, 0.08, epsilon = 1e-12);
        assert!(result.summary.within_tolerance);

        assert_eq!(result.elevations.len(), 6);
        assert_abs_diff_eq!(result.elevations[1], 12.234, epsilon = 1e-9);
        assert_abs_diff_eq!(result.elevations[5], 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.summary.corrected_difference_sum, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn attached_line_ends_on_the_known_benchmark() {
        let result = attached_leveling(
            &[1.6, 2.1, 1.7, 2.0],
            &[2.331, 2.813, -2.224, 1.430],
            45.286,
            49.579,
            &LevelingSettings::default(),
        )
        .unwrap();

        let corrections: Vec<f64> = result.sections.iter().map(|s| s.correction).collect();
        assert_eq!(corrections, vec![-0.013, -0.015, -0.014, -0.015]);
        assert_abs_diff_eq!(result.summary.closure, 0.057, epsilon = 1e-9);
        assert_abs_diff_eq!(corrections.iter().sum::<f64>(), -0.057, epsilon = 1e-12);
        assert_abs_diff_eq!(result.elevations[2], 50.402, epsilon = 1e-9);
        assert_abs_diff_eq!(*result.elevations.last().unwrap(), 49.579, epsilon = 1e-9);
    }

    #[test]
    fn excessive_misclosure_is_flagged_not_rejected() {
        let settings = LevelingSettings {
            tolerance_coefficient_mm: 12.0,
            ..LevelingSettings::default()
        };
        let result = closed_leveling(&[1.0, 1.0], &[0.5, -0.45], 100.0, &settings).unwrap();
        assert!(!result.summary.within_tolerance);
        assert_abs_diff_eq!(*result.elevations.last().unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let settings = LevelingSettings::default();
        assert!(matches!(
            closed_leveling(&[1.0, 2.0], &[0.1], 0.0, &settings),
            Err(AdjustError::SizeMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            closed_leveling(&[], &[], 0.0, &settings),
            Err(AdjustError::InsufficientPoints { .. })
        ));
        assert!(matches!(
            attached_leveling(&[0.0], &[0.1], 0.0, 0.1, &settings),
            Err(AdjustError::InvalidWeight { .. })
        ));
    }
}
