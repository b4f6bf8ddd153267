//! Two-station bearing intersection
//!
//! Station A sits at the origin and station B at `(baseline, 0)`. Each
//! station reports the angle of its fitted peak, measured from the baseline
//! toward the other station: A's bearing is used directly, B's is mirrored
//! (`π − angle`) because the two antennas face each other.

use serde::Serialize;

use crate::constants::{COINCIDENT_EPSILON, PARALLEL_EPSILON};
use crate::error::{DfError, Result};

/// Emitter position solved from two bearings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriangulationResult {
    /// Distance from station A to the source
    pub distance_a: f64,
    /// Distance from station B to the source
    pub distance_b: f64,
    /// Station separation
    pub baseline: f64,
    /// Source x coordinate (station A frame)
    pub source_x: f64,
    /// Source y coordinate (station A frame)
    pub source_y: f64,
    /// Interior angles of the A–B–source triangle in degrees: at A, at B, at the source
    pub interior_angles: [f64; 3],
}

/// Intersect the bearing rays of stations A and B
///
/// Deterministic and free of side effects.
///
/// # Errors
/// * [`DfError::InvalidGeometry`] for a non-positive baseline, non-finite
///   input, or a triangle whose angles cannot be computed
/// * [`DfError::ParallelBearings`] when the rays never meet
/// * [`DfError::CoincidentSource`] when the source lands on a station
///
/// # Example
/// ```
/// use bearingfit::triangulation::solve;
///
/// let r = solve(10.0, 45.0, 45.0).unwrap();
/// assert!((r.source_x - 5.0).abs() < 1e-9);
/// assert!((r.source_y - 5.0).abs() < 1e-9);
/// ```
pub fn solve(baseline: f64, angle_a_deg: f64, angle_b_deg: f64) -> Result<TriangulationResult> {
    if !(baseline.is_finite() && baseline > 0.0) {
        return Err(DfError::InvalidGeometry(format!(
            "baseline must be greater than 0, got {}",
            baseline
        )));
    }
    if !(angle_a_deg.is_finite() && angle_b_deg.is_finite()) {
        return Err(DfError::InvalidGeometry("non-finite bearing".to_string()));
    }

    let theta1 = angle_a_deg.to_radians();
    let theta2 = std::f64::consts::PI - angle_b_deg.to_radians();

    let sin_diff = (theta1 - theta2).sin();
    if sin_diff.abs() < PARALLEL_EPSILON {
        return Err(DfError::ParallelBearings);
    }

    let t = -baseline * theta2.sin() / sin_diff;
    let s = -baseline * theta1.sin() / sin_diff;
    if !(t.is_finite() && s.is_finite()) {
        return Err(DfError::InvalidGeometry("invalid configuration".to_string()));
    }

    let distance_a = t.abs();
    let distance_b = s.abs();
    let min_distance = COINCIDENT_EPSILON * baseline;
    if distance_a < min_distance || distance_b < min_distance {
        return Err(DfError::CoincidentSource);
    }

    let source_x = t * theta1.cos();
    let source_y = t * theta1.sin();

    let interior_angles = [
        law_of_cosines(distance_a, baseline, distance_b),
        law_of_cosines(distance_b, baseline, distance_a),
        law_of_cosines(distance_a, distance_b, baseline),
    ];
    if interior_angles.iter().any(|a| a.is_nan()) {
        return Err(DfError::InvalidGeometry("invalid configuration".to_string()));
    }

    log::debug!(
        "Triangulated source at ({:.2}, {:.2}), distances {:.2} / {:.2}",
        source_x,
        source_y,
        distance_a,
        distance_b
    );

    Ok(TriangulationResult {
        distance_a,
        distance_b,
        baseline,
        source_x,
        source_y,
        interior_angles,
    })
}

/// Angle in degrees between sides `a` and `b`, opposite side `c`
fn law_of_cosines(a: f64, b: f64, c: f64) -> f64 {
    ((a * a + b * b - c * c) / (2.0 * a * b)).acos().to_degrees()
}
