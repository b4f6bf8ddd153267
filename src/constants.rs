//! Numeric constants for sweep geometry and fit stability
//!
//! These constants define the physical sweep range and the epsilon values
//! used throughout the fitting and triangulation code.

/// Lowest antenna angle reported by a board, in degrees.
pub const MIN_ANGLE_DEG: f64 = 0.0;

/// Highest antenna angle reported by a board, in degrees.
/// Reaching this angle ends a sweep.
pub const MAX_ANGLE_DEG: f64 = 180.0;

/// Gaussian full-width-at-half-maximum to sigma ratio (2·sqrt(2·ln 2), rounded).
pub const FWHM_PER_SIGMA: f64 = 2.35;

/// RSSI reported by a board when no packet was received at an angle.
pub const NO_SIGNAL_RSSI: f64 = -999.0;

/// Minimum RSSI spread (dB) for a series to be fittable.
/// Series flatter than this are treated as zero-variance.
pub const MIN_RSSI_SPREAD_DB: f64 = 1e-9;

/// Smallest pivot magnitude accepted by Gaussian elimination.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// Below this, sin(θ₁−θ₂) means the two bearing rays are parallel.
pub const PARALLEL_EPSILON: f64 = 1e-10;

/// Station-to-source distance, relative to the baseline, treated as zero.
pub const COINCIDENT_EPSILON: f64 = 1e-9;
