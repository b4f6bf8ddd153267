//! Configuration for the bearingfit direction-finding pipeline.
//!
//! Every section has sensible defaults, so a TOML file only needs the keys
//! it wants to change:
//!
//! ```toml
//! [fit]
//! model = "polynomial:4"
//!
//! [triangulation]
//! baseline_m = 2.5
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::constants::{MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use crate::error::{DfError, Result};

/// Highest polynomial degree accepted by the normal-equation solver.
pub const MAX_POLYNOMIAL_DEGREE: usize = 8;

/// Default polynomial degree when none is given.
pub const DEFAULT_POLYNOMIAL_DEGREE: usize = 3;

/// Antenna pattern model fitted to a completed sweep
///
/// # Parsing formats
/// - `gaussian` (or `gauss`)
/// - `cosine` (or `cosine-squared`, `cos2`)
/// - `polynomial` (or `poly`), optionally with a degree: `polynomial:4`
///
/// # Example
/// ```
/// use bearingfit::config::FitModel;
///
/// let model: FitModel = "poly:4".parse().unwrap();
/// assert_eq!(model, FitModel::Polynomial { degree: 4 });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FitModel {
    /// Gaussian main-lobe approximation (directional antennas)
    #[default]
    Gaussian,
    /// cos²(θ − phase) pattern (dipole-like antennas)
    CosineSquared,
    /// Least-squares polynomial of the given degree
    Polynomial { degree: usize },
}

impl FitModel {
    /// Minimum number of distinct angles needed to fit this model
    pub fn min_points(&self) -> usize {
        match self {
            Self::Gaussian | Self::CosineSquared => 3,
            Self::Polynomial { degree } => degree + 1,
        }
    }
}

impl fmt::Display for FitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::CosineSquared => write!(f, "cosine"),
            Self::Polynomial { degree } => write!(f, "polynomial:{}", degree),
        }
    }
}

impl FromStr for FitModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (name, degree) = match s.split_once(':') {
            Some((name, degree)) => (name.trim(), Some(degree.trim())),
            None => (s.as_str(), None),
        };

        match (name, degree) {
            ("gaussian" | "gauss", None) => Ok(Self::Gaussian),
            ("cosine" | "cosine-squared" | "cos2", None) => Ok(Self::CosineSquared),
            ("polynomial" | "poly", None) => Ok(Self::Polynomial {
                degree: DEFAULT_POLYNOMIAL_DEGREE,
            }),
            ("polynomial" | "poly", Some(degree)) => {
                let degree: usize = degree
                    .parse()
                    .map_err(|_| format!("invalid polynomial degree: {}", degree))?;
                if degree == 0 || degree > MAX_POLYNOMIAL_DEGREE {
                    return Err(format!(
                        "polynomial degree must be 1..={}",
                        MAX_POLYNOMIAL_DEGREE
                    ));
                }
                Ok(Self::Polynomial { degree })
            }
            _ => Err(format!("unknown fit model: {}", s)),
        }
    }
}

impl TryFrom<String> for FitModel {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// System-wide configuration
///
/// Use `DfConfig::default()` for the values the boards ship with.
///
/// # Example
/// ```
/// use bearingfit::config::DfConfig;
///
/// let mut config = DfConfig::default();
/// config.triangulation.baseline_m = 4.0;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DfConfig {
    /// Sweep accumulation configuration
    pub sweep: SweepConfig,
    /// Curve fitting configuration
    pub fit: FitConfig,
    /// Two-station triangulation configuration
    pub triangulation: TriangulationConfig,
}

/// Sweep accumulation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Angle (degrees) at which a sweep is considered complete
    pub boundary_angle_deg: f64,
    /// Begin scanning on the first observation even without a start command.
    /// Boards can be started by another client, so this defaults to on.
    pub auto_start: bool,
}

/// Curve fitting configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Model fitted when a sweep completes
    pub model: FitModel,
    /// Gaussian optimizer tuning
    pub gaussian: GaussianFitConfig,
    /// Cosine-squared optimizer tuning
    pub cosine: CosineFitConfig,
    /// Polynomial curve sampling
    pub polynomial: PolynomialFitConfig,
}

/// Gaussian gradient-descent tuning
///
/// The step size adapts: it grows by `step_growth` while the error falls and
/// shrinks by `step_shrink` when it rises, always staying within
/// `[min_step, max_step]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GaussianFitConfig {
    /// Iteration cap
    pub max_iterations: usize,
    /// Stop once successive mean-squared errors differ by less than this
    pub convergence_tolerance: f64,
    /// Step size before the first adaptation
    pub initial_step: f64,
    /// Step multiplier applied while the error decreases
    pub step_growth: f64,
    /// Step multiplier applied when the error increases
    pub step_shrink: f64,
    /// Lower step clamp
    pub min_step: f64,
    /// Upper step clamp
    pub max_step: f64,
    /// Sigma used when no sample reaches half maximum, in degrees
    pub default_sigma_deg: f64,
    /// Angular spacing of the evaluated curve, in degrees
    pub curve_resolution_deg: f64,
}

/// Cosine-squared gradient-descent tuning (fixed step)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CosineFitConfig {
    /// Fixed step size
    pub step_size: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Angular spacing of the evaluated curve, in degrees
    pub curve_resolution_deg: f64,
}

/// Polynomial curve sampling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolynomialFitConfig {
    /// Angular spacing of the evaluated curve, in degrees
    pub curve_resolution_deg: f64,
}

/// Two-station triangulation configuration
///
/// Station A sits at the origin and station B at `(baseline_m, 0)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Distance between the two stations in meters
    pub baseline_m: f64,
    /// Board id of the station at the origin
    pub station_a: String,
    /// Board id of the station at the far end of the baseline
    pub station_b: String,
    /// Recompute the triangulation whenever both stations have a fresh fit
    pub auto_calculate: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            boundary_angle_deg: MAX_ANGLE_DEG,
            auto_start: true,
        }
    }
}

impl Default for GaussianFitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            convergence_tolerance: 0.001,
            initial_step: 0.1,
            step_growth: 1.1,
            step_shrink: 0.5,
            min_step: 0.001,
            max_step: 0.5,
            default_sigma_deg: 20.0,
            curve_resolution_deg: 1.0,
        }
    }
}

impl Default for CosineFitConfig {
    fn default() -> Self {
        Self {
            step_size: 0.001,
            iterations: 100,
            curve_resolution_deg: 2.0,
        }
    }
}

impl Default for PolynomialFitConfig {
    fn default() -> Self {
        Self {
            curve_resolution_deg: 2.0,
        }
    }
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            baseline_m: 1.0,
            station_a: "board1".to_string(),
            station_b: "board2".to_string(),
            auto_calculate: true,
        }
    }
}

impl DfConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| DfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DfError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let boundary = self.sweep.boundary_angle_deg;
        if !(boundary > MIN_ANGLE_DEG && boundary <= MAX_ANGLE_DEG) {
            return Err(DfError::Config(format!(
                "boundary angle must be in ({}, {}], got {}",
                MIN_ANGLE_DEG, MAX_ANGLE_DEG, boundary
            )));
        }

        self.fit.validate()?;

        let tri = &self.triangulation;
        if !(tri.baseline_m.is_finite() && tri.baseline_m > 0.0) {
            return Err(DfError::Config(format!(
                "baseline must be greater than 0, got {}",
                tri.baseline_m
            )));
        }
        if tri.station_a == tri.station_b {
            return Err(DfError::Config(format!(
                "stations must differ, both are '{}'",
                tri.station_a
            )));
        }
        Ok(())
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if let FitModel::Polynomial { degree } = self.model
            && (degree == 0 || degree > MAX_POLYNOMIAL_DEGREE)
        {
            return Err(DfError::Config(format!(
                "polynomial degree must be 1..={}, got {}",
                MAX_POLYNOMIAL_DEGREE, degree
            )));
        }

        let g = &self.gaussian;
        if !(g.min_step > 0.0 && g.min_step <= g.max_step) {
            return Err(DfError::Config(format!(
                "gaussian step clamp [{}, {}] is empty",
                g.min_step, g.max_step
            )));
        }
        if g.default_sigma_deg <= 0.0 {
            return Err(DfError::Config("default sigma must be positive".to_string()));
        }
        if self.cosine.step_size <= 0.0 {
            return Err(DfError::Config("cosine step size must be positive".to_string()));
        }

        for resolution in [
            g.curve_resolution_deg,
            self.cosine.curve_resolution_deg,
            self.polynomial.curve_resolution_deg,
        ] {
            if !(resolution > 0.0 && resolution <= MAX_ANGLE_DEG) {
                return Err(DfError::Config(format!(
                    "curve resolution must be in (0, {}], got {}",
                    MAX_ANGLE_DEG, resolution
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_model_parse() {
        assert_eq!("gaussian".parse::<FitModel>().unwrap(), FitModel::Gaussian);
        assert_eq!("Cos2".parse::<FitModel>().unwrap(), FitModel::CosineSquared);
        assert_eq!(
            "polynomial".parse::<FitModel>().unwrap(),
            FitModel::Polynomial { degree: 3 }
        );
        assert_eq!(
            "poly: 5".parse::<FitModel>().unwrap(),
            FitModel::Polynomial { degree: 5 }
        );
    }

    #[test]
    fn test_fit_model_parse_invalid() {
        assert!("spline".parse::<FitModel>().is_err());
        assert!("poly:0".parse::<FitModel>().is_err());
        assert!("poly:9".parse::<FitModel>().is_err());
        assert!("gaussian:2".parse::<FitModel>().is_err());
    }

    #[test]
    fn test_fit_model_display_roundtrip() {
        for model in [
            FitModel::Gaussian,
            FitModel::CosineSquared,
            FitModel::Polynomial { degree: 4 },
        ] {
            assert_eq!(model.to_string().parse::<FitModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_partial_toml() {
        let config = DfConfig::from_toml_str(
            r#"
            [fit]
            model = "poly:4"

            [triangulation]
            baseline_m = 2.5
            auto_calculate = false
            "#,
        )
        .unwrap();

        assert_eq!(config.fit.model, FitModel::Polynomial { degree: 4 });
        assert!((config.triangulation.baseline_m - 2.5).abs() < 1e-12);
        assert!(!config.triangulation.auto_calculate);
        assert_eq!(config.triangulation.station_a, "board1");
        assert_eq!(config.fit.gaussian.max_iterations, 200);
        assert!((config.sweep.boundary_angle_deg - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(DfConfig::from_toml_str("[triangulation]\nbaseline_m = 0.0").is_err());
        assert!(DfConfig::from_toml_str("[fit]\nmodel = \"spline\"").is_err());
        assert!(
            DfConfig::from_toml_str("[triangulation]\nstation_a = \"x\"\nstation_b = \"x\"")
                .is_err()
        );
        assert!(DfConfig::from_toml_str("[sweep]\nboundary_angle_deg = 270.0").is_err());
    }
}
