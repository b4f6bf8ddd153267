//! Antenna pattern fitting for completed sweeps
//!
//! A [`CurveFitter`] takes the ordered `(angle, rssi)` points of one sweep and
//! fits the configured [`FitModel`]. The result carries the evaluated curve,
//! the model parameters, the estimated peak and goodness-of-fit figures.
//! Every failure is returned as a [`DfError`]; nothing here panics on bad
//! data.

mod cosine;
mod gaussian;
mod goodness;
mod polynomial;

use serde::Serialize;

pub use cosine::CosineParameters;
pub use gaussian::GaussianParameters;
pub use goodness::{mean_squared_error, r_squared};
pub use polynomial::{PolynomialParameters, solve_linear_system};

use crate::config::{FitConfig, FitModel};
use crate::constants::{MAX_ANGLE_DEG, MIN_RSSI_SPREAD_DB};
use crate::error::{DfError, Result};
use crate::observation::PeakEstimate;
use crate::series::SamplePoint;

/// One sample of an evaluated model curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub angle: f64,
    pub value: f64,
}

/// Model-specific parameters of a fit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FitParameters {
    Gaussian(GaussianParameters),
    CosineSquared(CosineParameters),
    Polynomial(PolynomialParameters),
}

impl FitParameters {
    /// Model value at `angle_deg`
    pub fn evaluate(&self, angle_deg: f64) -> f64 {
        match self {
            Self::Gaussian(p) => p.evaluate(angle_deg),
            Self::CosineSquared(p) => p.evaluate(angle_deg),
            Self::Polynomial(p) => p.evaluate(angle_deg),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Gaussian(p) => p.is_finite(),
            Self::CosineSquared(p) => p.is_finite(),
            Self::Polynomial(p) => p.is_finite(),
        }
    }

    /// Peak of the model; polynomials have no closed form and use the curve maximum
    fn peak(&self, curve: &[CurvePoint]) -> Option<PeakEstimate> {
        match self {
            Self::Gaussian(p) => Some(p.peak()),
            Self::CosineSquared(p) => Some(p.peak()),
            Self::Polynomial(_) => curve
                .iter()
                .copied()
                .reduce(|best, c| if c.value > best.value { c } else { best })
                .map(|c| PeakEstimate {
                    angle: c.angle,
                    signal: c.value,
                }),
        }
    }
}

/// Fit quality figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitQuality {
    /// Mean squared error of the model at the observed angles
    pub mse: f64,
    /// Coefficient of determination against the evaluated curve (see [`r_squared`])
    pub r2: f64,
}

/// Result of fitting one completed sweep
///
/// Recomputed wholesale on every fit; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    #[serde(serialize_with = "serialize_model")]
    pub model: FitModel,
    pub curve: Vec<CurvePoint>,
    pub parameters: FitParameters,
    pub peak: PeakEstimate,
    pub quality: FitQuality,
}

fn serialize_model<S: serde::Serializer>(
    model: &FitModel,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(model)
}

/// Fits antenna pattern models using a fixed tuning configuration
#[derive(Debug, Clone, Default)]
pub struct CurveFitter {
    config: FitConfig,
}

impl CurveFitter {
    pub fn new(config: &FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// The model used by [`CurveFitter::fit`]
    pub fn model(&self) -> FitModel {
        self.config.model
    }

    /// Fit the configured model
    pub fn fit(&self, points: &[SamplePoint]) -> Result<FitResult> {
        self.fit_model(points, self.config.model)
    }

    /// Fit an explicit model
    ///
    /// # Errors
    /// * [`DfError::InsufficientData`] when there are fewer distinct angles than
    ///   the model needs (3 for Gaussian/cosine, degree + 1 for polynomials)
    /// * [`DfError::DegenerateFit`] when the RSSI has no spread or the fit
    ///   produced non-finite values
    pub fn fit_model(&self, points: &[SamplePoint], model: FitModel) -> Result<FitResult> {
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.angle.total_cmp(&b.angle));

        let needed = model.min_points();
        let available = distinct_angles(&sorted);
        if available < needed {
            return Err(DfError::InsufficientData { needed, available });
        }

        let (min_rssi, max_rssi) = rssi_range(&sorted);
        if max_rssi - min_rssi < MIN_RSSI_SPREAD_DB {
            return Err(DfError::DegenerateFit("zero variance in rssi".to_string()));
        }

        let (parameters, resolution) = match model {
            FitModel::Gaussian => (
                FitParameters::Gaussian(gaussian::fit(&sorted, &self.config.gaussian)),
                self.config.gaussian.curve_resolution_deg,
            ),
            FitModel::CosineSquared => (
                FitParameters::CosineSquared(cosine::fit(&sorted, &self.config.cosine)),
                self.config.cosine.curve_resolution_deg,
            ),
            FitModel::Polynomial { degree } => (
                FitParameters::Polynomial(polynomial::fit(&sorted, degree)?),
                self.config.polynomial.curve_resolution_deg,
            ),
        };

        if !parameters.is_finite() {
            return Err(DfError::DegenerateFit(format!(
                "non-finite {} parameters",
                model
            )));
        }

        let curve = sample_curve(resolution, |angle| parameters.evaluate(angle));
        if curve.iter().any(|c| !c.value.is_finite()) {
            return Err(DfError::DegenerateFit(format!("non-finite {} curve", model)));
        }

        let peak = parameters
            .peak(&curve)
            .filter(|p| p.angle.is_finite() && p.signal.is_finite())
            .ok_or_else(|| DfError::DegenerateFit("no peak".to_string()))?;

        let quality = FitQuality {
            mse: mean_squared_error(&sorted, |angle| parameters.evaluate(angle)),
            r2: r_squared(&sorted, &curve),
        };

        log::debug!(
            "{} fit over {} points: peak {:.1}° @ {:.1} dBm, R² {:.3}",
            model,
            sorted.len(),
            peak.angle,
            peak.signal,
            quality.r2
        );

        Ok(FitResult {
            model,
            curve,
            parameters,
            peak,
            quality,
        })
    }
}

/// Fit `model` with default tuning
pub fn fit(points: &[SamplePoint], model: FitModel) -> Result<FitResult> {
    CurveFitter::default().fit_model(points, model)
}

/// Evaluate `f` on a regular grid spanning 0-180°
fn sample_curve(resolution_deg: f64, f: impl Fn(f64) -> f64) -> Vec<CurvePoint> {
    let steps = (MAX_ANGLE_DEG / resolution_deg).floor() as usize;
    (0..=steps)
        .map(|i| {
            let angle = i as f64 * resolution_deg;
            CurvePoint {
                angle,
                value: f(angle),
            }
        })
        .collect()
}

/// Number of distinct angles in an angle-sorted slice
fn distinct_angles(sorted: &[SamplePoint]) -> usize {
    let mut count = 0;
    let mut last: Option<f64> = None;
    for p in sorted {
        if last != Some(p.angle) {
            count += 1;
            last = Some(p.angle);
        }
    }
    count
}

fn rssi_range(points: &[SamplePoint]) -> (f64, f64) {
    points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.rssi), hi.max(p.rssi))
        })
}
