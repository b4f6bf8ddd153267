use serde::Serialize;

use crate::config::GaussianFitConfig;
use crate::constants::{FWHM_PER_SIGMA, MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use crate::observation::PeakEstimate;
use crate::series::SamplePoint;

const AMPLITUDE_MIN_DB: f64 = 1.0;
const AMPLITUDE_MAX_DB: f64 = 100.0;
const SIGMA_MIN_DEG: f64 = 2.0;
const SIGMA_MAX_DEG: f64 = 80.0;
/// How far below the weakest sample the baseline may settle
const BASELINE_MARGIN_DB: f64 = 5.0;

/// `rssi(θ) = baseline + amplitude · exp(−(θ − center)² / (2·sigma²))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianParameters {
    /// Lobe height above the baseline (dB)
    pub amplitude: f64,
    /// Lobe center in degrees
    pub center: f64,
    /// Lobe width in degrees
    pub sigma: f64,
    /// Floor level (dBm)
    pub baseline: f64,
}

impl GaussianParameters {
    pub fn evaluate(&self, angle_deg: f64) -> f64 {
        let d = angle_deg - self.center;
        self.baseline + self.amplitude * (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Full width at half maximum, in degrees
    pub fn beam_width(&self) -> f64 {
        FWHM_PER_SIGMA * self.sigma
    }

    pub fn peak_rssi(&self) -> f64 {
        self.baseline + self.amplitude
    }

    pub fn peak(&self) -> PeakEstimate {
        PeakEstimate {
            angle: self.center,
            signal: self.peak_rssi(),
        }
    }

    pub(super) fn is_finite(&self) -> bool {
        self.amplitude.is_finite()
            && self.center.is_finite()
            && self.sigma.is_finite()
            && self.baseline.is_finite()
    }

    fn clamped(self, min_rssi: f64, max_rssi: f64) -> Self {
        Self {
            amplitude: self.amplitude.clamp(AMPLITUDE_MIN_DB, AMPLITUDE_MAX_DB),
            center: self.center.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG),
            sigma: self.sigma.clamp(SIGMA_MIN_DEG, SIGMA_MAX_DEG),
            baseline: self.baseline.clamp(min_rssi - BASELINE_MARGIN_DB, max_rssi),
        }
    }

    /// Mean squared error over `points`
    fn error(&self, points: &[SamplePoint]) -> f64 {
        let sum: f64 = points
            .iter()
            .map(|p| {
                let e = self.evaluate(p.angle) - p.rssi;
                e * e
            })
            .sum();
        sum / points.len() as f64
    }

    /// Gradient of the summed squared error, in (amplitude, center, sigma, baseline) order
    fn gradient(&self, points: &[SamplePoint]) -> [f64; 4] {
        let s2 = self.sigma * self.sigma;
        let s3 = s2 * self.sigma;
        let mut g = [0.0; 4];
        for p in points {
            let d = p.angle - self.center;
            let exp_term = (-(d * d) / (2.0 * s2)).exp();
            let err = self.baseline + self.amplitude * exp_term - p.rssi;

            g[0] += err * exp_term;
            g[1] += err * self.amplitude * exp_term * d / s2;
            g[2] += err * self.amplitude * exp_term * d * d / s3;
            g[3] += err;
        }
        g
    }
}

/// Initial guess from the raw samples
///
/// The peak sample gives center and amplitude; sigma comes from the angular
/// spread of samples at or above half maximum.
fn initial_guess(points: &[SamplePoint], min_rssi: f64, max_rssi: f64, default_sigma: f64) -> GaussianParameters {
    let center = points
        .iter()
        .copied()
        .reduce(|best, p| if p.rssi > best.rssi { p } else { best })
        .map_or(MAX_ANGLE_DEG / 2.0, |p| p.angle);

    let amplitude = max_rssi - min_rssi;
    let baseline = min_rssi;
    let half_max = baseline + amplitude / 2.0;

    let (lo, hi) = points
        .iter()
        .filter(|p| p.rssi >= half_max)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.angle), hi.max(p.angle))
        });
    let sigma = if lo <= hi {
        (hi - lo) / FWHM_PER_SIGMA
    } else {
        default_sigma
    };

    GaussianParameters {
        amplitude,
        center,
        sigma: sigma.clamp(SIGMA_MIN_DEG, SIGMA_MAX_DEG),
        baseline,
    }
}

/// Adaptive-step gradient descent on the squared error
///
/// Parameters are clamped after every step. Returns the lowest-error iterate:
/// on noisy sweeps an overlong step can throw the lobe against its clamps,
/// where the descent stalls.
pub(super) fn fit(points: &[SamplePoint], config: &GaussianFitConfig) -> GaussianParameters {
    let (min_rssi, max_rssi) = super::rssi_range(points);
    let mut params =
        initial_guess(points, min_rssi, max_rssi, config.default_sigma_deg).clamped(min_rssi, max_rssi);

    let mut step = config.initial_step;
    let mut prev_error = f64::INFINITY;
    let mut best = (f64::INFINITY, params);

    for iteration in 0..config.max_iterations {
        let g = params.gradient(points);
        let error = params.error(points);
        if error < best.0 {
            best = (error, params);
        }

        step *= if error < prev_error {
            config.step_growth
        } else {
            config.step_shrink
        };
        step = step.clamp(config.min_step, config.max_step);

        params.amplitude -= g[0] * step;
        params.center -= g[1] * step;
        params.sigma -= g[2] * step;
        params.baseline -= g[3] * step;

        params = params.clamped(min_rssi, max_rssi);

        if (error - prev_error).abs() < config.convergence_tolerance {
            log::trace!("Gaussian fit converged after {} iterations", iteration + 1);
            break;
        }
        prev_error = error;
    }

    if params.error(points) < best.0 {
        params
    } else {
        best.1
    }
}
