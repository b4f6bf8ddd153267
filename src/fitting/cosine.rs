use std::f64::consts::PI;

use serde::Serialize;

use crate::config::CosineFitConfig;
use crate::observation::PeakEstimate;
use crate::series::SamplePoint;

/// `rssi(θ) = amplitude · cos²(θ − phase) + baseline`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CosineParameters {
    /// Pattern height above the baseline (dB), never negative
    pub amplitude: f64,
    /// Direction of the pattern maximum in radians (0-π)
    pub phase: f64,
    /// Floor level (dBm)
    pub baseline: f64,
}

impl CosineParameters {
    pub fn evaluate(&self, angle_deg: f64) -> f64 {
        let c = (angle_deg.to_radians() - self.phase).cos();
        self.amplitude * c * c + self.baseline
    }

    pub fn phase_degrees(&self) -> f64 {
        self.phase.to_degrees()
    }

    pub fn peak(&self) -> PeakEstimate {
        PeakEstimate {
            angle: self.phase_degrees(),
            signal: self.amplitude + self.baseline,
        }
    }

    pub(super) fn is_finite(&self) -> bool {
        self.amplitude.is_finite() && self.phase.is_finite() && self.baseline.is_finite()
    }
}

/// Fixed-step gradient descent on the mean squared error
///
/// The gradient is averaged over the samples; a summed gradient with the
/// same step diverges in phase once a sweep has more than a handful of
/// points.
pub(super) fn fit(points: &[SamplePoint], config: &CosineFitConfig) -> CosineParameters {
    let (min_rssi, _) = super::rssi_range(points);
    let peak = points
        .iter()
        .copied()
        .reduce(|best, p| if p.rssi > best.rssi { p } else { best });

    let mut params = match peak {
        Some(peak) => CosineParameters {
            amplitude: peak.rssi - min_rssi,
            phase: peak.angle.to_radians(),
            baseline: min_rssi,
        },
        None => {
            return CosineParameters {
                amplitude: f64::NAN,
                phase: f64::NAN,
                baseline: f64::NAN,
            };
        }
    };

    let n = points.len() as f64;
    for _ in 0..config.iterations {
        let (mut d_amp, mut d_phase, mut d_base) = (0.0, 0.0, 0.0);
        for p in points {
            let delta = p.angle.to_radians() - params.phase;
            let (s, c) = delta.sin_cos();
            let err = params.amplitude * c * c + params.baseline - p.rssi;

            d_amp += err * c * c;
            d_phase += err * params.amplitude * 2.0 * c * s;
            d_base += err;
        }

        params.amplitude -= config.step_size * d_amp / n;
        params.phase -= config.step_size * d_phase / n;
        params.baseline -= config.step_size * d_base / n;

        params.amplitude = params.amplitude.max(0.0);
        params.phase = params.phase.clamp(0.0, PI);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitModel;
    use crate::fitting::{FitParameters, fit as fit_model};

    fn cosine_sweep(amplitude: f64, phase_deg: f64, baseline: f64, step: usize) -> Vec<SamplePoint> {
        let truth = CosineParameters {
            amplitude,
            phase: phase_deg.to_radians(),
            baseline,
        };
        (0..=180)
            .step_by(step)
            .map(|a| SamplePoint::new(a as f64, truth.evaluate(a as f64)))
            .collect()
    }

    #[test]
    fn test_recovers_phase() {
        for (phase, step) in [(62.0, 5), (118.0, 5), (92.0, 10)] {
            let points = cosine_sweep(20.0, phase, -80.0, step);
            let result = fit_model(&points, FitModel::CosineSquared).unwrap();
            assert!(
                (result.peak.angle - phase).abs() < 2.0,
                "expected {}, got {}",
                phase,
                result.peak.angle
            );
            assert!(result.quality.r2 > 0.99, "r2 {}", result.quality.r2);
        }
    }

    #[test]
    fn test_exact_start_is_stationary() {
        let points = cosine_sweep(20.0, 60.0, -80.0, 5);
        let result = fit_model(&points, FitModel::CosineSquared).unwrap();
        let FitParameters::CosineSquared(p) = result.parameters else {
            panic!("expected cosine parameters");
        };
        assert!((p.phase_degrees() - 60.0).abs() < 1e-6);
        assert!((p.amplitude - 20.0).abs() < 1e-6);
        assert!((p.baseline + 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak_signal() {
        let p = CosineParameters {
            amplitude: 12.0,
            phase: PI / 4.0,
            baseline: -70.0,
        };
        let peak = p.peak();
        assert!((peak.angle - 45.0).abs() < 1e-9);
        assert!((peak.signal + 58.0).abs() < 1e-9);
        assert!((p.evaluate(135.0) + 70.0).abs() < 1e-9);
    }
}
