use serde::Deserialize;

use crate::constants::MAX_ANGLE_DEG;
use crate::observation::Observation;

/// Shape of the simulated antenna main lobe
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternShape {
    #[default]
    Gaussian,
    Cosine,
}

/// Received level as a function of antenna angle for one station
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub shape: PatternShape,
    /// Lobe height above the floor (dB)
    pub amplitude_db: f64,
    /// Gaussian lobe width (degrees); unused for the cosine shape
    pub sigma_deg: f64,
    /// Level received off the main lobe (dBm)
    pub floor_dbm: f64,
    /// Receiver noise floor, used to derive the reported SNR (dBm)
    pub noise_floor_dbm: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            shape: PatternShape::Gaussian,
            amplitude_db: 30.0,
            sigma_deg: 15.0,
            floor_dbm: -80.0,
            noise_floor_dbm: -110.0,
        }
    }
}

impl PatternConfig {
    /// Level at `angle_deg` with the lobe pointing at `bearing_deg`
    pub fn level(&self, angle_deg: f64, bearing_deg: f64) -> f64 {
        let lobe = match self.shape {
            PatternShape::Gaussian => {
                let d = angle_deg - bearing_deg;
                (-(d * d) / (2.0 * self.sigma_deg * self.sigma_deg)).exp()
            }
            PatternShape::Cosine => (angle_deg - bearing_deg).to_radians().cos().powi(2),
        };
        self.floor_dbm + self.amplitude_db * lobe
    }
}

/// Sweep angles from 0° to 180° inclusive
///
/// The last angle is always 180° even when `step_deg` does not divide the
/// range, so a simulated sweep always reaches the boundary.
pub fn sweep_angles(step_deg: f64) -> Vec<f64> {
    if !(step_deg > 0.0) {
        return vec![MAX_ANGLE_DEG];
    }
    let steps = (MAX_ANGLE_DEG / step_deg).floor() as usize;
    let mut angles: Vec<f64> = (0..=steps).map(|i| i as f64 * step_deg).collect();
    if angles.last().is_some_and(|&a| a < MAX_ANGLE_DEG) {
        angles.push(MAX_ANGLE_DEG);
    }
    angles
}

/// Noise-free sweep of a station whose emitter lies at `bearing_deg`
pub fn generate_sweep(bearing_deg: f64, step_deg: f64, pattern: &PatternConfig) -> Vec<Observation> {
    sweep_angles(step_deg)
        .into_iter()
        .map(|angle| {
            let rssi = pattern.level(angle, bearing_deg);
            Observation::new(angle, rssi).with_snr(rssi - pattern.noise_floor_dbm)
        })
        .collect()
}

/// Bearings (A, B) at which each station sees a source at `(x, y)`
///
/// Station A sits at the origin and B at `(baseline, 0)`; angles are
/// measured from the baseline toward the other station. Returns `None` for
/// sources on or behind the baseline.
pub fn bearings_for_source(baseline: f64, x: f64, y: f64) -> Option<(f64, f64)> {
    if !(y > 0.0 && baseline > 0.0) {
        return None;
    }
    let angle_a = y.atan2(x).to_degrees();
    let angle_b = MAX_ANGLE_DEG - y.atan2(x - baseline).to_degrees();
    Some((angle_a, angle_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::solve;

    #[test]
    fn test_sweep_angles_reach_boundary() {
        assert_eq!(sweep_angles(45.0), vec![0.0, 45.0, 90.0, 135.0, 180.0]);
        let angles = sweep_angles(7.0);
        assert_eq!(*angles.last().unwrap(), 180.0);
        assert_eq!(angles[angles.len() - 2], 175.0);
        assert_eq!(sweep_angles(0.0), vec![180.0]);
    }

    #[test]
    fn test_sweep_peaks_at_bearing() {
        let sweep = generate_sweep(70.0, 5.0, &PatternConfig::default());
        let best = sweep
            .iter()
            .max_by(|a, b| a.rssi.total_cmp(&b.rssi))
            .unwrap();
        assert_eq!(best.angle, 70.0);
        assert!((best.rssi + 50.0).abs() < 1e-9);
        assert!((best.snr.unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_shape() {
        let pattern = PatternConfig {
            shape: PatternShape::Cosine,
            ..Default::default()
        };
        assert!((pattern.level(40.0, 40.0) + 50.0).abs() < 1e-9);
        assert!((pattern.level(130.0, 40.0) + 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearings_invert_triangulation() {
        let (a, b) = bearings_for_source(10.0, 3.0, 4.0).unwrap();
        assert!((a - 53.130).abs() < 1e-3);
        assert!((b - 29.745).abs() < 1e-3);

        let r = solve(10.0, a, b).unwrap();
        assert!((r.source_x - 3.0).abs() < 1e-9);
        assert!((r.source_y - 4.0).abs() < 1e-9);

        assert!(bearings_for_source(10.0, 3.0, 0.0).is_none());
        assert!(bearings_for_source(10.0, 3.0, -2.0).is_none());
    }
}
