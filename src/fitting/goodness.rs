use super::CurvePoint;
use crate::series::SamplePoint;

/// Coefficient of determination of `fitted` against `observed`
///
/// Each observation is compared with the curve sample nearest in angle (no
/// interpolation), so this approximates the training-set R² rather than
/// computing it exactly. Never exceeds 1.0, and reaches it only when every
/// observation equals its nearest curve sample. Returns 0.0 when either input
/// is empty, or when the observations are constant but not matched exactly.
pub fn r_squared(observed: &[SamplePoint], fitted: &[CurvePoint]) -> f64 {
    if observed.is_empty() || fitted.is_empty() {
        return 0.0;
    }

    let mean = observed.iter().map(|p| p.rssi).sum::<f64>() / observed.len() as f64;

    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for p in observed {
        let closest = nearest(fitted, p.angle);
        ss_tot += (p.rssi - mean).powi(2);
        ss_res += (p.rssi - closest.value).powi(2);
    }

    if ss_res == 0.0 {
        1.0
    } else if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Mean squared error of `model` at the observed angles; 0.0 for no observations
pub fn mean_squared_error(observed: &[SamplePoint], model: impl Fn(f64) -> f64) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let sum: f64 = observed.iter().map(|p| (model(p.angle) - p.rssi).powi(2)).sum();
    sum / observed.len() as f64
}

/// Curve sample closest in angle; ties resolve to the earlier sample
fn nearest(fitted: &[CurvePoint], angle: f64) -> &CurvePoint {
    let mut best = &fitted[0];
    for c in &fitted[1..] {
        if (c.angle - angle).abs() < (best.angle - angle).abs() {
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(values: &[(f64, f64)]) -> Vec<CurvePoint> {
        values
            .iter()
            .map(|&(angle, value)| CurvePoint { angle, value })
            .collect()
    }

    #[test]
    fn test_empty_observed_is_zero() {
        assert_eq!(r_squared(&[], &curve(&[(0.0, 1.0)])), 0.0);
        assert_eq!(r_squared(&[SamplePoint::new(0.0, 1.0)], &[]), 0.0);
        assert_eq!(mean_squared_error(&[], |_| 0.0), 0.0);
    }

    #[test]
    fn test_exact_match_is_one() {
        let observed = [
            SamplePoint::new(0.0, -80.0),
            SamplePoint::new(10.0, -60.0),
            SamplePoint::new(20.0, -70.0),
        ];
        let fitted = curve(&[(0.0, -80.0), (10.0, -60.0), (20.0, -70.0)]);
        assert_eq!(r_squared(&observed, &fitted), 1.0);
    }

    #[test]
    fn test_uses_nearest_sample_not_interpolation() {
        let observed = [SamplePoint::new(4.0, -70.0), SamplePoint::new(16.0, -60.0)];
        // Nearest samples match exactly; interpolating would not
        let fitted = curve(&[(0.0, -70.0), (10.0, -100.0), (20.0, -60.0)]);
        assert_eq!(r_squared(&observed, &fitted), 1.0);
    }

    #[test]
    fn test_never_exceeds_one() {
        let observed: Vec<SamplePoint> = (0..19)
            .map(|i| SamplePoint::new(i as f64 * 10.0, -80.0 + (i % 5) as f64 * 3.0))
            .collect();
        for offset in [0.1, 1.0, 10.0, -5.0] {
            let fitted: Vec<CurvePoint> = observed
                .iter()
                .map(|p| CurvePoint {
                    angle: p.angle,
                    value: p.rssi + offset,
                })
                .collect();
            let r2 = r_squared(&observed, &fitted);
            assert!(r2 < 1.0, "offset {} gave {}", offset, r2);
        }
    }

    #[test]
    fn test_mean_prediction_is_zero() {
        let observed = [
            SamplePoint::new(0.0, -80.0),
            SamplePoint::new(10.0, -60.0),
        ];
        let fitted = curve(&[(0.0, -70.0), (10.0, -70.0)]);
        assert!(r_squared(&observed, &fitted).abs() < 1e-12);
    }

    #[test]
    fn test_constant_observations() {
        let observed = [SamplePoint::new(0.0, -70.0), SamplePoint::new(10.0, -70.0)];
        assert_eq!(r_squared(&observed, &curve(&[(0.0, -70.0)])), 1.0);
        assert_eq!(r_squared(&observed, &curve(&[(0.0, -71.0)])), 0.0);
    }

    #[test]
    fn test_mean_squared_error() {
        let observed = [SamplePoint::new(0.0, 1.0), SamplePoint::new(1.0, 3.0)];
        assert!((mean_squared_error(&observed, |_| 2.0) - 1.0).abs() < 1e-12);
    }
}
