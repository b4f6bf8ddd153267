use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::NO_SIGNAL_RSSI;
use crate::error::{DfError, Result};
use crate::observation::Observation;

use super::pattern::PatternConfig;

/// Impairments applied to a clean sweep
///
/// Every section is optional; an empty config leaves the sweep untouched.
/// With `seed` set the result is reproducible.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub fading: Option<FadingConfig>,
    pub reflection: Option<ReflectionConfig>,
    pub impulse: Option<ImpulseNoiseConfig>,
    pub dropout: Option<DropoutConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rssi_noise(mut self, std_dev_db: f64) -> Self {
        self.additive = Some(AdditiveNoiseConfig { std_dev_db });
        self
    }

    pub fn with_fading(mut self, k_factor: f64) -> Self {
        self.fading = Some(FadingConfig { k_factor });
        self
    }

    pub fn with_reflection(mut self, bearing_deg: f64, relative_db: f64) -> Self {
        self.reflection = Some(ReflectionConfig {
            bearing_deg,
            relative_db,
        });
        self
    }

    pub fn with_impulse(mut self, probability: f64, amplitude_db: f64) -> Self {
        self.impulse = Some(ImpulseNoiseConfig {
            probability,
            amplitude_db,
        });
        self
    }

    pub fn with_dropouts(mut self, probability: f64) -> Self {
        self.dropout = Some(DropoutConfig { probability });
        self
    }
}

/// Gaussian RSSI measurement noise
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub std_dev_db: f64,
}

/// Per-sample Rician fading; `k_factor = 0` is Rayleigh
#[derive(Clone, Debug, serde::Deserialize)]
pub struct FadingConfig {
    pub k_factor: f64,
}

/// A second, weaker path arriving from another bearing
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ReflectionConfig {
    pub bearing_deg: f64,
    /// Strength relative to the direct lobe (dB, negative is weaker)
    pub relative_db: f64,
}

/// Occasional interference bursts raising a sample's RSSI
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImpulseNoiseConfig {
    pub probability: f64,
    pub amplitude_db: f64,
}

/// Lost packets, reported with the no-signal RSSI
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DropoutConfig {
    pub probability: f64,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Power sum of two levels in dBm
fn combine_dbm(a: f64, b: f64) -> f64 {
    10.0 * (10f64.powf(a / 10.0) + 10f64.powf(b / 10.0)).log10()
}

fn apply_reflection(sweep: &mut [Observation], config: &ReflectionConfig, pattern: &PatternConfig) {
    for obs in sweep.iter_mut() {
        let reflected = pattern.level(obs.angle, config.bearing_deg) + config.relative_db;
        obs.rssi = combine_dbm(obs.rssi, reflected);
    }
}

fn apply_fading(sweep: &mut [Observation], config: &FadingConfig, rng: &mut ChaCha8Rng) -> Result<()> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| DfError::Config(e.to_string()))?;
    let k = config.k_factor.max(0.0);
    let los = (k / (k + 1.0)).sqrt();
    let scatter = (1.0 / (2.0 * (k + 1.0))).sqrt();

    for obs in sweep.iter_mut() {
        let real = los + scatter * normal.sample(rng);
        let imag = scatter * normal.sample(rng);
        let power = (real * real + imag * imag).max(1e-6);
        obs.rssi += 10.0 * power.log10();
    }
    Ok(())
}

fn apply_additive_noise(
    sweep: &mut [Observation],
    config: &AdditiveNoiseConfig,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let normal =
        Normal::new(0.0, config.std_dev_db).map_err(|e| DfError::Config(e.to_string()))?;
    for obs in sweep.iter_mut() {
        obs.rssi += normal.sample(rng);
    }
    Ok(())
}

fn apply_impulse_noise(sweep: &mut [Observation], config: &ImpulseNoiseConfig, rng: &mut ChaCha8Rng) {
    for obs in sweep.iter_mut() {
        if rng.random::<f64>() < config.probability {
            obs.rssi += config.amplitude_db;
        }
    }
}

fn apply_dropouts(sweep: &mut [Observation], config: &DropoutConfig, rng: &mut ChaCha8Rng) {
    for obs in sweep.iter_mut() {
        if rng.random::<f64>() < config.probability {
            obs.rssi = NO_SIGNAL_RSSI;
            obs.snr = None;
        }
    }
}

/// Apply the configured impairments to a clean sweep
///
/// SNR follows the impaired RSSI. Dropped samples carry the no-signal RSSI
/// and no SNR, the way boards report lost packets.
///
/// # Errors
/// [`DfError::Config`] for an invalid noise standard deviation.
pub fn apply_noise(
    clean: &[Observation],
    config: &NoiseConfig,
    pattern: &PatternConfig,
) -> Result<Vec<Observation>> {
    let mut sweep = clean.to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref reflection) = config.reflection {
        apply_reflection(&mut sweep, reflection, pattern);
    }

    if let Some(ref fading) = config.fading {
        apply_fading(&mut sweep, fading, &mut rng)?;
    }

    if let Some(ref additive) = config.additive {
        apply_additive_noise(&mut sweep, additive, &mut rng)?;
    }

    if let Some(ref impulse) = config.impulse {
        apply_impulse_noise(&mut sweep, impulse, &mut rng);
    }

    for obs in sweep.iter_mut() {
        if obs.snr.is_some() {
            obs.snr = Some(obs.rssi - pattern.noise_floor_dbm);
        }
    }

    if let Some(ref dropout) = config.dropout {
        apply_dropouts(&mut sweep, dropout, &mut rng);
    }

    Ok(sweep)
}

#[cfg(test)]
mod tests {
    use super::super::pattern::generate_sweep;
    use super::*;

    fn clean() -> Vec<Observation> {
        generate_sweep(90.0, 2.0, &PatternConfig::default())
    }

    #[test]
    fn test_empty_config_is_identity() {
        let sweep = clean();
        let out = apply_noise(&sweep, &NoiseConfig::default(), &PatternConfig::default()).unwrap();
        assert_eq!(out, sweep);
    }

    #[test]
    fn test_additive_noise_changes_sweep() {
        let sweep = clean();
        let config = NoiseConfig::default().with_seed(42).with_rssi_noise(1.0);
        let noisy = apply_noise(&sweep, &config, &PatternConfig::default()).unwrap();

        assert_eq!(noisy.len(), sweep.len());
        assert_ne!(noisy, sweep);
        let max_dev = noisy
            .iter()
            .zip(&sweep)
            .map(|(n, c)| (n.rssi - c.rssi).abs())
            .fold(0.0, f64::max);
        assert!(max_dev < 6.0, "deviation {}", max_dev);
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let sweep = clean();
        let config = NoiseConfig::default()
            .with_seed(12345)
            .with_rssi_noise(2.0)
            .with_fading(4.0)
            .with_dropouts(0.1);
        let a = apply_noise(&sweep, &config, &PatternConfig::default()).unwrap();
        let b = apply_noise(&sweep, &config, &PatternConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dropouts_use_sentinel() {
        let config = NoiseConfig::default().with_seed(7).with_dropouts(0.5);
        let out = apply_noise(&clean(), &config, &PatternConfig::default()).unwrap();
        let dropped: Vec<&Observation> = out.iter().filter(|o| o.rssi == NO_SIGNAL_RSSI).collect();
        assert!(!dropped.is_empty());
        assert!(dropped.len() < out.len());
        assert!(dropped.iter().all(|o| o.snr.is_none()));
    }

    #[test]
    fn test_reflection_raises_floor_at_reflection_bearing() {
        let config = NoiseConfig::default().with_reflection(30.0, -10.0);
        let sweep = clean();
        let out = apply_noise(&sweep, &config, &PatternConfig::default()).unwrap();

        let at = |v: &[Observation], angle: f64| v.iter().find(|o| o.angle == angle).unwrap().rssi;
        assert!(at(&out, 30.0) - at(&sweep, 30.0) > 5.0);
        // Direct lobe still dominates at its own bearing
        assert!(at(&out, 90.0) - at(&sweep, 90.0) < 0.1);
    }

    #[test]
    fn test_impulse_only_raises() {
        let config = NoiseConfig::default().with_seed(3).with_impulse(0.3, 15.0);
        let sweep = clean();
        let out = apply_noise(&sweep, &config, &PatternConfig::default()).unwrap();
        let raised = out.iter().zip(&sweep).filter(|(o, c)| o.rssi > c.rssi).count();
        assert!(raised > 0);
        assert!(out.iter().zip(&sweep).all(|(o, c)| o.rssi >= c.rssi));
    }

    #[test]
    fn test_snr_tracks_rssi() {
        let config = NoiseConfig::default().with_seed(1).with_rssi_noise(3.0);
        let pattern = PatternConfig::default();
        let out = apply_noise(&clean(), &config, &pattern).unwrap();
        for o in out {
            assert!((o.snr.unwrap() - (o.rssi - pattern.noise_floor_dbm)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_std_dev() {
        let config = NoiseConfig::default().with_rssi_noise(-1.0);
        assert!(apply_noise(&clean(), &config, &PatternConfig::default()).is_err());
    }

    #[test]
    fn test_toml_config() {
        let config: NoiseConfig = toml::from_str(
            r#"
            seed = 9
            [additive]
            std_dev_db = 1.5
            [dropout]
            probability = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(config.additive.is_some());
        assert!(config.fading.is_none());
    }
}
