use serde::Deserialize;

use crate::constants::NO_SIGNAL_RSSI;
use crate::error::{DfError, Result};
use crate::observation::{Observation, PeakEstimate};
use crate::series::SamplePoint;
use crate::session::Command;
use crate::transport::WireMessage;

use super::noise::{NoiseConfig, apply_noise};
use super::pattern::{PatternConfig, bearings_for_source, generate_sweep};

/// A two-station sweep of one emitter
///
/// Loadable from TOML; every key is optional:
///
/// ```toml
/// baseline_m = 10.0
/// source_x = 3.0
/// source_y = 4.0
/// step_deg = 2.0
///
/// [pattern]
/// sigma_deg = 12.0
///
/// [noise]
/// seed = 42
/// [noise.additive]
/// std_dev_db = 1.0
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub baseline_m: f64,
    pub source_x: f64,
    pub source_y: f64,
    pub step_deg: f64,
    pub station_a: String,
    pub station_b: String,
    /// Send start commands before the sweeps
    pub send_start: bool,
    /// Follow each sweep with a rotation-complete summary
    pub rotation_complete: bool,
    /// Follow each sweep with the board's stored copy of it
    pub final_dump: bool,
    pub pattern: PatternConfig,
    pub noise: NoiseConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            baseline_m: 10.0,
            source_x: 3.0,
            source_y: 4.0,
            step_deg: 2.0,
            station_a: "board1".to_string(),
            station_b: "board2".to_string(),
            send_start: true,
            rotation_complete: true,
            final_dump: false,
            pattern: PatternConfig::default(),
            noise: NoiseConfig::default(),
        }
    }
}

/// Simulated sweeps of both stations
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioSweeps {
    /// True bearing from station A
    pub bearing_a: f64,
    /// True bearing from station B
    pub bearing_b: f64,
    pub sweep_a: Vec<Observation>,
    pub sweep_b: Vec<Observation>,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DfError::Config(e.to_string()))
    }

    pub fn with_source(mut self, x: f64, y: f64) -> Self {
        self.source_x = x;
        self.source_y = y;
        self
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    /// True bearings (A, B) of the source
    pub fn bearings(&self) -> Result<(f64, f64)> {
        bearings_for_source(self.baseline_m, self.source_x, self.source_y).ok_or_else(|| {
            DfError::InvalidGeometry(format!(
                "source ({}, {}) must lie in front of a positive baseline",
                self.source_x, self.source_y
            ))
        })
    }

    /// Generate both sweeps
    ///
    /// Station B's noise is drawn from the seed plus one so the two sweeps
    /// are not identical.
    pub fn sweeps(&self) -> Result<ScenarioSweeps> {
        let (bearing_a, bearing_b) = self.bearings()?;

        let noise_b = NoiseConfig {
            seed: self.noise.seed.map(|s| s.wrapping_add(1)),
            ..self.noise.clone()
        };
        let sweep_a = apply_noise(
            &generate_sweep(bearing_a, self.step_deg, &self.pattern),
            &self.noise,
            &self.pattern,
        )?;
        let sweep_b = apply_noise(
            &generate_sweep(bearing_b, self.step_deg, &self.pattern),
            &noise_b,
            &self.pattern,
        )?;

        Ok(ScenarioSweeps {
            bearing_a,
            bearing_b,
            sweep_a,
            sweep_b,
        })
    }

    /// The wire log both boards would produce, samples interleaved
    pub fn wire_messages(&self) -> Result<Vec<WireMessage>> {
        let sweeps = self.sweeps()?;
        let a = self.station_a.as_str();
        let b = self.station_b.as_str();
        let mut messages = Vec::new();

        if self.send_start {
            messages.push(WireMessage::command(a, Command::Start));
            messages.push(WireMessage::command(b, Command::Start));
        }

        let longest = sweeps.sweep_a.len().max(sweeps.sweep_b.len());
        for i in 0..longest {
            if let Some(obs) = sweeps.sweep_a.get(i) {
                messages.push(WireMessage::observation(a, obs));
            }
            if let Some(obs) = sweeps.sweep_b.get(i) {
                messages.push(WireMessage::observation(b, obs));
            }
        }

        for (board, sweep) in [(a, &sweeps.sweep_a), (b, &sweeps.sweep_b)] {
            if self.rotation_complete {
                messages.push(WireMessage::rotation_complete(board, best_sample(sweep)));
            }
            if self.final_dump {
                let points: Vec<SamplePoint> = sweep
                    .iter()
                    .map(|o| SamplePoint::new(o.angle, o.rssi))
                    .collect();
                messages.push(WireMessage::all_angles(board, &points));
            }
        }

        Ok(messages)
    }
}

/// Strongest received sample, as a board reports it at rotation end
fn best_sample(sweep: &[Observation]) -> Option<PeakEstimate> {
    sweep
        .iter()
        .filter(|o| o.rssi > NO_SIGNAL_RSSI)
        .max_by(|x, y| x.rssi.total_cmp(&y.rssi))
        .map(|o| PeakEstimate {
            angle: o.angle,
            signal: o.rssi,
        })
}
