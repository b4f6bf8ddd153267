mod noise;
mod pattern;
mod scenario;

pub use noise::{
    AdditiveNoiseConfig, DropoutConfig, FadingConfig, ImpulseNoiseConfig, NoiseConfig,
    ReflectionConfig, apply_noise,
};
pub use pattern::{PatternConfig, PatternShape, bearings_for_source, generate_sweep, sweep_angles};
pub use scenario::{Scenario, ScenarioSweeps};
