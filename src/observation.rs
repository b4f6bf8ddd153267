use serde::Serialize;

/// One RSSI measurement taken at an antenna angle
///
/// Arrival order is the only notion of time; observations are immutable once
/// received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Antenna angle in degrees (0-180)
    pub angle: f64,
    /// Received signal strength in dBm
    pub rssi: f64,
    /// Signal-to-noise ratio in dB, when the radio reports it
    pub snr: Option<f64>,
}

impl Observation {
    pub fn new(angle: f64, rssi: f64) -> Self {
        Self {
            angle,
            rssi,
            snr: None,
        }
    }

    pub fn with_snr(mut self, snr: f64) -> Self {
        self.snr = Some(snr);
        self
    }
}

/// Best current estimate of the bearing to the emitter for one board
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakEstimate {
    /// Peak angle in degrees
    pub angle: f64,
    /// Signal level at the peak (dBm)
    pub signal: f64,
}
