//! Per-board sweep state machine
//!
//! ```text
//!            start               boundary / rotation complete
//!   Idle ───────────▶ Scanning ─────────────────────────────▶ Complete
//!    ▲                                                           │
//!    └─────────────────────────── reset ─────────────────────────┘
//! ```
//!
//! Reset returns any state to `Idle`. A fit runs exactly once, on entry to
//! `Complete`; observations arriving afterwards are ignored until reset or a
//! new start.

use std::fmt;

use serde::Serialize;

use crate::config::SweepConfig;
use crate::error::DfError;
use crate::fitting::{CurveFitter, FitResult};
use crate::observation::{Observation, PeakEstimate};
use crate::series::{SamplePoint, SampleSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepState {
    Idle,
    Scanning,
    Complete,
}

/// Control command for a board
///
/// Applied to the local session, then handed back for the transport to
/// forward; the wire encoding is not handled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Stop,
    Reset,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

/// Input to a board session, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    /// Operator control command
    Command(Command),
    /// One sample from the rotating antenna
    Observation(Observation),
    /// The board finished its rotation, optionally reporting its own best sample
    RotationComplete(Option<PeakEstimate>),
    /// The board's stored copy of the entire sweep
    FinalSweep(Vec<SamplePoint>),
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq)]
pub enum SweepUpdate {
    /// Event had no effect in the current state
    Ignored,
    /// Sample stored; the sweep continues
    Sampled,
    /// Sweep finished and the fit ran
    Completed(Result<FitResult, DfError>),
    /// Command applied; forward it to the board
    Forward(Command),
}

/// Packet counters for one board
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LinkStats {
    pub packets: u64,
    pub last_rssi: Option<f64>,
    pub last_snr: Option<f64>,
}

/// Sweep controller for one board
///
/// Owns the board's sample series, its latest fit and peak estimates.
#[derive(Debug, Clone)]
pub struct BoardSession {
    id: String,
    state: SweepState,
    series: SampleSeries,
    fitter: CurveFitter,
    auto_start: bool,
    fit: Option<FitResult>,
    fit_error: Option<DfError>,
    live_peak: Option<PeakEstimate>,
    reported_peak: Option<PeakEstimate>,
    link: LinkStats,
}

impl BoardSession {
    pub fn new(id: impl Into<String>, config: &SweepConfig, fitter: CurveFitter) -> Self {
        Self {
            id: id.into(),
            state: SweepState::Idle,
            series: SampleSeries::new(config.boundary_angle_deg),
            fitter,
            auto_start: config.auto_start,
            fit: None,
            fit_error: None,
            live_peak: None,
            reported_peak: None,
            link: LinkStats::default(),
        }
    }

    /// Process one event to completion
    pub fn handle(&mut self, event: SweepEvent) -> SweepUpdate {
        match event {
            SweepEvent::Command(command) => self.apply(command),
            SweepEvent::Observation(obs) => self.observe(obs),
            SweepEvent::RotationComplete(summary) => self.rotation_complete(summary),
            SweepEvent::FinalSweep(points) => self.final_sweep(points),
        }
    }

    /// Apply a control command and return it for forwarding
    pub fn apply(&mut self, command: Command) -> SweepUpdate {
        match command {
            Command::Start => self.begin_sweep(),
            // Halts the physical rotation only; no fit is forced
            Command::Stop => log::info!("[{}] Stop requested while {:?}", self.id, self.state),
            Command::Reset => self.reset(),
        }
        SweepUpdate::Forward(command)
    }

    /// Discard the sweep, any fit and all peaks; back to `Idle`
    pub fn reset(&mut self) {
        self.series.reset();
        self.clear_results();
        self.link = LinkStats::default();
        self.state = SweepState::Idle;
        log::info!("[{}] Reset", self.id);
    }

    fn begin_sweep(&mut self) {
        self.series.reset();
        self.clear_results();
        self.state = SweepState::Scanning;
        log::info!("[{}] Sweep started", self.id);
    }

    fn clear_results(&mut self) {
        self.fit = None;
        self.fit_error = None;
        self.live_peak = None;
        self.reported_peak = None;
    }

    fn observe(&mut self, obs: Observation) -> SweepUpdate {
        self.link.packets += 1;
        self.link.last_rssi = Some(obs.rssi);
        if obs.snr.is_some() {
            self.link.last_snr = obs.snr;
        }

        match self.state {
            SweepState::Complete => return SweepUpdate::Ignored,
            SweepState::Idle if !self.auto_start => return SweepUpdate::Ignored,
            SweepState::Idle => {
                log::debug!("[{}] Observation while idle, starting sweep", self.id);
                self.begin_sweep();
            }
            SweepState::Scanning => {}
        }

        let in_progress = self.series.upsert(obs.angle, obs.rssi);
        self.live_peak = self.series.max_point();
        log::debug!(
            "[{}] {:.1}° {:.1} dBm ({} points)",
            self.id,
            obs.angle,
            obs.rssi,
            self.series.len()
        );

        if in_progress {
            SweepUpdate::Sampled
        } else {
            log::info!("[{}] Sweep boundary reached at {:.1}°", self.id, obs.angle);
            self.complete()
        }
    }

    fn rotation_complete(&mut self, summary: Option<PeakEstimate>) -> SweepUpdate {
        if summary.is_some() {
            self.reported_peak = summary;
        }
        if self.state != SweepState::Scanning {
            return SweepUpdate::Ignored;
        }
        log::info!("[{}] Rotation complete signalled", self.id);
        self.series.lock();
        self.complete()
    }

    fn final_sweep(&mut self, points: Vec<SamplePoint>) -> SweepUpdate {
        log::info!("[{}] Stored sweep received: {} points", self.id, points.len());
        let reported = self.reported_peak;
        self.clear_results();
        self.reported_peak = reported;
        self.series.replace_all(points);
        self.live_peak = self.series.max_point();
        self.complete()
    }

    fn complete(&mut self) -> SweepUpdate {
        self.state = SweepState::Complete;
        let result = self.fitter.fit(&self.series.ordered_points());
        match &result {
            Ok(fit) => {
                log::info!(
                    "[{}] Fitted peak {:.1}° @ {:.1} dBm (R² {:.3})",
                    self.id,
                    fit.peak.angle,
                    fit.peak.signal,
                    fit.quality.r2
                );
                self.fit = Some(fit.clone());
                self.fit_error = None;
            }
            Err(e) => {
                log::warn!("[{}] No fit available: {}", self.id, e);
                self.fit = None;
                self.fit_error = Some(e.clone());
            }
        }
        SweepUpdate::Completed(result)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn fit(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    /// Why the last completed sweep produced no fit
    pub fn fit_error(&self) -> Option<&DfError> {
        self.fit_error.as_ref()
    }

    /// Fitted peak of the current completed sweep; this is what triangulation uses
    pub fn fitted_peak(&self) -> Option<PeakEstimate> {
        match self.state {
            SweepState::Complete => self.fit.as_ref().map(|f| f.peak),
            _ => None,
        }
    }

    /// Strongest raw sample of the current sweep
    pub fn live_peak(&self) -> Option<PeakEstimate> {
        self.live_peak
    }

    /// Best sample as reported by the board itself at rotation end
    pub fn reported_peak(&self) -> Option<PeakEstimate> {
        self.reported_peak
    }

    /// Fitted peak when available, otherwise the raw maximum
    pub fn peak(&self) -> Option<PeakEstimate> {
        self.fitted_peak().or(self.live_peak)
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitModel;

    fn session() -> BoardSession {
        BoardSession::new("board1", &SweepConfig::default(), CurveFitter::default())
    }

    fn lobe(angle: f64) -> f64 {
        -80.0 + 30.0 * (-(angle - 70.0).powi(2) / 450.0).exp()
    }

    fn feed(session: &mut BoardSession, angles: impl IntoIterator<Item = u32>) -> Vec<SweepUpdate> {
        angles
            .into_iter()
            .map(|a| {
                let a = a as f64;
                session.handle(SweepEvent::Observation(Observation::new(a, lobe(a))))
            })
            .collect()
    }

    #[test]
    fn test_start_moves_to_scanning() {
        let mut s = session();
        assert_eq!(s.state(), SweepState::Idle);
        assert_eq!(
            s.handle(SweepEvent::Command(Command::Start)),
            SweepUpdate::Forward(Command::Start)
        );
        assert_eq!(s.state(), SweepState::Scanning);
        assert!(s.series().is_empty());
    }

    #[test]
    fn test_boundary_completes_and_fits() {
        let mut s = session();
        s.apply(Command::Start);
        let updates = feed(&mut s, (0..=180).step_by(5));

        assert!(updates[..updates.len() - 1]
            .iter()
            .all(|u| *u == SweepUpdate::Sampled));
        let SweepUpdate::Completed(Ok(fit)) = updates.last().unwrap() else {
            panic!("expected a completed fit, got {:?}", updates.last());
        };
        assert!((fit.peak.angle - 70.0).abs() < 2.0);
        assert_eq!(s.state(), SweepState::Complete);
        assert!((s.fitted_peak().unwrap().angle - 70.0).abs() < 2.0);
    }

    #[test]
    fn test_rotation_complete_message_completes() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=120).step_by(5));
        assert_eq!(s.state(), SweepState::Scanning);

        let summary = PeakEstimate {
            angle: 70.0,
            signal: -50.0,
        };
        let update = s.handle(SweepEvent::RotationComplete(Some(summary)));
        assert!(matches!(update, SweepUpdate::Completed(Ok(_))));
        assert_eq!(s.state(), SweepState::Complete);
        assert_eq!(s.reported_peak(), Some(summary));
        assert!(s.series().is_locked());
    }

    #[test]
    fn test_first_completion_trigger_wins() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=180).step_by(10));
        assert_eq!(s.state(), SweepState::Complete);
        let fit = s.fit().cloned();

        assert_eq!(
            s.handle(SweepEvent::RotationComplete(None)),
            SweepUpdate::Ignored
        );
        assert_eq!(s.fit().cloned(), fit);
    }

    #[test]
    fn test_observations_ignored_after_complete() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=180).step_by(10));
        let len = s.series().len();

        let update = s.handle(SweepEvent::Observation(Observation::new(95.0, -20.0)));
        assert_eq!(update, SweepUpdate::Ignored);
        assert_eq!(s.series().len(), len);
    }

    #[test]
    fn test_stop_does_not_fit() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=90).step_by(10));
        assert_eq!(
            s.handle(SweepEvent::Command(Command::Stop)),
            SweepUpdate::Forward(Command::Stop)
        );
        assert_eq!(s.state(), SweepState::Scanning);
        assert!(s.fit().is_none());
        assert!(s.fitted_peak().is_none());
    }

    #[test]
    fn test_sparse_sweep_reports_insufficient_data() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, [90]);
        let update = s.handle(SweepEvent::RotationComplete(None));
        assert_eq!(
            update,
            SweepUpdate::Completed(Err(DfError::InsufficientData {
                needed: 3,
                available: 1
            }))
        );
        assert!(s.fit().is_none());
        assert!(s.fit_error().is_some());
        assert!(s.fitted_peak().is_none());
        // Raw data is still shown
        assert_eq!(s.live_peak().unwrap().angle, 90.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=180).step_by(10));
        assert!(s.fitted_peak().is_some());

        s.handle(SweepEvent::Command(Command::Reset));
        assert_eq!(s.state(), SweepState::Idle);
        assert!(s.series().ordered_points().is_empty());
        assert!(!s.series().is_locked());
        assert!(s.fit().is_none());
        assert!(s.fitted_peak().is_none());
        assert!(s.live_peak().is_none());
        assert_eq!(s.link_stats(), LinkStats::default());
    }

    #[test]
    fn test_restart_discards_previous_fit() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=180).step_by(10));
        s.apply(Command::Start);
        assert_eq!(s.state(), SweepState::Scanning);
        assert!(s.fitted_peak().is_none());
        assert!(s.series().is_empty());
    }

    #[test]
    fn test_auto_start_on_first_observation() {
        let mut s = session();
        assert_eq!(feed(&mut s, [0]), vec![SweepUpdate::Sampled]);
        assert_eq!(s.state(), SweepState::Scanning);
    }

    #[test]
    fn test_idle_ignores_observations_without_auto_start() {
        let config = SweepConfig {
            auto_start: false,
            ..Default::default()
        };
        let mut s = BoardSession::new("board1", &config, CurveFitter::default());
        assert_eq!(feed(&mut s, [0, 10]), vec![SweepUpdate::Ignored; 2]);
        assert!(s.series().is_empty());
        assert_eq!(s.link_stats().packets, 2);
        assert_eq!(
            s.handle(SweepEvent::RotationComplete(None)),
            SweepUpdate::Ignored
        );
    }

    #[test]
    fn test_final_sweep_replaces_and_refits() {
        let mut s = session();
        s.apply(Command::Start);
        feed(&mut s, (0..=180).step_by(10));

        let stored: Vec<SamplePoint> = (0..=180)
            .step_by(5)
            .map(|a| {
                let a = a as f64;
                SamplePoint::new(a, -80.0 + 25.0 * (-(a - 120.0).powi(2) / 450.0).exp())
            })
            .collect();
        let update = s.handle(SweepEvent::FinalSweep(stored));
        let SweepUpdate::Completed(Ok(fit)) = update else {
            panic!("expected refit");
        };
        assert!((fit.peak.angle - 120.0).abs() < 2.0);
        assert_eq!(s.series().len(), 37);
        assert_eq!(s.live_peak().unwrap().angle, 120.0);
    }

    #[test]
    fn test_live_peak_and_link_stats() {
        let mut s = session();
        s.handle(SweepEvent::Observation(
            Observation::new(10.0, -75.0).with_snr(4.5),
        ));
        s.handle(SweepEvent::Observation(Observation::new(20.0, -60.0)));
        s.handle(SweepEvent::Observation(Observation::new(30.0, -70.0)));

        assert_eq!(
            s.live_peak(),
            Some(PeakEstimate {
                angle: 20.0,
                signal: -60.0
            })
        );
        assert_eq!(s.peak(), s.live_peak());
        let link = s.link_stats();
        assert_eq!(link.packets, 3);
        assert_eq!(link.last_rssi, Some(-70.0));
        assert_eq!(link.last_snr, Some(4.5));
    }

    #[test]
    fn test_polynomial_session() {
        let fitter = CurveFitter::new(&crate::config::FitConfig {
            model: FitModel::Polynomial { degree: 4 },
            ..Default::default()
        })
        .unwrap();
        let mut s = BoardSession::new("board2", &SweepConfig::default(), fitter);
        s.apply(Command::Start);
        let updates = feed(&mut s, (0..=180).step_by(10));
        let Some(SweepUpdate::Completed(Ok(fit))) = updates.last() else {
            panic!("expected polynomial fit");
        };
        assert_eq!(fit.model, FitModel::Polynomial { degree: 4 });
    }
}
