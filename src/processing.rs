use std::collections::BTreeMap;

use crate::config::{DfConfig, TriangulationConfig};
use crate::error::{DfError, Result};
use crate::fitting::{CurveFitter, FitResult};
use crate::observation::PeakEstimate;
use crate::session::{BoardSession, Command, SweepEvent, SweepUpdate};
use crate::triangulation::{self, TriangulationResult};

/// A sweep event addressed to one board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardMessage {
    pub board: String,
    pub event: SweepEvent,
}

impl BoardMessage {
    pub fn new(board: impl Into<String>, event: SweepEvent) -> Self {
        Self {
            board: board.into(),
            event,
        }
    }
}

/// Something the front end should show or forward
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A board finished a sweep and fitted it
    Fit { board: String, fit: FitResult },
    /// A board finished a sweep but no fit is available
    FitFailed { board: String, error: DfError },
    /// Both stations produced a fresh fit
    Triangulation {
        bearing_a: PeakEstimate,
        bearing_b: PeakEstimate,
        result: TriangulationResult,
    },
    /// Both stations have fits but the bearings do not intersect usefully
    TriangulationFailed { error: DfError },
    /// A command to send to a board
    Command { board: String, command: Command },
}

/// Sweep sessions for every known board, plus two-station triangulation
///
/// Boards are processed independently; triangulation only reads the
/// latest fitted peak of each station.
pub struct DfProcessor {
    sessions: BTreeMap<String, BoardSession>,
    triangulation: TriangulationConfig,
}

impl DfProcessor {
    /// Create a processor with sessions for both configured stations
    pub fn new(config: &DfConfig) -> Result<Self> {
        config.validate()?;
        let fitter = CurveFitter::new(&config.fit)?;

        let sessions = [&config.triangulation.station_a, &config.triangulation.station_b]
            .into_iter()
            .map(|id| {
                (
                    id.clone(),
                    BoardSession::new(id.as_str(), &config.sweep, fitter.clone()),
                )
            })
            .collect();

        Ok(Self {
            sessions,
            triangulation: config.triangulation.clone(),
        })
    }

    /// Route one message to its board
    ///
    /// Returns the reports produced, in order. A completed sweep yields a fit
    /// report and, when auto-calculation is on and the other station also has
    /// a fit, a triangulation report.
    pub fn process(&mut self, message: BoardMessage) -> Result<Vec<Report>> {
        let BoardMessage { board, event } = message;
        let session = self
            .sessions
            .get_mut(&board)
            .ok_or_else(|| DfError::UnknownBoard(board.clone()))?;

        let mut reports = Vec::new();
        match session.handle(event) {
            SweepUpdate::Ignored | SweepUpdate::Sampled => {}
            SweepUpdate::Forward(command) => reports.push(Report::Command { board, command }),
            SweepUpdate::Completed(Ok(fit)) => {
                reports.push(Report::Fit { board, fit });
                if self.triangulation.auto_calculate
                    && let Some(report) = self.try_triangulate()
                {
                    reports.push(report);
                }
            }
            SweepUpdate::Completed(Err(error)) => reports.push(Report::FitFailed { board, error }),
        }
        Ok(reports)
    }

    /// Process a batch of messages, stopping at the first unknown board
    pub fn process_all(
        &mut self,
        messages: impl IntoIterator<Item = BoardMessage>,
    ) -> Result<Vec<Report>> {
        let mut reports = Vec::new();
        for message in messages {
            reports.extend(self.process(message)?);
        }
        Ok(reports)
    }

    /// Apply a command to one board and return it for forwarding
    pub fn command(&mut self, board: &str, command: Command) -> Result<Report> {
        let session = self
            .sessions
            .get_mut(board)
            .ok_or_else(|| DfError::UnknownBoard(board.to_string()))?;
        session.apply(command);
        Ok(Report::Command {
            board: board.to_string(),
            command,
        })
    }

    /// Apply a command to every board
    pub fn command_all(&mut self, command: Command) -> Vec<Report> {
        self.sessions
            .iter_mut()
            .map(|(id, session)| {
                session.apply(command);
                Report::Command {
                    board: id.clone(),
                    command,
                }
            })
            .collect()
    }

    /// Triangulate from the current fitted peaks
    ///
    /// # Errors
    /// [`DfError::InsufficientData`] when a station has no fitted peak, or any
    /// error from [`triangulation::solve`].
    pub fn triangulate(&self) -> Result<TriangulationResult> {
        let (a, b) = self.station_peaks();
        let available = a.is_some() as usize + b.is_some() as usize;
        let (Some(a), Some(b)) = (a, b) else {
            return Err(DfError::InsufficientData {
                needed: 2,
                available,
            });
        };
        triangulation::solve(self.triangulation.baseline_m, a.angle, b.angle)
    }

    fn try_triangulate(&self) -> Option<Report> {
        let (Some(bearing_a), Some(bearing_b)) = self.station_peaks() else {
            return None;
        };

        match triangulation::solve(self.triangulation.baseline_m, bearing_a.angle, bearing_b.angle) {
            Ok(result) => {
                log::info!(
                    "Source at ({:.2}, {:.2}) m: {:.2} m from {}, {:.2} m from {}",
                    result.source_x,
                    result.source_y,
                    result.distance_a,
                    self.triangulation.station_a,
                    result.distance_b,
                    self.triangulation.station_b
                );
                Some(Report::Triangulation {
                    bearing_a,
                    bearing_b,
                    result,
                })
            }
            Err(error) => {
                log::warn!("Triangulation failed: {}", error);
                Some(Report::TriangulationFailed { error })
            }
        }
    }

    fn station_peaks(&self) -> (Option<PeakEstimate>, Option<PeakEstimate>) {
        let peak = |id: &String| self.sessions.get(id).and_then(|s| s.fitted_peak());
        (
            peak(&self.triangulation.station_a),
            peak(&self.triangulation.station_b),
        )
    }

    pub fn session(&self, board: &str) -> Option<&BoardSession> {
        self.sessions.get(board)
    }

    /// Sessions ordered by board id
    pub fn sessions(&self) -> impl Iterator<Item = &BoardSession> {
        self.sessions.values()
    }

    pub fn baseline(&self) -> f64 {
        self.triangulation.baseline_m
    }

    pub fn set_baseline(&mut self, baseline_m: f64) -> Result<()> {
        if !(baseline_m.is_finite() && baseline_m > 0.0) {
            return Err(DfError::Config(format!(
                "baseline must be greater than 0, got {}",
                baseline_m
            )));
        }
        self.triangulation.baseline_m = baseline_m;
        Ok(())
    }
}
