use serde::Serialize;

use crate::constants::{MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use crate::observation::PeakEstimate;

/// A single `(angle, rssi)` point of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub angle: f64,
    pub rssi: f64,
}

impl SamplePoint {
    pub fn new(angle: f64, rssi: f64) -> Self {
        Self { angle, rssi }
    }
}

/// Per-board collection of sweep samples keyed by angle
///
/// A repeated angle replaces the stored RSSI (latest wins). Points are kept in
/// arrival order and sorted only when read. Once the boundary angle is
/// reached the series locks and ignores further writes until `reset`.
#[derive(Debug, Clone)]
pub struct SampleSeries {
    points: Vec<SamplePoint>,
    locked: bool,
    boundary_deg: f64,
}

impl SampleSeries {
    /// Create an empty series completing at `boundary_deg`
    pub fn new(boundary_deg: f64) -> Self {
        Self {
            points: Vec::new(),
            locked: false,
            boundary_deg: boundary_deg.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG),
        }
    }

    /// Insert or replace the sample at `angle`
    ///
    /// Angles are clamped to 0-180°; non-finite values are dropped. Returns
    /// `true` while the sweep is still in progress, `false` once the series is
    /// locked (including when this write reached the boundary).
    pub fn upsert(&mut self, angle: f64, rssi: f64) -> bool {
        if self.locked {
            return false;
        }
        match self.insert(angle, rssi) {
            Some(angle) => !self.check_boundary(angle),
            None => true,
        }
    }

    /// Store a sample regardless of lock state; returns the clamped angle
    fn insert(&mut self, angle: f64, rssi: f64) -> Option<f64> {
        if !angle.is_finite() || !rssi.is_finite() {
            log::debug!("Dropping non-finite sample ({}, {})", angle, rssi);
            return None;
        }

        let angle = angle.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG);
        match self.points.iter_mut().find(|p| p.angle == angle) {
            Some(existing) => existing.rssi = rssi,
            None => self.points.push(SamplePoint::new(angle, rssi)),
        }
        Some(angle)
    }

    /// Lock the series if `angle` has reached the sweep boundary
    ///
    /// Returns `true` when the boundary is reached.
    pub fn check_boundary(&mut self, angle: f64) -> bool {
        let reached = angle >= self.boundary_deg;
        if reached {
            self.lock();
        }
        reached
    }

    /// Freeze the series; idempotent
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Clear all points and unlock
    pub fn reset(&mut self) {
        self.points.clear();
        self.locked = false;
    }

    /// Replace the whole sweep with an authoritative set of points, then lock
    ///
    /// Used when a board reports its stored sweep in one message. Duplicate
    /// angles within `points` resolve to the last occurrence.
    pub fn replace_all(&mut self, points: impl IntoIterator<Item = SamplePoint>) {
        self.reset();
        for p in points {
            self.insert(p.angle, p.rssi);
        }
        self.lock();
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn boundary_deg(&self) -> f64 {
        self.boundary_deg
    }

    /// Points sorted by ascending angle
    ///
    /// Each call builds a fresh sorted copy, so it can be read any number of
    /// times.
    pub fn ordered_points(&self) -> Vec<SamplePoint> {
        let mut sorted = self.points.clone();
        sorted.sort_by(|a, b| a.angle.total_cmp(&b.angle));
        sorted
    }

    /// Strongest raw sample; ties keep the lowest angle
    pub fn max_point(&self) -> Option<PeakEstimate> {
        self.ordered_points()
            .into_iter()
            .fold(None, |best: Option<SamplePoint>, p| match best {
                Some(b) if b.rssi >= p.rssi => Some(b),
                _ => Some(p),
            })
            .map(|p| PeakEstimate {
                angle: p.angle,
                signal: p.rssi,
            })
    }
}

impl Default for SampleSeries {
    fn default() -> Self {
        Self::new(MAX_ANGLE_DEG)
    }
}
