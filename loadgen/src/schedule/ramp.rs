//! Staged ramp profile
//!
//! A profile is an ordered list of `(duration, target)` stages. During a stage the
//! target concurrency moves linearly from the previous stage's target (0 for the first)
//! to the stage's own target, so a stage whose target equals its predecessor holds flat.

use serde::Serialize;
use std::time::Duration;

/// Length of the transition segment that precedes each hold
pub const DEFAULT_RISE: Duration = Duration::from_secs(1);

/// Length of the hold segment for each peak
pub const DEFAULT_HOLD: Duration = Duration::from_secs(30);

/// One segment of a ramp profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// How long this segment lasts
    pub duration: Duration,
    /// Concurrency reached at the end of the segment
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Immutable concurrency curve consumed by the client pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RampProfile {
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Build a profile from peak targets using the default 1s rise / 30s hold
    pub fn from_peaks(peaks: &[u32]) -> Self {
        Self::from_peaks_with(peaks, DEFAULT_RISE, DEFAULT_HOLD)
    }

    /// Build a profile where every peak expands to a rise segment followed by a hold
    pub fn from_peaks_with(peaks: &[u32], rise: Duration, hold: Duration) -> Self {
        let stages = peaks
            .iter()
            .flat_map(|&peak| [Stage::new(rise, peak), Stage::new(hold, peak)])
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of all stage durations
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest concurrency the profile ever asks for
    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// True once `elapsed` has run past the last stage
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Target concurrency at `elapsed` since the start of the run.
    ///
    /// Past the end of the profile the last target is held; an empty profile is zero
    /// everywhere.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                // elapsed >= stage_start here, so the stage has a non-zero duration
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let span = f64::from(stage.target) - f64::from(from);
                return (f64::from(from) + span * progress).round() as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}
