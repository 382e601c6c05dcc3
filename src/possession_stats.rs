use serde::{Deserialize, Serialize};

use crate::{config::positive, error::AnalysisError, track::TeamId};

/// Percentages reported while no frame has been credited to either team.
pub const NEUTRAL_PERCENTAGE: u8 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PossessionStats {
    pub home_seconds: f64,
    pub away_seconds: f64,
    pub home_percentage: u8,
    pub away_percentage: u8,
}

impl PossessionStats {
    pub fn neutral() -> Self {
        Self {
            home_seconds: 0.0,
            away_seconds: 0.0,
            home_percentage: NEUTRAL_PERCENTAGE,
            away_percentage: 100 - NEUTRAL_PERCENTAGE,
        }
    }
}

/// Running per-team frame counts over the possession label sequence.
///
/// Frames with no team are ignored, so percentages are shares of the labelled frames.
#[derive(Clone, Debug)]
pub struct PossessionAccumulator {
    frame_rate: f64,
    home_frames: u64,
    away_frames: u64,
}

impl PossessionAccumulator {
    pub fn new(frame_rate: f64) -> Result<Self, AnalysisError> {
        positive("possession.frame_rate", frame_rate)?;
        Ok(Self {
            frame_rate,
            home_frames: 0,
            away_frames: 0,
        })
    }

    /// Accumulates a whole prefix of labels at once.
    pub fn from_labels(frame_rate: f64, labels: &[Option<TeamId>]) -> Result<Self, AnalysisError> {
        let mut accumulator = Self::new(frame_rate)?;
        labels.iter().for_each(|label| accumulator.push(*label));
        Ok(accumulator)
    }

    pub fn push(&mut self, label: Option<TeamId>) {
        match label {
            Some(TeamId::Home) => self.home_frames += 1,
            Some(TeamId::Away) => self.away_frames += 1,
            None => {}
        }
    }

    pub fn labelled_frames(&self) -> u64 {
        self.home_frames + self.away_frames
    }

    pub fn stats(&self) -> PossessionStats {
        let labelled = self.labelled_frames();
        if labelled == 0 {
            return PossessionStats::neutral();
        }

        // round one side only; the other is the complement so the pair always sums to 100
        let home_percentage = (self.home_frames as f64 * 100.0 / labelled as f64).round() as u8;

        PossessionStats {
            home_seconds: self.home_frames as f64 / self.frame_rate,
            away_seconds: self.away_frames as f64 / self.frame_rate,
            home_percentage,
            away_percentage: 100 - home_percentage,
        }
    }
}
