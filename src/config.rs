//! Analyzer configuration.
//!
//! Every threshold the pipeline uses lives here. Sections deserialize independently with
//! defaults, so a JSON document only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub ball: BallConfig,
    pub teams: TeamConfig,
    pub possession: PossessionConfig,
}

/// Ball false-positive filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// Frames a new ball position must persist before it is trusted (default: 8)
    pub min_consecutive_frames: usize,
    /// Max center distance in pixels between detections of the same run (default: 40.0)
    pub run_proximity_radius: f64,
    /// Max center distance in pixels between the first two detections of a new run, before
    /// any motion is known (default: 150.0)
    pub max_ball_step: f64,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            min_consecutive_frames: 8,
            run_proximity_radius: 40.0,
            max_ball_step: 150.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// RGB distance above which a new sample for a known track is discarded (default: 100.0)
    pub color_change_threshold: f64,
    /// IoU above which two player boxes contaminate each other's colour (default: 0.2)
    pub overlap_threshold: f64,
    /// Frames pooled to fit the team centroids (default: 5)
    pub initialization_frame_count: usize,
    pub home_reference_color: Option<[u8; 3]>,
    pub away_reference_color: Option<[u8; 3]>,
    pub referee_color: [u8; 3],
    pub pitch_mask: PitchMask,
    pub torso_region: TorsoRegion,
    /// Consecutive drifted samples toward the other team before a track is re-labelled.
    /// `None` keeps team labels immutable.
    pub revision_frames: Option<u32>,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            color_change_threshold: 100.0,
            overlap_threshold: 0.2,
            initialization_frame_count: 5,
            home_reference_color: Some([255, 0, 0]),
            away_reference_color: Some([255, 255, 255]),
            referee_color: [255, 255, 0],
            pitch_mask: PitchMask::default(),
            torso_region: TorsoRegion::default(),
            revision_frames: None,
        }
    }
}

/// HSV range treated as grass. Hue in degrees, saturation in percent, value in 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchMask {
    pub hue_min: f64,
    pub hue_max: f64,
    pub saturation_min: f64,
    pub value_min: f64,
}

impl Default for PitchMask {
    fn default() -> Self {
        Self {
            hue_min: 70.0,
            hue_max: 170.0,
            saturation_min: 25.0,
            value_min: 40.0,
        }
    }
}

/// Part of a player box sampled for the shirt colour, as fractions of the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorsoRegion {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl Default for TorsoRegion {
    fn default() -> Self {
        Self {
            x_start: 0.25,
            x_end: 0.75,
            y_start: 0.15,
            y_end: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PossessionConfig {
    /// Max foot-to-ball distance in pixels for a player to be a candidate (default: 150.0)
    pub distance_threshold: f64,
    /// Consecutive frames the same candidate needs before possession is confirmed (default: 12)
    pub possession_time_threshold: u32,
    pub frame_rate: f64,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 150.0,
            possession_time_threshold: 12,
            frame_rate: 30.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let ball = &self.ball;
        let teams = &self.teams;
        let possession = &self.possession;

        if ball.min_consecutive_frames == 0 {
            return Err(invalid("ball.min_consecutive_frames", "must be at least 1"));
        }
        non_negative("ball.run_proximity_radius", ball.run_proximity_radius)?;
        non_negative("ball.max_ball_step", ball.max_ball_step)?;
        non_negative("teams.color_change_threshold", teams.color_change_threshold)?;
        if !(0.0..=1.0).contains(&teams.overlap_threshold) {
            return Err(invalid("teams.overlap_threshold", "must be within [0, 1]"));
        }
        if teams.initialization_frame_count == 0 {
            return Err(invalid("teams.initialization_frame_count", "must be at least 1"));
        }
        if teams.revision_frames == Some(0) {
            return Err(invalid("teams.revision_frames", "must be at least 1 when set"));
        }
        let torso = &teams.torso_region;
        if !(0.0..=1.0).contains(&torso.x_start)
            || !(0.0..=1.0).contains(&torso.x_end)
            || !(0.0..=1.0).contains(&torso.y_start)
            || !(0.0..=1.0).contains(&torso.y_end)
            || torso.x_start >= torso.x_end
            || torso.y_start >= torso.y_end
        {
            return Err(invalid(
                "teams.torso_region",
                "fractions must be ordered and within [0, 1]",
            ));
        }
        let mask = &teams.pitch_mask;
        if !(0.0..=360.0).contains(&mask.hue_min)
            || !(0.0..=360.0).contains(&mask.hue_max)
            || mask.hue_min > mask.hue_max
        {
            return Err(invalid("teams.pitch_mask", "hue range must be ordered within [0, 360]"));
        }
        non_negative("possession.distance_threshold", possession.distance_threshold)?;
        if possession.possession_time_threshold == 0 {
            return Err(invalid(
                "possession.possession_time_threshold",
                "must be at least 1",
            ));
        }
        positive("possession.frame_rate", possession.frame_rate)?;

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> AnalysisError {
    AnalysisError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite, non-negative number"))
    }
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalyzerConfig::from_json_str(
            r#"{ "possession": { "distance_threshold": 70.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.possession.distance_threshold, 70.0);
        assert_eq!(config.possession.possession_time_threshold, 12);
        assert_eq!(config.ball.min_consecutive_frames, 8);
        assert_eq!(config.ball.max_ball_step, 150.0);
        assert_eq!(config.teams.overlap_threshold, 0.2);
    }

    #[test]
    fn test_zero_frame_rate_is_rejected() {
        let mut config = AnalyzerConfig::default();
        config.possession.frame_rate = 0.0;

        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig {
                field: "possession.frame_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_nan_ball_step_is_rejected() {
        let mut config = AnalyzerConfig::default();
        config.ball.max_ball_step = f64::NAN;

        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig {
                field: "ball.max_ball_step",
                ..
            })
        ));
    }

    #[test]
    fn test_out_of_range_overlap_is_rejected() {
        let json = r#"{ "teams": { "overlap_threshold": 1.5 } }"#;

        assert!(AnalyzerConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        assert!(matches!(
            AnalyzerConfig::from_json_str("{ ball: "),
            Err(AnalysisError::ConfigParse(_))
        ));
    }
}
