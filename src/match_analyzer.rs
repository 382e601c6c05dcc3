use std::collections::BTreeMap;

use image::RgbImage;
use log::{info, warn};

use crate::{
    ball_trajectory::BallTrajectoryReconstructor,
    bbox::BBox,
    color::{Color, color_from_rgb},
    config::AnalyzerConfig,
    error::AnalysisError,
    possession::{PossessionAssigner, TeamedPlayer},
    possession_stats::{PossessionAccumulator, PossessionStats},
    team_classifier::TeamColorClassifier,
    track::{FrameTracks, PlayerTrack, RefereeTrack, TeamId, TrackId},
};

/// Everything produced for a clip, indexed by frame.
#[derive(Clone, Debug)]
pub struct MatchAnalysis {
    pub ball: Vec<Option<BBox>>,
    pub players: Vec<BTreeMap<TrackId, PlayerTrack>>,
    pub referees: Vec<BTreeMap<TrackId, RefereeTrack>>,
    pub possession: Vec<Option<TeamId>>,
    /// Cumulative statistics up to and including each frame.
    pub stats: Vec<PossessionStats>,
    pub home_color: Option<Color>,
    pub away_color: Option<Color>,
}

impl MatchAnalysis {
    /// Cumulative statistics for the prefix ending at `frame`, neutral before the first frame.
    pub fn stats_at(&self, frame: usize) -> PossessionStats {
        self.stats
            .get(frame)
            .or(self.stats.last())
            .copied()
            .unwrap_or_else(PossessionStats::neutral)
    }

    pub fn final_stats(&self) -> PossessionStats {
        self.stats
            .last()
            .copied()
            .unwrap_or_else(PossessionStats::neutral)
    }
}

/// Runs ball reconstruction, team classification and possession over a whole clip.
pub struct MatchAnalyzer {
    config: AnalyzerConfig,
}

impl MatchAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        frames: &[RgbImage],
        tracks: &[FrameTracks],
    ) -> Result<MatchAnalysis, AnalysisError> {
        if frames.len() != tracks.len() {
            return Err(AnalysisError::FrameCountMismatch {
                frames: frames.len(),
                tracks: tracks.len(),
            });
        }

        let observations: Vec<Option<BBox>> = tracks.iter().map(|frame| frame.ball).collect();
        let ball = BallTrajectoryReconstructor::from_config(&self.config.ball).reconstruct(&observations);

        let mut classifier = TeamColorClassifier::new(self.config.teams.clone());
        let mut assigner = PossessionAssigner::from_config(&self.config.possession)?;
        let mut accumulator = PossessionAccumulator::new(self.config.possession.frame_rate)?;
        let referee_color = color_from_rgb(self.config.teams.referee_color);
        let window = self.config.teams.initialization_frame_count;

        let mut players = Vec::with_capacity(tracks.len());
        let mut referees = Vec::with_capacity(tracks.len());
        let mut possession = Vec::with_capacity(tracks.len());
        let mut stats = Vec::with_capacity(tracks.len());

        for (frame_num, (frame, frame_tracks)) in frames.iter().zip(tracks).enumerate() {
            if !classifier.is_initialized() {
                let end = (frame_num + window).min(tracks.len());
                classifier.initialize(
                    frames[frame_num..end]
                        .iter()
                        .zip(&tracks[frame_num..end])
                        .map(|(frame, frame_tracks)| (frame, &frame_tracks.players)),
                );
                if classifier.is_initialized() {
                    info!("Team colours initialized at frame {}", frame_num);
                }
            }

            let assignments =
                classifier.classify_frame(frame, &frame_tracks.players, &frame_tracks.referees);
            let mut frame_players: BTreeMap<TrackId, PlayerTrack> = frame_tracks
                .players
                .iter()
                .map(|(track_id, bbox)| {
                    let mut player = PlayerTrack::unclassified(*bbox);
                    if let Some(assignment) = assignments.get(track_id) {
                        player.team = Some(assignment.team);
                        player.team_color = Some(assignment.team_color);
                    }
                    (*track_id, player)
                })
                .collect();

            let teamed: Vec<TeamedPlayer> = frame_players
                .iter()
                .filter_map(|(track_id, player)| {
                    player.team.map(|team| TeamedPlayer {
                        track_id: *track_id,
                        bbox: player.bbox,
                        team,
                    })
                })
                .collect();
            let outcome = assigner.update(ball[frame_num].as_ref(), &teamed);
            if let Some(holder) = outcome
                .ball_holder
                .and_then(|track_id| frame_players.get_mut(&track_id))
            {
                holder.has_ball = true;
            }

            accumulator.push(outcome.team);
            possession.push(outcome.team);
            stats.push(accumulator.stats());
            players.push(frame_players);
            referees.push(
                frame_tracks
                    .referees
                    .iter()
                    .map(|(track_id, bbox)| {
                        (
                            *track_id,
                            RefereeTrack {
                                bbox: *bbox,
                                color: referee_color,
                            },
                        )
                    })
                    .collect(),
            );
        }

        if !classifier.is_initialized() && !tracks.is_empty() {
            warn!("Team colours never established, no player was classified");
        }

        let profile = classifier.profile();
        Ok(MatchAnalysis {
            ball,
            players,
            referees,
            possession,
            stats,
            home_color: profile.map(|profile| profile.display_color(TeamId::Home)),
            away_color: profile.map(|profile| profile.display_color(TeamId::Away)),
        })
    }
}
