use log::{debug, info};

use crate::{
    bbox::BBox,
    config::{PossessionConfig, non_negative},
    error::AnalysisError,
    track::{TeamId, TrackId},
};

/// A player the assigner may credit with the ball: only players whose team is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeamedPlayer {
    pub track_id: TrackId,
    pub bbox: BBox,
    pub team: TeamId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingCandidate {
    pub track_id: TrackId,
    pub team: TeamId,
    pub run_length: u32,
}

/// Carried from frame to frame in order; only [`PossessionAssigner::update`] mutates it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PossessionState {
    pub last_confirmed_team: Option<TeamId>,
    pub pending: Option<PendingCandidate>,
}

/// Coarse view of [`PossessionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PossessionPhase {
    NoControl,
    Pending { candidate: TrackId, run_length: u32 },
    Confirmed(TeamId),
}

impl PossessionState {
    pub fn phase(&self, possession_time_threshold: u32) -> PossessionPhase {
        match (self.pending, self.last_confirmed_team) {
            (Some(pending), _) if pending.run_length < possession_time_threshold => {
                PossessionPhase::Pending {
                    candidate: pending.track_id,
                    run_length: pending.run_length,
                }
            }
            (_, Some(team)) => PossessionPhase::Confirmed(team),
            (Some(pending), None) => PossessionPhase::Pending {
                candidate: pending.track_id,
                run_length: pending.run_length,
            },
            (None, None) => PossessionPhase::NoControl,
        }
    }
}

/// Output for a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PossessionFrame {
    /// Team credited with possession, the last confirmed one when nothing new is confirmed.
    pub team: Option<TeamId>,
    /// Player confirmed to hold the ball on this very frame.
    pub ball_holder: Option<TrackId>,
}

/// Debounced ball possession.
///
/// The nearest player within `distance_threshold` becomes a candidate; possession is credited to
/// the candidate's team only once the same player stayed nearest for
/// `possession_time_threshold` consecutive in-range frames. Frames without a ball or without
/// a player in range leave the state untouched.
pub struct PossessionAssigner {
    distance_threshold: f64,
    possession_time_threshold: u32,
    state: PossessionState,
}

impl PossessionAssigner {
    pub fn new(
        distance_threshold: f64,
        possession_time_threshold: u32,
    ) -> Result<Self, AnalysisError> {
        non_negative("possession.distance_threshold", distance_threshold)?;
        Ok(Self {
            distance_threshold,
            possession_time_threshold: possession_time_threshold.max(1),
            state: PossessionState::default(),
        })
    }

    pub fn from_config(config: &PossessionConfig) -> Result<Self, AnalysisError> {
        Self::new(config.distance_threshold, config.possession_time_threshold)
    }

    pub fn state(&self) -> &PossessionState {
        &self.state
    }

    pub fn phase(&self) -> PossessionPhase {
        self.state.phase(self.possession_time_threshold)
    }

    pub fn update<'a>(
        &mut self,
        ball: Option<&BBox>,
        players: impl IntoIterator<Item = &'a TeamedPlayer>,
    ) -> PossessionFrame {
        let unchanged = PossessionFrame {
            team: self.state.last_confirmed_team,
            ball_holder: None,
        };

        let Some(ball) = ball.filter(|ball| ball.is_valid()) else {
            return unchanged;
        };
        let Some((nearest, distance)) = nearest_player(ball, players) else {
            return unchanged;
        };
        if distance > self.distance_threshold {
            return unchanged;
        }

        let pending = match self.state.pending {
            Some(pending) if pending.track_id == nearest.track_id => PendingCandidate {
                run_length: pending.run_length + 1,
                team: nearest.team,
                ..pending
            },
            _ => PendingCandidate {
                track_id: nearest.track_id,
                team: nearest.team,
                run_length: 1,
            },
        };
        self.state.pending = Some(pending);

        if pending.run_length < self.possession_time_threshold {
            debug!(
                "Track {} near ball for {} of {} frames ({:.1}px)",
                pending.track_id, pending.run_length, self.possession_time_threshold, distance
            );
            return unchanged;
        }

        if self.state.last_confirmed_team != Some(pending.team) {
            info!(
                "Possession confirmed for {} via track {}",
                pending.team, pending.track_id
            );
        }
        self.state.last_confirmed_team = Some(pending.team);

        PossessionFrame {
            team: Some(pending.team),
            ball_holder: Some(pending.track_id),
        }
    }
}

/// Player whose feet are nearest the ball center; ties go to the lowest track id.
fn nearest_player<'a>(
    ball: &BBox,
    players: impl IntoIterator<Item = &'a TeamedPlayer>,
) -> Option<(&'a TeamedPlayer, f64)> {
    let center = ball.center();
    players
        .into_iter()
        .filter(|player| player.bbox.is_valid())
        .map(|player| (player, player.bbox.foot_distance(&center)))
        .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.track_id.cmp(&b.track_id)))
}
