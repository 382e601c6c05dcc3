use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{bbox::BBox, color::Color};

/// Identity handed out by the upstream multi-object tracker.
///
/// Only unique within one contiguous tracked interval; a recycled id is treated as the same
/// player by everything keyed on it.
pub type TrackId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamId {
    Home,
    Away,
}

impl TeamId {
    pub fn other(self) -> Self {
        match self {
            TeamId::Home => TeamId::Away,
            TeamId::Away => TeamId::Home,
        }
    }

    /// Numeric id used on the wire, home is 1 and away is 2.
    pub fn as_number(self) -> u8 {
        match self {
            TeamId::Home => 1,
            TeamId::Away => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(TeamId::Home),
            2 => Some(TeamId::Away),
            _ => None,
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamId::Home => write!(f, "home"),
            TeamId::Away => write!(f, "away"),
        }
    }
}

/// Everything the detector/tracker reports for one frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameTracks {
    pub players: BTreeMap<TrackId, BBox>,
    pub referees: BTreeMap<TrackId, BBox>,
    pub ball: Option<BBox>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerTrack {
    pub bbox: BBox,
    pub team: Option<TeamId>,
    pub team_color: Option<Color>,
    pub has_ball: bool,
}

impl PlayerTrack {
    pub fn unclassified(bbox: BBox) -> Self {
        Self {
            bbox,
            team: None,
            team_color: None,
            has_ball: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefereeTrack {
    pub bbox: BBox,
    pub color: Color,
}
