mod ball_trajectory;
mod bbox;
mod clustering;
mod color;
mod config;
mod error;
mod match_analyzer;
mod possession;
mod possession_stats;
#[cfg(feature = "python")]
mod python_api;
mod team_classifier;
mod track;

pub use ball_trajectory::{BallTrajectoryReconstructor, interpolate_positions};
pub use bbox::BBox;
pub use clustering::{ClusterFit, ColorClustering, TwoMeans};
pub use color::{Color, color_from_rgb, color_to_rgb, dominant_color};
pub use config::{AnalyzerConfig, BallConfig, PitchMask, PossessionConfig, TeamConfig, TorsoRegion};
pub use error::AnalysisError;
pub use match_analyzer::{MatchAnalysis, MatchAnalyzer};
pub use possession::{
    PossessionAssigner, PossessionFrame, PossessionPhase, PossessionState, TeamedPlayer,
};
pub use possession_stats::{PossessionAccumulator, PossessionStats};
pub use team_classifier::{TeamAssignment, TeamColorClassifier, TeamColorProfile};
pub use track::{FrameTracks, PlayerTrack, RefereeTrack, TeamId, TrackId};

#[cfg(feature = "python")]
use pyo3::{
    Bound, PyResult, pymodule,
    types::{PyModule, PyModuleMethods},
    wrap_pyfunction,
};

#[cfg(feature = "python")]
use crate::python_api::{
    PyBBox, PyPossessionAccumulator, PyPossessionAssigner, PyTeamColorClassifier,
    reconstruct_ball_trajectory,
};

#[cfg(feature = "python")]
#[pymodule]
fn football_possession(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBBox>()?;
    m.add_class::<PyTeamColorClassifier>()?;
    m.add_class::<PyPossessionAssigner>()?;
    m.add_class::<PyPossessionAccumulator>()?;
    m.add_function(wrap_pyfunction!(reconstruct_ball_trajectory, m)?)?;

    Ok(())
}
