mod py_ball_trajectory;
mod py_bbox;
mod py_possession;
mod py_team_classifier;

pub use py_ball_trajectory::reconstruct_ball_trajectory;
pub use py_bbox::PyBBox;
pub use py_possession::{PyPossessionAccumulator, PyPossessionAssigner};
pub use py_team_classifier::PyTeamColorClassifier;
