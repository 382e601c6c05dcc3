use pyo3::pyfunction;

use crate::{BBox, BallTrajectoryReconstructor, python_api::PyBBox};

/// Filters spurious ball detections and fills the gaps, one entry per frame.
#[pyfunction]
#[pyo3(signature = (observations, min_consecutive_frames=8, run_proximity_radius=40.0, max_ball_step=150.0))]
pub fn reconstruct_ball_trajectory(
    observations: Vec<Option<PyBBox>>,
    min_consecutive_frames: usize,
    run_proximity_radius: f64,
    max_ball_step: f64,
) -> Vec<Option<PyBBox>> {
    let observations = observations
        .into_iter()
        .map(|observation| observation.map(|bbox| bbox.inner))
        .collect::<Vec<Option<BBox>>>();

    BallTrajectoryReconstructor::new(min_consecutive_frames, run_proximity_radius, max_ball_step)
        .reconstruct(&observations)
        .into_iter()
        .map(|position| position.map(|inner| PyBBox { inner }))
        .collect()
}
