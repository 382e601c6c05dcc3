use std::collections::{BTreeMap, HashMap};

use image::RgbImage;
use pyo3::{PyResult, exceptions::PyValueError, pyclass, pymethods};

use crate::{
    BBox, TeamColorClassifier, TeamConfig, TeamId, TrackId, color_to_rgb, python_api::PyBBox,
};

fn frame_from_bytes(width: u32, height: u32, pixels: Vec<u8>) -> PyResult<RgbImage> {
    RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        PyValueError::new_err(format!(
            "pixel buffer does not hold a {width}x{height} RGB frame"
        ))
    })
}

fn track_boxes(players: HashMap<TrackId, PyBBox>) -> BTreeMap<TrackId, BBox> {
    players
        .into_iter()
        .map(|(track_id, bbox)| (track_id, bbox.inner))
        .collect()
}

#[pyclass(name = "TeamColorClassifier")]
pub struct PyTeamColorClassifier {
    inner: TeamColorClassifier,
}

#[pymethods]
impl PyTeamColorClassifier {
    #[new]
    #[pyo3(signature = (color_change_threshold=100.0, overlap_threshold=0.2))]
    pub fn new(color_change_threshold: f64, overlap_threshold: f64) -> Self {
        let config = TeamConfig {
            color_change_threshold,
            overlap_threshold,
            ..TeamConfig::default()
        };
        Self {
            inner: TeamColorClassifier::new(config),
        }
    }

    /// `frames` holds `(width, height, rgb_bytes)` per initialization frame, `players` the
    /// matching `{track_id: BBox}` maps. Returns whether the team colours are established.
    pub fn initialize(
        &mut self,
        frames: Vec<(u32, u32, Vec<u8>)>,
        players: Vec<HashMap<TrackId, PyBBox>>,
    ) -> PyResult<bool> {
        if frames.len() != players.len() {
            return Err(PyValueError::new_err(format!(
                "{} frames given with {} player maps",
                frames.len(),
                players.len()
            )));
        }
        let frames = frames
            .into_iter()
            .map(|(width, height, pixels)| frame_from_bytes(width, height, pixels))
            .collect::<PyResult<Vec<RgbImage>>>()?;
        let players: Vec<BTreeMap<TrackId, BBox>> = players.into_iter().map(track_boxes).collect();

        Ok(self.inner.initialize(frames.iter().zip(&players)).is_some())
    }

    /// Returns `{track_id: (team, (r, g, b))}` for every player classified on this frame.
    /// `referees` only count as overlapping boxes and are never classified.
    #[pyo3(signature = (width, height, pixels, players, referees=HashMap::new()))]
    pub fn classify_frame(
        &mut self,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        players: HashMap<TrackId, PyBBox>,
        referees: HashMap<TrackId, PyBBox>,
    ) -> PyResult<HashMap<TrackId, (u8, (u8, u8, u8))>> {
        let frame = frame_from_bytes(width, height, pixels)?;
        let assignments = self.inner.classify_frame(
            &frame,
            &track_boxes(players),
            &track_boxes(referees),
        );

        Ok(assignments
            .into_iter()
            .map(|(track_id, assignment)| {
                let [r, g, b] = color_to_rgb(&assignment.team_color);
                (track_id, (assignment.team.as_number(), (r, g, b)))
            })
            .collect())
    }

    pub fn team_of(&self, track_id: TrackId) -> Option<u8> {
        self.inner.team_of(track_id).map(TeamId::as_number)
    }

    #[getter]
    fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }
}
