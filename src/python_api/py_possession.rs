use pyo3::{PyResult, exceptions::PyValueError, pyclass, pymethods};

use crate::{
    PossessionAccumulator, PossessionAssigner, TeamId, TeamedPlayer, TrackId, python_api::PyBBox,
};

fn team_from_number(number: u8) -> PyResult<TeamId> {
    TeamId::from_number(number)
        .ok_or_else(|| PyValueError::new_err(format!("unknown team id {number}, expected 1 or 2")))
}

#[pyclass(name = "PossessionAssigner")]
pub struct PyPossessionAssigner {
    inner: PossessionAssigner,
}

#[pymethods]
impl PyPossessionAssigner {
    #[new]
    #[pyo3(signature = (distance_threshold=150.0, possession_time_threshold=12))]
    pub fn new(distance_threshold: f64, possession_time_threshold: u32) -> PyResult<Self> {
        let inner = PossessionAssigner::new(distance_threshold, possession_time_threshold)
            .map_err(|err| PyValueError::new_err(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Takes `(track_id, bbox, team)` for every player with a known team and returns
    /// `(team, ball_holder)` for the frame.
    pub fn update(
        &mut self,
        ball: Option<PyBBox>,
        players: Vec<(TrackId, PyBBox, u8)>,
    ) -> PyResult<(Option<u8>, Option<TrackId>)> {
        let players = players
            .into_iter()
            .map(|(track_id, bbox, team)| {
                Ok(TeamedPlayer {
                    track_id,
                    bbox: bbox.inner,
                    team: team_from_number(team)?,
                })
            })
            .collect::<PyResult<Vec<TeamedPlayer>>>()?;

        let frame = self
            .inner
            .update(ball.as_ref().map(|bbox| &bbox.inner), &players);

        Ok((frame.team.map(TeamId::as_number), frame.ball_holder))
    }

    #[getter]
    fn last_confirmed_team(&self) -> Option<u8> {
        self.inner.state().last_confirmed_team.map(TeamId::as_number)
    }
}

#[pyclass(name = "PossessionAccumulator")]
pub struct PyPossessionAccumulator {
    inner: PossessionAccumulator,
}

#[pymethods]
impl PyPossessionAccumulator {
    #[new]
    #[pyo3(signature = (frame_rate=30.0))]
    pub fn new(frame_rate: f64) -> PyResult<Self> {
        let inner = PossessionAccumulator::new(frame_rate)
            .map_err(|err| PyValueError::new_err(err.to_string()))?;
        Ok(Self { inner })
    }

    pub fn push(&mut self, team: Option<u8>) -> PyResult<()> {
        let team = team.map(team_from_number).transpose()?;
        self.inner.push(team);
        Ok(())
    }

    /// `(home_seconds, away_seconds, home_percentage, away_percentage)`
    pub fn stats(&self) -> (f64, f64, u8, u8) {
        let stats = self.inner.stats();
        (
            stats.home_seconds,
            stats.away_seconds,
            stats.home_percentage,
            stats.away_percentage,
        )
    }
}
