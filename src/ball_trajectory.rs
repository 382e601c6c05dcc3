use itertools::Itertools;
use log::{debug, warn};

use crate::{bbox::BBox, config::BallConfig};

/// Turns the raw per-frame ball detections of a whole clip into one dense trajectory.
///
/// This is a batch step: a detection is only trusted once the frames after it confirm it,
/// and gaps are filled from both sides.
pub struct BallTrajectoryReconstructor {
    min_consecutive_frames: usize,
    run_proximity_radius: f64,
    max_ball_step: f64,
}

impl BallTrajectoryReconstructor {
    pub fn new(
        min_consecutive_frames: usize,
        run_proximity_radius: f64,
        max_ball_step: f64,
    ) -> Self {
        Self {
            min_consecutive_frames: min_consecutive_frames.max(1),
            run_proximity_radius,
            max_ball_step,
        }
    }

    pub fn from_config(config: &BallConfig) -> Self {
        Self::new(
            config.min_consecutive_frames,
            config.run_proximity_radius,
            config.max_ball_step,
        )
    }

    /// Returns one box per input frame. The output is fully populated unless no detection
    /// survived filtering, in which case it is entirely `None`.
    pub fn reconstruct(&self, observations: &[Option<BBox>]) -> Vec<Option<BBox>> {
        let accepted = self.suppress_false_positives(observations);
        if accepted.iter().all(Option::is_none) {
            warn!(
                "No ball position accepted in {} frames, trajectory stays empty",
                observations.len()
            );
        }
        interpolate_positions(&accepted)
    }

    /// Keeps detections that either continue the accepted trajectory or belong to a run of at
    /// least `min_consecutive_frames` detections following one motion. A run that reaches the
    /// threshold is accepted as a whole; one that is broken earlier is dropped.
    ///
    /// A clip shorter than `min_consecutive_frames` only needs a run spanning all of it.
    fn suppress_false_positives(&self, observations: &[Option<BBox>]) -> Vec<Option<BBox>> {
        let required = self.min_consecutive_frames.min(observations.len());
        let mut accepted = vec![None; observations.len()];
        // last two accepted detections, enough to extrapolate the motion
        let mut trajectory: Vec<(usize, BBox)> = Vec::new();
        let mut run: Vec<(usize, BBox)> = Vec::new();

        for (frame, observation) in observations.iter().enumerate() {
            let Some(bbox) = observation else {
                run.clear();
                continue;
            };
            if !bbox.is_valid() {
                debug!("Skipping malformed ball box at frame {}: {:?}", frame, bbox);
                run.clear();
                continue;
            }

            if self.follows(&trajectory, frame, bbox, self.run_proximity_radius) {
                accepted[frame] = Some(*bbox);
                trajectory.push((frame, *bbox));
                keep_tail(&mut trajectory);
                run.clear();
                continue;
            }

            if !self.follows(&run, frame, bbox, self.max_ball_step) {
                if !run.is_empty() {
                    debug!(
                        "Dropping ball run of {} frames ending at frame {}",
                        run.len(),
                        frame - 1
                    );
                }
                run.clear();
            }
            run.push((frame, *bbox));

            if run.len() >= required {
                debug!(
                    "Accepting new ball position after {} frames (frames {}..={})",
                    run.len(),
                    run[0].0,
                    frame
                );
                for &(run_frame, run_bbox) in &run {
                    accepted[run_frame] = Some(run_bbox);
                }
                trajectory = run.split_off(run.len().saturating_sub(2));
                run.clear();
            }
        }

        accepted
    }

    /// Whether `bbox` at `frame` continues `track`, of which only the last two entries count.
    ///
    /// A detection continues the track when it stays within `run_proximity_radius` of the last
    /// position, or of the position extrapolated from the last two. With a single entry no
    /// motion is known yet and the detection may move up to `single_step`.
    fn follows(
        &self,
        track: &[(usize, BBox)],
        frame: usize,
        bbox: &BBox,
        single_step: f64,
    ) -> bool {
        let center = bbox.center();
        match *track {
            [] => false,
            [(_, last)] => {
                (center - last.center()).norm() <= single_step.max(self.run_proximity_radius)
            }
            [.., (prev_frame, prev), (last_frame, last)] => {
                let velocity = (last.center() - prev.center()) / (last_frame - prev_frame) as f64;
                let predicted = last.center() + velocity * (frame - last_frame) as f64;
                (center - last.center()).norm() <= self.run_proximity_radius
                    || (center - predicted).norm() <= self.run_proximity_radius
            }
        }
    }
}

fn keep_tail(track: &mut Vec<(usize, BBox)>) {
    if track.len() > 2 {
        track.drain(..track.len() - 2);
    }
}

/// Linear interpolation of every coordinate between known positions. Leading gaps take the
/// first known position, trailing gaps the last.
pub fn interpolate_positions(positions: &[Option<BBox>]) -> Vec<Option<BBox>> {
    let known: Vec<(usize, BBox)> = positions
        .iter()
        .enumerate()
        .filter_map(|(frame, position)| position.map(|bbox| (frame, bbox)))
        .collect();

    let (Some(&(first, first_bbox)), Some(&(last, last_bbox))) = (known.first(), known.last())
    else {
        return positions.to_vec();
    };

    let mut filled = positions.to_vec();
    filled[..first].fill(Some(first_bbox));
    filled[last + 1..].fill(Some(last_bbox));

    for (&(start, start_bbox), &(end, end_bbox)) in known.iter().tuple_windows() {
        let span = (end - start) as f64;
        for frame in start + 1..end {
            let t = (frame - start) as f64 / span;
            filled[frame] = Some(start_bbox.lerp(&end_bbox, t));
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ball_at(x: f64, y: f64) -> BBox {
        BBox::new(x, y, x + 10.0, y + 10.0)
    }

    #[test]
    fn test_all_missing_stays_missing() {
        let reconstructor = BallTrajectoryReconstructor::new(8, 40.0, 150.0);

        let trajectory = reconstructor.reconstruct(&vec![None; 100]);

        assert_eq!(trajectory.len(), 100);
        assert!(trajectory.iter().all(Option::is_none));
    }

    #[test]
    fn test_single_observation_is_broadcast() {
        let mut positions = vec![None; 6];
        positions[3] = Some(ball_at(5.0, 5.0));

        let filled = interpolate_positions(&positions);

        assert!(filled.iter().all(|p| *p == Some(ball_at(5.0, 5.0))));
    }

    #[test]
    fn test_gap_is_linearly_interpolated() {
        let positions = vec![
            None,
            Some(ball_at(0.0, 0.0)),
            None,
            None,
            None,
            Some(ball_at(40.0, 80.0)),
            None,
        ];

        let filled = interpolate_positions(&positions);

        assert_eq!(filled[0], Some(ball_at(0.0, 0.0)));
        assert_eq!(filled[2], Some(ball_at(10.0, 20.0)));
        assert_eq!(filled[3], Some(ball_at(20.0, 40.0)));
        assert_eq!(filled[4], Some(ball_at(30.0, 60.0)));
        assert_eq!(filled[6], Some(ball_at(40.0, 80.0)));
    }

    #[test]
    fn test_isolated_spurious_detection_is_discarded() {
        let reconstructor = BallTrajectoryReconstructor::new(3, 40.0, 150.0);
        let mut observations = vec![None; 20];
        observations[10] = Some(ball_at(500.0, 500.0));

        let trajectory = reconstructor.reconstruct(&observations);

        assert!(trajectory.iter().all(Option::is_none));
    }

    #[test]
    fn test_spurious_detection_does_not_become_anchor() {
        let reconstructor = BallTrajectoryReconstructor::new(3, 40.0, 150.0);
        let mut observations: Vec<Option<BBox>> = (0..10).map(|_| Some(ball_at(0.0, 0.0))).collect();
        observations.push(None);
        observations.push(Some(ball_at(800.0, 400.0)));
        observations.push(None);
        observations.extend((0..5).map(|_| Some(ball_at(0.0, 0.0))));

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory[11], Some(ball_at(0.0, 0.0)));
        assert!(trajectory.iter().all(|p| *p == Some(ball_at(0.0, 0.0))));
    }

    #[test]
    fn test_sustained_new_position_is_accepted() {
        let reconstructor = BallTrajectoryReconstructor::new(4, 40.0, 150.0);
        let mut observations: Vec<Option<BBox>> = (0..4).map(|_| Some(ball_at(0.0, 0.0))).collect();
        observations.extend((0..6).map(|_| Some(ball_at(600.0, 0.0))));

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory[4], Some(ball_at(600.0, 0.0)));
        assert_eq!(trajectory[9], Some(ball_at(600.0, 0.0)));
    }

    #[test]
    fn test_short_far_run_is_dropped_and_bridged() {
        let reconstructor = BallTrajectoryReconstructor::new(4, 40.0, 150.0);
        let mut observations: Vec<Option<BBox>> = (0..4).map(|_| Some(ball_at(0.0, 0.0))).collect();
        observations.extend((0..3).map(|_| Some(ball_at(600.0, 0.0))));
        observations.extend((0..4).map(|_| Some(ball_at(20.0, 0.0))));

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory[4], Some(ball_at(5.0, 0.0)));
        assert_eq!(trajectory[6], Some(ball_at(15.0, 0.0)));
        assert_eq!(trajectory[10], Some(ball_at(20.0, 0.0)));
    }

    #[test]
    fn test_malformed_box_is_skipped() {
        let reconstructor = BallTrajectoryReconstructor::new(1, 40.0, 150.0);
        let observations = vec![
            Some(ball_at(0.0, 0.0)),
            Some(BBox::new(f64::NAN, 0.0, 1.0, 1.0)),
            Some(ball_at(20.0, 0.0)),
        ];

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory[1], Some(ball_at(10.0, 0.0)));
    }

    #[test]
    fn test_fast_dense_ball_is_kept() {
        let reconstructor = BallTrajectoryReconstructor::new(8, 40.0, 150.0);
        let observations: Vec<Option<BBox>> =
            (0..30).map(|i| Some(ball_at(45.0 * i as f64, 300.0))).collect();

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory, observations);
    }

    #[test]
    fn test_fast_ball_resumes_after_gap() {
        let reconstructor = BallTrajectoryReconstructor::new(4, 40.0, 150.0);
        let mut observations: Vec<Option<BBox>> =
            (0..12).map(|i| Some(ball_at(60.0 * i as f64, 100.0))).collect();
        observations[6] = None;
        observations[7] = None;

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory[8], Some(ball_at(480.0, 100.0)));
        assert!(trajectory[6].is_some());
        assert_eq!(trajectory[11], Some(ball_at(660.0, 100.0)));
    }

    #[test]
    fn test_short_dense_clip_is_kept() {
        let reconstructor = BallTrajectoryReconstructor::new(8, 40.0, 150.0);
        let observations = vec![Some(ball_at(100.0, 100.0)); 5];

        let trajectory = reconstructor.reconstruct(&observations);

        assert_eq!(trajectory, observations);
    }

    #[test]
    fn test_far_jump_does_not_start_a_run() {
        let reconstructor = BallTrajectoryReconstructor::new(3, 40.0, 150.0);
        let observations = vec![
            Some(ball_at(0.0, 0.0)),
            Some(ball_at(400.0, 0.0)),
            Some(ball_at(0.0, 0.0)),
            Some(ball_at(400.0, 0.0)),
            None,
            None,
        ];

        let trajectory = reconstructor.reconstruct(&observations);

        assert!(trajectory.iter().all(Option::is_none));
    }

    proptest! {
        #[test]
        fn prop_dense_smooth_trajectory_is_unchanged(
            start_x in 0.0f64..1000.0,
            start_y in 0.0f64..600.0,
            steps in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), 1..60)
        ) {
            let reconstructor = BallTrajectoryReconstructor::new(8, 40.0, 150.0);
            let mut x = start_x;
            let mut y = start_y;
            let observations: Vec<Option<BBox>> = steps
                .iter()
                .map(|(dx, dy)| {
                    x += dx;
                    y += dy;
                    Some(ball_at(x, y))
                })
                .collect();

            let trajectory = reconstructor.reconstruct(&observations);

            prop_assert_eq!(trajectory, observations);
        }

        #[test]
        fn prop_dense_straight_flight_is_unchanged(
            start_x in 0.0f64..1000.0,
            start_y in 0.0f64..600.0,
            vx in -100.0f64..100.0,
            vy in -100.0f64..100.0,
            len in 1usize..60
        ) {
            let reconstructor = BallTrajectoryReconstructor::new(8, 40.0, 150.0);
            let observations: Vec<Option<BBox>> = (0..len)
                .map(|i| Some(ball_at(start_x + vx * i as f64, start_y + vy * i as f64)))
                .collect();

            let trajectory = reconstructor.reconstruct(&observations);

            prop_assert_eq!(trajectory, observations);
        }
    }
}
