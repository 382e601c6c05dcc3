use std::collections::{BTreeMap, BTreeSet, HashMap};

use image::RgbImage;
use log::{debug, info, warn};
use pathfinding::prelude::{Matrix, kuhn_munkres_min};
use rayon::prelude::*;

use crate::{
    bbox::BBox,
    clustering::{ColorClustering, TwoMeans, nearest_centroid},
    color::{Color, brightness, color_from_rgb, dominant_color},
    config::TeamConfig,
    error::AnalysisError,
    track::{TeamId, TrackId},
};

// the hungarian solver only takes integer weights
const DISTANCE_MULTIPLIER: f64 = 1000.0;

/// Two team centroids fitted once from the initialization window, plus which team each one
/// stands for.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamColorProfile {
    centroids: [Color; 2],
    teams: [TeamId; 2],
    display: [Color; 2],
}

impl TeamColorProfile {
    /// Fits the two centroids and labels them home/away.
    ///
    /// With both reference colours the labelling is the cheaper of the two possible pairings;
    /// with one, the centroid closest to it takes that team; with none, the darker centroid is
    /// home.
    pub fn fit<C: ColorClustering + ?Sized>(
        samples: &[Color],
        clustering: &C,
        home_reference: Option<Color>,
        away_reference: Option<Color>,
    ) -> Result<Self, AnalysisError> {
        let fit = clustering.fit(samples)?;
        let centroids = fit.centroids;

        let teams = match (home_reference, away_reference) {
            (Some(home), Some(away)) => label_by_references(&centroids, &[home, away]),
            (Some(home), None) => label_by_single_reference(&centroids, &home, TeamId::Home),
            (None, Some(away)) => label_by_single_reference(&centroids, &away, TeamId::Away),
            (None, None) => {
                if brightness(&centroids[0]) <= brightness(&centroids[1]) {
                    [TeamId::Home, TeamId::Away]
                } else {
                    [TeamId::Away, TeamId::Home]
                }
            }
        };

        let reference = |team: TeamId| match team {
            TeamId::Home => home_reference,
            TeamId::Away => away_reference,
        };
        let display = [
            reference(teams[0]).unwrap_or(centroids[0]),
            reference(teams[1]).unwrap_or(centroids[1]),
        ];

        Ok(Self {
            centroids,
            teams,
            display,
        })
    }

    pub fn team_for(&self, color: &Color) -> TeamId {
        self.teams[nearest_centroid(&self.centroids, color)]
    }

    pub fn centroid(&self, team: TeamId) -> Color {
        self.centroids[self.index_of(team)]
    }

    /// Colour a renderer should use for `team`.
    pub fn display_color(&self, team: TeamId) -> Color {
        self.display[self.index_of(team)]
    }

    fn index_of(&self, team: TeamId) -> usize {
        if self.teams[0] == team { 0 } else { 1 }
    }
}

fn label_by_references(centroids: &[Color; 2], references: &[Color; 2]) -> [TeamId; 2] {
    let mut weights = Matrix::new(2, 2, 0i64);
    for (i, centroid) in centroids.iter().enumerate() {
        for (j, reference) in references.iter().enumerate() {
            weights[(i, j)] = ((centroid - reference).norm() * DISTANCE_MULTIPLIER) as i64;
        }
    }
    let assignment = kuhn_munkres_min(&weights).1;
    let team = |column: usize| if column == 0 { TeamId::Home } else { TeamId::Away };

    [team(assignment[0]), team(assignment[1])]
}

fn label_by_single_reference(centroids: &[Color; 2], reference: &Color, team: TeamId) -> [TeamId; 2] {
    if nearest_centroid(centroids, reference) == 0 {
        [team, team.other()]
    } else {
        [team.other(), team]
    }
}

/// What a player track resolves to on a given frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeamAssignment {
    pub team: TeamId,
    /// Display colour of the team.
    pub team_color: Color,
    /// Last trusted shirt colour measured for this track.
    pub observed_color: Color,
}

struct TrackColor {
    team: TeamId,
    color: Color,
    drift_toward_other: u32,
}

/// Sticky team assignment per player track.
///
/// A track's team is decided on the first usable colour sample and kept for the track's
/// lifetime. Later samples can only refresh the stored colour, and only when they are close to
/// it and the player is not overlapping someone else.
pub struct TeamColorClassifier<C = TwoMeans> {
    config: TeamConfig,
    clustering: C,
    profile: Option<TeamColorProfile>,
    tracks: HashMap<TrackId, TrackColor>,
}

impl TeamColorClassifier<TwoMeans> {
    pub fn new(config: TeamConfig) -> Self {
        Self::with_clustering(config, TwoMeans::default())
    }
}

impl<C: ColorClustering + Sync> TeamColorClassifier<C> {
    pub fn with_clustering(config: TeamConfig, clustering: C) -> Self {
        Self {
            config,
            clustering,
            profile: None,
            tracks: HashMap::new(),
        }
    }

    pub fn profile(&self) -> Option<&TeamColorProfile> {
        self.profile.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.profile.is_some()
    }

    pub fn team_of(&self, track_id: TrackId) -> Option<TeamId> {
        self.tracks.get(&track_id).map(|track| track.team)
    }

    pub fn stored_color(&self, track_id: TrackId) -> Option<Color> {
        self.tracks.get(&track_id).map(|track| track.color)
    }

    /// Pools one dominant colour per player per frame over `window` and fits the team profile.
    ///
    /// A profile that is already established is never re-fitted. Returns `None` while too few
    /// distinct colours have been seen; the caller can retry with a later window.
    pub fn initialize<'a>(
        &mut self,
        window: impl IntoIterator<Item = (&'a RgbImage, &'a BTreeMap<TrackId, BBox>)>,
    ) -> Option<&TeamColorProfile> {
        if self.profile.is_some() {
            return self.profile.as_ref();
        }

        let mut samples = Vec::new();
        for (frame, players) in window {
            let boxes: Vec<&BBox> = players.values().filter(|bbox| bbox.is_valid()).collect();
            samples.extend(self.sample_colors(frame, &boxes).into_iter().flatten());
        }

        let home = self.config.home_reference_color.map(color_from_rgb);
        let away = self.config.away_reference_color.map(color_from_rgb);
        match TeamColorProfile::fit(&samples, &self.clustering, home, away) {
            Ok(profile) => {
                info!(
                    "Team colours established from {} samples: home {:?}, away {:?}",
                    samples.len(),
                    profile.centroid(TeamId::Home).as_slice(),
                    profile.centroid(TeamId::Away).as_slice()
                );
                self.profile = Some(profile);
            }
            Err(err) => {
                warn!("Team colour initialization deferred: {}", err);
            }
        }

        self.profile.as_ref()
    }

    /// Resolves every player in one frame.
    ///
    /// `occluders` are other tracked boxes in the frame, such as referees. They are never
    /// sampled or classified, but a player overlapping one counts as overlapped.
    ///
    /// Players missing from the result are not classified yet: the profile is not established,
    /// their box is malformed, or no usable colour could be sampled on first sighting.
    pub fn classify_frame(
        &mut self,
        frame: &RgbImage,
        players: &BTreeMap<TrackId, BBox>,
        occluders: &BTreeMap<TrackId, BBox>,
    ) -> BTreeMap<TrackId, TeamAssignment> {
        if self.profile.is_none() {
            return BTreeMap::new();
        }

        let valid: Vec<(TrackId, BBox)> = players
            .iter()
            .filter(|(track_id, bbox)| {
                let valid = bbox.is_valid();
                if !valid {
                    debug!("Skipping malformed box for track {}: {:?}", track_id, bbox);
                }
                valid
            })
            .map(|(track_id, bbox)| (*track_id, *bbox))
            .collect();

        let overlapped = self.overlapping_tracks(&valid, occluders);

        // known tracks under overlap keep their stored colour, so only sample the rest
        let to_sample: Vec<(TrackId, BBox)> = valid
            .iter()
            .filter(|(track_id, _)| {
                !self.tracks.contains_key(track_id) || !overlapped.contains(track_id)
            })
            .copied()
            .collect();
        let boxes: Vec<&BBox> = to_sample.iter().map(|(_, bbox)| bbox).collect();
        let sampled: HashMap<TrackId, Option<Color>> = to_sample
            .iter()
            .map(|(track_id, _)| *track_id)
            .zip(self.sample_colors(frame, &boxes))
            .collect();

        valid
            .iter()
            .filter_map(|(track_id, _)| {
                let sample = sampled.get(track_id).copied().flatten();
                self.classify_sample(*track_id, sample, overlapped.contains(track_id))
                    .map(|assignment| (*track_id, assignment))
            })
            .collect()
    }

    /// Applies one colour measurement to a track.
    ///
    /// `sample` is `None` when nothing usable was measured this frame. `overlapped` marks the
    /// measurement as contaminated by another track; the stored colour is then kept.
    pub fn classify_sample(
        &mut self,
        track_id: TrackId,
        sample: Option<Color>,
        overlapped: bool,
    ) -> Option<TeamAssignment> {
        let profile = self.profile.as_ref()?;

        if let Some(track) = self.tracks.get_mut(&track_id) {
            if let (Some(sample), false) = (sample, overlapped) {
                let drift = (sample - track.color).norm();
                if drift <= self.config.color_change_threshold {
                    track.color = sample;
                    track.drift_toward_other = 0;
                } else {
                    debug!(
                        "Discarding colour sample for track {}: drift {:.1} above {:.1}",
                        track_id, drift, self.config.color_change_threshold
                    );
                    if let Some(limit) = self.config.revision_frames {
                        if profile.team_for(&sample) == track.team.other() {
                            track.drift_toward_other += 1;
                            if track.drift_toward_other >= limit {
                                info!(
                                    "Revising track {} from {} to {} after {} drifted samples",
                                    track_id,
                                    track.team,
                                    track.team.other(),
                                    track.drift_toward_other
                                );
                                track.team = track.team.other();
                                track.color = sample;
                                track.drift_toward_other = 0;
                            }
                        } else {
                            track.drift_toward_other = 0;
                        }
                    }
                }
            }

            return Some(TeamAssignment {
                team: track.team,
                team_color: profile.display_color(track.team),
                observed_color: track.color,
            });
        }

        let sample = sample?;
        let team = profile.team_for(&sample);
        if overlapped {
            debug!("Track {} first seen while overlapping, classified anyway", track_id);
        }
        debug!("Track {} assigned to {}", track_id, team);
        self.tracks.insert(
            track_id,
            TrackColor {
                team,
                color: sample,
                drift_toward_other: 0,
            },
        );

        Some(TeamAssignment {
            team,
            team_color: profile.display_color(team),
            observed_color: sample,
        })
    }

    fn overlapping_tracks(
        &self,
        players: &[(TrackId, BBox)],
        occluders: &BTreeMap<TrackId, BBox>,
    ) -> BTreeSet<TrackId> {
        let threshold = self.config.overlap_threshold;
        let mut overlapped = BTreeSet::new();
        for (i, (id_1, bbox_1)) in players.iter().enumerate() {
            for (id_2, bbox_2) in players.iter().skip(i + 1) {
                if bbox_1.iou(bbox_2) > threshold {
                    overlapped.insert(*id_1);
                    overlapped.insert(*id_2);
                }
            }
            if occluders
                .values()
                .filter(|occluder| occluder.is_valid())
                .any(|occluder| bbox_1.iou(occluder) > threshold)
            {
                overlapped.insert(*id_1);
            }
        }
        overlapped
    }

    /// Dominant colour per box. Read-only over the frame, so boxes are sampled in parallel.
    fn sample_colors(&self, frame: &RgbImage, boxes: &[&BBox]) -> Vec<Option<Color>> {
        let torso = &self.config.torso_region;
        let pitch = &self.config.pitch_mask;
        let clustering = &self.clustering;

        boxes
            .par_iter()
            .map(|bbox| dominant_color(frame, bbox, torso, pitch, clustering))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const GRASS: Rgb<u8> = Rgb([40, 140, 50]);
    const RED: [u8; 3] = [200, 30, 30];
    const WHITE: [u8; 3] = [235, 235, 235];

    fn paint(frame: &mut RgbImage, bbox: &BBox, shirt: [u8; 3]) {
        for y in bbox.y_1 as u32..bbox.y_2 as u32 {
            for x in bbox.x_1 as u32..bbox.x_2 as u32 {
                frame.put_pixel(x, y, Rgb(shirt));
            }
        }
    }

    fn frame_with(players: &[(BBox, [u8; 3])]) -> RgbImage {
        let mut frame = RgbImage::from_pixel(400, 200, GRASS);
        for (bbox, shirt) in players {
            paint(&mut frame, bbox, *shirt);
        }
        frame
    }

    fn player_box(x: f64) -> BBox {
        BBox::new(x, 50.0, x + 20.0, 110.0)
    }

    fn initialized(config: TeamConfig) -> TeamColorClassifier {
        let players = [
            (player_box(10.0), RED),
            (player_box(60.0), RED),
            (player_box(110.0), WHITE),
            (player_box(160.0), WHITE),
        ];
        let frame = frame_with(&players);
        let boxes: BTreeMap<TrackId, BBox> = players
            .iter()
            .enumerate()
            .map(|(i, (bbox, _))| (i as TrackId + 1, *bbox))
            .collect();
        let frames = vec![frame; 5];

        let mut classifier = TeamColorClassifier::new(config);
        classifier.initialize(frames.iter().map(|frame| (frame, &boxes)));
        classifier
    }

    #[test]
    fn test_initialization_labels_red_home_and_white_away() {
        let classifier = initialized(TeamConfig::default());

        let profile = classifier.profile().unwrap();
        assert_eq!(profile.team_for(&color_from_rgb(RED)), TeamId::Home);
        assert_eq!(profile.team_for(&color_from_rgb(WHITE)), TeamId::Away);
        assert_eq!(profile.centroid(TeamId::Home), color_from_rgb(RED));
        assert_eq!(profile.display_color(TeamId::Away), Color::new(255.0, 255.0, 255.0));
    }

    #[test]
    fn test_references_swapped_swaps_labels() {
        let config = TeamConfig {
            home_reference_color: Some([255, 255, 255]),
            away_reference_color: Some([255, 0, 0]),
            ..TeamConfig::default()
        };

        let classifier = initialized(config);

        let profile = classifier.profile().unwrap();
        assert_eq!(profile.team_for(&color_from_rgb(RED)), TeamId::Away);
    }

    #[test]
    fn test_brightness_labels_without_references() {
        let config = TeamConfig {
            home_reference_color: None,
            away_reference_color: None,
            ..TeamConfig::default()
        };

        let classifier = initialized(config);

        let profile = classifier.profile().unwrap();
        assert_eq!(profile.team_for(&color_from_rgb(RED)), TeamId::Home);
        assert_eq!(profile.display_color(TeamId::Away), color_from_rgb(WHITE));
    }

    #[test]
    fn test_single_colour_window_defers_initialization() {
        let players = [(player_box(10.0), RED), (player_box(60.0), RED)];
        let frame = frame_with(&players);
        let boxes: BTreeMap<TrackId, BBox> =
            [(1, players[0].0), (2, players[1].0)].into_iter().collect();

        let mut classifier = TeamColorClassifier::new(TeamConfig::default());

        assert!(classifier.initialize([(&frame, &boxes)]).is_none());
        assert!(classifier.classify_frame(&frame, &boxes, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_new_red_track_joins_red_team_and_stays_after_drift() {
        let mut classifier = initialized(TeamConfig::default());
        let bbox = player_box(300.0);
        let boxes: BTreeMap<TrackId, BBox> = [(7, bbox)].into_iter().collect();

        let no_referees = BTreeMap::new();
        let first = classifier.classify_frame(
            &frame_with(&[(bbox, [210, 40, 35])]),
            &boxes,
            &no_referees,
        );
        let drifted =
            classifier.classify_frame(&frame_with(&[(bbox, WHITE)]), &boxes, &no_referees);

        assert_eq!(first[&7].team, TeamId::Home);
        assert_eq!(drifted[&7].team, TeamId::Home);
        assert_eq!(classifier.stored_color(7), Some(Color::new(210.0, 40.0, 35.0)));
    }

    #[test]
    fn test_small_colour_change_refreshes_stored_colour() {
        let mut classifier = initialized(TeamConfig::default());

        classifier.classify_sample(3, Some(color_from_rgb(RED)), false);
        let assignment = classifier
            .classify_sample(3, Some(Color::new(180.0, 50.0, 40.0)), false)
            .unwrap();

        assert_eq!(assignment.team, TeamId::Home);
        assert_eq!(assignment.observed_color, Color::new(180.0, 50.0, 40.0));
    }

    #[test]
    fn test_overlap_keeps_pre_overlap_colour() {
        let mut classifier = initialized(TeamConfig::default());
        let apart: BTreeMap<TrackId, BBox> =
            [(1, player_box(10.0)), (2, player_box(100.0))].into_iter().collect();
        classifier.classify_frame(
            &frame_with(&[(apart[&1], RED), (apart[&2], WHITE)]),
            &apart,
            &BTreeMap::new(),
        );

        let together: BTreeMap<TrackId, BBox> =
            [(1, player_box(10.0)), (2, player_box(15.0))].into_iter().collect();
        let result = classifier.classify_frame(
            &frame_with(&[(together[&1], [180, 60, 60]), (together[&2], [180, 60, 60])]),
            &together,
            &BTreeMap::new(),
        );

        assert_eq!(result[&1].observed_color, color_from_rgb(RED));
        assert_eq!(result[&2].team, TeamId::Away);
        assert_eq!(result[&2].observed_color, color_from_rgb(WHITE));
    }

    #[test]
    fn test_referee_overlap_keeps_pre_overlap_colour() {
        let mut classifier = initialized(TeamConfig::default());
        let bbox = player_box(300.0);
        let boxes: BTreeMap<TrackId, BBox> = [(7, bbox)].into_iter().collect();
        let no_referees = BTreeMap::new();
        classifier.classify_frame(&frame_with(&[(bbox, RED)]), &boxes, &no_referees);

        let referee = BBox::new(305.0, 50.0, 325.0, 110.0);
        let referees: BTreeMap<TrackId, BBox> = [(90, referee)].into_iter().collect();
        let blended = frame_with(&[(bbox, [200, 90, 30])]);
        let result = classifier.classify_frame(&blended, &boxes, &referees);

        assert_eq!(result[&7].team, TeamId::Home);
        assert_eq!(result[&7].observed_color, color_from_rgb(RED));
        assert!(!result.contains_key(&90));
        assert_eq!(classifier.team_of(90), None);

        // the same blended colour is taken once the referee has moved away
        let result = classifier.classify_frame(&blended, &boxes, &no_referees);
        assert_eq!(result[&7].observed_color, Color::new(200.0, 90.0, 30.0));
    }

    #[test]
    fn test_malformed_box_is_left_unclassified() {
        let mut classifier = initialized(TeamConfig::default());
        let boxes: BTreeMap<TrackId, BBox> =
            [(9, BBox::new(50.0, 50.0, 10.0, 10.0))].into_iter().collect();

        let result = classifier.classify_frame(&frame_with(&[]), &boxes, &BTreeMap::new());

        assert!(result.is_empty());
        assert_eq!(classifier.team_of(9), None);
    }

    #[test]
    fn test_revision_requires_opt_in_and_sustained_drift() {
        let config = TeamConfig {
            revision_frames: Some(3),
            ..TeamConfig::default()
        };
        let mut classifier = initialized(config);
        let white = color_from_rgb(WHITE);

        classifier.classify_sample(4, Some(color_from_rgb(RED)), false);
        classifier.classify_sample(4, Some(white), false);
        classifier.classify_sample(4, Some(white), false);
        assert_eq!(classifier.team_of(4), Some(TeamId::Home));

        let revised = classifier.classify_sample(4, Some(white), false).unwrap();
        assert_eq!(revised.team, TeamId::Away);
        assert_eq!(revised.observed_color, white);
    }

    #[test]
    fn test_unseen_track_without_sample_is_deferred() {
        let mut classifier = initialized(TeamConfig::default());

        assert!(classifier.classify_sample(11, None, false).is_none());
    }
}
