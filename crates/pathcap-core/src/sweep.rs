//! Feature sweep control: which pose and channel to capture next.
//!
//! The controller walks the feature list in order and, for each feature, the
//! configured frame interval. Each call to [`FeatureSweepController::step`]
//! advances the state exactly once. Poses are interpolated on demand, so an
//! interval reaching past the last checkpoint follows the path's
//! [`Extrapolation`] policy.

use crate::config::{CaptureConfig, FrameInterval};
use crate::error::{CaptureError, Result};
use crate::feature::FeatureChannel;
use crate::naming::OutputNaming;
use crate::path::{CameraPath, Extrapolation, InterpolatedPose};

/// Counters of a running sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSweepState {
    /// Next path frame position to capture.
    pub current_frame: usize,
    /// Index of the active feature.
    pub current_feature: usize,
    /// Set once the last feature's interval is exhausted.
    pub done: bool,
}

/// One frame to render and export.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCapture {
    /// Camera pose to apply before rendering.
    pub pose: InterpolatedPose,
    /// Frame offset from the path's first checkpoint.
    pub path_position: usize,
    /// Index written into the output file name.
    pub output_index: u64,
    /// Index of the active feature (0 when no feature list is configured).
    pub feature_index: usize,
    /// Debug view to render.
    pub channel: FeatureChannel,
    /// Output file name.
    pub file_name: String,
    /// Whether this is the first frame of the feature's interval.
    pub first_of_feature: bool,
}

/// Result of a single [`FeatureSweepController::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum SweepStep {
    /// Render and export this frame.
    Capture(FrameCapture),
    /// A feature's interval is exhausted and the next feature starts.
    AdvanceFeature {
        /// Name of the finished feature.
        completed: String,
        /// Index of the feature that starts next.
        next: usize,
    },
    /// The sweep is complete; the render loop should terminate.
    Done,
}

/// Drives the feature x frame-interval iteration.
#[derive(Debug, Clone)]
pub struct FeatureSweepController {
    path: CameraPath,
    extrapolation: Extrapolation,
    segment: usize,
    interval: FrameInterval,
    features: Vec<String>,
    prefixes: Vec<String>,
    naming: OutputNaming,
    start_index: u64,
    channel: FeatureChannel,
    state: FeatureSweepState,
}

impl FeatureSweepController {
    /// Creates a controller over `path`.
    ///
    /// `interval` counts frames from the first checkpoint and may extend past
    /// the last one.
    pub fn new(
        path: CameraPath,
        extrapolation: Extrapolation,
        interval: FrameInterval,
        features: Vec<String>,
        prefixes: Vec<String>,
        naming: OutputNaming,
        start_index: u64,
    ) -> Result<Self> {
        if interval.start >= interval.end || path.frame_at(interval.end - 1).is_none() {
            return Err(CaptureError::InvalidInterval {
                start: interval.start,
                end: interval.end,
                len: path.frame_count(),
            });
        }
        if interval.end > path.frame_count() {
            log::info!(
                "Frames {}..{} lie past the last checkpoint, extrapolating with {extrapolation:?}",
                path.frame_count(),
                interval.end
            );
        }
        let needed = features.len().max(1);
        if prefixes.len() < needed {
            return Err(CaptureError::Config(format!(
                "{} output prefixes configured, {needed} needed",
                prefixes.len()
            )));
        }
        Ok(Self {
            path,
            extrapolation,
            segment: 0,
            state: FeatureSweepState {
                current_frame: interval.start,
                current_feature: 0,
                done: false,
            },
            interval,
            features,
            prefixes,
            naming,
            start_index,
            channel: FeatureChannel::Shaded,
        })
    }

    /// Creates a controller from a configuration and a loaded path.
    pub fn from_config(config: &CaptureConfig, path: &CameraPath) -> Result<Self> {
        let interval = config.frame_interval(path.frame_count())?;
        Self::new(
            path.clone(),
            config.extrapolation,
            interval,
            config.features.clone(),
            config.output_prefixes.clone(),
            config.naming(),
            config.start_index,
        )
    }

    /// Current counters.
    #[must_use]
    pub fn state(&self) -> FeatureSweepState {
        self.state
    }

    /// The frame interval swept for each feature.
    #[must_use]
    pub fn interval(&self) -> FrameInterval {
        self.interval
    }

    /// Total number of frames the full sweep captures.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.interval.len() * self.features.len().max(1)
    }

    /// Whether the sweep has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.done
    }

    /// Advances the sweep by one step.
    pub fn step(&mut self) -> SweepStep {
        if self.state.done {
            return SweepStep::Done;
        }

        if self.state.current_frame >= self.interval.end {
            if self.features.is_empty() {
                log::info!("Done following path");
                self.state.done = true;
                return SweepStep::Done;
            }

            let completed = self.features[self.state.current_feature].clone();
            log::info!("Done with feature '{completed}'");
            self.state.current_frame = self.interval.start;
            self.state.current_feature += 1;
            if self.state.current_feature >= self.features.len() {
                log::info!("Done following path");
                self.state.done = true;
                return SweepStep::Done;
            }
            return SweepStep::AdvanceFeature {
                completed,
                next: self.state.current_feature,
            };
        }

        let position = self.state.current_frame;
        let first_of_feature = position == self.interval.start;
        if first_of_feature {
            self.channel = self.select_channel();
            self.segment = 0;
        }
        // Fits: `new` checked the interval end against `i64`.
        #[allow(clippy::cast_possible_wrap)]
        let t = self.path.first_frame() + position as i64;
        let pose = self
            .path
            .pose_with_cursor(&mut self.segment, t, self.extrapolation);

        let feature_index = self.state.current_feature;
        let output_index = position as u64 + self.start_index;
        let capture = FrameCapture {
            pose,
            path_position: position,
            output_index,
            feature_index,
            channel: self.channel,
            file_name: self
                .naming
                .file_name(&self.prefixes[feature_index], output_index),
            first_of_feature,
        };

        self.state.current_frame += 1;
        SweepStep::Capture(capture)
    }

    fn select_channel(&self) -> FeatureChannel {
        let Some(name) = self.features.get(self.state.current_feature) else {
            return FeatureChannel::Shaded;
        };
        FeatureChannel::from_name(name).unwrap_or_else(|| {
            log::warn!("Unrecognized feature '{name}', rendering the default view");
            FeatureChannel::Shaded
        })
    }
}

impl Iterator for FeatureSweepController {
    type Item = FrameCapture;

    /// Yields captures, skipping feature transitions, until the sweep is done.
    fn next(&mut self) -> Option<FrameCapture> {
        loop {
            match self.step() {
                SweepStep::Capture(capture) => return Some(capture),
                SweepStep::AdvanceFeature { .. } => {}
                SweepStep::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{CameraCheckpoint, Extrapolation};
    use glam::Vec3;

    fn path(frames: &[i64]) -> CameraPath {
        CameraPath::new(
            frames
                .iter()
                .map(|&t| CameraCheckpoint {
                    position: Vec3::new(t as f32, 0.0, 0.0),
                    direction: Vec3::NEG_Z,
                    frame: t,
                })
                .collect(),
        )
        .unwrap()
    }

    fn controller(
        frames: &[i64],
        interval: Option<[usize; 2]>,
        features: &[&str],
        prefixes: &[&str],
        start_index: u64,
    ) -> FeatureSweepController {
        let config = CaptureConfig {
            path_file: Some("unused.json".into()),
            features: features.iter().map(ToString::to_string).collect(),
            output_prefixes: prefixes.iter().map(ToString::to_string).collect(),
            interval,
            start_index,
            extrapolation: Extrapolation::ReplayLastSegment,
            ..CaptureConfig::default()
        };
        FeatureSweepController::from_config(&config, &path(frames)).unwrap()
    }

    #[test]
    fn test_single_pass_over_whole_path() {
        let mut sweep = controller(&[0, 10, 20], Some([0, 20]), &[], &[""], 0);
        let captures: Vec<_> = sweep.by_ref().collect();
        assert_eq!(captures.len(), 21);
        assert_eq!(captures[10].pose.position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(captures[10].pose.direction, Vec3::NEG_Z);
        assert!(sweep.is_done());
        assert_eq!(sweep.step(), SweepStep::Done);
    }

    #[test]
    fn test_feature_sweep_file_order() {
        let mut sweep = controller(&[0, 10], Some([0, 4]), &["normal", "albedo"], &["n_", "a_"], 0);
        assert_eq!(sweep.total_frames(), 10);

        let mut files = Vec::new();
        let mut advances = Vec::new();
        loop {
            match sweep.step() {
                SweepStep::Capture(c) => files.push(c.file_name),
                SweepStep::AdvanceFeature { completed, next } => advances.push((completed, next)),
                SweepStep::Done => break,
            }
        }
        let expected: Vec<String> = (0..5)
            .map(|i| format!("n_{i}.exr"))
            .chain((0..5).map(|i| format!("a_{i}.exr")))
            .collect();
        assert_eq!(files, expected);
        assert_eq!(advances, vec![("normal".to_string(), 1)]);
        assert!(sweep.state().done);
    }

    #[test]
    fn test_start_index_offsets_written_index() {
        let mut sweep = controller(&[0, 10], None, &[], &["p_"], 5);
        let third = sweep.nth(2).unwrap();
        assert_eq!(third.output_index, 7);
        assert_eq!(third.file_name, "p_7.exr");
    }

    #[test]
    fn test_channel_selected_at_feature_start() {
        let sweep = controller(&[0, 3], None, &["position", "bogus"], &["p_", "b_"], 0);
        let captures: Vec<_> = sweep.collect();
        assert_eq!(captures.len(), 8);
        assert!(captures[..4]
            .iter()
            .all(|c| c.channel == FeatureChannel::Position && c.feature_index == 0));
        // Unknown names still sweep, with the default view.
        assert!(captures[4..]
            .iter()
            .all(|c| c.channel == FeatureChannel::Shaded && c.feature_index == 1));
        assert!(captures[0].first_of_feature && captures[4].first_of_feature);
        assert!(!captures[1].first_of_feature);
    }

    #[test]
    fn test_sub_interval_uses_path_positions() {
        let captures: Vec<_> = controller(&[0, 10], Some([3, 5]), &[], &[""], 0).collect();
        let positions: Vec<_> = captures.iter().map(|c| c.path_position).collect();
        assert_eq!(positions, vec![3, 4, 5]);
        assert_eq!(captures[0].file_name, "3.exr");
    }

    fn positions_past_end(extrapolation: Extrapolation) -> Vec<f32> {
        let config = CaptureConfig {
            path_file: Some("unused.json".into()),
            features: vec!["normal".into(), "albedo".into()],
            output_prefixes: vec!["n_".into(), "a_".into()],
            interval: Some([8, 12]),
            extrapolation,
            ..CaptureConfig::default()
        };
        FeatureSweepController::from_config(&config, &path(&[0, 10]))
            .unwrap()
            .map(|c| c.pose.position.x)
            .collect()
    }

    #[test]
    fn test_interval_past_last_checkpoint_follows_extrapolation() {
        let replay = positions_past_end(Extrapolation::ReplayLastSegment);
        let clamp = positions_past_end(Extrapolation::ClampToLast);
        assert_eq!(replay.len(), 10);
        assert_eq!(clamp.len(), 10);

        let expected_replay = [8.0, 9.0, 10.0, 11.0, 12.0];
        let expected_clamp = [8.0, 9.0, 10.0, 10.0, 10.0];
        // The second feature starts over from the same poses.
        for feature in 0..2 {
            let range = feature * 5..feature * 5 + 5;
            for (got, want) in replay[range.clone()].iter().zip(expected_replay) {
                assert!((got - want).abs() < 1e-5, "replay {got} != {want}");
            }
            for (got, want) in clamp[range].iter().zip(expected_clamp) {
                assert!((got - want).abs() < 1e-5, "clamp {got} != {want}");
            }
        }
    }

    #[test]
    fn test_rejects_interval_beyond_frame_range() {
        let config = CaptureConfig {
            path_file: Some("unused.json".into()),
            interval: Some([0, usize::MAX - 1]),
            ..CaptureConfig::default()
        };
        let err = FeatureSweepController::from_config(&config, &path(&[0, 10])).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidInterval { .. }));
    }
}
