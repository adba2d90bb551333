//! Camera path loading and per-frame pose interpolation.
//!
//! A path file is a JSON list of checkpoints:
//!
//! ```json
//! [
//!     { "x": 0.0, "y": 1.0, "z": 5.0, "dirx": 0.0, "diry": 0.0, "dirz": -1.0, "t": 0 },
//!     { "x": 2.0, "y": 1.0, "z": 5.0, "dirx": 0.0, "diry": 0.0, "dirz": -1.0, "t": 30 }
//! ]
//! ```
//!
//! Poses between checkpoints are linearly interpolated. Directions use a plain
//! lerp followed by normalization, not a spherical interpolation, so widely
//! spaced checkpoints with large turns show a non-constant angular velocity.

use std::path::Path;

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// World up axis used to build the view basis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// A keyframed camera pose tagged with an integer frame index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraCheckpoint {
    /// Camera position in world space.
    pub position: Vec3,
    /// Viewing direction (not required to be unit length).
    pub direction: Vec3,
    /// Frame index at which the camera reaches this pose.
    pub frame: i64,
}

/// On-disk layout of a single checkpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CheckpointRecord {
    x: f32,
    y: f32,
    z: f32,
    dirx: f32,
    diry: f32,
    dirz: f32,
    t: i64,
}

impl From<CheckpointRecord> for CameraCheckpoint {
    fn from(r: CheckpointRecord) -> Self {
        Self {
            position: Vec3::new(r.x, r.y, r.z),
            direction: Vec3::new(r.dirx, r.diry, r.dirz),
            frame: r.t,
        }
    }
}

/// Policy for frames outside the checkpoint range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    /// Keep applying the nearest segment's interpolation law, so the camera
    /// continues moving past the last checkpoint.
    #[default]
    ReplayLastSegment,
    /// Hold the first/last checkpoint pose.
    ClampToLast,
}

/// An interpolated camera pose for one integer frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedPose {
    /// Frame index this pose was computed for.
    pub frame: i64,
    /// Camera position.
    pub position: Vec3,
    /// Normalized viewing direction.
    pub direction: Vec3,
}

impl InterpolatedPose {
    /// Camera right axis: `normalize(direction x up)`.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.direction.cross(WORLD_UP).normalize()
    }

    /// Camera up axis, orthogonal to right and direction.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.direction).normalize()
    }

    /// World-to-camera rotation.
    #[must_use]
    pub fn rotation(&self) -> Mat3 {
        Mat3::from_cols(self.right(), self.up(), -self.direction).transpose()
    }

    /// View matrix: `rotation * translate(-position)`.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_mat3(self.rotation()) * Mat4::from_translation(-self.position)
    }
}

/// An ordered sequence of at least two checkpoints with strictly increasing
/// frame indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPath {
    checkpoints: Vec<CameraCheckpoint>,
}

impl CameraPath {
    /// Creates a path, validating checkpoint count and ordering.
    pub fn new(checkpoints: Vec<CameraCheckpoint>) -> Result<Self> {
        if checkpoints.is_empty() {
            return Err(CaptureError::EmptyPath);
        }
        if checkpoints.len() < 2 {
            return Err(CaptureError::TooFewCheckpoints(checkpoints.len()));
        }
        for (index, pair) in checkpoints.windows(2).enumerate() {
            if pair[1].frame <= pair[0].frame {
                return Err(CaptureError::NonIncreasingFrameIndex {
                    index: index + 1,
                    previous: pair[0].frame,
                    current: pair[1].frame,
                });
            }
        }
        Ok(Self { checkpoints })
    }

    /// Loads a path from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CaptureError::PathFileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let camera_path = Self::from_json_str(&text)?;
        log::info!(
            "Loaded camera path {} ({} checkpoints, {} frames)",
            path.display(),
            camera_path.checkpoints.len(),
            camera_path.frame_count()
        );
        Ok(camera_path)
    }

    /// Parses a path from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(CaptureError::PathFileParse)?;
        let serde_json::Value::Array(items) = value else {
            return Err(CaptureError::PathNotAList);
        };
        let checkpoints = items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<CheckpointRecord>(item)
                    .map(CameraCheckpoint::from)
                    .map_err(CaptureError::PathFileParse)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(checkpoints)
    }

    /// The validated checkpoints.
    #[must_use]
    pub fn checkpoints(&self) -> &[CameraCheckpoint] {
        &self.checkpoints
    }

    /// Frame index of the first checkpoint.
    #[must_use]
    pub fn first_frame(&self) -> i64 {
        self.checkpoints[0].frame
    }

    /// Frame index of the last checkpoint.
    #[must_use]
    pub fn last_frame(&self) -> i64 {
        self.checkpoints[self.checkpoints.len() - 1].frame
    }

    /// Number of integer frames from the first to the last checkpoint, inclusive.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn frame_count(&self) -> usize {
        (self.last_frame() - self.first_frame() + 1) as usize
    }

    /// Returns a planner that walks this path frame by frame.
    #[must_use]
    pub fn planner(&self, extrapolation: Extrapolation) -> PathPlanner<'_> {
        PathPlanner {
            path: self,
            segment: 0,
            extrapolation,
        }
    }

    /// Computes one pose per frame from the first to the last checkpoint.
    #[must_use]
    pub fn poses(&self, extrapolation: Extrapolation) -> Vec<InterpolatedPose> {
        let mut planner = self.planner(extrapolation);
        (self.first_frame()..=self.last_frame())
            .map(|t| planner.pose_at(t))
            .collect()
    }
}

/// Walks a [`CameraPath`] with a segment cursor that only moves forward.
///
/// Frames must be requested in non-decreasing order; call [`PathPlanner::rewind`]
/// to start over.
#[derive(Debug, Clone)]
pub struct PathPlanner<'a> {
    path: &'a CameraPath,
    segment: usize,
    extrapolation: Extrapolation,
}

impl PathPlanner<'_> {
    /// Index of the segment's first checkpoint.
    #[must_use]
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Moves the cursor back to the first segment.
    pub fn rewind(&mut self) {
        self.segment = 0;
    }

    /// Computes the pose for integer frame `t`.
    ///
    /// At a checkpoint's own frame the cursor has already moved onto the
    /// segment starting there, so the result equals that checkpoint exactly.
    /// Past the last checkpoint the final segment stays selected.
    pub fn pose_at(&mut self, t: i64) -> InterpolatedPose {
        self.path
            .pose_with_cursor(&mut self.segment, t, self.extrapolation)
    }
}

impl CameraPath {
    /// Path frame index of sweep position `position`, counted from the first
    /// checkpoint. `None` if it does not fit an `i64`.
    #[must_use]
    pub fn frame_at(&self, position: usize) -> Option<i64> {
        i64::try_from(position)
            .ok()
            .and_then(|p| self.first_frame().checked_add(p))
    }

    /// Interpolates frame `t`, advancing the caller's forward-only segment cursor.
    pub(crate) fn pose_with_cursor(
        &self,
        segment: &mut usize,
        t: i64,
        extrapolation: Extrapolation,
    ) -> InterpolatedPose {
        let cps = &self.checkpoints;
        while *segment + 2 < cps.len() && t >= cps[*segment + 1].frame {
            *segment += 1;
        }
        let a = &cps[*segment];
        let b = &cps[*segment + 1];

        #[allow(clippy::cast_precision_loss)]
        let mut coeff = (t - a.frame) as f32 / (b.frame - a.frame) as f32;
        if extrapolation == Extrapolation::ClampToLast {
            coeff = coeff.clamp(0.0, 1.0);
        }

        InterpolatedPose {
            frame: t,
            position: lerp(a.position, b.position, coeff),
            direction: lerp(a.direction, b.direction, coeff).normalize(),
        }
    }
}

/// `(1 - s) * a + s * b`, exact at both `s == 0` and `s == 1`.
#[must_use]
pub fn lerp(a: Vec3, b: Vec3, s: f32) -> Vec3 {
    b * s + a * (1.0 - s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cp(x: f32, dir: Vec3, frame: i64) -> CameraCheckpoint {
        CameraCheckpoint {
            position: Vec3::new(x, 0.0, 0.0),
            direction: dir,
            frame,
        }
    }

    fn three_point_path() -> CameraPath {
        CameraPath::new(vec![
            cp(0.0, Vec3::NEG_Z, 0),
            cp(10.0, Vec3::X, 10),
            cp(20.0, Vec3::NEG_Z, 20),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_path_file_layout() {
        let path = CameraPath::from_json_str(
            r#"[
                {"x": 1, "y": 2, "z": 3, "dirx": 0, "diry": 0, "dirz": -1, "t": 4},
                {"x": 5, "y": 6, "z": 7, "dirx": 1, "diry": 0, "dirz": 0, "t": 8}
            ]"#,
        )
        .unwrap();
        assert_eq!(path.checkpoints().len(), 2);
        assert_eq!(path.checkpoints()[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(path.checkpoints()[1].direction, Vec3::X);
        assert_eq!(path.first_frame(), 4);
        assert_eq!(path.frame_count(), 5);
    }

    #[test]
    fn test_parse_rejects_non_list() {
        let err = CameraPath::from_json_str(r#"{"x": 1}"#).unwrap_err();
        assert!(matches!(err, CaptureError::PathNotAList));
    }

    #[test]
    fn test_parse_rejects_empty_and_single() {
        assert!(matches!(
            CameraPath::from_json_str("[]").unwrap_err(),
            CaptureError::EmptyPath
        ));
        let single = r#"[{"x":0,"y":0,"z":0,"dirx":0,"diry":0,"dirz":-1,"t":0}]"#;
        assert!(matches!(
            CameraPath::from_json_str(single).unwrap_err(),
            CaptureError::TooFewCheckpoints(1)
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_checkpoint() {
        let err = CameraPath::from_json_str(r#"[{"x": 1}, {"x": 2}]"#).unwrap_err();
        assert!(matches!(err, CaptureError::PathFileParse(_)));
        let err = CameraPath::from_json_str("not json").unwrap_err();
        assert!(matches!(err, CaptureError::PathFileParse(_)));
    }

    #[test]
    fn test_rejects_non_increasing_frames() {
        let err = CameraPath::new(vec![cp(0.0, Vec3::X, 5), cp(1.0, Vec3::X, 5)]).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::NonIncreasingFrameIndex {
                index: 1,
                previous: 5,
                current: 5
            }
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CameraPath::load("/nonexistent/pathcap/path.json").unwrap_err();
        assert!(matches!(err, CaptureError::PathFileOpen { .. }));
    }

    #[test]
    fn test_poses_cover_whole_path() {
        let path = three_point_path();
        let poses = path.poses(Extrapolation::default());
        assert_eq!(poses.len(), 21);
        assert_eq!(poses[0].frame, 0);
        assert_eq!(poses[20].frame, 20);
    }

    #[test]
    fn test_pose_at_checkpoint_is_exact() {
        let path = three_point_path();
        let poses = path.poses(Extrapolation::default());
        assert_eq!(poses[10].position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(poses[10].direction, Vec3::X);
        assert_eq!(poses[20].position, Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(poses[20].direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_cursor_advances_monotonically() {
        let path = three_point_path();
        let mut planner = path.planner(Extrapolation::default());
        planner.pose_at(3);
        assert_eq!(planner.segment(), 0);
        planner.pose_at(10);
        assert_eq!(planner.segment(), 1);
        // The cursor does not move back for earlier frames.
        planner.pose_at(2);
        assert_eq!(planner.segment(), 1);
        planner.rewind();
        assert_eq!(planner.segment(), 0);
    }

    #[test]
    fn test_replay_last_segment_extrapolates() {
        let path = three_point_path();
        let mut planner = path.planner(Extrapolation::ReplayLastSegment);
        let pose = planner.pose_at(25);
        assert_eq!(planner.segment(), 1);
        assert!((pose.position.x - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_to_last_holds_pose() {
        let path = three_point_path();
        let mut planner = path.planner(Extrapolation::ClampToLast);
        let pose = planner.pose_at(25);
        assert_eq!(pose.position, Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(pose.direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_frame_at_counts_from_first_checkpoint() {
        let path = CameraPath::new(vec![cp(0.0, Vec3::X, 4), cp(1.0, Vec3::X, 8)]).unwrap();
        assert_eq!(path.frame_at(0), Some(4));
        assert_eq!(path.frame_at(10), Some(14));
        assert_eq!(path.frame_at(usize::MAX), None);
    }

    #[test]
    fn test_view_matrix_maps_position_to_origin() {
        let pose = InterpolatedPose {
            frame: 0,
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::NEG_Z,
        };
        let view = pose.view_matrix();
        let origin = view.transform_point3(pose.position);
        assert!(origin.length() < 1e-5);
        // Looking down -Z with +Y up is the identity rotation.
        let ahead = view.transform_point3(pose.position + Vec3::NEG_Z);
        assert!((ahead - Vec3::NEG_Z).length() < 1e-5);
        assert!((pose.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_view_matches_look_at() {
        let pose = InterpolatedPose {
            frame: 0,
            position: Vec3::new(4.0, 1.0, -2.0),
            direction: Vec3::new(1.0, -0.3, 0.5).normalize(),
        };
        let expected = Mat4::look_at_rh(pose.position, pose.position + pose.direction, WORLD_UP);
        assert!(pose.view_matrix().abs_diff_eq(expected, 1e-5));
    }

    fn unit_dir() -> impl Strategy<Value = Vec3> {
        (-1.0f32..1.0, -0.5f32..0.5, -1.0f32..1.0)
            .prop_filter("non-degenerate", |(x, _, z)| x.abs() + z.abs() > 0.1)
            .prop_map(|(x, y, z)| Vec3::new(x, y, z).normalize())
    }

    fn point() -> impl Strategy<Value = Vec3> {
        (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0)
            .prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_pose_is_linear_lerp(
            pa in point(),
            pb in point(),
            da in unit_dir(),
            db in unit_dir(),
            ta in -50i64..50,
            span in 1i64..40,
            offset in 0i64..40,
        ) {
            prop_assume!((da + db).length() > 0.1);
            let tb = ta + span;
            let t = ta + offset.min(span);
            let path = CameraPath::new(vec![
                CameraCheckpoint { position: pa, direction: da, frame: ta },
                CameraCheckpoint { position: pb, direction: db, frame: tb },
            ]).unwrap();
            let pose = path.planner(Extrapolation::default()).pose_at(t);

            #[allow(clippy::cast_precision_loss)]
            let coeff = (t - ta) as f32 / (tb - ta) as f32;
            let expected_pos = pb * coeff + pa * (1.0 - coeff);
            let expected_dir = (db * coeff + da * (1.0 - coeff)).normalize();
            prop_assert!((pose.position - expected_pos).length() < 1e-3);
            prop_assert!((pose.direction - expected_dir).length() < 1e-5);
        }
    }
}
