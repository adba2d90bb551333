//! Capture configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::naming::OutputNaming;
use crate::path::Extrapolation;

/// Configuration for a capture run, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Whether to follow the camera path. When disabled nothing is captured.
    pub follow_path: bool,

    /// Camera path JSON file, relative to the config file when loaded.
    pub path_file: Option<PathBuf>,

    /// Capture width in pixels.
    pub width: u32,

    /// Capture height in pixels.
    pub height: u32,

    /// Feature-channel names, one sweep each.
    pub features: Vec<String>,

    /// Output file prefixes, parallel to `features`. [`CaptureConfig::load`]
    /// resolves relative prefixes against the config file's directory.
    pub output_prefixes: Vec<String>,

    /// Output file extension, including the dot.
    pub output_extension: String,

    /// Zero-padding width of the written frame index.
    pub index_pad: usize,

    /// Offset added to the written frame index.
    pub start_index: u64,

    /// Inclusive `[t0, t1]` range of path frames to render.
    pub interval: Option<[usize; 2]>,

    /// Behavior for frames past the last checkpoint.
    pub extrapolation: Extrapolation,

    /// Number of frame slots (pre-recorded scene command sets).
    pub frame_slots: usize,

    /// Per-attempt timeout of the render-completion wait, in nanoseconds.
    pub render_wait_timeout_ns: u64,

    /// Per-attempt timeout of the copy-completion wait, in nanoseconds.
    pub copy_wait_timeout_ns: u64,

    /// Vertical field of view in degrees.
    pub fov_degrees: f32,

    /// Near clipping plane.
    pub near: f32,

    /// Far clipping plane.
    pub far: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            follow_path: true,
            path_file: None,
            width: 1280,
            height: 720,
            features: Vec::new(),
            output_prefixes: vec![String::new()],
            output_extension: ".exr".to_string(),
            index_pad: 1,
            start_index: 0,
            interval: None,
            extrapolation: Extrapolation::default(),
            frame_slots: 2,
            render_wait_timeout_ns: 10_000_000,
            copy_wait_timeout_ns: 10_000,
            fov_degrees: 45.0,
            near: 0.001,
            far: 256.0,
        }
    }
}

impl CaptureConfig {
    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;

        // Relative paths are resolved against the config's directory.
        let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(config);
        };
        if let Some(path_file) = &config.path_file {
            if path_file.is_relative() {
                config.path_file = Some(dir.join(path_file));
            }
        }
        for prefix in &mut config.output_prefixes {
            if Path::new(prefix.as_str()).is_relative() {
                *prefix = dir.join(prefix.as_str()).to_string_lossy().into_owned();
            }
        }
        Ok(config)
    }

    /// Checks the settings that do not depend on the loaded path.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Config(format!(
                "capture resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.frame_slots == 0 {
            return Err(CaptureError::Config(
                "at least one frame slot is required".into(),
            ));
        }
        let needed = self.features.len().max(1);
        if self.output_prefixes.len() < needed {
            return Err(CaptureError::Config(format!(
                "{} output prefixes configured, {needed} needed",
                self.output_prefixes.len()
            )));
        }
        if !self.output_extension.starts_with('.') {
            return Err(CaptureError::Config(format!(
                "output extension '{}' must start with '.'",
                self.output_extension
            )));
        }
        if self.follow_path && self.path_file.is_none() {
            return Err(CaptureError::Config(
                "follow_path is enabled but no path_file is set".into(),
            ));
        }
        if let Some([t0, t1]) = self.interval {
            if t1 < t0 {
                return Err(CaptureError::Config(format!(
                    "interval end {t1} is before start {t0}"
                )));
            }
        }
        Ok(())
    }

    /// Output naming scheme.
    #[must_use]
    pub fn naming(&self) -> OutputNaming {
        OutputNaming::new(self.index_pad, self.output_extension.clone())
    }

    /// Resolves the frame interval against a path of `path_len` frames.
    pub fn frame_interval(&self, path_len: usize) -> Result<FrameInterval> {
        FrameInterval::resolve(self.interval, path_len)
    }

    /// Aspect ratio of the capture.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Half-open range `[start, end)` of path frame positions to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInterval {
    /// First frame position.
    pub start: usize,
    /// One past the last frame position.
    pub end: usize,
}

impl FrameInterval {
    /// Creates an interval.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Resolves an optional inclusive `[t0, t1]` range; `None` means the whole path.
    ///
    /// The range may reach past the last checkpoint. Those frames follow the
    /// configured [`Extrapolation`].
    pub fn resolve(inclusive: Option<[usize; 2]>, path_len: usize) -> Result<Self> {
        let (start, end) = match inclusive {
            Some([t0, t1]) => {
                let Some(end) = t1.checked_add(1) else {
                    return Err(CaptureError::InvalidInterval {
                        start: t0,
                        end: t1,
                        len: path_len,
                    });
                };
                (t0, end)
            }
            None => (0, path_len),
        };
        if start >= end {
            return Err(CaptureError::InvalidInterval {
                start,
                end,
                len: path_len,
            });
        }
        Ok(Self { start, end })
    }

    /// Number of frames in the interval.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the interval holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
