//! Feature channels: the debug views a sweep can render.

use serde::{Deserialize, Serialize};

/// A recognized debug-view channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureChannel {
    /// The regular shaded view.
    #[default]
    Shaded,
    /// World-space surface normals.
    Normal,
    /// Unlit base color.
    Albedo,
    /// World-space position.
    Position,
}

impl FeatureChannel {
    /// All recognized channels, in debug-view index order.
    pub const ALL: [FeatureChannel; 4] = [
        FeatureChannel::Shaded,
        FeatureChannel::Normal,
        FeatureChannel::Albedo,
        FeatureChannel::Position,
    ];

    /// Matches a configured feature name. The empty string selects the shaded view.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The configuration name of this channel.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FeatureChannel::Shaded => "",
            FeatureChannel::Normal => "normal",
            FeatureChannel::Albedo => "albedo",
            FeatureChannel::Position => "position",
        }
    }

    /// Debug-view index written to the scene uniforms.
    #[must_use]
    pub fn debug_view_index(self) -> u32 {
        match self {
            FeatureChannel::Shaded => 0,
            FeatureChannel::Normal => 1,
            FeatureChannel::Albedo => 2,
            FeatureChannel::Position => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(FeatureChannel::from_name("normal"), Some(FeatureChannel::Normal));
        assert_eq!(FeatureChannel::from_name("albedo"), Some(FeatureChannel::Albedo));
        assert_eq!(FeatureChannel::from_name("position"), Some(FeatureChannel::Position));
        assert_eq!(FeatureChannel::from_name(""), Some(FeatureChannel::Shaded));
        assert_eq!(FeatureChannel::from_name("Normal"), None);
        assert_eq!(FeatureChannel::from_name("roughness"), None);
    }

    #[test]
    fn test_debug_view_indices_follow_order() {
        for (i, channel) in FeatureChannel::ALL.iter().enumerate() {
            assert_eq!(channel.debug_view_index() as usize, i);
        }
    }
}
