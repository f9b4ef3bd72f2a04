//! # Stream and Renderer Configuration
//!
//! Serializable settings for the two halves of the crate:
//!
//! - **Player Config**: per-stream settings pushed to the source before each sample
//! - **Points Renderer Config**: draw path, point size, draw state, shader slot names
//! - **Stream Config**: both of the above, loadable from TOML or RON
//!
//! Every struct is `#[serde(default)]`, so a config file only has to name the
//! values it changes.

use serde::{Deserialize, Serialize};

use crate::render::api::DrawSettings;
use crate::render::InstancingMode;

pub use crate::config::{Config, ConfigError};

/// # Player Configuration
///
/// Settings forwarded to the stream handle before every sample request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Let the source decode samples in the background between `update` and
    /// `late_update`
    pub async_load: bool,
    /// Multiplier applied to per-vertex motion vectors
    pub vertex_motion_scale: f32,
}

impl PlayerConfig {
    /// Set whether samples are decoded asynchronously
    pub const fn with_async_load(mut self, async_load: bool) -> Self {
        self.async_load = async_load;
        self
    }

    /// Set the vertex motion scale
    pub const fn with_vertex_motion_scale(mut self, scale: f32) -> Self {
        self.vertex_motion_scale = scale;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.vertex_motion_scale.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "vertex_motion_scale must be finite, got {}",
                self.vertex_motion_scale
            )));
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            async_load: true,
            vertex_motion_scale: 1.0,
        }
    }
}

/// Names of the material parameters the point renderer binds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSlots {
    /// Float parameter receiving the point size
    pub point_size: String,
    /// Buffer parameter receiving the point positions
    pub points: String,
    /// Buffer or float-array parameter receiving the point ids
    pub point_ids: String,
    /// Keyword switching the shader to read instances from `points`
    pub procedural_keyword: String,
}

impl Default for ShaderSlots {
    fn default() -> Self {
        Self {
            point_size: "_PointSize".to_string(),
            points: "_Points".to_string(),
            point_ids: "_PointIDs".to_string(),
            procedural_keyword: "PROCEDURAL_INSTANCING_ENABLED".to_string(),
        }
    }
}

/// # Points Renderer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsRendererConfig {
    /// Requested draw path; downgraded at draw time if the device lacks support
    pub instancing_mode: InstancingMode,
    /// Uniform scale applied to the mesh drawn at every point
    pub point_size: f32,
    /// Forward per-point ids to the shader when the point set carries them
    pub use_point_ids: bool,
    /// Shadow and layer state of every draw
    pub draw: DrawSettings,
    /// Material parameter names
    pub slots: ShaderSlots,
}

impl PointsRendererConfig {
    /// Set the requested draw path
    pub const fn with_mode(mut self, mode: InstancingMode) -> Self {
        self.instancing_mode = mode;
        self
    }

    /// Set the point size
    pub const fn with_point_size(mut self, point_size: f32) -> Self {
        self.point_size = point_size;
        self
    }

    /// Enable or disable id forwarding
    pub const fn with_point_ids(mut self, use_point_ids: bool) -> Self {
        self.use_point_ids = use_point_ids;
        self
    }

    /// Set the draw state
    pub const fn with_draw_settings(mut self, draw: DrawSettings) -> Self {
        self.draw = draw;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.point_size.is_finite() || self.point_size < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "point_size must be finite and non-negative, got {}",
                self.point_size
            )));
        }
        let slots = &self.slots;
        for (name, value) in [
            ("point_size", &slots.point_size),
            ("points", &slots.points),
            ("point_ids", &slots.point_ids),
            ("procedural_keyword", &slots.procedural_keyword),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("shader slot `{name}` is empty")));
            }
        }
        Ok(())
    }
}

impl Default for PointsRendererConfig {
    fn default() -> Self {
        Self {
            instancing_mode: InstancingMode::Instancing,
            point_size: 0.2,
            use_point_ids: false,
            draw: DrawSettings::default(),
            slots: ShaderSlots::default(),
        }
    }
}

/// # Stream Configuration
///
/// Top-level settings file for a player and its point renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Player settings
    pub player: PlayerConfig,
    /// Renderer settings
    pub renderer: PointsRendererConfig,
}

impl StreamConfig {
    /// Set player settings
    pub const fn with_player(mut self, player: PlayerConfig) -> Self {
        self.player = player;
        self
    }

    /// Set renderer settings
    pub fn with_renderer(mut self, renderer: PointsRendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Validate all configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.player.validate()?;
        self.renderer.validate()?;
        Ok(())
    }
}

impl Config for StreamConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ShadowCasting;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();

        assert!(config.player.async_load);
        assert_eq!(config.renderer.instancing_mode, InstancingMode::Instancing);
        assert!(!config.renderer.use_point_ids);
        assert_eq!(config.renderer.slots.point_size, "_PointSize");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let negative = PointsRendererConfig::default().with_point_size(-1.0);
        assert!(matches!(negative.validate(), Err(ConfigError::Invalid(_))));

        let nan = PlayerConfig::default().with_vertex_motion_scale(f32::NAN);
        assert!(matches!(nan.validate(), Err(ConfigError::Invalid(_))));

        let mut unnamed = PointsRendererConfig::default();
        unnamed.slots.points.clear();
        assert!(StreamConfig::default().with_renderer(unnamed).validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.toml");
        let config = StreamConfig::default()
            .with_player(PlayerConfig::default().with_async_load(false))
            .with_renderer(
                PointsRendererConfig::default()
                    .with_mode(InstancingMode::Procedural)
                    .with_draw_settings(DrawSettings {
                        shadow_casting: ShadowCasting::TwoSided,
                        receive_shadows: true,
                        layer: 3,
                    }),
            );

        config.save_to_file(&path).unwrap();
        let loaded = StreamConfig::load_from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.ron");
        std::fs::write(&path, "(renderer: (point_size: 0.5))").unwrap();

        let loaded = StreamConfig::load_from_file(&path).unwrap();

        assert_relative_eq!(loaded.renderer.point_size, 0.5);
        assert_eq!(loaded.player, PlayerConfig::default());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = StreamConfig::load_from_file("stream.json");
        assert!(matches!(result, Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))));
    }
}
