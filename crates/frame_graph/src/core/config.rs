//! # Graph Configuration
//!
//! Configuration surface for a [`crate::scene::Graph`]: viewport size,
//! dimensionality, handedness, projection and the two per-frame optimization
//! toggles (cached projection-view inverse and boundary equation updates).
//!
//! Configurations are plain serde structures so they can be loaded from TOML
//! or RON files through the [`Config`] trait.

use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let is_toml = path.ends_with(".toml");
        if !is_toml && !path.ends_with(".ron") {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if is_toml {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its valid range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Dimensionality of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// Planar scene; rotations are about +Z and the eye is orthographic
    TwoD,
    /// Full 3D scene
    ThreeD,
}

/// Handedness of the world coordinate system
///
/// Pixel rows always grow downward. Right-handed graphs show world +Y up on
/// screen; left-handed graphs flip the projection's Y axis so world +Y grows
/// with pixel rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    /// Left-handed: world +Y grows with pixel rows
    Left,
    /// Right-handed: world +Y points up on screen
    Right,
}

/// Projection used by the eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Perspective projection driven by the field of view
    Perspective,
    /// Orthographic projection driven by half extents
    Orthographic,
}

/// Which debug overlays are enabled at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualHintsConfig {
    /// Draw world axes
    pub axes: bool,
    /// Draw the ground grid
    pub grid: bool,
    /// Draw picking hints around pickable frames
    pub picking: bool,
}

impl Default for VisualHintsConfig {
    fn default() -> Self {
        Self {
            axes: true,
            grid: true,
            picking: false,
        }
    }
}

/// # Graph Configuration
///
/// Everything needed to construct a [`crate::scene::Graph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
    /// 2D or 3D graph
    pub dimension: Dimension,
    /// World handedness
    pub handedness: Handedness,
    /// Initial eye projection (ignored in 2D, which is always orthographic)
    pub projection: ProjectionType,
    /// Vertical field of view in degrees
    pub field_of_view_degrees: f32,
    /// Scene bounding sphere radius
    pub scene_radius: f32,
    /// Scene bounding sphere center
    pub scene_center: [f32; 3],
    /// Keep the inverse of the projection-view product cached for unprojection
    pub cache_projection_view_inverse: bool,
    /// Recompute the frustum boundary equations whenever the eye changes
    pub boundary_equations: bool,
    /// Initial debug overlays
    pub visual_hints: VisualHintsConfig,
    /// Multiple of the scene radius spanned by the default clipping planes
    pub z_clipping_coefficient: f32,
    /// Fraction of the clipping span used as the minimum near distance
    pub z_near_coefficient: f32,
    /// Default pick region size for bound precision, in pixels
    pub pick_threshold: f32,
}

impl GraphConfig {
    /// Create a 3D configuration with the given viewport
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Create a 2D configuration with the given viewport
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self::new(width, height).with_dimension(Dimension::TwoD)
    }

    /// Set dimensionality
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set handedness
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    /// Set the eye projection
    pub fn with_projection(mut self, projection: ProjectionType) -> Self {
        self.projection = projection;
        self
    }

    /// Set the vertical field of view in degrees
    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view_degrees = degrees;
        self
    }

    /// Set the scene bounding sphere
    pub fn with_scene(mut self, center: [f32; 3], radius: f32) -> Self {
        self.scene_center = center;
        self.scene_radius = radius;
        self
    }

    /// Enable or disable the cached projection-view inverse
    pub fn with_inverse_caching(mut self, enabled: bool) -> Self {
        self.cache_projection_view_inverse = enabled;
        self
    }

    /// Enable or disable automatic boundary equation updates
    pub fn with_boundary_equations(mut self, enabled: bool) -> Self {
        self.boundary_equations = enabled;
        self
    }

    /// Set the initial debug overlays
    pub fn with_visual_hints(mut self, hints: VisualHintsConfig) -> Self {
        self.visual_hints = hints;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        if !(self.field_of_view_degrees > 0.0 && self.field_of_view_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be within (0, 180) degrees, got {}",
                self.field_of_view_degrees
            )));
        }

        if !(self.scene_radius.is_finite() && self.scene_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scene radius must be positive, got {}",
                self.scene_radius
            )));
        }

        if self.scene_center.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid("scene center must be finite".to_string()));
        }

        if !(self.z_clipping_coefficient > 0.0 && self.z_near_coefficient > 0.0) {
            return Err(ConfigError::Invalid(
                "clipping coefficients must be positive".to_string(),
            ));
        }

        if !(self.pick_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pick threshold must be positive, got {}",
                self.pick_threshold
            )));
        }

        Ok(())
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            dimension: Dimension::ThreeD,
            handedness: Handedness::Right,
            projection: ProjectionType::Perspective,
            field_of_view_degrees: 45.0,
            scene_radius: 100.0,
            scene_center: [0.0, 0.0, 0.0],
            cache_projection_view_inverse: false,
            boundary_equations: false,
            visual_hints: VisualHintsConfig::default(),
            z_clipping_coefficient: 3.0_f32.sqrt(),
            z_near_coefficient: 0.005,
            pick_threshold: 20.0,
        }
    }
}

impl Config for GraphConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GraphConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_viewport_rejected() {
        let config = GraphConfig::new(0, 600);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_field_of_view_range() {
        let config = GraphConfig::default().with_field_of_view(180.0);
        assert!(config.validate().is_err());

        let config = GraphConfig::default().with_field_of_view(60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_keeps_toggles() {
        let config = GraphConfig::new_2d(640, 480)
            .with_handedness(Handedness::Left)
            .with_inverse_caching(true);

        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: GraphConfig = toml::from_str(&text).expect("parse");

        assert_eq!(parsed.dimension, Dimension::TwoD);
        assert_eq!(parsed.handedness, Handedness::Left);
        assert!(parsed.cache_projection_view_inverse);
        assert_eq!(parsed.width, 640);
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join(format!("frame_graph_config_{}.json", std::process::id()));
        let path = path.to_str().expect("utf-8 temp path").to_string();
        std::fs::write(&path, "{}").expect("write temp file");

        let loaded = GraphConfig::load_from_file(&path);
        let saved = GraphConfig::default().save_to_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(loaded, Err(ConfigError::UnsupportedFormat(_))));
        assert!(matches!(saved, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("frame_graph_config_missing.toml");
        let result = GraphConfig::load_from_file(path.to_str().expect("utf-8 temp path"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
