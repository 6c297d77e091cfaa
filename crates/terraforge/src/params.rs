//! Generation parameter types shared by the analyzer, the submission
//! service, the worker pipeline, and the record store.
//!
//! These are the structured blobs recorded on a Job for audit/replay and
//! serialized into the transient parameter file the render scripts read.
//! Field names follow the JSON contract of the scripts.

use serde::{Deserialize, Serialize};

/// Procedural noise basis used for the height field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NoiseType {
    Perlin,
    Voronoi,
    Musgrave,
}

/// Climate tag controlling material and color defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Climate {
    Arctic,
    Temperate,
    Desert,
    Volcanic,
    Alien,
}

/// Full terrain generation parameter set.
///
/// `scale` and `roughness` mirror `base_scale` and `base_roughness` for
/// older script versions that only know the two-parameter form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainParameters {
    pub scale: f64,
    pub roughness: f64,

    pub base_scale: f64,
    pub base_roughness: f64,
    pub height_multiplier: f64,

    pub noise_type: NoiseType,
    pub noise_layers: u32,
    pub octaves: u32,

    pub peak_sharpness: f64,
    pub valley_depth: f64,
    pub erosion: f64,
    pub terrace_levels: u32,

    pub snow_height: f64,
    pub rock_height: f64,
    pub grass_height: f64,

    pub snow_color: [f64; 3],
    pub rock_color: [f64; 3],
    pub grass_color: [f64; 3],

    pub climate: Climate,
    pub wetness: f64,
    pub vegetation_density: f64,

    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Default for TerrainParameters {
    fn default() -> Self {
        Self {
            scale: 20.0,
            roughness: 0.7,
            base_scale: 20.0,
            base_roughness: 0.7,
            height_multiplier: 30.0,
            noise_type: NoiseType::Musgrave,
            noise_layers: 3,
            octaves: 6,
            peak_sharpness: 0.5,
            valley_depth: 0.5,
            erosion: 0.3,
            terrace_levels: 0,
            snow_height: 0.7,
            rock_height: 0.3,
            grass_height: 0.0,
            snow_color: [0.95, 0.95, 1.0],
            rock_color: [0.3, 0.3, 0.35],
            grass_color: [0.2, 0.4, 0.1],
            climate: Climate::Temperate,
            wetness: 0.3,
            vegetation_density: 0.3,
            description: String::new(),
            features: Vec::new(),
        }
    }
}

impl TerrainParameters {
    /// Fixed fallback used when the semantic parameter service fails:
    /// defaults everywhere, the user's description carried through.
    pub fn fallback(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// Parameters for a manually specified terrain (no analyzer involved).
    pub fn manual(description: &str, scale: f64, roughness: f64) -> Self {
        Self {
            scale,
            roughness,
            base_scale: scale,
            base_roughness: roughness,
            description: description.to_string(),
            ..Self::default()
        }
        .clamped()
    }

    /// Clamps every ranged field into its documented range.
    pub fn clamped(mut self) -> Self {
        self.base_scale = self.base_scale.clamp(5.0, 50.0);
        self.base_roughness = self.base_roughness.clamp(0.0, 1.0);
        self.height_multiplier = self.height_multiplier.clamp(5.0, 100.0);
        self.noise_layers = self.noise_layers.clamp(1, 5);
        self.octaves = self.octaves.clamp(1, 10);
        self.peak_sharpness = self.peak_sharpness.clamp(0.0, 1.0);
        self.valley_depth = self.valley_depth.clamp(0.0, 1.0);
        self.erosion = self.erosion.clamp(0.0, 1.0);
        self.terrace_levels = self.terrace_levels.min(10);
        self.snow_height = self.snow_height.clamp(0.0, 1.0);
        self.rock_height = self.rock_height.clamp(0.0, 1.0);
        self.grass_height = self.grass_height.clamp(0.0, 1.0);
        self.wetness = self.wetness.clamp(0.0, 1.0);
        self.vegetation_density = self.vegetation_density.clamp(0.0, 1.0);
        self.scale = self.base_scale;
        self.roughness = self.base_roughness;
        self
    }
}

/// A single 2-D road control point in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

impl ControlPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &ControlPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Default road width in meters (single lane).
pub const DEFAULT_ROAD_WIDTH: f64 = 1.6;

fn default_width() -> f64 {
    DEFAULT_ROAD_WIDTH
}

/// Road generation parameter set. Key names follow the road script's
/// JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadParameters {
    /// Ordered control points; insertion order defines the path geometry.
    #[serde(rename = "controlPoints")]
    pub control_points: Vec<ControlPoint>,
    #[serde(default = "default_width")]
    pub width: f64,
}

impl RoadParameters {
    pub fn new(control_points: Vec<ControlPoint>, width: Option<f64>) -> Self {
        Self {
            control_points,
            width: width.unwrap_or(DEFAULT_ROAD_WIDTH),
        }
    }
}
