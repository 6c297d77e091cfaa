//! Builder patterns for creating test requests programmatically.

#![allow(dead_code)]

use terraforge::params::ControlPoint;
use terraforge::service::{RoadRequest, TerrainRequest};

/// Builder for `TerrainRequest` instances.
pub struct TerrainRequestBuilder {
    description: String,
    use_ai: bool,
    scale: Option<f64>,
    roughness: Option<f64>,
}

impl TerrainRequestBuilder {
    pub fn new() -> Self {
        Self {
            description: String::new(),
            use_ai: false,
            scale: Some(20.0),
            roughness: Some(0.7),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn use_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = use_ai;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn roughness(mut self, roughness: f64) -> Self {
        self.roughness = Some(roughness);
        self
    }

    pub fn build(self) -> TerrainRequest {
        TerrainRequest {
            description: self.description,
            use_ai: self.use_ai,
            scale: self.scale,
            roughness: self.roughness,
        }
    }
}

/// Builder for `RoadRequest` instances.
pub struct RoadRequestBuilder {
    terrain_id: String,
    control_points: Vec<ControlPoint>,
    width: Option<f64>,
    simplify: bool,
}

impl RoadRequestBuilder {
    pub fn new(terrain_id: &str) -> Self {
        Self {
            terrain_id: terrain_id.to_string(),
            control_points: vec![
                ControlPoint::new(10.0, 10.0),
                ControlPoint::new(50.0, 40.0),
                ControlPoint::new(90.0, 80.0),
            ],
            width: None,
            simplify: false,
        }
    }

    pub fn points(mut self, points: Vec<ControlPoint>) -> Self {
        self.control_points = points;
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    pub fn build(self) -> RoadRequest {
        RoadRequest {
            terrain_id: self.terrain_id,
            control_points: self.control_points,
            width: self.width,
            simplify: self.simplify,
        }
    }
}
