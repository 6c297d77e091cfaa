use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::AnalyzerConfig;
use crate::params::{Climate, NoiseType, TerrainParameters};

/// Errors that can occur during description analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Environment variable '{0}' not set")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis endpoint returned status {0}")]
    Status(u16),

    #[error("Analysis response contained no text content")]
    EmptyResponse,

    #[error("Failed to parse analysis response: {0}")]
    ResponseParse(String),

    #[error("Analyzer disabled in configuration")]
    Disabled,
}

/// Seam for substituting a fake analyzer in tests.
pub trait DescriptionAnalyzer: Send + Sync {
    fn analyze(&self, description: &str) -> Result<TerrainParameters, AnalyzerError>;
}

/// Analyzer used when analysis is switched off in configuration. Always
/// fails, which routes every request through the default-parameter
/// fallback.
pub struct DisabledAnalyzer;

impl DescriptionAnalyzer for DisabledAnalyzer {
    fn analyze(&self, _description: &str) -> Result<TerrainParameters, AnalyzerError> {
        Err(AnalyzerError::Disabled)
    }
}

/// Production analyzer calling an Anthropic-compatible messages endpoint.
pub struct ClaudeAnalyzer {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    max_tokens: u32,
}

impl ClaudeAnalyzer {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

impl DescriptionAnalyzer for ClaudeAnalyzer {
    fn analyze(&self, description: &str) -> Result<TerrainParameters, AnalyzerError> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| AnalyzerError::MissingApiKey(self.api_key_env.clone()))?;

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": build_prompt(description) }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let payload: MessagesResponse = response.json()?;
        let text = payload
            .content
            .iter()
            .find_map(|block| block.text.as_deref())
            .ok_or(AnalyzerError::EmptyResponse)?;

        parse_response(text, description)
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Raw model output: every field optional, normalized afterwards.
#[derive(Debug, Default, Deserialize)]
struct RawParameters {
    scale: Option<f64>,
    base_scale: Option<f64>,
    roughness: Option<f64>,
    base_roughness: Option<f64>,
    height_multiplier: Option<f64>,
    noise_type: Option<NoiseType>,
    noise_layers: Option<u32>,
    octaves: Option<u32>,
    peak_sharpness: Option<f64>,
    valley_depth: Option<f64>,
    erosion: Option<f64>,
    terrace_levels: Option<u32>,
    snow_height: Option<f64>,
    rock_height: Option<f64>,
    grass_height: Option<f64>,
    snow_color: Option<[f64; 3]>,
    rock_color: Option<[f64; 3]>,
    grass_color: Option<[f64; 3]>,
    climate: Option<Climate>,
    wetness: Option<f64>,
    vegetation_density: Option<f64>,
    description: Option<String>,
    features: Option<Vec<String>>,
}

/// Extracts the JSON object from model text and normalizes it into a
/// clamped parameter set. The model may wrap the object in prose.
fn parse_response(text: &str, description: &str) -> Result<TerrainParameters, AnalyzerError> {
    let json_pattern = regex::Regex::new(r"\{[\s\S]*\}").expect("static regex");
    let matched = json_pattern
        .find(text)
        .ok_or_else(|| AnalyzerError::ResponseParse("no JSON object in response".to_string()))?;

    let raw: RawParameters = serde_json::from_str(matched.as_str())
        .map_err(|e| AnalyzerError::ResponseParse(e.to_string()))?;

    Ok(normalize(raw, description))
}

/// Applies the original service's precedence and defaulting rules, then
/// clamps every ranged field.
fn normalize(raw: RawParameters, description: &str) -> TerrainParameters {
    let defaults = TerrainParameters::default();
    let base_scale = raw.base_scale.or(raw.scale).unwrap_or(defaults.base_scale);
    let base_roughness = raw
        .base_roughness
        .or(raw.roughness)
        .unwrap_or(defaults.base_roughness);

    TerrainParameters {
        scale: base_scale,
        roughness: base_roughness,
        base_scale,
        base_roughness,
        height_multiplier: raw.height_multiplier.unwrap_or(defaults.height_multiplier),
        noise_type: raw.noise_type.unwrap_or(defaults.noise_type),
        noise_layers: raw.noise_layers.unwrap_or(defaults.noise_layers),
        octaves: raw.octaves.unwrap_or(defaults.octaves),
        peak_sharpness: raw.peak_sharpness.unwrap_or(defaults.peak_sharpness),
        valley_depth: raw.valley_depth.unwrap_or(defaults.valley_depth),
        erosion: raw.erosion.unwrap_or(defaults.erosion),
        terrace_levels: raw.terrace_levels.unwrap_or(defaults.terrace_levels),
        snow_height: raw.snow_height.unwrap_or(defaults.snow_height),
        rock_height: raw.rock_height.unwrap_or(defaults.rock_height),
        grass_height: raw.grass_height.unwrap_or(defaults.grass_height),
        snow_color: raw.snow_color.unwrap_or(defaults.snow_color),
        rock_color: raw.rock_color.unwrap_or(defaults.rock_color),
        grass_color: raw.grass_color.unwrap_or(defaults.grass_color),
        climate: raw.climate.unwrap_or(defaults.climate),
        wetness: raw.wetness.unwrap_or(defaults.wetness),
        vegetation_density: raw
            .vegetation_density
            .unwrap_or(defaults.vegetation_density),
        description: raw
            .description
            .unwrap_or_else(|| description.to_string()),
        features: raw.features.unwrap_or_default(),
    }
    .clamped()
}

/// Instruction prompt for the parameter extraction call.
fn build_prompt(description: &str) -> String {
    format!(
        r#"You are an expert 3D terrain generation system. Analyze the terrain description and extract ALL parameters for procedural terrain generation.

User's terrain description: "{description}"

Respond with ONLY a JSON object (no other text, no markdown) containing:
{{
  "base_scale": <number 5-50, overall terrain size; mountains 30-40, hills 15-25, flat 5-10>,
  "base_roughness": <number 0-1, surface detail>,
  "height_multiplier": <number 5-100, max height in meters>,
  "noise_type": <"MUSGRAVE" | "PERLIN" | "VORONOI"; MUSGRAVE=complex mountains, PERLIN=smooth hills, VORONOI=sharp rocks>,
  "noise_layers": <number 1-5>,
  "octaves": <number 1-10>,
  "peak_sharpness": <number 0-1>,
  "valley_depth": <number 0-1>,
  "erosion": <number 0-1>,
  "terrace_levels": <number 0-10, step-like terraces; none=0>,
  "snow_height": <number 0-1, snow starts at this height ratio; no snow=1.0>,
  "rock_height": <number 0-1, exposed rock starts here>,
  "grass_height": <number 0-1, vegetation below this>,
  "snow_color": <[R, G, B] each 0-1>,
  "rock_color": <[R, G, B] each 0-1>,
  "grass_color": <[R, G, B] each 0-1>,
  "climate": <"arctic" | "temperate" | "desert" | "volcanic" | "alien">,
  "wetness": <number 0-1, surface reflectivity>,
  "vegetation_density": <number 0-1>,
  "description": <one-sentence summary of the terrain>
}}

Now analyze: "{description}""#
    )
}
