use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't find config file {0}")]
    NotFound(String),

    #[error("Couldn't read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("{0} must be greater than {1}")]
    NotGreater(&'static str, &'static str),

    #[error("{0} must be within {1} ..= {2}")]
    OutOfRange(&'static str, f64, f64),
}

/// An sRGB color, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Channels scaled to 0..1, the way shaders expect them.
    pub fn to_unit(self) -> [f32; 3] {
        [self.0 as f32 / 255.0, self.1 as f32 / 255.0, self.2 as f32 / 255.0]
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.strip_prefix('#').unwrap_or(&value);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConfigError::InvalidColor(value));
        }

        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| ConfigError::InvalidColor(value.clone()));

        Ok(Color(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

pub const DEFAULT_RADIUS: f64 = 6.0;
pub const DEFAULT_HEIGHT_SCALE: f64 = 500.0;
pub const DEFAULT_STRIDE: usize = 3;
pub const DEFAULT_GROUND_COLOR: Color = Color(0x6B, 0x8E, 0x23);
pub const DEFAULT_SKY_COLOR: Color = Color(0x00, 0xFF, 0x00);
pub const DEFAULT_OCEAN_COLOR: Color = Color(0x1E, 0x90, 0xFF);
pub const DEFAULT_CLEAR_COLOR: Color = Color(0x00, 0x00, 0x00);

/// The sphere under the columns. Its radius is the scene radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OceanConfig {
    pub color: Color,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for OceanConfig {
    fn default() -> Self {
        OceanConfig {
            color: DEFAULT_OCEAN_COLOR,
            width_segments: 360,
            height_segments: 180,
        }
    }
}

/// Two point lights mirrored above and below the equator plus an ambient term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightingConfig {
    pub point_color: Color,
    pub point_intensity: f64,
    /// Range of the point lights, 0 for unlimited.
    pub point_distance: f64,
    /// The lights sit at `(0, ±point_height, 0)`.
    pub point_height: f64,
    pub ambient_color: Color,
}

impl Default for LightingConfig {
    fn default() -> Self {
        LightingConfig {
            point_color: Color(0x40, 0x40, 0x40),
            point_intensity: 1.0,
            point_distance: 100.0,
            point_height: 15.0,
            ambient_color: Color(0x80, 0x80, 0x80),
        }
    }
}

/// Perspective camera looking at the origin from `+z`, orbiting within
/// `min_distance..=max_distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            distance: 20.0,
            min_distance: 9.0,
            max_distance: 20.0,
        }
    }
}

/// Tunables of the globe scene.
///
/// Heights are `sqrt(value) / height_scale` and are not normalized against
/// the data, so a raster with a very different value range needs another
/// `height_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneConfig {
    /// Radius of the base sphere the columns stand on.
    pub radius: f64,
    pub height_scale: f64,
    /// Only every `stride`-th raster column and row is turned into geometry.
    pub stride: usize,
    /// Color at the base sphere.
    pub ground_color: Color,
    /// Color one unit above the base sphere.
    pub sky_color: Color,
    pub clear_color: Color,
    pub ocean: OceanConfig,
    pub lighting: LightingConfig,
    pub camera: CameraConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            radius: DEFAULT_RADIUS,
            height_scale: DEFAULT_HEIGHT_SCALE,
            stride: DEFAULT_STRIDE,
            ground_color: DEFAULT_GROUND_COLOR,
            sky_color: DEFAULT_SKY_COLOR,
            clear_color: DEFAULT_CLEAR_COLOR,
            ocean: OceanConfig::default(),
            lighting: LightingConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius > 0.0) {
            return Err(ConfigError::NotPositive("radius"));
        }
        if !(self.height_scale > 0.0) {
            return Err(ConfigError::NotPositive("heightScale"));
        }
        if self.stride == 0 {
            return Err(ConfigError::NotPositive("stride"));
        }
        if self.ocean.width_segments < 3 {
            return Err(ConfigError::NotGreater("ocean.widthSegments", "2"));
        }
        if self.ocean.height_segments < 2 {
            return Err(ConfigError::NotGreater("ocean.heightSegments", "1"));
        }
        if !(self.lighting.point_intensity >= 0.0) {
            return Err(ConfigError::OutOfRange("lighting.pointIntensity", 0.0, f64::INFINITY));
        }
        if !(self.lighting.point_distance >= 0.0) {
            return Err(ConfigError::OutOfRange("lighting.pointDistance", 0.0, f64::INFINITY));
        }

        let camera = &self.camera;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::OutOfRange("camera.fov", 0.0, 180.0));
        }
        if !(camera.near > 0.0) {
            return Err(ConfigError::NotPositive("camera.near"));
        }
        if !(camera.far > camera.near) {
            return Err(ConfigError::NotGreater("camera.far", "camera.near"));
        }
        if !(camera.min_distance > 0.0) {
            return Err(ConfigError::NotPositive("camera.minDistance"));
        }
        if !(camera.max_distance > camera.min_distance) {
            return Err(ConfigError::NotGreater("camera.maxDistance", "camera.minDistance"));
        }
        if !(camera.distance >= camera.min_distance && camera.distance <= camera.max_distance) {
            return Err(ConfigError::OutOfRange("camera.distance", camera.min_distance, camera.max_distance));
        }
        Ok(())
    }
}

pub trait ConfigParser {
    fn parse(&self, path: &Path) -> Result<SceneConfig, ConfigError>;
}

pub struct SerdeConfigParser {}

impl ConfigParser for SerdeConfigParser {
    fn parse(&self, path: &Path) -> Result<SceneConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: SceneConfig = serde_json::from_reader(reader)?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
pub struct DummyConfigParser {
    pub succeeds: bool,
}

#[cfg(test)]
impl ConfigParser for DummyConfigParser {
    fn parse(&self, path: &Path) -> Result<SceneConfig, ConfigError> {
        if self.succeeds {
            Ok(SceneConfig {
                stride: 1,
                ..SceneConfig::default()
            })
        } else {
            Err(ConfigError::NotFound(path.display().to_string()))
        }
    }
}
