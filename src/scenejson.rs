use serde::Serialize;

use std::path::{Path, PathBuf};

use serde_json::to_string_pretty;

use crate::config::SceneConfig;
use crate::globe::{ScanStats, INDICES_PER_COLUMN, VERTICES_PER_COLUMN};
use crate::pipeline::{Scene, SceneSink};
use crate::raster::BoundingBox;
use crate::utils::{write_f32_le, write_u32_le};

pub const POSITIONS_FILE: &str = "positions.bin";
pub const INDICES_FILE: &str = "indices.bin";
pub const SCENE_JSON_FILE: &str = "scene.json";

/// Inputs of the radial color ramp shader.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShaderUniforms {
    pub ground_radius: f64,
    pub ground_color: [f32; 3],
    pub sky_color: [f32; 3],
}

/// Sphere drawn under the columns.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OceanSphere {
    pub radius: f64,
    pub color: [f32; 3],
    pub width_segments: u32,
    pub height_segments: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Point,
    Ambient,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
}

impl Light {
    fn lights_for(config: &SceneConfig) -> Vec<Light> {
        let lighting = &config.lighting;
        let point = |y: f64| Light {
            kind: LightKind::Point,
            color: lighting.point_color.to_unit(),
            intensity: lighting.point_intensity,
            distance: Some(lighting.point_distance),
            position: Some([0.0, y, 0.0]),
        };

        vec![
            point(lighting.point_height),
            point(-lighting.point_height),
            Light {
                kind: LightKind::Ambient,
                color: lighting.ambient_color.to_unit(),
                intensity: 1.0,
                distance: None,
                position: None,
            },
        ]
    }
}

/// Perspective camera plus the orbit limits around `target`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub min_distance: f64,
    pub max_distance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferRef {
    pub uri: String,
    pub component_type: String,
    pub count: usize,
}

/// Manifest describing the buffers written next to it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneJSON {
    pub name: String,
    pub description: String,
    pub raster_width: usize,
    pub raster_height: usize,
    pub bbox: BoundingBox,
    pub stride: usize,
    pub height_scale: f64,
    pub column_count: usize,
    pub vertices_per_column: usize,
    /// `true` if `positions` holds one vertex per triangle corner and there is no index buffer.
    pub expanded: bool,
    pub positions: BufferRef,
    pub indices: Option<BufferRef>,
    pub uniforms: ShaderUniforms,
    pub clear_color: [f32; 3],
    pub ocean: OceanSphere,
    pub lights: Vec<Light>,
    pub camera: Camera,
    pub stats: ScanStats,
}

impl SceneJSON {
    pub fn new(scene: &Scene, name: &str, expanded: bool) -> Self {
        let buffers = &scene.buffers;
        let config = &scene.config;
        let (positions_count, indices) = if expanded {
            (buffers.indices.len() * 3, None)
        } else {
            (
                buffers.positions.len(),
                Some(BufferRef {
                    uri: INDICES_FILE.to_string(),
                    component_type: "u32".to_string(),
                    count: buffers.indices.len(),
                }),
            )
        };

        SceneJSON {
            name: name.to_string(),
            description: format!(
                "{} columns sampled every {} cells from a {}x{} raster",
                buffers.column_count(),
                scene.config.stride,
                scene.raster_size.0,
                scene.raster_size.1
            ),
            raster_width: scene.raster_size.0,
            raster_height: scene.raster_size.1,
            bbox: scene.bbox,
            stride: scene.config.stride,
            height_scale: scene.config.height_scale,
            column_count: buffers.column_count(),
            vertices_per_column: if expanded { INDICES_PER_COLUMN } else { VERTICES_PER_COLUMN },
            expanded,
            positions: BufferRef {
                uri: POSITIONS_FILE.to_string(),
                component_type: "f32".to_string(),
                count: positions_count,
            },
            indices,
            uniforms: ShaderUniforms {
                ground_radius: config.radius,
                ground_color: config.ground_color.to_unit(),
                sky_color: config.sky_color.to_unit(),
            },
            clear_color: config.clear_color.to_unit(),
            ocean: OceanSphere {
                radius: config.radius,
                color: config.ocean.color.to_unit(),
                width_segments: config.ocean.width_segments,
                height_segments: config.ocean.height_segments,
            },
            lights: Light::lights_for(config),
            camera: Camera {
                fov: config.camera.fov,
                near: config.camera.near,
                far: config.camera.far,
                position: [0.0, 0.0, config.camera.distance],
                target: [0.0, 0.0, 0.0],
                min_distance: config.camera.min_distance,
                max_distance: config.camera.max_distance,
            },
            stats: scene.stats,
        }
    }
}

/// Writes the scene into a directory as binary buffers plus `scene.json`.
///
/// Every file is written under a temporary name first and only renamed into
/// place once all of them were written, so a failed write leaves the output
/// of an earlier build untouched.
pub struct SceneWriter {
    pub dir: PathBuf,
    pub name: String,
    pub expanded: bool,
}

impl SceneWriter {
    pub fn new(dir: &Path, name: &str, expanded: bool) -> Self {
        SceneWriter {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            expanded,
        }
    }

    fn staging_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!(".{}.partial", file_name))
    }

    /// Writes all files to their staging paths, recording each before it is written.
    fn write_staged(&self, scene: &Scene, staged: &mut Vec<(PathBuf, PathBuf)>) -> anyhow::Result<()> {
        let mut stage = |file_name: &str| {
            let paths = (self.staging_path(file_name), self.dir.join(file_name));
            staged.push(paths.clone());
            paths.0
        };

        if self.expanded {
            write_f32_le(&stage(POSITIONS_FILE), &scene.buffers.expanded_positions())?;
        } else {
            write_f32_le(&stage(POSITIONS_FILE), &scene.buffers.positions)?;
            write_u32_le(&stage(INDICES_FILE), &scene.buffers.indices)?;
        }

        let scene_json = SceneJSON::new(scene, &self.name, self.expanded);
        std::fs::write(stage(SCENE_JSON_FILE), to_string_pretty(&scene_json)?)?;

        Ok(())
    }
}

impl SceneSink for SceneWriter {
    fn attach(&mut self, scene: &Scene) -> anyhow::Result<()> {
        let mut staged = Vec::new();

        if let Err(e) = self.write_staged(scene, &mut staged) {
            for (partial, _) in staged.iter() {
                if let Err(cleanup) = std::fs::remove_file(partial) {
                    tracing::debug!(path = %partial.display(), error = %cleanup, "couldn't remove partial file");
                }
            }
            return Err(e);
        }

        for (partial, target) in staged.iter() {
            std::fs::rename(partial, target)?;
        }

        let indices_path = self.dir.join(INDICES_FILE);
        if self.expanded && indices_path.is_file() {
            std::fs::remove_file(&indices_path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(unused_must_use)]
mod tests {
    use super::{SceneWriter, INDICES_FILE, POSITIONS_FILE, SCENE_JSON_FILE};
    use crate::config::SceneConfig;
    use crate::pipeline::{GlobeLoader, SceneSink};
    use crate::raster::{BoundingBox, InMemoryRaster, Raster};
    use crate::test::with_input_and_output_paths;

    fn scene() -> crate::pipeline::Scene {
        let raster = Raster::new(2, 2, BoundingBox::new(0.0, 0.0, 2.0, 2.0), vec![4.0, f32::NAN, 9.0, 1.0]).unwrap();
        let mut loader = GlobeLoader::new(SceneConfig {
            stride: 1,
            ..SceneConfig::default()
        });
        struct Noop {}
        impl SceneSink for Noop {
            fn attach(&mut self, _: &crate::pipeline::Scene) -> anyhow::Result<()> {
                Ok(())
            }
        }
        loader.run(&InMemoryRaster(raster), &mut Noop {}).unwrap()
    }

    #[test]
    fn writes_indexed_buffers_and_manifest() {
        with_input_and_output_paths(|_, output_path| {
            let mut writer = SceneWriter::new(&output_path, "density", false);
            writer.attach(&scene()).unwrap();

            let positions = std::fs::read(output_path.join(POSITIONS_FILE)).unwrap();
            let indices = std::fs::read(output_path.join(INDICES_FILE)).unwrap();
            assert_eq!(positions.len(), 3 * 8 * 3 * 4);
            assert_eq!(indices.len(), 3 * 36 * 4);

            let json: serde_json::Value =
                serde_json::from_slice(&std::fs::read(output_path.join(SCENE_JSON_FILE)).unwrap()).unwrap();
            assert_eq!(json["columnCount"], 3);
            assert_eq!(json["indices"]["count"], 108);
            assert_eq!(json["stats"]["maxValue"], 9.0);
            assert_eq!(json["uniforms"]["groundRadius"], 6.0);
            assert_eq!(json["bbox"]["maxLatitude"], 2.0);
        });
    }

    #[test]
    fn manifest_carries_ocean_lights_and_camera() {
        with_input_and_output_paths(|_, output_path| {
            let mut writer = SceneWriter::new(&output_path, "density", false);
            writer.attach(&scene()).unwrap();

            let json: serde_json::Value =
                serde_json::from_slice(&std::fs::read(output_path.join(SCENE_JSON_FILE)).unwrap()).unwrap();

            assert_eq!(json["clearColor"], serde_json::json!([0.0, 0.0, 0.0]));

            assert_eq!(json["ocean"]["radius"], 6.0);
            assert_eq!(json["ocean"]["widthSegments"], 360);
            assert_eq!(json["ocean"]["heightSegments"], 180);
            assert_eq!(json["ocean"]["color"][2], 1.0);

            let lights = json["lights"].as_array().unwrap();
            assert_eq!(lights.len(), 3);
            assert_eq!(lights[0]["kind"], "point");
            assert_eq!(lights[0]["position"], serde_json::json!([0.0, 15.0, 0.0]));
            assert_eq!(lights[1]["position"], serde_json::json!([0.0, -15.0, 0.0]));
            assert_eq!(lights[0]["distance"], 100.0);
            assert_eq!(lights[2]["kind"], "ambient");
            assert!(lights[2].get("position").is_none());

            assert_eq!(json["camera"]["fov"], 75.0);
            assert_eq!(json["camera"]["near"], 0.1);
            assert_eq!(json["camera"]["far"], 1000.0);
            assert_eq!(json["camera"]["position"], serde_json::json!([0.0, 0.0, 20.0]));
            assert_eq!(json["camera"]["minDistance"], 9.0);
            assert_eq!(json["camera"]["maxDistance"], 20.0);
        });
    }

    #[test]
    fn failed_write_keeps_the_previous_scene() {
        with_input_and_output_paths(|_, output_path| {
            let mut writer = SceneWriter::new(&output_path, "density", false);
            writer.attach(&scene()).unwrap();

            let read = |name: &str| std::fs::read(output_path.join(name)).unwrap();
            let before = (read(POSITIONS_FILE), read(INDICES_FILE), read(SCENE_JSON_FILE));

            // a directory in the way makes the manifest write fail after both buffers
            std::fs::create_dir(output_path.join(".scene.json.partial")).unwrap();
            let mut expanded = SceneWriter::new(&output_path, "density", true);
            assert!(expanded.attach(&scene()).is_err());

            assert_eq!(before, (read(POSITIONS_FILE), read(INDICES_FILE), read(SCENE_JSON_FILE)));
            assert!(!output_path.join(".positions.bin.partial").exists());

            std::fs::remove_dir(output_path.join(".scene.json.partial")).unwrap();
            assert!(expanded.attach(&scene()).is_ok());
            assert_ne!(before.0, read(POSITIONS_FILE));
            assert!(!output_path.join(INDICES_FILE).exists());
        });
    }

    #[test]
    fn writes_expanded_buffer_without_indices() {
        with_input_and_output_paths(|_, output_path| {
            let mut writer = SceneWriter::new(&output_path, "density", true);
            writer.attach(&scene()).unwrap();

            let positions = std::fs::read(output_path.join(POSITIONS_FILE)).unwrap();
            assert_eq!(positions.len(), 3 * 36 * 3 * 4);
            assert!(!output_path.join(INDICES_FILE).exists());

            let json: serde_json::Value =
                serde_json::from_slice(&std::fs::read(output_path.join(SCENE_JSON_FILE)).unwrap()).unwrap();
            assert_eq!(json["expanded"], true);
            assert!(json["indices"].is_null());
        });
    }
}
