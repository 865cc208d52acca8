use clap::{arg, App};

use std::time::Instant;

use crate::commands::{GlobeCommand, Invocation};
use crate::pipeline::GlobeLoader;
use crate::raster::{RasterFile, RasterSource};
use crate::scenejson::SceneWriter;

#[cfg(test)]
#[allow(unused_must_use)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::commands::{Build, ClapCommand};
    use crate::config::SerdeConfigParser;
    use crate::scenejson::{INDICES_FILE, POSITIONS_FILE, SCENE_JSON_FILE};
    use crate::test::with_input_and_output_paths;

    const GRID: &str = "ncols 4\n\
        nrows 4\n\
        xllcorner -10\n\
        yllcorner -10\n\
        cellsize 5\n\
        NODATA_value -9999\n\
        100 100 100 100\n\
        100 -1 100 100\n\
        100 100 -9999 100\n\
        100 100 100 100\n";

    fn run(input_path: &Path, output_path: &Path, extra: &[&str]) -> anyhow::Result<()> {
        let cmd = ClapCommand::new("build", Box::new(Build {}), Box::new(SerdeConfigParser {}));
        let mut args: Vec<String> = vec![
            "build".to_string(),
            "-i".to_string(),
            input_path.to_str().unwrap().to_string(),
            "-o".to_string(),
            output_path.to_str().unwrap().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));

        let matches = cmd.register().try_get_matches_from(args)?;
        cmd.run(&matches)
    }

    fn write_grid(input_path: &Path) -> PathBuf {
        let path = input_path.join("density.asc");
        std::fs::write(&path, GRID).unwrap();
        path
    }

    #[test]
    fn builds_scene_from_ascii_grid() {
        with_input_and_output_paths(|input_path, output_path| {
            let grid = write_grid(&input_path);

            assert!(run(&grid, &output_path, &["--stride", "2"]).is_ok());

            let positions = std::fs::read(output_path.join(POSITIONS_FILE)).unwrap();
            assert_eq!(positions.len(), 72 * 4);
            assert!(output_path.join(INDICES_FILE).is_file());
            assert!(output_path.join(SCENE_JSON_FILE).is_file());
        });
    }

    #[test]
    fn expanded_flag_drops_the_index_buffer() {
        with_input_and_output_paths(|input_path, output_path| {
            let grid = write_grid(&input_path);

            assert!(run(&grid, &output_path, &["--stride", "2", "--expanded"]).is_ok());

            let positions = std::fs::read(output_path.join(POSITIONS_FILE)).unwrap();
            assert_eq!(positions.len(), 3 * 36 * 3 * 4);
            assert!(!output_path.join(INDICES_FILE).exists());
        });
    }

    #[test]
    fn bails_on_undecodable_raster_and_writes_nothing() {
        with_input_and_output_paths(|input_path, output_path| {
            let path = input_path.join("density.tif");
            std::fs::write(&path, "foo").unwrap();

            assert!(run(&path, &output_path, &[]).is_err());
            assert_eq!(output_path.read_dir().unwrap().count(), 0);
        });
    }
}

pub struct Build {}

impl GlobeCommand for Build {
    fn get_description(&self) -> &'static str {
        "Build the globe column mesh from a density raster."
    }

    fn register_args(&self, app: App<'static>) -> App<'static> {
        app.arg(arg!(--expanded "Write one vertex per triangle corner instead of an index buffer"))
    }

    fn exec(&self, invocation: &Invocation) -> anyhow::Result<()> {
        let start = Instant::now();
        let output_path = invocation.output_path()?;
        let config = &invocation.config;

        let source = RasterFile::new(&invocation.input_path);
        let name = invocation
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "globe".to_string());
        let mut writer = SceneWriter::new(output_path, &name, invocation.args.is_present("expanded"));

        let mut loader = GlobeLoader::new(config.clone());
        loader.start()?;

        let now = Instant::now();
        println!("▶️  Loading raster {}", source.describe());
        let raster = loader.load(&source)?;
        let (width, height) = raster.dimensions();
        println!("✔️  Loaded {}x{} raster in {}ms", width, height, now.elapsed().as_millis());

        let now = Instant::now();
        println!("▶️  Building columns (stride {})", config.stride);
        let scene = loader.build(&raster)?;
        drop(raster);
        println!(
            "✔️  Built {} columns in {}ms",
            scene.stats.columns,
            now.elapsed().as_millis()
        );
        if let Some(max) = scene.stats.max_value {
            println!("ℹ️  Max value is {}", max);
        }
        println!("ℹ️  Skipped {} of {} sampled cells", scene.stats.skipped, scene.stats.sampled);

        let now = Instant::now();
        println!("▶️  Writing scene");
        loader.attach(scene, &mut writer)?;
        println!("✔️  Wrote scene in {}ms", now.elapsed().as_millis());

        println!("\n    🎉  Finished in {}ms", start.elapsed().as_millis());

        Ok(())
    }
}
