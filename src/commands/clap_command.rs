use anyhow::{bail, Context};
use clap::{arg, App, Arg, ArgMatches};
use std::path::{Path, PathBuf};

use crate::commands::{GlobeCommand, Invocation};
use crate::config::{ConfigParser, SceneConfig};


pub struct ClapCommand {
    pub identifier: String,
    pub exec: Box<dyn GlobeCommand>,
    config_parser: Box<dyn ConfigParser>,
}

impl ClapCommand {
    pub fn new(identifier: &str, exec: Box<dyn GlobeCommand>, config_parser: Box<dyn ConfigParser>) -> Self {
        ClapCommand {
            identifier: identifier.to_string(),
            exec,
            config_parser,
        }
    }

    pub fn register(&self) -> App<'static> {
        let mut app = App::new(self.identifier.as_str())
            .about(self.exec.get_description())
            .arg(arg!(-i --input <RASTER> "Path to a GeoTIFF (.tif) or ESRI ASCII grid (.asc, .asc.gz)"))
            .arg(arg!(-c --config [CONFIG] "Path to a JSON scene config"))
            .arg(arg!(--stride [STRIDE] "Sample every n-th raster column and row"))
            .arg(arg!(--radius [RADIUS] "Radius of the base sphere"))
            .arg(
                Arg::new("height-scale")
                    .long("height-scale")
                    .takes_value(true)
                    .value_name("SCALE")
                    .help("Column height is sqrt(value) / SCALE"),
            );

        if self.exec.needs_output() {
            app = app.arg(arg!(-o --output <OUTPUT_DIR> "Path to output directory"));
        }

        self.exec.register_args(app)
    }

    pub fn run(&self, args: &ArgMatches) -> anyhow::Result<()> {
        let (input_path, output_path) = self.get_in_out_path_params(args);

        if !input_path.is_file() {
            bail!("Input path is not a file");
        }

        if let Some(output_path) = &output_path {
            if !output_path.is_dir() {
                bail!("Output path is not a directory");
            }
        }

        let config = self.resolve_config(args)?;

        self.exec.exec(&Invocation {
            input_path,
            output_path,
            config,
            args,
        })
    }

    /// Defaults, then the config file, then flags.
    pub fn resolve_config(&self, args: &ArgMatches) -> anyhow::Result<SceneConfig> {
        let mut config = match args.value_of("config") {
            Some(path) => self.config_parser.parse(Path::new(path))?,
            None => SceneConfig::default(),
        };

        if let Some(stride) = args.value_of("stride") {
            config.stride = stride.parse().with_context(|| format!("Invalid stride '{}'", stride))?;
        }
        if let Some(radius) = args.value_of("radius") {
            config.radius = radius.parse().with_context(|| format!("Invalid radius '{}'", radius))?;
        }
        if let Some(scale) = args.value_of("height-scale") {
            config.height_scale = scale.parse().with_context(|| format!("Invalid height scale '{}'", scale))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn get_in_out_path_params(&self, args: &ArgMatches) -> (PathBuf, Option<PathBuf>) {
        let input_path = args.value_of("input").map(PathBuf::from).unwrap_or_default();
        let output_path = if self.exec.needs_output() {
            args.value_of("output").map(PathBuf::from)
        } else {
            None
        };

        (input_path, output_path)
    }
}
