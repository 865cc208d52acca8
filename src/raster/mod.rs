mod ascii_grid;
mod geotiff;
mod raster;

use flate2::bufread::GzDecoder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

pub use ascii_grid::AsciiGridError;
pub use raster::{is_valid_value, BoundingBox, Raster};

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("Couldn't read raster: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't decode GeoTIFF: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Couldn't parse ASCII grid: {0}")]
    AsciiGrid(#[from] AsciiGridError),

    #[error("GeoTIFF lacks a usable {0}")]
    MissingGeoreference(&'static str),

    #[error("Unsupported raster format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Expected {expected} values but got {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },

    #[error("Raster has no cells")]
    EmptyRaster,

    #[error("Bounding box {0:?} covers no area")]
    DegenerateBoundingBox(BoundingBox),
}

/// Anything a raster can be loaded from.
pub trait RasterSource {
    fn describe(&self) -> String;
    fn load(&self) -> Result<Raster, RasterError>;
}

/// A raster on disk, decoded according to its extension.
pub struct RasterFile {
    path: PathBuf,
}

impl RasterFile {
    pub fn new(path: &Path) -> Self {
        RasterFile {
            path: path.to_path_buf(),
        }
    }
}

impl RasterSource for RasterFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Raster, RasterError> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tif") || name.ends_with(".tiff") {
            let file = File::open(&self.path)?;
            geotiff::decode(BufReader::new(file))
        } else if name.ends_with(".asc.gz") {
            let file = File::open(&self.path)?;
            let mut dec = GzDecoder::new(BufReader::new(file));
            let mut s = String::new();
            dec.read_to_string(&mut s)?;
            ascii_grid::raster_from_str(&s)
        } else if name.ends_with(".asc") {
            let s = std::fs::read_to_string(&self.path)?;
            ascii_grid::raster_from_str(&s)
        } else {
            Err(RasterError::UnsupportedFormat(self.path.clone()))
        }
    }
}

/// A raster that is already in memory.
#[cfg(test)]
pub struct InMemoryRaster(pub Raster);

#[cfg(test)]
impl RasterSource for InMemoryRaster {
    fn describe(&self) -> String {
        let (w, h) = self.0.dimensions();
        format!("in-memory {}x{} raster", w, h)
    }

    fn load(&self) -> Result<Raster, RasterError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
#[allow(unused_must_use)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::{RasterError, RasterFile, RasterSource};
    use crate::test::with_input_and_output_paths;

    const GRID: &str = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n3 4\n";

    #[test]
    fn loads_plain_ascii_grid() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("density.asc");
            std::fs::write(&path, GRID).unwrap();

            let raster = RasterFile::new(&path).load().unwrap();
            assert_eq!(raster.dimensions(), (2, 2));
        });
    }

    #[test]
    fn loads_gzipped_ascii_grid() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("density.ASC.gz");
            let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
            enc.write_all(GRID.as_bytes()).unwrap();
            enc.finish().unwrap();

            let raster = RasterFile::new(&path).load().unwrap();
            assert_eq!(raster.value(1, 1), 4.0);
        });
    }

    #[test]
    fn bails_on_unknown_extension_and_missing_file() {
        with_input_and_output_paths(|input_path, _| {
            let png = input_path.join("density.png");
            std::fs::write(&png, "foo").unwrap();
            assert!(matches!(RasterFile::new(&png).load(), Err(RasterError::UnsupportedFormat(_))));

            let missing = input_path.join("missing.tif");
            assert!(matches!(RasterFile::new(&missing).load(), Err(RasterError::Io(_))));
        });
    }
}
