use image::{codecs::png::PngEncoder, DynamicImage, GenericImageView};
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;

pub fn encode_png(
    file_path: &Path,
    img: &DynamicImage,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let file = File::create(file_path)?;
    let ref mut buf = BufWriter::new(file);
    let encoder = PngEncoder::new(buf);

    let dim = img.dimensions();
    match encoder.encode(&img.to_bytes(), dim.0, dim.1, img.color()) {
        Ok(_) => Ok(()),
        Err(err) => Err(Box::new(Error::new(ErrorKind::Other, err.to_string()))),
    }
}

/// Dumps floats as a little endian byte stream, the layout of a JS `Float32Array`.
pub fn write_f32_le(file_path: &Path, values: &[f32]) -> std::io::Result<()> {
    let mut buf = BufWriter::new(File::create(file_path)?);
    for v in values {
        buf.write_all(&v.to_le_bytes())?;
    }
    buf.flush()
}

pub fn write_u32_le(file_path: &Path, values: &[u32]) -> std::io::Result<()> {
    let mut buf = BufWriter::new(File::create(file_path)?);
    for v in values {
        buf.write_all(&v.to_le_bytes())?;
    }
    buf.flush()
}
