use anyhow::bail;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::commands::{GlobeCommand, Invocation};
use crate::config::{Color, SceneConfig};
use crate::raster::{is_valid_value, Raster, RasterFile, RasterSource};
use crate::utils::encode_png;

use std::time::Instant;


const THUMBNAIL_SIZES: [u32; 4] = [128, 256, 512, 1024];

pub struct Preview {}

impl GlobeCommand for Preview {
    fn get_description(&self) -> &'static str {
        "Render a flat preview image of the raster, colored like the globe."
    }

    fn exec(&self, invocation: &Invocation) -> anyhow::Result<()> {
        let start = Instant::now();
        let output_path = invocation.output_path()?;

        if !output_path.is_dir() {
            bail!("Output path is not a directory");
        }

        let now = Instant::now();
        let source = RasterFile::new(&invocation.input_path);
        println!("▶️  Loading raster {}", source.describe());
        let raster = source.load()?;
        println!("✔️  Loaded raster in {}ms", now.elapsed().as_millis());

        let now = Instant::now();
        println!("▶️  Rendering preview image");
        let img = render_preview(&raster, &invocation.config);
        encode_png(&output_path.join("preview.png"), &img).map_err(|e| anyhow::anyhow!(e))?;
        println!("✔️  Rendered preview image in {}ms", now.elapsed().as_millis());

        let largest_side = img.width().max(img.height());
        let sizes: Vec<u32> = THUMBNAIL_SIZES.iter().copied().filter(|s| *s < largest_side).collect();

        sizes.par_iter().for_each(|size| {
            let now = Instant::now();
            println!("▶️  Building x{} image", size);

            let thumb = img.thumbnail(*size, *size);
            let thumb_path = output_path.join(format!("preview_{}.png", size));

            if let Err(e) = encode_png(&thumb_path, &thumb) {
                println!("❌  Build of x{} failed", size);
                println!("{}", e);
            } else {
                println!("✔️  Built x{} in {}ms", size, now.elapsed().as_millis())
            }
        });

        println!("\n    🎉  Finished in {}ms", start.elapsed().as_millis());

        Ok(())
    }
}

/// Flat equirectangular picture of the raster. Cells without data take the
/// ocean color, the rest ramps from ground to sky color by `sqrt(value)`.
pub fn render_preview(raster: &Raster, config: &SceneConfig) -> DynamicImage {
    let (w, h) = raster.dimensions();
    let max = raster.max_valid_value().map(|m| (m as f64).sqrt()).unwrap_or(0.0);
    let mut buffer = RgbImage::new(w as u32, h as u32);
    let ocean = to_rgb(config.ocean.color);

    for x in 0..w {
        for y in 0..h {
            let value = raster.value(x, y);
            let pixel = if !is_valid_value(value) {
                ocean
            } else {
                let t = if max > 0.0 { (value as f64).sqrt() / max } else { 0.0 };
                to_rgb(config.ground_color.lerp(config.sky_color, t as f32))
            };
            buffer.put_pixel(x as u32, y as u32, pixel);
        }
    }

    DynamicImage::ImageRgb8(buffer)
}

fn to_rgb(c: Color) -> Rgb<u8> {
    Rgb([c.0, c.1, c.2])
}
