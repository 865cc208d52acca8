use crate::commands::{GlobeCommand, Invocation};
use crate::globe::scan_stats;
use crate::raster::{RasterFile, RasterSource};

pub struct Info {}

impl GlobeCommand for Info {
    fn get_description(&self) -> &'static str {
        "Print dimensions, bounds and value range of a raster."
    }

    fn needs_output(&self) -> bool {
        false
    }

    fn exec(&self, invocation: &Invocation) -> anyhow::Result<()> {
        let raster = RasterFile::new(&invocation.input_path).load()?;
        let (width, height) = raster.dimensions();
        let bbox = raster.bbox();

        println!("ℹ️  Size: {}x{}", width, height);
        println!(
            "ℹ️  Bounds: lon {} .. {}, lat {} .. {}",
            bbox.min_longitude, bbox.max_longitude, bbox.min_latitude, bbox.max_latitude
        );
        println!("ℹ️  Cells with data: {} of {}", raster.valid_cell_count(), width * height);
        match raster.max_valid_value() {
            Some(max) => println!("ℹ️  Max value: {}", max),
            None => println!("ℹ️  No cell holds data"),
        }
        println!(
            "ℹ️  Columns at stride {}: {}",
            invocation.config.stride,
            scan_stats(&raster, invocation.config.stride).columns
        );

        Ok(())
    }
}
