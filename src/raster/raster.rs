use serde::Serialize;

use super::RasterError;

/// Geographic rectangle covered by a raster, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub min_latitude: f64,
    pub max_longitude: f64,
    pub max_latitude: f64,
}

impl BoundingBox {
    pub fn new(min_longitude: f64, min_latitude: f64, max_longitude: f64, max_latitude: f64) -> Self {
        BoundingBox {
            min_longitude,
            min_latitude,
            max_longitude,
            max_latitude,
        }
    }

    pub fn longitude_span(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    pub fn latitude_span(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }
}

/// A single band of scalar samples over a geographic bounding box.
///
/// Values are stored row-major, row 0 being the northern edge. A value that
/// is NaN or negative means "no data" for that cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    bbox: BoundingBox,
    values: Vec<f32>,
}

impl Raster {
    pub fn new(width: usize, height: usize, bbox: BoundingBox, values: Vec<f32>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyRaster);
        }

        if values.len() != width * height {
            return Err(RasterError::ValueCountMismatch {
                expected: width * height,
                actual: values.len(),
            });
        }

        if !(bbox.longitude_span() > 0.0) || !(bbox.latitude_span() > 0.0) {
            return Err(RasterError::DegenerateBoundingBox(bbox));
        }

        Ok(Raster {
            width,
            height,
            bbox,
            values,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.values[col + row * self.width]
    }

    /// Degrees of longitude covered by one column.
    pub fn longitude_factor(&self) -> f64 {
        self.bbox.longitude_span() / self.width as f64
    }

    /// Degrees of latitude covered by one row.
    pub fn latitude_factor(&self) -> f64 {
        self.bbox.latitude_span() / self.height as f64
    }

    pub fn longitude(&self, col: usize) -> f64 {
        self.bbox.min_longitude + col as f64 * self.longitude_factor()
    }

    pub fn latitude(&self, row: usize) -> f64 {
        self.bbox.max_latitude - row as f64 * self.latitude_factor()
    }

    /// Largest value carried by a cell that holds data, if any does.
    pub fn max_valid_value(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|v| is_valid_value(*v))
            .fold(None, |max, v| match max {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    pub fn valid_cell_count(&self) -> usize {
        self.values.iter().filter(|v| is_valid_value(**v)).count()
    }
}

pub fn is_valid_value(value: f32) -> bool {
    !value.is_nan() && value >= 0.0
}
