use std::io::{Read, Seek};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use super::{BoundingBox, Raster, RasterError};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GDAL_NODATA_TAG: u16 = 42113;

/// Decodes band 0 of the first image in a GeoTIFF.
///
/// The bounding box is derived from the tie point and pixel scale tags,
/// treating pixels as areas.
pub fn decode<R: Read + Seek>(reader: R) -> Result<Raster, RasterError> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let scale = read_f64_tag(&mut decoder, MODEL_PIXEL_SCALE_TAG)?.ok_or(RasterError::MissingGeoreference("ModelPixelScaleTag"))?;
    let tiepoint = read_f64_tag(&mut decoder, MODEL_TIEPOINT_TAG)?.ok_or(RasterError::MissingGeoreference("ModelTiepointTag"))?;
    let no_data = read_no_data(&mut decoder)?;

    if scale.len() < 2 {
        return Err(RasterError::MissingGeoreference("ModelPixelScaleTag"));
    }
    if tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference("ModelTiepointTag"));
    }

    let bbox = bbox_from_tiepoint(width, height, &tiepoint, &scale);

    let samples = widen(decoder.read_image()?);
    let values = first_band(samples, width * height, no_data)?;

    tracing::debug!(width, height, ?bbox, "decoded GeoTIFF");

    Raster::new(width, height, bbox, values)
}

fn read_f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>, RasterError> {
    let value = decoder.find_tag(Tag::from_u16_exhaustive(code))?;
    Ok(value.map(|v| v.into_f64_vec()).transpose()?)
}

fn read_no_data<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f32>, RasterError> {
    let value = match decoder.find_tag(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))? {
        Some(v) => v.into_string()?,
        None => return Ok(None),
    };

    let trimmed = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match trimmed.parse::<f32>() {
        Ok(v) => Ok(Some(v)),
        Err(_) => {
            tracing::warn!(value = trimmed, "ignoring unparsable GDAL_NODATA tag");
            Ok(None)
        }
    }
}

fn bbox_from_tiepoint(width: usize, height: usize, tiepoint: &[f64], scale: &[f64]) -> BoundingBox {
    let (tie_i, tie_j, tie_x, tie_y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (scale_x, scale_y) = (scale[0], scale[1]);

    let min_longitude = tie_x - tie_i * scale_x;
    let max_latitude = tie_y + tie_j * scale_y;

    BoundingBox::new(
        min_longitude,
        max_latitude - height as f64 * scale_y,
        min_longitude + width as f64 * scale_x,
        max_latitude,
    )
}

fn widen(image: DecodingResult) -> Vec<f32> {
    match image {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I16(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::U16(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I32(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::U32(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::U8(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I8(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::U64(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I64(data) => data.iter().map(|&v| v as f32).collect(),
    }
}

/// Picks band 0 out of interleaved samples and maps no-data cells to NaN.
fn first_band(samples: Vec<f32>, cells: usize, no_data: Option<f32>) -> Result<Vec<f32>, RasterError> {
    if cells == 0 || samples.len() % cells != 0 {
        return Err(RasterError::ValueCountMismatch {
            expected: cells,
            actual: samples.len(),
        });
    }

    let samples_per_pixel = samples.len() / cells;
    let values = samples
        .into_iter()
        .step_by(samples_per_pixel)
        .map(|v| match no_data {
            Some(nd) if v == nd => f32::NAN,
            _ => v,
        })
        .collect();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    use super::{bbox_from_tiepoint, decode, first_band, MODEL_PIXEL_SCALE_TAG, MODEL_TIEPOINT_TAG};
    use crate::raster::{BoundingBox, RasterError};

    fn encode(values: &[f32], width: u32, height: u32, georeferenced: bool) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf).unwrap();
            let mut image = encoder.new_image::<colortype::Gray32Float>(width, height).unwrap();
            if georeferenced {
                image
                    .encoder()
                    .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG), &[10.0f64, 5.0, 0.0][..])
                    .unwrap();
                image
                    .encoder()
                    .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG), &[0.0f64, 0.0, 0.0, -180.0, 90.0, 0.0][..])
                    .unwrap();
            }
            image.write_data(values).unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn decodes_values_and_bbox() {
        let bytes = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2, true);
        let raster = decode(Cursor::new(bytes)).unwrap();

        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(raster.value(2, 1), 6.0);
        assert_eq!(*raster.bbox(), BoundingBox::new(-180.0, 80.0, -150.0, 90.0));
    }

    #[test]
    fn bails_without_georeference() {
        let bytes = encode(&[1.0, 2.0], 2, 1, false);
        assert!(matches!(decode(Cursor::new(bytes)), Err(RasterError::MissingGeoreference(_))));
    }

    #[test]
    fn bails_on_garbage() {
        assert!(decode(Cursor::new(b"foo".to_vec())).is_err());
    }

    #[test]
    fn tiepoint_offsets_are_honoured() {
        let bbox = bbox_from_tiepoint(4, 2, &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0], &[1.0, 2.0, 0.0]);
        assert_eq!(bbox, BoundingBox::new(-1.0, -2.0, 3.0, 2.0));
    }

    #[test]
    fn first_band_deinterleaves_and_masks_no_data() {
        let values = first_band(vec![1.0, 9.0, -1.0, 9.0, 3.0, 9.0], 3, Some(-1.0)).unwrap();

        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);
    }
}
