use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{line_ending, space0, space1, u32 as u32_parser},
    combinator::{eof, map},
    error::ParseError,
    multi::separated_list0,
    number::complete::{double, float},
    sequence::{pair, preceded, terminated},
    IResult,
};

use super::{BoundingBox, Raster};

#[derive(thiserror::Error, Debug)]
pub enum AsciiGridError {
    #[error("Missing NCOLS-Header")]
    MissingNColsHeader,

    #[error("Missing NROWS-Header")]
    MissingNRowsHeader,

    #[error("Missing CELLSIZE-Header")]
    MissingCellSizeHeader,

    #[error("Expected either XLLCENTER- & YLLCENTER-Header or XLLCORNER- & YLLCORNER-Header")]
    MissingOrigin,

    #[error("Row {} is too short", .0)]
    RowTooShort(usize),

    #[error("One or more rows are missing")]
    MissingRow,

    #[error("CELLSIZE-Header must be > 0")]
    CellSizeInvalid,

    #[error("NOM returned an incomplete-error")]
    NomIncomplete,

    #[error("NOM returned an error: {}", .0.description())]
    Nom(nom::error::ErrorKind),
}

impl<I> ParseError<I> for AsciiGridError {
    fn from_error_kind(_: I, kind: nom::error::ErrorKind) -> Self {
        AsciiGridError::Nom(kind)
    }

    fn append(_: I, _: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<AsciiGridError> for nom::Err<AsciiGridError> {
    fn from(e: AsciiGridError) -> Self {
        nom::Err::Failure(e)
    }
}

impl From<nom::Err<AsciiGridError>> for AsciiGridError {
    fn from(e: nom::Err<AsciiGridError>) -> Self {
        match e {
            nom::Err::Incomplete(_) => Self::NomIncomplete,
            nom::Err::Error(err) => err,
            nom::Err::Failure(err) => err,
        }
    }
}

type ParseResult<'a, O> = IResult<&'a str, O, AsciiGridError>;

#[derive(Debug)]
enum Header {
    NCols(usize),
    NRows(usize),
    XLLCenter(f64),
    XLLCorner(f64),
    YLLCenter(f64),
    YLLCorner(f64),
    CellSize(f64),
    NoDataValue(f32),
}

/// Where the grid is anchored, as given by the XLL*/YLL* headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    /// Center of the lower left cell.
    Center(f64, f64),
    /// Outer lower left corner of the grid.
    Corner(f64, f64),
}

#[derive(Debug, PartialEq)]
pub struct GridHeader {
    pub columns: usize,
    pub rows: usize,
    pub origin: Origin,
    pub cell_size: f64,
    pub no_data_value: f32,
}

impl GridHeader {
    pub fn bbox(&self) -> BoundingBox {
        let (left, bottom) = match self.origin {
            Origin::Center(x, y) => (x - self.cell_size / 2.0, y - self.cell_size / 2.0),
            Origin::Corner(x, y) => (x, y),
        };

        BoundingBox::new(
            left,
            bottom,
            left + self.columns as f64 * self.cell_size,
            bottom + self.rows as f64 * self.cell_size,
        )
    }
}

/// Parser for ESRI ASCII grids (`.asc`).
#[derive(Debug)]
pub struct AsciiGridParser {}

impl AsciiGridParser {
    fn header_line<'a, O, P>(name: &'static str, value: P) -> impl FnMut(&'a str) -> ParseResult<'a, O>
    where
        P: FnMut(&'a str) -> ParseResult<'a, O>,
    {
        terminated(
            preceded(pair(tag_no_case(name), space1), value),
            pair(space0, line_ending),
        )
    }

    fn any_header_line(input: &str) -> ParseResult<Header> {
        alt((
            map(Self::header_line("NCOLS", u32_parser), |v| Header::NCols(v as usize)),
            map(Self::header_line("NROWS", u32_parser), |v| Header::NRows(v as usize)),
            map(Self::header_line("XLLCENTER", double), Header::XLLCenter),
            map(Self::header_line("XLLCORNER", double), Header::XLLCorner),
            map(Self::header_line("YLLCENTER", double), Header::YLLCenter),
            map(Self::header_line("YLLCORNER", double), Header::YLLCorner),
            map(Self::header_line("CELLSIZE", double), Header::CellSize),
            map(Self::header_line("NODATA_VALUE", float), Header::NoDataValue),
        ))(input)
    }

    fn data_line(input: &str) -> ParseResult<Vec<f32>> {
        terminated(
            preceded(space0, separated_list0(space1, float)),
            pair(space0, alt((line_ending, eof))),
        )(input)
    }

    pub fn header(mut input: &str) -> ParseResult<GridHeader> {
        let mut columns = None;
        let mut rows = None;
        let mut x_center = None;
        let mut y_center = None;
        let mut x_corner = None;
        let mut y_corner = None;
        let mut cell_size = None;
        let mut no_data_value = None;

        loop {
            match Self::any_header_line(input) {
                // not a header line, the data starts here
                Err(nom::Err::Error(_)) => break,
                Err(err) => return Err(err),
                Ok((remaining_input, header)) => {
                    input = remaining_input;

                    match header {
                        Header::NCols(val) => columns = Some(val),
                        Header::NRows(val) => rows = Some(val),
                        Header::XLLCenter(val) => x_center = Some(val),
                        Header::XLLCorner(val) => x_corner = Some(val),
                        Header::YLLCenter(val) => y_center = Some(val),
                        Header::YLLCorner(val) => y_corner = Some(val),
                        Header::CellSize(val) => cell_size = Some(val),
                        Header::NoDataValue(val) => no_data_value = Some(val),
                    }
                }
            }
        }

        let columns = columns.ok_or(AsciiGridError::MissingNColsHeader)?;
        let rows = rows.ok_or(AsciiGridError::MissingNRowsHeader)?;
        let cell_size = cell_size.ok_or(AsciiGridError::MissingCellSizeHeader)?;

        if cell_size <= 0.0 {
            return Err(AsciiGridError::CellSizeInvalid.into());
        }

        let origin = match (x_center, y_center, x_corner, y_corner) {
            (Some(x), Some(y), _, _) => Origin::Center(x, y),
            (_, _, Some(x), Some(y)) => Origin::Corner(x, y),
            _ => return Err(AsciiGridError::MissingOrigin.into()),
        };

        Ok((
            input,
            GridHeader {
                columns,
                rows,
                origin,
                cell_size,
                no_data_value: no_data_value.unwrap_or(-9999.0),
            },
        ))
    }

    /// Parses a whole grid. Cells holding the NODATA_VALUE come out as NaN.
    pub fn parse(i: &str) -> Result<(GridHeader, Vec<f32>), AsciiGridError> {
        let (mut input, header) = Self::header(i)?;

        let mut data: Vec<f32> = Vec::with_capacity(header.columns * header.rows);

        for row_index in 0..header.rows {
            if input.is_empty() {
                return Err(AsciiGridError::MissingRow);
            }

            let (remaining_input, mut row) = Self::data_line(input)?;
            input = remaining_input;

            if row.len() < header.columns {
                return Err(AsciiGridError::RowTooShort(row_index));
            }

            row.truncate(header.columns);

            data.extend(row.into_iter().map(|v| {
                if v == header.no_data_value {
                    f32::NAN
                } else {
                    v
                }
            }));
        }

        Ok((header, data))
    }
}

pub fn raster_from_str(input: &str) -> Result<Raster, super::RasterError> {
    let (header, data) = AsciiGridParser::parse(input)?;
    Raster::new(header.columns, header.rows, header.bbox(), data)
}
