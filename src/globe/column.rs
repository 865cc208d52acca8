use glam::DVec3;

use super::projection::to_cartesian;

pub const VERTICES_PER_COLUMN: usize = 8;
pub const INDICES_PER_COLUMN: usize = 36;

/// Triangulation of a column, counter-clockwise seen from outside.
///
/// Vertices 0..4 are the floor, 4..8 the roof, each going
/// south-west, south-east, north-east, north-west.
pub const COLUMN_INDICES: [u32; INDICES_PER_COLUMN] = [
    // floor
    0, 2, 1, 0, 3, 2,
    // roof
    4, 5, 6, 4, 6, 7,
    // south
    0, 1, 5, 0, 5, 4,
    // east
    1, 2, 6, 1, 6, 5,
    // north
    2, 3, 7, 2, 7, 6,
    // west
    3, 0, 4, 3, 4, 7,
];

/// A rectangular prism standing on the globe.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub vertices: [DVec3; VERTICES_PER_COLUMN],
}

impl Column {
    /// Vertex positions in triangle order, for renderers without index buffers.
    pub fn triangle_vertices(&self) -> impl Iterator<Item = DVec3> + '_ {
        COLUMN_INDICES.iter().map(move |&i| self.vertices[i as usize])
    }
}

/// Builds the column for one cell, its floor on the sphere of `radius` and
/// its roof `height` above it.
pub fn build_column(
    radius: f64,
    height: f64,
    min_latitude: f64,
    min_longitude: f64,
    max_latitude: f64,
    max_longitude: f64,
) -> Column {
    let corners = [
        (min_longitude, min_latitude),
        (max_longitude, min_latitude),
        (max_longitude, max_latitude),
        (min_longitude, max_latitude),
    ];

    let mut vertices = [DVec3::ZERO; VERTICES_PER_COLUMN];
    for (i, (lon, lat)) in corners.iter().enumerate() {
        vertices[i] = to_cartesian(radius, *lon, *lat);
        vertices[i + 4] = to_cartesian(radius + height, *lon, *lat);
    }

    Column { vertices }
}
