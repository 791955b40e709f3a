//! Cell type tags carried in the `cell_types` stream.

/// Common cell types for mesh elements, numbered the way visualization tools
/// expect them on disk.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum CellType {
    /// 0D vertex.
    Vertex = 1,
    /// Set of unconnected vertices.
    PolyVertex = 2,
    /// 1D segment.
    Line = 3,
    /// Connected run of segments.
    PolyLine = 4,
    /// 2D simplex.
    Triangle = 5,
    /// Strip of triangles sharing edges.
    TriangleStrip = 6,
    /// 2D polygon with any number of vertices.
    Polygon = 7,
    /// Axis-aligned quad.
    Pixel = 8,
    /// 2D tensor-product cell.
    Quad = 9,
    /// 3D simplex.
    Tetra = 10,
    /// Axis-aligned hexahedron.
    Voxel = 11,
    /// 3D tensor-product cell.
    Hexahedron = 12,
    /// 3D wedge/prism.
    Wedge = 13,
    /// 3D pyramid.
    Pyramid = 14,
}

impl CellType {
    /// The byte stored on the wire.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => CellType::Vertex,
            2 => CellType::PolyVertex,
            3 => CellType::Line,
            4 => CellType::PolyLine,
            5 => CellType::Triangle,
            6 => CellType::TriangleStrip,
            7 => CellType::Polygon,
            8 => CellType::Pixel,
            9 => CellType::Quad,
            10 => CellType::Tetra,
            11 => CellType::Voxel,
            12 => CellType::Hexahedron,
            13 => CellType::Wedge,
            14 => CellType::Pyramid,
            _ => return None,
        })
    }

    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Vertex | CellType::PolyVertex => 0,
            CellType::Line | CellType::PolyLine => 1,
            CellType::Triangle
            | CellType::TriangleStrip
            | CellType::Polygon
            | CellType::Pixel
            | CellType::Quad => 2,
            CellType::Tetra
            | CellType::Voxel
            | CellType::Hexahedron
            | CellType::Wedge
            | CellType::Pyramid => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for tag in 1..=14u8 {
            assert_eq!(CellType::from_tag(tag).map(CellType::tag), Some(tag));
        }
        assert_eq!(CellType::from_tag(0), None);
        assert_eq!(CellType::from_tag(42), None);
    }

    #[test]
    fn dimensions() {
        assert_eq!(CellType::Vertex.dimension(), 0);
        assert_eq!(CellType::TriangleStrip.dimension(), 2);
        assert_eq!(CellType::Hexahedron.dimension(), 3);
    }
}
