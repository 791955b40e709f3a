//! Geometry blocks: one contiguous sub-domain of a mesh owned by one process.
//!
//! Extents on blocks are *point* index extents `[i0, i1, j0, j1, k0, k1]`
//! (inclusive), the way structured grids are usually stored in memory.

use crate::data::array::DatasetAttributes;
use crate::data::cell_array::CellArray;
use crate::data::scalar::TypedBuffer;
use serde::{Deserialize, Serialize};

/// Closed set of geometry kinds a mesh's blocks can have.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum GeometryKind {
    /// Explicit points with arbitrary cells.
    Unstructured,
    /// Explicit points with vertex/line/polygon/strip cells.
    Polydata,
    /// Implicit points from origin and spacing.
    UniformCartesian,
    /// Implicit points from three 1-D axis coordinate arrays.
    StretchedCartesian,
    /// Explicit points on a logically Cartesian index space.
    LogicallyCartesian,
}

impl GeometryKind {
    pub const fn code(self) -> u8 {
        match self {
            GeometryKind::Unstructured => 1,
            GeometryKind::Polydata => 2,
            GeometryKind::UniformCartesian => 3,
            GeometryKind::StretchedCartesian => 4,
            GeometryKind::LogicallyCartesian => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => GeometryKind::Unstructured,
            2 => GeometryKind::Polydata,
            3 => GeometryKind::UniformCartesian,
            4 => GeometryKind::StretchedCartesian,
            5 => GeometryKind::LogicallyCartesian,
            _ => return None,
        })
    }

    /// Blocks of this kind store an explicit 3-component point array.
    pub fn has_points(self) -> bool {
        matches!(
            self,
            GeometryKind::Unstructured | GeometryKind::Polydata | GeometryKind::LogicallyCartesian
        )
    }

    /// Blocks of this kind are addressed by an index-space extent.
    pub fn has_extent(self) -> bool {
        matches!(
            self,
            GeometryKind::UniformCartesian
                | GeometryKind::StretchedCartesian
                | GeometryKind::LogicallyCartesian
        )
    }
}

/// Number of points along each axis of a point extent.
pub fn extent_dims(extent: &[i32; 6]) -> [usize; 3] {
    let axis = |lo: i32, hi: i32| (hi - lo + 1).max(0) as usize;
    [
        axis(extent[0], extent[1]),
        axis(extent[2], extent[3]),
        axis(extent[4], extent[5]),
    ]
}

/// Points spanned by a point extent.
pub fn extent_num_points(extent: &[i32; 6]) -> usize {
    extent_dims(extent).iter().product()
}

/// Cells spanned by a point extent; flat axes count as one layer.
pub fn extent_num_cells(extent: &[i32; 6]) -> usize {
    let dims = extent_dims(extent);
    if dims.contains(&0) {
        return 0;
    }
    dims.iter().map(|&n| n.saturating_sub(1).max(1)).product()
}

/// Explicit points plus arbitrary cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnstructuredGrid {
    pub points: Option<TypedBuffer>,
    pub cells: CellArray,
    /// One [`CellType`](crate::data::CellType) tag per cell.
    pub cell_types: Vec<u8>,
    pub attributes: DatasetAttributes,
}

/// Explicit points plus four ordered groups of cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyData {
    pub points: Option<TypedBuffer>,
    pub verts: CellArray,
    pub lines: CellArray,
    pub polys: CellArray,
    pub strips: CellArray,
    pub attributes: DatasetAttributes,
}

impl PolyData {
    pub fn num_cells(&self) -> usize {
        self.verts.num_cells()
            + self.lines.num_cells()
            + self.polys.num_cells()
            + self.strips.num_cells()
    }

    pub fn cell_array_size(&self) -> usize {
        self.verts.len() + self.lines.len() + self.polys.len() + self.strips.len()
    }
}

/// Implicit uniform grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub extent: [i32; 6],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub attributes: DatasetAttributes,
}

impl Default for ImageData {
    fn default() -> Self {
        Self {
            extent: [0, -1, 0, -1, 0, -1],
            origin: [0.0; 3],
            spacing: [1.0; 3],
            attributes: DatasetAttributes::default(),
        }
    }
}

/// Grid with independent, possibly stretched, axis coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RectilinearGrid {
    pub extent: [i32; 6],
    pub x_coords: Option<TypedBuffer>,
    pub y_coords: Option<TypedBuffer>,
    pub z_coords: Option<TypedBuffer>,
    pub attributes: DatasetAttributes,
}

impl Default for RectilinearGrid {
    fn default() -> Self {
        Self {
            extent: [0, -1, 0, -1, 0, -1],
            x_coords: None,
            y_coords: None,
            z_coords: None,
            attributes: DatasetAttributes::default(),
        }
    }
}

/// Logically Cartesian grid with explicit (curvilinear) points.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredGrid {
    pub extent: [i32; 6],
    pub points: Option<TypedBuffer>,
    pub attributes: DatasetAttributes,
}

impl Default for StructuredGrid {
    fn default() -> Self {
        Self {
            extent: [0, -1, 0, -1, 0, -1],
            points: None,
            attributes: DatasetAttributes::default(),
        }
    }
}

/// One typed block.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Unstructured(UnstructuredGrid),
    Polydata(PolyData),
    Image(ImageData),
    Rectilinear(RectilinearGrid),
    Structured(StructuredGrid),
}

impl Block {
    /// A block of `kind` with no geometry and no arrays.
    pub fn empty(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Unstructured => Block::Unstructured(UnstructuredGrid::default()),
            GeometryKind::Polydata => Block::Polydata(PolyData::default()),
            GeometryKind::UniformCartesian => Block::Image(ImageData::default()),
            GeometryKind::StretchedCartesian => Block::Rectilinear(RectilinearGrid::default()),
            GeometryKind::LogicallyCartesian => Block::Structured(StructuredGrid::default()),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Block::Unstructured(_) => GeometryKind::Unstructured,
            Block::Polydata(_) => GeometryKind::Polydata,
            Block::Image(_) => GeometryKind::UniformCartesian,
            Block::Rectilinear(_) => GeometryKind::StretchedCartesian,
            Block::Structured(_) => GeometryKind::LogicallyCartesian,
        }
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        match self {
            Block::Unstructured(b) => &b.attributes,
            Block::Polydata(b) => &b.attributes,
            Block::Image(b) => &b.attributes,
            Block::Rectilinear(b) => &b.attributes,
            Block::Structured(b) => &b.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut DatasetAttributes {
        match self {
            Block::Unstructured(b) => &mut b.attributes,
            Block::Polydata(b) => &mut b.attributes,
            Block::Image(b) => &mut b.attributes,
            Block::Rectilinear(b) => &mut b.attributes,
            Block::Structured(b) => &mut b.attributes,
        }
    }

    /// Explicit point coordinates, for kinds that store them.
    pub fn points(&self) -> Option<&TypedBuffer> {
        match self {
            Block::Unstructured(b) => b.points.as_ref(),
            Block::Polydata(b) => b.points.as_ref(),
            Block::Structured(b) => b.points.as_ref(),
            Block::Image(_) | Block::Rectilinear(_) => None,
        }
    }

    /// Install explicit point coordinates; returns `false` for implicit-point kinds.
    pub fn set_points(&mut self, points: TypedBuffer) -> bool {
        match self {
            Block::Unstructured(b) => b.points = Some(points),
            Block::Polydata(b) => b.points = Some(points),
            Block::Structured(b) => b.points = Some(points),
            Block::Image(_) | Block::Rectilinear(_) => return false,
        }
        true
    }

    /// Point extent, for kinds that have one.
    pub fn extent(&self) -> Option<[i32; 6]> {
        match self {
            Block::Image(b) => Some(b.extent),
            Block::Rectilinear(b) => Some(b.extent),
            Block::Structured(b) => Some(b.extent),
            Block::Unstructured(_) | Block::Polydata(_) => None,
        }
    }

    /// Set the point extent; returns `false` for kinds without one.
    pub fn set_extent(&mut self, extent: [i32; 6]) -> bool {
        match self {
            Block::Image(b) => b.extent = extent,
            Block::Rectilinear(b) => b.extent = extent,
            Block::Structured(b) => b.extent = extent,
            Block::Unstructured(_) | Block::Polydata(_) => return false,
        }
        true
    }

    pub fn num_points(&self) -> usize {
        match self {
            Block::Unstructured(b) => b.points.as_ref().map_or(0, |p| p.len() / 3),
            Block::Polydata(b) => b.points.as_ref().map_or(0, |p| p.len() / 3),
            Block::Image(b) => extent_num_points(&b.extent),
            Block::Rectilinear(b) => extent_num_points(&b.extent),
            Block::Structured(b) => extent_num_points(&b.extent),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            Block::Unstructured(b) => b.cells.num_cells(),
            Block::Polydata(b) => b.num_cells(),
            Block::Image(b) => extent_num_cells(&b.extent),
            Block::Rectilinear(b) => extent_num_cells(&b.extent),
            Block::Structured(b) => extent_num_cells(&b.extent),
        }
    }

    /// Length of the count-prefixed connectivity buffer (zero for implicit cells).
    pub fn cell_array_size(&self) -> usize {
        match self {
            Block::Unstructured(b) => b.cells.len(),
            Block::Polydata(b) => b.cell_array_size(),
            Block::Image(_) | Block::Rectilinear(_) | Block::Structured(_) => 0,
        }
    }

    /// Axis-aligned bounds `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    ///
    /// Empty geometry yields the inverted box `[MAX, MIN, ...]`.
    pub fn bounds(&self) -> [f64; 6] {
        let mut b = [f64::MAX, f64::MIN, f64::MAX, f64::MIN, f64::MAX, f64::MIN];
        let mut grow = |axis: usize, v: f64| {
            b[2 * axis] = b[2 * axis].min(v);
            b[2 * axis + 1] = b[2 * axis + 1].max(v);
        };
        match self {
            Block::Image(img) => {
                let dims = extent_dims(&img.extent);
                if !dims.contains(&0) {
                    for axis in 0..3 {
                        let lo = img.extent[2 * axis] as f64;
                        let hi = img.extent[2 * axis + 1] as f64;
                        grow(axis, img.origin[axis] + lo * img.spacing[axis]);
                        grow(axis, img.origin[axis] + hi * img.spacing[axis]);
                    }
                }
            }
            Block::Rectilinear(r) => {
                for (axis, coords) in [&r.x_coords, &r.y_coords, &r.z_coords].iter().enumerate() {
                    if let Some(c) = coords {
                        for i in 0..c.len() {
                            if let Some(v) = c.get_f64(i) {
                                grow(axis, v);
                            }
                        }
                    }
                }
            }
            _ => {
                if let Some(p) = self.points() {
                    for i in 0..p.len() {
                        if let Some(v) = p.get_f64(i) {
                            grow(i % 3, v);
                        }
                    }
                }
            }
        }
        b
    }
}
