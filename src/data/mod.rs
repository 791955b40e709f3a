//! In-memory mesh data model: typed buffers, named arrays, cell connectivity,
//! geometry blocks and the composite that holds them.
//!
//! The schema codecs only talk to this model through the types re-exported here.

pub mod array;
pub mod block;
pub mod cell_array;
pub mod cell_type;
pub mod composite;
pub mod scalar;

pub use array::{ArrayCollection, Centering, DataArray, DatasetAttributes};
pub use block::{
    Block, GeometryKind, ImageData, PolyData, RectilinearGrid, StructuredGrid, UnstructuredGrid,
    extent_dims, extent_num_cells, extent_num_points,
};
pub use cell_array::{CellArray, cell_locations};
pub use cell_type::CellType;
pub use composite::CompositeMesh;
pub use scalar::{ScalarType, TypedBuffer};
