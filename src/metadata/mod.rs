//! Mesh metadata: what each object looks like and who owns which block.

pub mod builder;
pub mod map;
pub mod mesh_metadata;

pub use builder::{BlockMetadata, MeshMetadataBuilder, arrays_of};
pub use map::MeshMetadataMap;
pub use mesh_metadata::{
    ArrayMetadata, EMPTY_BOUNDS, EMPTY_EXTENT, GHOST_ARRAY_NAME, MeshMetadata,
};
