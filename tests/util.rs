#![allow(dead_code)]
use std::sync::Arc;

use mesh_transit::metadata::{GHOST_ARRAY_NAME, arrays_of};
use mesh_transit::prelude::*;

/// Cell array every test block carries.
pub const CELL_ARRAY: &str = "pressure";
/// Point array every test block carries (3 components).
pub const POINT_ARRAY: &str = "velocity";

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub kind: GeometryKind,
    pub blocks: Vec<Block>,
}

impl Mesh {
    /// `n` distinguishable blocks of `kind`, arrays attached.
    pub fn new(name: &str, kind: GeometryKind, n: usize) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            blocks: (0..n).map(|j| block(kind, j)).collect(),
        }
    }
}

pub fn block(kind: GeometryKind, j: usize) -> Block {
    let mut b = match kind {
        GeometryKind::Unstructured => unstructured(j),
        GeometryKind::Polydata => polydata(j),
        GeometryKind::UniformCartesian => image(j),
        GeometryKind::StretchedCartesian => rectilinear(j),
        GeometryKind::LogicallyCartesian => structured(j),
    };
    with_arrays(&mut b, j);
    b
}

fn points(n: usize, j: usize) -> Vec<f64> {
    (0..n)
        .flat_map(|i| [i as f64, j as f64, 0.5 * i as f64])
        .collect()
}

/// `j + 3` points fanned into `j + 1` triangles.
pub fn unstructured(j: usize) -> Block {
    let mut cells = CellArray::new();
    for i in 0..=j as i64 {
        cells.push_cell(&[0, i + 1, i + 2]);
    }
    Block::Unstructured(UnstructuredGrid {
        points: Some(TypedBuffer::F64(points(j + 3, j))),
        cells,
        cell_types: vec![CellType::Triangle.tag(); j + 1],
        ..Default::default()
    })
}

/// Group sizes vary with `j`; strips only on odd blocks.
pub fn polydata(j: usize) -> Block {
    let mut pd = PolyData {
        points: Some(TypedBuffer::F64(points(6, j))),
        ..Default::default()
    };
    for v in 0..=(j % 2) as i64 {
        pd.verts.push_cell(&[v]);
    }
    for _ in 0..j {
        pd.lines.push_cell(&[0, 1]);
    }
    pd.polys.push_cell(&[0, 1, 2, 3]);
    if j % 2 == 1 {
        pd.strips.push_cell(&[1, 2, 3, 4, 5]);
    }
    Block::Polydata(pd)
}

pub fn image(j: usize) -> Block {
    Block::Image(ImageData {
        extent: [0, j as i32 + 1, 0, 2, 0, 0],
        origin: [10.0 * j as f64, 0.0, 0.0],
        spacing: [0.5, 0.5, 1.0],
        ..Default::default()
    })
}

pub fn rectilinear(j: usize) -> Block {
    let axis = |n: usize, scale: f64| TypedBuffer::F64((0..n).map(|i| scale * (i * i) as f64).collect());
    Block::Rectilinear(RectilinearGrid {
        extent: [0, j as i32 + 1, 0, 1, 0, 1],
        x_coords: Some(axis(j + 2, 1.0 + j as f64)),
        y_coords: Some(axis(2, 2.0)),
        z_coords: Some(axis(2, 3.0)),
        ..Default::default()
    })
}

pub fn structured(j: usize) -> Block {
    let n = 2 * (j + 2);
    Block::Structured(StructuredGrid {
        extent: [0, 1, 0, j as i32 + 1, 0, 0],
        points: Some(TypedBuffer::F32(
            (0..3 * n).map(|i| (i + 100 * j) as f32).collect(),
        )),
        ..Default::default()
    })
}

/// Attach the cell and point arrays, with values that identify the block.
pub fn with_arrays(b: &mut Block, j: usize) {
    let cells = b.num_cells();
    let points = b.num_points();
    let attrs = b.attributes_mut();
    attrs.cell_data.add(DataArray::new(
        CELL_ARRAY,
        1,
        TypedBuffer::F64((0..cells).map(|c| (1000 * j + c) as f64).collect()),
    ));
    attrs.point_data.add(DataArray::new(
        POINT_ARRAY,
        3,
        TypedBuffer::F32((0..3 * points).map(|p| (j + p) as f32 * 0.25).collect()),
    ));
}

/// Attach ghost arrays: cell ghosts and/or node ghosts.
pub fn with_ghosts(b: &mut Block, cells: bool, nodes: bool) {
    let (nc, np) = (b.num_cells(), b.num_points());
    let attrs = b.attributes_mut();
    if cells {
        let flags = (0..nc).map(|c| (c % 2) as u8).collect();
        attrs
            .cell_data
            .add(DataArray::new(GHOST_ARRAY_NAME, 1, TypedBuffer::U8(flags)));
    }
    if nodes {
        let flags = (0..np).map(|p| 2 * (p % 2) as u8).collect();
        attrs
            .point_data
            .add(DataArray::new(GHOST_ARRAY_NAME, 1, TypedBuffer::U8(flags)));
    }
}

/// Global-view metadata for `blocks`, block `j` owned by writer `j % n_writers`.
pub fn describe(name: &str, kind: GeometryKind, blocks: &[Block], n_writers: usize) -> MeshMetadata {
    let mut b = MeshMetadataBuilder::new(name, kind);
    if let Some(first) = blocks.first() {
        for a in arrays_of(first) {
            b = b.array(a.name, a.centering, a.components, a.scalar);
        }
        let attrs = first.attributes();
        if attrs.cell_data.get(GHOST_ARRAY_NAME).is_some() {
            b = b.ghost_cells(1);
        }
        if attrs.point_data.get(GHOST_ARRAY_NAME).is_some() {
            b = b.ghost_nodes(1);
        }
    }
    for (j, block) in blocks.iter().enumerate() {
        b = b.block(j, j % n_writers, block);
    }
    b.build(n_writers).unwrap()
}

/// The blocks writer `rank` holds, at their global indices.
pub fn local(blocks: &[Block], n_writers: usize, rank: usize) -> CompositeMesh {
    let mut mesh = CompositeMesh::new(blocks.len());
    for (j, b) in blocks.iter().enumerate() {
        if j % n_writers == rank {
            mesh.set_block(j, b.clone());
        }
    }
    mesh
}

/// Write `steps` of `meshes` from a group of `n_writers`, one rank after the other.
pub fn write_stream(
    hub: &Arc<MemoryHub>,
    stream: &str,
    engine: &str,
    n_writers: usize,
    meshes: &[Mesh],
    steps: &[(u64, f64)],
) {
    let md: Vec<_> = meshes
        .iter()
        .map(|m| describe(&m.name, m.kind, &m.blocks, n_writers))
        .collect();
    for comm in LocalComm::group(n_writers) {
        let objects: Vec<_> = meshes
            .iter()
            .map(|m| local(&m.blocks, n_writers, comm.rank()))
            .collect();
        let mut out = OutputStream::new(hub.clone());
        out.set_write_engine(engine).unwrap();
        out.open(&comm, stream).unwrap();
        for &(step, time) in steps {
            out.write_step(&comm, step, time, &md, &objects).unwrap();
        }
        assert_eq!(out.steps_written(), steps.len() as u64);
        out.close().unwrap();
    }
}

/// An adaptor for reader `comm`, opened on the first step of `stream`.
pub fn reader(hub: &Arc<MemoryHub>, stream: &str, engine: &str, comm: LocalComm) -> InTransitDataAdaptor {
    let mut a = InTransitDataAdaptor::new(hub.clone(), Arc::new(comm));
    a.set_file_name(stream);
    a.set_read_engine(engine).unwrap();
    a.open_stream().unwrap();
    a
}

/// Geometry plus every array the sender declared.
pub fn read_full(a: &mut InTransitDataAdaptor, name: &str) -> CompositeMesh {
    let arrays = a.mesh_metadata_by_name(name).unwrap().arrays.clone();
    let mut mesh = a.mesh(name, false).unwrap();
    for desc in arrays {
        a.add_array(&mut mesh, name, desc.centering, &desc.name).unwrap();
    }
    mesh
}

/// Assert `got` holds exactly the blocks `md` assigns to `rank`, equal to `want`.
pub fn assert_owned_blocks(got: &CompositeMesh, want: &[Block], md: &MeshMetadata, rank: usize) {
    assert_eq!(got.len(), want.len());
    for (j, expect) in want.iter().enumerate() {
        if md.block_owner[j] == rank {
            assert_eq!(got.block(j), Some(expect), "rank {rank} block {j}");
        } else {
            assert!(got.block(j).is_none(), "rank {rank} holds foreign block {j}");
        }
    }
}
