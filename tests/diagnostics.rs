mod util;
use util::*;

use std::sync::Arc;

use mesh_transit::metadata::GHOST_ARRAY_NAME;
use mesh_transit::prelude::*;
use mesh_transit::schema::array_path;
use mesh_transit::transport::StoredShape;

#[test]
fn block_owner_arrays_come_from_metadata() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::Unstructured, 4);
    write_stream(&hub, "s", "BP4", 2, &[mesh.clone()], &[(0, 0.0)]);

    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));
    let mut got = a.mesh("m", false).unwrap();
    a.add_array(&mut got, "m", Centering::Cell, "SenderBlockOwner")
        .unwrap();
    a.add_array(&mut got, "m", Centering::Point, "BlockOwner")
        .unwrap();

    for (j, b) in got.iter() {
        let sender = b.attributes().cell_data.get("SenderBlockOwner").unwrap();
        assert_eq!(
            sender.values,
            TypedBuffer::I32(vec![(j % 2) as i32; mesh.blocks[j].num_cells()])
        );
        let receiver = b.attributes().point_data.get("BlockOwner").unwrap();
        assert_eq!(
            receiver.values,
            TypedBuffer::I32(vec![0; mesh.blocks[j].num_points()])
        );
    }
}

#[test]
fn ghost_arrays_follow_the_data_arrays() {
    let hub = Arc::new(MemoryHub::new());
    let mut mesh = Mesh::new("m", GeometryKind::UniformCartesian, 3);
    for b in &mut mesh.blocks {
        with_ghosts(b, true, true);
    }
    write_stream(&hub, "s", "BP4", 1, &[mesh.clone()], &[(0, 0.0)]);

    let raw = hub.reader("s", "BP4", &NoComm).unwrap();
    let cells: u64 = mesh.blocks.iter().map(|b| b.num_cells() as u64).sum();
    let points: u64 = mesh.blocks.iter().map(|b| b.num_points() as u64).sum();
    let k = 2;
    let cell_ghosts = raw.inquire(&array_path(0, k)).unwrap();
    assert_eq!(cell_ghosts.scalar, ScalarType::U8);
    assert_eq!(cell_ghosts.shape, StoredShape::Global { len: cells });
    let node_ghosts = raw.inquire(&array_path(0, k + 1)).unwrap();
    assert_eq!(node_ghosts.shape, StoredShape::Global { len: points });

    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));
    assert_eq!(a.sender_mesh_metadata(0).unwrap().num_ghost_arrays(), 2);
    let mut got = read_full(&mut a, "m");
    a.add_ghost_cells_array(&mut got, "m").unwrap();
    a.add_ghost_nodes_array(&mut got, "m").unwrap();
    assert_owned_blocks(&got, &mesh.blocks, a.mesh_metadata(0).unwrap(), 0);
}

#[test]
fn node_ghosts_alone_keep_their_slot() {
    let hub = Arc::new(MemoryHub::new());
    let mut mesh = Mesh::new("m", GeometryKind::Polydata, 2);
    for b in &mut mesh.blocks {
        with_ghosts(b, false, true);
    }
    write_stream(&hub, "s", "BP4", 1, &[mesh.clone()], &[(0, 0.0)]);

    let raw = hub.reader("s", "BP4", &NoComm).unwrap();
    assert!(raw.inquire(&array_path(0, 2)).is_none());
    assert!(raw.inquire(&array_path(0, 3)).is_some());

    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));
    let mut got = a.mesh("m", false).unwrap();
    let err = a.add_ghost_cells_array(&mut got, "m").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        SchemaError::ArrayNotFound { array, centering: Centering::Cell, .. } if array == GHOST_ARRAY_NAME
    ));
    a.add_ghost_nodes_array(&mut got, "m").unwrap();
    for (j, b) in got.iter() {
        assert_eq!(
            b.attributes().point_data.get(GHOST_ARRAY_NAME),
            mesh.blocks[j].attributes().point_data.get(GHOST_ARRAY_NAME)
        );
    }
}

#[test]
fn structure_only_skips_points_and_cells() {
    let hub = Arc::new(MemoryHub::new());
    let meshes = [
        Mesh::new("u", GeometryKind::Unstructured, 2),
        Mesh::new("img", GeometryKind::UniformCartesian, 2),
        Mesh::new("curv", GeometryKind::LogicallyCartesian, 2),
    ];
    write_stream(&hub, "s", "BP4", 1, &meshes, &[(0, 0.0)]);
    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));

    let u = a.mesh("u", true).unwrap();
    for (_, b) in u.iter() {
        let Block::Unstructured(grid) = b else {
            panic!("wrong kind")
        };
        assert!(grid.points.is_none());
        assert!(grid.cells.is_empty());
        assert!(grid.cell_types.is_empty());
    }

    let img = a.mesh("img", true).unwrap();
    for (j, b) in img.iter() {
        let (Block::Image(got), Block::Image(want)) = (b, &meshes[1].blocks[j]) else {
            panic!("wrong kind")
        };
        assert_eq!(got.extent, want.extent);
        assert_eq!(got.origin, want.origin);
        assert_eq!(got.spacing, want.spacing);
    }

    let curv = a.mesh("curv", true).unwrap();
    for (j, b) in curv.iter() {
        assert_eq!(b.extent(), meshes[2].blocks[j].extent());
        assert!(b.points().is_none());
    }
}

#[test]
fn explicit_receiver_layout_wins_over_the_partitioner() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::StretchedCartesian, 4);
    write_stream(&hub, "s", "BP4", 2, &[mesh.clone()], &[(0, 0.0)]);

    let comm = LocalComm::new(1, 2);
    let mut a = reader(&hub, "s", "BP4", comm);
    let mut layout = a.sender_mesh_metadata(0).unwrap().clone();
    layout.block_owner = vec![1, 1, 0, 0];
    layout.num_blocks_local = vec![2, 2];
    a.set_receiver_mesh_metadata(0, layout.clone()).unwrap();

    let got = read_full(&mut a, "m");
    assert_eq!(a.mesh_metadata(0).unwrap(), &layout);
    assert_owned_blocks(&got, &mesh.blocks, &layout, 1);
    assert!(got.block(0).is_some() && got.block(2).is_none());

    // released layouts are recomputed by the partitioner
    a.release_data();
    assert_eq!(a.mesh_metadata(0).unwrap().block_owner, vec![0, 0, 1, 1]);
}

#[test]
fn configured_partitioner_is_used() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::LogicallyCartesian, 3);
    write_stream(&hub, "cfg", "BP4", 1, &[mesh.clone()], &[(0, 0.0)]);

    let cfg = StreamConfig::from_json_str(
        r#"{
            "file_name": "cfg",
            "engine": "BP4",
            "partitioner": { "mapped": { "blocks": [0, 1, 2], "procs": [2, 0, 1] } }
        }"#,
    )
    .unwrap();
    for comm in LocalComm::group(3) {
        let mut a = InTransitDataAdaptor::new(hub.clone(), Arc::new(comm));
        a.configure(&cfg).unwrap();
        a.open_stream().unwrap();
        let got = read_full(&mut a, "m");
        let md = a.mesh_metadata(0).unwrap().clone();
        assert_eq!(md.block_owner, vec![2, 0, 1]);
        assert_eq!(got.num_local_blocks(), 1);
        assert_owned_blocks(&got, &mesh.blocks, &md, comm.rank());
    }
}

#[test]
fn partitioner_failures_surface() {
    let hub = Arc::new(MemoryHub::new());
    write_stream(
        &hub,
        "s",
        "BP4",
        1,
        &[Mesh::new("m", GeometryKind::UniformCartesian, 2)],
        &[(0, 0.0)],
    );
    let cfg = StreamConfig {
        file_name: "s".into(),
        partitioner: PartitionerKind::Mapped {
            blocks: vec![0],
            procs: vec![0],
        },
        ..Default::default()
    };
    let mut a = InTransitDataAdaptor::new(hub, Arc::new(LocalComm::new(0, 1)));
    a.configure(&cfg).unwrap();
    a.open_stream().unwrap();
    assert!(matches!(a.mesh("m", false), Err(SchemaError::Partition(_))));
}
