mod util;
use util::*;

use std::sync::Arc;

use bytes::Bytes;
use mesh_transit::prelude::*;
use mesh_transit::schema::{InputStream, REVISION, VERSION_PATH, object_path};
use mesh_transit::transport::{TransportError, VariableDecl};

const STEPS: [(u64, f64); 3] = [(10, 0.1), (20, 0.2), (30, 0.3)];

#[test]
fn readers_walk_every_step_then_hit_the_end() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::Polydata, 5);
    write_stream(&hub, "live", "SST", 2, &[mesh.clone()], &STEPS);
    assert_eq!(hub.committed_steps("live"), 3);

    for comm in LocalComm::group(3) {
        let mut a = reader(&hub, "live", "sst", comm);
        for (i, &(step, time)) in STEPS.iter().enumerate() {
            if i > 0 {
                a.advance_stream().unwrap();
            }
            assert_eq!(a.data_time_step(), step);
            assert_eq!(a.data_time(), time);
            assert_eq!(a.number_of_meshes(), 1);
            let got = read_full(&mut a, "m");
            let md = a.mesh_metadata(0).unwrap().clone();
            assert_owned_blocks(&got, &mesh.blocks, &md, comm.rank());
        }
        match a.advance_stream() {
            Err(SchemaError::TransportRead { source, .. }) => {
                assert!(matches!(source, TransportError::EndOfStream));
            }
            other => panic!("expected end of stream, got {other:?}"),
        }
        assert!(!a.stream_good());
    }
}

#[test]
fn streaming_metadata_is_read_per_writer_block() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::UniformCartesian, 4);
    write_stream(&hub, "live", "SST", 2, &[mesh.clone()], &STEPS[..1]);

    let raw = hub.reader("live", "SST", &NoComm).unwrap();
    assert!(!raw.is_file_based());
    let info = raw.inquire(&object_path(0, "metadata")).unwrap();
    assert_eq!(info.write_blocks(), 2);

    let want = describe("m", mesh.kind, &mesh.blocks, 2);
    for comm in LocalComm::group(4) {
        let a = reader(&hub, "live", "SST", comm);
        assert_eq!(a.sender_mesh_metadata(0).unwrap(), &want);
    }
}

#[test]
fn uncommitted_steps_are_not_ready() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::Unstructured, 2);
    let md = describe("m", mesh.kind, &mesh.blocks, 1);
    let mut out = OutputStream::new(hub.clone());
    out.set_write_engine("SST").unwrap();
    out.open(&NoComm, "live").unwrap();
    out.write_step(&NoComm, 0, 0.0, &[md], &[local(&mesh.blocks, 1, 0)])
        .unwrap();

    let mut a = reader(&hub, "live", "SST", LocalComm::new(0, 1));
    match a.advance_stream() {
        Err(SchemaError::TransportRead { source, .. }) => {
            assert!(matches!(source, TransportError::StepNotReady));
        }
        other => panic!("expected a not-ready step, got {other:?}"),
    }
    assert!(!a.stream_good());

    out.close().unwrap();
    assert!(!out.good());
    assert_eq!(hub.committed_steps("live"), 1);
}

#[test]
fn a_finished_stream_is_replaced_by_the_next_session() {
    let hub = Arc::new(MemoryHub::new());
    let first = Mesh::new("first", GeometryKind::UniformCartesian, 1);
    let second = Mesh::new("second", GeometryKind::LogicallyCartesian, 2);
    write_stream(&hub, "s", "BP4", 1, &[first], &STEPS);
    write_stream(&hub, "s", "BP4", 2, &[second.clone()], &STEPS[..1]);

    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));
    assert_eq!(hub.committed_steps("s"), 1);
    assert_eq!(a.number_of_meshes(), 1);
    assert_eq!(a.sender_mesh_metadata(0).unwrap().mesh_name, "second");
    let got = read_full(&mut a, "second");
    assert_owned_blocks(&got, &second.blocks, a.mesh_metadata(0).unwrap(), 0);
}

#[test]
fn engine_names_are_checked_up_front() {
    let hub = Arc::new(MemoryHub::new());
    let mut input = InputStream::new(hub.clone());
    assert_eq!(input.read_engine(), "BP4");
    assert!(matches!(
        input.set_read_engine("carrier-pigeon"),
        Err(SchemaError::TransportRead {
            source: TransportError::UnknownEngine(_),
            ..
        })
    ));
    input.set_read_engine("hdf5").unwrap();
    assert_eq!(input.read_engine(), "HDF5");
    assert!(input.is_file_based());
    input.set_read_engine("DataMan").unwrap();
    assert!(!input.is_file_based());

    let mut out = OutputStream::new(hub);
    assert!(out.set_write_engine("carrier-pigeon").is_err());
}

#[test]
fn steps_can_be_read_with_the_raw_stream_api() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::StretchedCartesian, 3);
    write_stream(&hub, "s", "BP4", 1, &[mesh], &STEPS);

    let comm = LocalComm::new(0, 1);
    let mut input = InputStream::new(hub);
    input.open(&comm, "s").unwrap();
    let mut codec = CollectionCodec::new();
    let mut seen = Vec::new();
    loop {
        let engine = input.engine_mut("read").unwrap();
        seen.push(codec.read_time_step(engine).unwrap());
        if input.advance_time_step().is_err() {
            break;
        }
    }
    assert_eq!(seen, STEPS);
    assert!(!input.good());
    assert_eq!(input.current_step(), None);
}

#[test]
fn a_step_that_cannot_be_read_closes_the_stream() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::UniformCartesian, 2);
    let md = describe("m", mesh.kind, &mesh.blocks, 1);
    let mut w = hub.writer("s", "BP4", &NoComm).unwrap();
    let mut codec = CollectionCodec::new();
    w.begin_step().unwrap();
    codec.define_variables(&mut w, &NoComm, &[md.clone()]).unwrap();
    codec
        .write(&mut w, &NoComm, 0, 0.0, &[md], &[local(&mesh.blocks, 1, 0)])
        .unwrap();
    w.end_step().unwrap();

    // second step carries the schema tag and nothing else
    w.begin_step().unwrap();
    w.remove_all_variables();
    let v = w
        .define_variable(VariableDecl::scalar(VERSION_PATH, ScalarType::U32))
        .unwrap();
    w.put_deferred(v, Bytes::copy_from_slice(&REVISION.to_ne_bytes()))
        .unwrap();
    w.end_step().unwrap();
    w.close().unwrap();

    let mut a = reader(&hub, "s", "BP4", LocalComm::new(0, 1));
    assert!(a.stream_good());
    assert!(matches!(
        a.advance_stream(),
        Err(SchemaError::MissingField(path)) if path == "time_step"
    ));
    assert!(!a.stream_good());
}

#[test]
fn a_failed_write_abandons_the_step_and_closes() {
    let hub = Arc::new(MemoryHub::new());
    let mesh = Mesh::new("m", GeometryKind::Unstructured, 2);
    let md = describe("m", mesh.kind, &mesh.blocks, 1);
    let mut out = OutputStream::new(hub.clone());
    out.open(&NoComm, "s").unwrap();

    assert!(matches!(
        out.write_step(&NoComm, 0, 0.0, &[md.clone()], &[]),
        Err(SchemaError::ObjectCountMismatch { .. })
    ));
    assert!(!out.good());
    assert_eq!(hub.committed_steps("s"), 0);
    assert!(matches!(
        out.write_step(&NoComm, 1, 0.1, &[md], &[local(&mesh.blocks, 1, 0)]),
        Err(SchemaError::InvalidState { state: "closed", .. })
    ));

    assert!(matches!(
        hub.reader("s", "BP4", &NoComm),
        Err(TransportError::EndOfStream)
    ));
}
