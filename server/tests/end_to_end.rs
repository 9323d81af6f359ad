//! Drives the parser and command handlers end to end without a real
//! socket: raw wire bytes in, `Buffer`/`Parser`/`handlers::dispatch` in
//! the middle, recorded outbound frames out.

use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, WriteBytesExt};
use sloggers::{null::NullLoggerBuilder, Build};

use coviz_core::config::Config;
use coviz_core::handlers;
use coviz_core::ids::{ConnectionId, HeadsetId};
use coviz_core::loader::NullLoader;
use coviz_core::net::buffer::Buffer;
use coviz_core::net::message::Tag;
use coviz_core::net::parser::Parser;
use coviz_core::session::connection::{Connection, HeadsetData, OutboundSink, Role, TabletData};
use coviz_core::world::dataset::DatasetKind;
use coviz_core::Server;

struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl OutboundSink for RecordingSink {
    fn send(&self, frame: Vec<u8>) {
        self.0.lock().unwrap().push(frame);
    }
}

fn test_server() -> Server {
    let log = NullLoggerBuilder {}.build().unwrap();
    Server::new(Config::default(), Box::new(NullLoader), log)
}

fn connect(server: &Server, id: ConnectionId, ip: &str) -> Arc<Mutex<Vec<Vec<u8>>>> {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let mut table = server.connections();
    table.insert(Connection::new(id, ip.to_string(), Box::new(RecordingSink(frames.clone()))));
    frames
}

fn ident_headset_frame() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u16::<BigEndian>(Tag::IdentHeadset as u16).unwrap();
    buf
}

fn rotate_frame(dataset_id: u32, sd_id: u32, quat: [f32; 4]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u16::<BigEndian>(Tag::RotateDataset as u16).unwrap();
    buf.write_u32::<BigEndian>(dataset_id).unwrap();
    buf.write_u32::<BigEndian>(sd_id).unwrap();
    for v in quat {
        buf.write_f32::<BigEndian>(v).unwrap();
    }
    buf
}

fn add_vtk_frame(path: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u16::<BigEndian>(Tag::AddVtkDataset as u16).unwrap();
    buf.write_u32::<BigEndian>(path.len() as u32).unwrap();
    buf.extend_from_slice(path.as_bytes());
    buf
}

/// Pumps bytes through a `Buffer`/`Parser` pair exactly the way
/// `coviz-server::runtime::connection` does, then dispatches whatever
/// comes out. This is the one place the codec and the handlers meet.
fn feed_and_dispatch(server: &Server, sender: ConnectionId, buffer: &mut Buffer, parser: &mut Parser, bytes: &[u8]) {
    buffer.write_slice(bytes);
    let readable_len = buffer.readable_slice().len();
    let messages = parser.feed(buffer.readable_slice()).expect("well-formed test bytes");
    buffer.advance(readable_len);
    for msg in messages {
        handlers::dispatch(server, sender, msg).expect("handler should not error on valid test input");
    }
}

#[test]
fn ident_then_rotate_arrives_split_across_chunks() {
    let server = test_server();
    let headset = ConnectionId(0);
    let frames = connect(&server, headset, "10.0.0.5");

    let dataset_id = {
        let mut world = server.world();
        let ds = world.add_dataset(DatasetKind::Vtk, "plate".into(), vec![0], vec![]);
        world.add_subdataset(ds, "plate/0".into(), None, 0).unwrap();
        ds
    };

    let mut buffer = Buffer::new();
    let mut parser = Parser::new();

    feed_and_dispatch(&server, headset, &mut buffer, &mut parser, &ident_headset_frame());
    assert_eq!(frames.lock().unwrap().len(), 1, "ident gets exactly one HeadsetBindingInfo reply");

    {
        let table = server.connections();
        let conn = table.get(headset).unwrap();
        assert!(matches!(conn.role, Role::Headset(_)));
    }

    let whole = rotate_frame(dataset_id.0, 0, [0.0, 1.0, 0.0, 0.0]);
    let (first, second) = whole.split_at(whole.len() / 2);
    feed_and_dispatch(&server, headset, &mut buffer, &mut parser, first);
    feed_and_dispatch(&server, headset, &mut buffer, &mut parser, second);

    let world = server.world();
    let sd = world.dataset(dataset_id).unwrap().find(coviz_core::ids::SubDatasetId(0)).unwrap();
    assert_eq!(sd.quat, [0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn private_subdataset_rejects_transform_from_a_non_owner() {
    let server = test_server();
    let owner = ConnectionId(0);
    let intruder = ConnectionId(1);
    connect(&server, owner, "10.0.0.1");
    let intruder_frames = connect(&server, intruder, "10.0.0.2");

    {
        let mut table = server.connections();
        table.get_mut(owner).unwrap().role = Role::Headset(HeadsetData::new(HeadsetId(0), 0));
        table.get_mut(intruder).unwrap().role = Role::Headset(HeadsetData::new(HeadsetId(1), 1));
    }

    let dataset_id = {
        let mut world = server.world();
        let ds = world.add_dataset(DatasetKind::Vtk, "plate".into(), vec![0], vec![]);
        world.add_subdataset(ds, "plate/0".into(), Some(HeadsetId(0)), 0).unwrap();
        ds
    };

    let mut buffer = Buffer::new();
    let mut parser = Parser::new();
    feed_and_dispatch(
        &server,
        intruder,
        &mut buffer,
        &mut parser,
        &rotate_frame(dataset_id.0, 0, [0.0, 1.0, 0.0, 0.0]),
    );

    let world = server.world();
    let sd = world.dataset(dataset_id).unwrap().find(coviz_core::ids::SubDatasetId(0)).unwrap();
    assert_eq!(sd.quat, [1.0, 0.0, 0.0, 0.0], "denied transform must not mutate state");
    assert!(intruder_frames.lock().unwrap().is_empty(), "denied transform produces no reply at all");
}

#[test]
fn add_vtk_dataset_without_a_real_loader_warns_and_drops() {
    let server = test_server();
    let sender = ConnectionId(0);
    connect(&server, sender, "10.0.0.9");

    let mut buffer = Buffer::new();
    let mut parser = Parser::new();
    buffer.write_slice(&add_vtk_frame("/datasets/plate.vtk"));
    let readable_len = buffer.readable_slice().len();
    let messages = parser.feed(buffer.readable_slice()).unwrap();
    buffer.advance(readable_len);

    assert_eq!(messages.len(), 1);
    let err = handlers::dispatch(&server, sender, messages.into_iter().next().unwrap()).unwrap_err();
    assert_eq!(err.action(), coviz_core::ErrorAction::WarnAndDrop);

    assert_eq!(server.world().datasets().count(), 0, "a failed load must not register a dataset");
}

#[test]
fn disconnect_removes_privately_owned_subdatasets_and_clears_binding() {
    let server = test_server();
    let headset = ConnectionId(0);
    let tablet = ConnectionId(1);
    connect(&server, headset, "10.0.0.1");
    let tablet_frames = connect(&server, tablet, "10.0.0.2");

    {
        let mut table = server.connections();
        let mut h = HeadsetData::new(HeadsetId(0), 0);
        h.bound_tablet = Some(tablet);
        table.get_mut(headset).unwrap().role = Role::Headset(h);
        table.get_mut(tablet).unwrap().role = Role::Tablet(TabletData {
            bound_headset: Some(headset),
            ..Default::default()
        });
    }

    let dataset_id = {
        let mut world = server.world();
        let ds = world.add_dataset(DatasetKind::Vtk, "plate".into(), vec![0], vec![]);
        world.add_subdataset(ds, "plate/0".into(), Some(HeadsetId(0)), 0).unwrap();
        ds
    };

    handlers::handle_disconnect(&server, headset);

    assert!(server.connections().get(headset).is_none());
    assert!(
        !tablet_frames.lock().unwrap().is_empty(),
        "the bound tablet should be told its headset dropped"
    );

    let world = server.world();
    assert!(
        world.meta(dataset_id, coviz_core::ids::SubDatasetId(0)).is_none(),
        "a privately owned subdataset is removed entirely when its owner disconnects"
    );
}
