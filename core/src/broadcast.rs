//! Broadcaster & Tick Loop (§4.7): the 10 Hz status frame and the
//! lock-owner expiry sweep. `coviz-server` owns the actual timer thread
//! and calls `tick` once per period; everything here is plain state
//! manipulation so it is driven directly from tests too.

use crate::ids::DatasetId;
use crate::net::outbound::{HeadsetStatusRecord, OutboundMessage};
use crate::server::Server;
use crate::session::connection::Role;

/// One full tick: release expired locks, then fan a `HeadsetsStatus`
/// frame out to every connection under the backpressure threshold.
pub fn tick(server: &Server) {
    let now = server.now_us();
    let mut world = server.world();
    let table = server.connections();

    let released = world.expire_locks(now, server.config.max_owner_time_us);
    for (dataset_id, sd_id) in released {
        server.broadcast_all(
            &table,
            &OutboundMessage::SubDatasetLockOwner { dataset_id, sd_id, headset_id: None },
        );
    }

    // No status frame goes out until the first anchor round is
    // committed — before that, clients have no shared spatial frame to
    // place headset positions into.
    if !world.anchor.buffer.is_completed() {
        return;
    }

    let records: Vec<HeadsetStatusRecord> = table
        .iter()
        .filter_map(|c| c.as_headset())
        .map(|h| HeadsetStatusRecord {
            id: h.headset_id,
            color: h.color,
            action: h.current_action as u32,
            pos: h.pos,
            rot: h.rot,
            pointing_technique: h.pointing.technique as u32,
            pointing_dataset_id: h.pointing.dataset_id,
            pointing_sd_id: h.pointing.sd_id,
            pointing_in_public: world
                .meta(DatasetId(h.pointing.dataset_id), h.pointing.sd_id.into())
                .map(|m| m.is_public())
                .unwrap_or(true),
            local_sd_pos: h.pointing.local_pos,
            headset_start_pos: h.pointing.start_pos,
            headset_start_rot: h.pointing.start_rot,
        })
        .collect();

    if records.is_empty() {
        return;
    }
    let frame = OutboundMessage::HeadsetsStatus { records }.encode();
    for conn in table.iter() {
        if matches!(conn.role, Role::Unidentified) {
            continue;
        }
        if conn.outstanding_bytes() < server.config.backpressure_threshold_bytes {
            conn.send(frame.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::{ConnectionId, HeadsetId};
    use crate::loader::NullLoader;
    use crate::session::connection::{Connection, HeadsetData, OutboundSink, Role};
    use sloggers::{null::NullLoggerBuilder, Build};
    use std::sync::{Arc, Mutex};

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

    #[test]
    fn test_tick_skips_backpressured_connections() {
        let server = test_server();
        let fast = Arc::new(Mutex::new(Vec::new()));
        let slow = Arc::new(Mutex::new(Vec::new()));
        {
            let mut table = server.connections();
            let mut c0 = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(RecordingSink(fast.clone())));
            c0.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c0);

            let mut c1 = Connection::new(ConnectionId(1), "10.0.0.3".into(), Box::new(RecordingSink(slow.clone())));
            c1.role = Role::Headset(HeadsetData::new(HeadsetId(1), 2));
            table.insert(c1);
            let handle = table.get(ConnectionId(1)).unwrap().outstanding_handle();
            handle.store(server.config.backpressure_threshold_bytes, std::sync::atomic::Ordering::Release);
        }
        server.world().anchor.buffer.commit();

        tick(&server);

        assert_eq!(fast.lock().unwrap().len(), 1);
        assert!(slow.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tick_with_no_headsets_sends_nothing() {
        let server = test_server();
        tick(&server); // must not panic with an empty table
    }

    #[test]
    fn test_tick_sends_nothing_before_anchor_is_completed() {
        let server = test_server();
        let sink = Arc::new(Mutex::new(Vec::new()));
        {
            let mut table = server.connections();
            let mut c0 = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(RecordingSink(sink.clone())));
            c0.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c0);
        }

        tick(&server);

        assert!(sink.lock().unwrap().is_empty(), "no status frame until the anchor round commits");
    }

    #[test]
    fn test_tick_skips_unidentified_connections() {
        let server = test_server();
        let headset_sink = Arc::new(Mutex::new(Vec::new()));
        let unidentified_sink = Arc::new(Mutex::new(Vec::new()));
        {
            let mut table = server.connections();
            let mut c0 = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(RecordingSink(headset_sink.clone())));
            c0.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c0);
            table.insert(Connection::new(ConnectionId(1), "10.0.0.3".into(), Box::new(RecordingSink(unidentified_sink.clone()))));
        }
        server.world().anchor.buffer.commit();

        tick(&server);

        assert_eq!(headset_sink.lock().unwrap().len(), 1);
        assert!(unidentified_sink.lock().unwrap().is_empty(), "a connection that never identified must not receive status ticks");
    }

    #[test]
    fn test_tick_releases_expired_locks() {
        let log = NullLoggerBuilder {}.build().unwrap();
        let config = Config { max_owner_time_us: 0, ..Config::default() };
        let server = Server::new(config, Box::new(NullLoader), log);
        let ds = {
            let mut world = server.world();
            let ds = world.add_dataset(crate::world::dataset::DatasetKind::Vtk, "d".into(), vec![], vec![]);
            let sd = world.add_subdataset(ds, "s".into(), None, 0).unwrap();
            world.meta_mut(ds, sd).unwrap().stamp(HeadsetId(0), 0);
            ds
        };

        tick(&server);

        let world = server.world();
        let meta = world.meta(ds, crate::ids::SubDatasetId(0)).unwrap();
        assert!(meta.lock_owner.is_none(), "zero max_owner_time_us expires any existing lock immediately");
    }
}
