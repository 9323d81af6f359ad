//! Annotation lifecycle (§4.3 item 96): `StartAnnotation` arms a
//! technique on a subdataset, `AnchorAnnotation` appends sketched
//! points, `ClearAnnotations` empties them. Structural content changes,
//! so all three fan out to every connection including the sender.

use crate::error::CoreError;
use crate::ids::{ConnectionId, DatasetId, SubDatasetId};
use crate::net::outbound::OutboundMessage;
use crate::permission::{can_modify, resolve_actor};
use crate::server::Server;

fn unknown(dataset_id: DatasetId, sd_id: SubDatasetId) -> CoreError {
    CoreError::UnknownTarget(format!("dataset {dataset_id} subdataset {sd_id}"))
}

pub fn start(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, technique: u16) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();
    let actor = resolve_actor(&table, sender);

    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }

    server.broadcast_all(&table, &OutboundMessage::StartAnnotation { dataset_id, sd_id, technique });
    Ok(())
}

pub fn anchor(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, points: Vec<[f32; 3]>) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();
    let actor = resolve_actor(&table, sender);

    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }
    let dataset = world.dataset_mut(dataset_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    let sd = dataset.find_mut(sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    sd.annotation_points.extend(points.iter().copied());

    server.broadcast_all(&table, &OutboundMessage::AnchorAnnotation { dataset_id, sd_id, points });
    Ok(())
}

pub fn clear(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();
    let actor = resolve_actor(&table, sender);

    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }
    let dataset = world.dataset_mut(dataset_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    let sd = dataset.find_mut(sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    sd.annotation_points.clear();

    server.broadcast_all(&table, &OutboundMessage::ClearAnnotations { dataset_id, sd_id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::HeadsetId;
    use crate::loader::NullLoader;
    use crate::session::connection::{Connection, HeadsetData, OutboundSink, Role};
    use crate::world::dataset::DatasetKind;
    use sloggers::{null::NullLoggerBuilder, Build};

    struct NullSink;
    impl OutboundSink for NullSink {
        fn send(&self, _frame: Vec<u8>) {}
    }

    fn test_server() -> Server {
        let log = NullLoggerBuilder {}.build().unwrap();
        Server::new(Config::default(), Box::new(NullLoader), log)
    }

    #[test]
    fn test_anchor_appends_then_clear_empties() {
        let server = test_server();
        let ds = {
            let mut world = server.world();
            let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
            world.add_subdataset(ds, "s".into(), None, 0).unwrap();
            ds
        };
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            c.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c);
        }

        anchor(&server, ConnectionId(0), ds.0, 0, vec![[1.0, 2.0, 3.0]]).unwrap();
        anchor(&server, ConnectionId(0), ds.0, 0, vec![[4.0, 5.0, 6.0]]).unwrap();
        {
            let world = server.world();
            let sd = world.dataset(ds).unwrap().find(SubDatasetId(0)).unwrap();
            assert_eq!(sd.annotation_points.len(), 2);
        }

        clear(&server, ConnectionId(0), ds.0, 0).unwrap();
        let world = server.world();
        let sd = world.dataset(ds).unwrap().find(SubDatasetId(0)).unwrap();
        assert!(sd.annotation_points.is_empty());
    }

    #[test]
    fn test_unknown_subdataset_is_warn_and_drop() {
        let server = test_server();
        let err = start(&server, ConnectionId(0), 0, 0, 0).unwrap_err();
        assert_eq!(err.action(), crate::error::ErrorAction::WarnAndDrop);
    }
}
